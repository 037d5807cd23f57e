//! Token view of a source file.
//!
//! Tokens are the leaves of the concrete syntax tree, classified into the
//! categories of a classic hand-written lexer. Comments and whitespace never
//! reach the token stream.

use cinder_common::{SourceFile, Span};
use serde::Serialize;
use smol_str::SmolStr;
use std::fmt;
use std::ops::Range;
use tree_sitter::{Node, Tree};

const KEYWORDS: &[&str] = &[
    "int", "bool", "void", "return", "if", "else", "while", "true", "false",
];

const SYMBOL_CHARS: &str = "<>+-*/%();={}[],!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    #[serde(rename = "KEYWORD")]
    Keyword,
    #[serde(rename = "NUMBER")]
    Number,
    #[serde(rename = "IDENTIFIER")]
    Identifier,
    /// `&&`
    #[serde(rename = "LAND")]
    LogicalAnd,
    /// `||`
    #[serde(rename = "LOR")]
    LogicalOr,
    #[serde(rename = "EQ")]
    Eq,
    #[serde(rename = "NEQ")]
    Neq,
    #[serde(rename = "LE")]
    Le,
    #[serde(rename = "GE")]
    Ge,
    /// `^`, integer exponentiation
    #[serde(rename = "EXP")]
    Exp,
    #[serde(rename = "SYMBOL")]
    Symbol,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Number => "NUMBER",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::LogicalAnd => "LAND",
            TokenKind::LogicalOr => "LOR",
            TokenKind::Eq => "EQ",
            TokenKind::Neq => "NEQ",
            TokenKind::Le => "LE",
            TokenKind::Ge => "GE",
            TokenKind::Exp => "EXP",
            TokenKind::Symbol => "SYMBOL",
            TokenKind::Unknown => "UNKNOWN",
        }
    }

    fn classify(node_kind: &str, text: &str) -> Self {
        if KEYWORDS.contains(&text) {
            return TokenKind::Keyword;
        }
        if node_kind == "number_literal" {
            return TokenKind::Number;
        }
        match text {
            "&&" => return TokenKind::LogicalAnd,
            "||" => return TokenKind::LogicalOr,
            "==" => return TokenKind::Eq,
            "!=" => return TokenKind::Neq,
            "<=" => return TokenKind::Le,
            ">=" => return TokenKind::Ge,
            "^" => return TokenKind::Exp,
            _ => {}
        }

        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if SYMBOL_CHARS.contains(c) => TokenKind::Symbol,
            (Some(c), _) if c.is_ascii_digit() && text.bytes().all(|b| b.is_ascii_digit()) => {
                TokenKind::Number
            }
            (Some(c), _)
                if (c.is_ascii_alphabetic() || c == '_')
                    && text.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') =>
            {
                TokenKind::Identifier
            }
            _ => TokenKind::Unknown,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token with 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
    pub line: u32,
    pub column: u32,
    #[serde(skip)]
    pub span: Span,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, '{}', {}, {})",
            self.kind, self.text, self.line, self.column
        )
    }
}

/// Collect the tokens of `tree` in source order.
pub fn tokens(tree: &Tree, source: &SourceFile) -> Vec<Token> {
    let mut tokens = vec![];
    let mut cursor = tree.walk();

    'walk: loop {
        let node = cursor.node();
        if node.child_count() > 0 && node.kind() != "comment" && cursor.goto_first_child() {
            continue;
        }

        leaf_tokens(node, source, &mut tokens);

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    tokens
}

fn leaf_tokens(node: Node, source: &SourceFile, out: &mut Vec<Token>) {
    if node.kind() == "comment" || node.is_missing() || node.start_byte() == node.end_byte() {
        return;
    }
    let Ok(raw) = node.utf8_text(source.content.as_bytes()) else {
        return;
    };
    let text = raw.trim_start();
    let start = node.start_byte() + (raw.len() - text.len());
    let text = text.trim_end();
    if text.is_empty() {
        return;
    }

    let kind = TokenKind::classify(node.kind(), text);
    if kind == TokenKind::Unknown && text.chars().nth(1).is_some() {
        // Leaves such as `^=`, `++` or `$$x` split the way a hand-written
        // lexer would see them
        let before = source.content[..start].chars().next_back();
        for (kind, range) in rescan(text, before) {
            out.push(make_token(source, kind, start + range.start, &text[range]));
        }
    } else {
        out.push(make_token(source, kind, start, text));
    }
}

fn make_token(source: &SourceFile, kind: TokenKind, start: usize, text: &str) -> Token {
    let (line, column) = source.line_col(start as u32);
    let token = Token {
        kind,
        text: SmolStr::new(text),
        line: line + 1,
        column: column + 1,
        span: Span::new(source.id, start as u32, (start + text.len()) as u32),
    };
    log::trace!("token {token}");
    token
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split `text` into tokens with the fixed rule order: keywords, numbers and
/// identifiers as whole words, two-character operators, `^`, single symbols,
/// then one `Unknown` per remaining character. Words only start on a word
/// boundary; `before` is the character preceding `text` in the file.
fn rescan(text: &str, before: Option<char>) -> Vec<(TokenKind, Range<usize>)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let offset = |i: usize| chars.get(i).map_or(text.len(), |&(at, _)| at);
    let mut out = vec![];
    let mut prev = before;
    let mut i = 0;

    while let Some(&(at, c)) = chars.get(i) {
        let mut len = 1;
        let kind = if c.is_whitespace() {
            None
        } else if is_word(c) {
            let at_boundary = !prev.is_some_and(is_word);
            let end = (i..chars.len()).find(|&j| !is_word(chars[j].1)).unwrap_or(chars.len());
            let word = &text[at..offset(end)];
            let whole = if !at_boundary {
                None
            } else if KEYWORDS.contains(&word) {
                Some(TokenKind::Keyword)
            } else if word.chars().all(|c| c.is_ascii_digit()) {
                Some(TokenKind::Number)
            } else if c.is_ascii_alphabetic() || c == '_' {
                Some(TokenKind::Identifier)
            } else {
                None
            };
            match whole {
                Some(kind) => {
                    len = end - i;
                    Some(kind)
                }
                None => Some(TokenKind::Unknown),
            }
        } else {
            let pair = text.get(at..at + 2).unwrap_or_default();
            let two = match pair {
                "&&" => Some(TokenKind::LogicalAnd),
                "||" => Some(TokenKind::LogicalOr),
                "==" => Some(TokenKind::Eq),
                "!=" => Some(TokenKind::Neq),
                "<=" => Some(TokenKind::Le),
                ">=" => Some(TokenKind::Ge),
                _ => None,
            };
            match two {
                Some(kind) => {
                    len = 2;
                    Some(kind)
                }
                None if c == '^' => Some(TokenKind::Exp),
                None if SYMBOL_CHARS.contains(c) => Some(TokenKind::Symbol),
                None => Some(TokenKind::Unknown),
            }
        };

        if let Some(kind) = kind {
            out.push((kind, at..offset(i + len)));
        }
        prev = Some(chars[i + len - 1].1);
        i += len;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use cinder_common::SourceId;
    use std::path::PathBuf;

    fn lex(text: &str) -> Vec<Token> {
        let file = SourceFile::new(SourceId::new(0), PathBuf::from("t.cpp"), text.to_string());
        let tree = parse(text).unwrap();
        tokens(&tree, &file)
    }

    fn kinds_and_text(tokens: &[Token]) -> Vec<(TokenKind, &str)> {
        tokens.iter().map(|t| (t.kind, t.text.as_str())).collect()
    }

    #[test]
    fn test_declaration_tokens() {
        let toks = lex("int globalVar = 42;");
        assert_eq!(
            kinds_and_text(&toks),
            vec![
                (TokenKind::Keyword, "int"),
                (TokenKind::Identifier, "globalVar"),
                (TokenKind::Symbol, "="),
                (TokenKind::Number, "42"),
                (TokenKind::Symbol, ";"),
            ]
        );
        assert_eq!((toks[1].line, toks[1].column), (1, 5));
    }

    #[test]
    fn test_comments_are_skipped() {
        let toks = lex("// header\nbool f = true; // trailing\n");
        assert_eq!(toks.len(), 5);
        assert_eq!(toks[0].text, "bool");
        assert_eq!(toks[0].line, 2);
        assert_eq!(toks[3].kind, TokenKind::Keyword);
    }

    #[test]
    fn test_operator_categories() {
        let toks = lex("int main() { return (1 <= 2) && (3 >= 4) || (5 == 6) && (7 != 8) && (2 ^ 3 > 1); }");
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        for expected in [
            TokenKind::Le,
            TokenKind::Ge,
            TokenKind::LogicalAnd,
            TokenKind::LogicalOr,
            TokenKind::Eq,
            TokenKind::Neq,
            TokenKind::Exp,
        ] {
            assert!(kinds.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_display_and_json() {
        let toks = lex("int a = 5;");
        assert_eq!(toks[0].to_string(), "(KEYWORD, 'int', 1, 1)");
        let json = serde_json::to_string(&toks[3]).unwrap();
        assert_eq!(json, r#"{"kind":"NUMBER","text":"5","line":1,"column":9}"#);
    }

    fn window<'t>(tokens: &'t [Token], first: &str, len: usize) -> Vec<(TokenKind, &'t str, u32)> {
        let at = tokens.iter().position(|t| t.text == first).unwrap();
        tokens[at..at + len]
            .iter()
            .map(|t| (t.kind, t.text.as_str(), t.column))
            .collect()
    }

    #[test]
    fn test_compound_operators_split() {
        let toks = lex("x ^= 3;");
        assert_eq!(
            window(&toks, "^", 3),
            vec![
                (TokenKind::Exp, "^", 3),
                (TokenKind::Symbol, "=", 4),
                (TokenKind::Number, "3", 6),
            ]
        );

        let toks = lex("int main() { int i = 0; i++; return i; }");
        assert_eq!(
            window(&toks, "+", 2),
            vec![(TokenKind::Symbol, "+", 26), (TokenKind::Symbol, "+", 27)]
        );
    }

    #[test]
    fn test_unknown_characters_one_at_a_time() {
        let toks = lex("int a = $$x;");
        assert_eq!(
            window(&toks, "$", 4),
            vec![
                (TokenKind::Unknown, "$", 9),
                (TokenKind::Unknown, "$", 10),
                (TokenKind::Identifier, "x", 11),
                (TokenKind::Symbol, ";", 12),
            ]
        );
    }

    #[test]
    fn test_columns_count_characters() {
        let toks = lex("int é = 1;");
        let accented = toks.iter().find(|t| t.text == "é").unwrap();
        assert_eq!((accented.kind, accented.column), (TokenKind::Unknown, 5));
        let assign = toks.iter().find(|t| t.text == "=").unwrap();
        assert_eq!((assign.line, assign.column), (1, 7));
        assert_eq!(assign.span.start, 7);
    }

    #[test]
    fn test_rescan_word_boundaries() {
        fn kinds(text: &str, before: Option<char>) -> Vec<(TokenKind, &str)> {
            rescan(text, before).into_iter().map(|(k, r)| (k, &text[r])).collect()
        }
        assert_eq!(
            kinds("1x <<", None),
            vec![
                (TokenKind::Unknown, "1"),
                (TokenKind::Unknown, "x"),
                (TokenKind::Symbol, "<"),
                (TokenKind::Symbol, "<"),
            ]
        );
        assert_eq!(kinds("while&&", None), vec![(TokenKind::Keyword, "while"), (TokenKind::LogicalAnd, "&&")]);
        // Preceded by a word character, so `ab` is not a word start
        assert_eq!(kinds("ab", Some('1')), vec![(TokenKind::Unknown, "a"), (TokenKind::Unknown, "b")]);
    }

    #[test]
    fn test_classify_fallbacks() {
        assert_eq!(TokenKind::classify("ERROR", "@"), TokenKind::Unknown);
        assert_eq!(TokenKind::classify("identifier", "_tmp1"), TokenKind::Identifier);
        assert_eq!(TokenKind::classify("ERROR", "123"), TokenKind::Number);
        assert_eq!(TokenKind::classify("primitive_type", "bool"), TokenKind::Keyword);
    }
}
