use cinder_common::{Diagnostic, SourceFile, Span};
use miette::{IntoDiagnostic, Result};
use tree_sitter::{Node, Parser, Tree};

/// Parse C++ source code into a tree-sitter Tree.
pub fn parse(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    let language = tree_sitter_cpp::LANGUAGE;
    parser.set_language(&language.into()).into_diagnostic()?;

    parser
        .parse(source, None)
        .ok_or_else(|| miette::miette!("Failed to parse C++ source"))
}

/// Collect a diagnostic for every ERROR and MISSING node in `tree`.
pub fn syntax_errors(tree: &Tree, source: &SourceFile) -> Vec<Diagnostic> {
    let mut errors = vec![];
    if tree.root_node().has_error() {
        collect_errors(tree.root_node(), source, &mut errors);
    }
    errors
}

fn collect_errors(node: Node, source: &SourceFile, errors: &mut Vec<Diagnostic>) {
    let span = Span::new(source.id, node.start_byte() as u32, node.end_byte() as u32);

    if node.is_missing() {
        errors.push(
            Diagnostic::error(format!("syntax error: missing `{}`", node.kind()))
                .with_span(span)
                .with_label(format!("expected `{}` here", node.kind())),
        );
        return;
    }

    if node.is_error() {
        let text = node.utf8_text(source.content.as_bytes()).unwrap_or("");
        let (line, col) = source.line_col(node.start_byte() as u32);
        errors.push(
            Diagnostic::error(format!(
                "syntax error at {}:{}: unexpected `{}`",
                line + 1,
                col + 1,
                excerpt(text)
            ))
            .with_span(span)
            .with_label("not valid here"),
        );
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            collect_errors(child, source, errors);
        }
    }
}

/// First line of `text`, shortened for messages.
fn excerpt(text: &str) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    if first.chars().count() > 24 {
        let short: String = first.chars().take(24).collect();
        format!("{short}...")
    } else {
        first.to_string()
    }
}
