//! C++ subset frontend: tree-sitter parsing, token extraction and lowering
//! to HIR.

mod parser;
mod lower;
mod token;

pub use parser::{parse, syntax_errors};
pub use lower::lower;
pub use token::{tokens, Token, TokenKind};

use cinder_common::{Diagnostics, SourceFile, SymbolInterner};
use cinder_hir::Module;
use miette::Result;

/// Parse a source file into HIR.
pub fn parse_file(source: &SourceFile, interner: &SymbolInterner) -> Result<Module> {
    let tree = parser::parse(&source.content)?;

    let errors = parser::syntax_errors(&tree, source);
    if !errors.is_empty() {
        return Err(Diagnostics::new("parsing", source, errors).into());
    }

    let module = lower::lower(&tree, source, interner)?;
    log::debug!(
        "lowered {} into {} item(s)",
        source.path.display(),
        module.items.len()
    );
    Ok(module)
}

/// Token stream of a source file. Works on files with syntax errors too;
/// unrecognised text comes out as [`TokenKind::Unknown`].
pub fn tokenize(source: &SourceFile) -> Result<Vec<Token>> {
    let tree = parser::parse(&source.content)?;
    Ok(token::tokens(&tree, source))
}
