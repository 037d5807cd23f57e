//! Semantic analysis for the Cinder C++ subset.
//!
//! Resolves every name, checks types and control flow, and fills in
//! [`Expr::ty`](cinder_hir::Expr) for each expression so later stages can
//! rely on a well-typed module. All errors in a file are collected and
//! reported together.

mod check;
mod scope;

pub use scope::{FnInfo, Scopes, VarInfo};

use cinder_common::{Diagnostics, SourceFile, Symbol, SymbolInterner};
use cinder_hir::Module;
use indexmap::IndexMap;

/// Name of the function a program starts in unless configured otherwise.
pub const DEFAULT_ENTRY: &str = "main";

/// What analysis learned about a well-formed module.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// File-scope variables in declaration order.
    pub globals: IndexMap<Symbol, VarInfo>,
    /// Every declared function in declaration order.
    pub functions: IndexMap<Symbol, FnInfo>,
}

/// Check `module`, annotating it with types in place.
pub fn analyze(
    module: &mut Module,
    interner: &SymbolInterner,
    source: &SourceFile,
    entry: &str,
) -> Result<Analysis, Diagnostics> {
    let mut checker = check::Checker::new(interner);
    checker.check_module(module, entry);

    if !checker.errors.is_empty() {
        log::debug!(
            "{}: {} semantic error(s)",
            source.path.display(),
            checker.errors.len()
        );
        return Err(Diagnostics::new("semantic analysis", source, checker.errors));
    }

    Ok(Analysis {
        globals: checker.scopes.globals,
        functions: checker.functions,
    })
}
