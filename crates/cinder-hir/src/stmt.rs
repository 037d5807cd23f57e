use cinder_common::{Span, Symbol};
use crate::types::{Mutability, Type};
use crate::expr::Expr;

/// A statement in the HIR.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Local declaration: int x = expr;
    Let {
        name: Symbol,
        name_span: Span,
        ty: Type,
        init: Expr,
        mutability: Mutability,
    },

    /// Expression statement: expr;
    Expr(Expr),

    /// Empty statement: ;
    Empty,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn expr(e: Expr) -> Self {
        let span = e.span;
        Self { kind: StmtKind::Expr(e), span }
    }

    pub fn always_returns(&self) -> bool {
        match &self.kind {
            StmtKind::Expr(e) => e.always_returns(),
            StmtKind::Let { .. } | StmtKind::Empty => false,
        }
    }
}
