use cinder_common::{Span, Symbol};
use crate::types::{Mutability, Type};
use crate::expr::Expr;

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Symbol,
    pub ty: Type,
    pub mutability: Mutability,
    pub span: Span,
}

/// A function signature.
#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<Param>,
    pub ret_ty: Type,
}

/// A function definition. `body` is a block, absent for prototypes.
#[derive(Debug, Clone)]
pub struct FnDef {
    pub name: Symbol,
    pub sig: FnSig,
    pub body: Option<Expr>,
    pub span: Span,
}

/// A file-scope variable: `int globalVar = 42;`
#[derive(Debug, Clone)]
pub struct GlobalDef {
    pub name: Symbol,
    pub mutability: Mutability,
    pub ty: Type,
    pub init: Expr,
    pub span: Span,
}

/// A top-level item.
#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    Function(FnDef),
    Global(GlobalDef),
}

impl Item {
    pub fn new(kind: ItemKind, span: Span) -> Self {
        Self { kind, span }
    }
}
