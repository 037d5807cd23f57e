use cinder_common::{Span, Symbol};
use crate::types::Type;
use crate::stmt::Stmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// Integer exponentiation, written `^`
    Pow,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

impl BinOp {
    /// Parse the source spelling of an operator.
    pub fn from_token(op: &str) -> Option<Self> {
        let binop = match op {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "%" => BinOp::Rem,
            "^" => BinOp::Pow,
            "==" => BinOp::Eq,
            "!=" => BinOp::Ne,
            "<" => BinOp::Lt,
            "<=" => BinOp::Le,
            ">" => BinOp::Gt,
            ">=" => BinOp::Ge,
            "&&" => BinOp::And,
            "||" => BinOp::Or,
            _ => return None,
        };
        Some(binop)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Pow => "^",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem | BinOp::Pow
        )
    }

    /// `<`, `<=`, `>`, `>=`: integer operands, bool result.
    pub fn is_ordering(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg, // -x
    Not, // !x
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    /// Kept wide until the checker verifies it fits in `int`
    Int(i128),
    Bool(bool),
}

/// An expression in the HIR.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Filled in by semantic analysis.
    pub ty: Option<Type>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A literal value
    Literal(Literal),

    /// A variable reference
    Ident(Symbol),

    /// Binary operation: a + b
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Unary operation: -x, !x
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Function call: f(a, b)
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Assignment: x = y
    Assign {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Block: { stmts }
    Block(Vec<Stmt>),

    /// if (cond) then else
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },

    /// while (cond) body
    While {
        cond: Box<Expr>,
        body: Box<Expr>,
    },

    /// return expr;
    Return(Option<Box<Expr>>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span, ty: None }
    }

    /// Name of the callee when it is a plain identifier.
    pub fn as_ident(&self) -> Option<Symbol> {
        match self.kind {
            ExprKind::Ident(sym) => Some(sym),
            _ => None,
        }
    }

    /// Whether executing this expression always ends in a `return`.
    pub fn always_returns(&self) -> bool {
        match &self.kind {
            ExprKind::Return(_) => true,
            ExprKind::Block(stmts) => stmts.iter().any(Stmt::always_returns),
            ExprKind::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => then_branch.always_returns() && else_branch.always_returns(),
            // `while (true)` can only be left through a return
            ExprKind::While { cond, .. } => {
                matches!(cond.kind, ExprKind::Literal(Literal::Bool(true)))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_common::SourceId;

    fn span() -> Span {
        Span::new(SourceId::new(0), 0, 0)
    }

    #[test]
    fn test_binop_spelling_round_trips() {
        for op in ["+", "-", "*", "/", "%", "^", "==", "!=", "<", "<=", ">", ">=", "&&", "||"] {
            assert_eq!(BinOp::from_token(op).unwrap().as_str(), op);
        }
        assert!(BinOp::from_token("<<").is_none());
        assert!(BinOp::Pow.is_arithmetic());
        assert!(BinOp::Ge.is_ordering());
    }

    #[test]
    fn test_always_returns_needs_both_branches() {
        let ret = || Expr::new(ExprKind::Return(None), span());
        let cond = || Box::new(Expr::new(ExprKind::Literal(Literal::Bool(true)), span()));

        let only_then = Expr::new(
            ExprKind::If {
                cond: cond(),
                then_branch: Box::new(ret()),
                else_branch: None,
            },
            span(),
        );
        assert!(!only_then.always_returns());

        let both = Expr::new(
            ExprKind::If {
                cond: cond(),
                then_branch: Box::new(ret()),
                else_branch: Some(Box::new(ret())),
            },
            span(),
        );
        assert!(both.always_returns());

        let block = Expr::new(ExprKind::Block(vec![Stmt::expr(ret())]), span());
        assert!(block.always_returns());
    }
}
