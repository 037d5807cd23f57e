//! Three-address instructions and their textual listing.

use cinder_hir::{BinOp, UnaryOp};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::fmt;

/// An immediate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Const {
    Int(i32),
    Bool(bool),
}

/// Somewhere a value can be stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Place {
    Global(SmolStr),
    Local(SmolStr),
    Temp(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Const(Const),
    Place(Place),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    /// Define a global with its initial value. Only in the global section.
    Global { name: SmolStr, value: Operand },
    Mov { dst: Place, src: Operand },
    Binary {
        op: BinOp,
        dst: Place,
        lhs: Operand,
        rhs: Operand,
    },
    Unary {
        op: UnaryOp,
        dst: Place,
        operand: Operand,
    },
    /// `dst` is absent for calls to void functions.
    Call {
        dst: Option<Place>,
        func: SmolStr,
        args: Vec<Operand>,
    },
    Jmp(Label),
    /// Jump when `cond` is false.
    Jz { cond: Operand, target: Label },
    Label(Label),
    Ret(Option<Operand>),
}

/// A compiled function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: SmolStr,
    /// Local slot names of the parameters, in order.
    pub params: Vec<SmolStr>,
    pub returns_value: bool,
    pub body: Vec<Inst>,
    /// Number of temporaries the body uses.
    pub temps: u32,
}

impl Function {
    /// Instruction index of every label in the body.
    pub fn label_positions(&self) -> FxHashMap<Label, usize> {
        label_positions(&self.body)
    }
}

pub fn label_positions(code: &[Inst]) -> FxHashMap<Label, usize> {
    code.iter()
        .enumerate()
        .filter_map(|(i, inst)| match inst {
            Inst::Label(label) => Some((*label, i)),
            _ => None,
        })
        .collect()
}

/// A whole compiled translation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub name: SmolStr,
    /// Global initialisation, run once before the entry function.
    pub globals: Vec<Inst>,
    pub global_temps: u32,
    pub functions: IndexMap<SmolStr, Function>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Total instruction count, labels included.
    pub fn len(&self) -> usize {
        self.globals.len() + self.functions.values().map(|f| f.body.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn binop_mnemonic(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "ADD",
        BinOp::Sub => "SUB",
        BinOp::Mul => "MUL",
        BinOp::Div => "DIV",
        BinOp::Rem => "MOD",
        BinOp::Pow => "POW",
        BinOp::Eq => "EQ",
        BinOp::Ne => "NE",
        BinOp::Lt => "LT",
        BinOp::Le => "LE",
        BinOp::Gt => "GT",
        BinOp::Ge => "GE",
        BinOp::And => "AND",
        BinOp::Or => "OR",
    }
}

pub fn unary_mnemonic(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "NEG",
        UnaryOp::Not => "NOT",
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(v) => write!(f, "{v}"),
            Const::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Global(name) | Place::Local(name) => f.write_str(name),
            Place::Temp(n) => write!(f, "t{n}"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(c) => fmt::Display::fmt(c, f),
            Operand::Place(p) => fmt::Display::fmt(p, f),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Global { name, value } => write!(f, "GLOBAL {name}, {value}"),
            Inst::Mov { dst, src } => write!(f, "MOV {dst}, {src}"),
            Inst::Binary { op, dst, lhs, rhs } => {
                write!(f, "{} {dst}, {lhs}, {rhs}", binop_mnemonic(*op))
            }
            Inst::Unary { op, dst, operand } => {
                write!(f, "{} {dst}, {operand}", unary_mnemonic(*op))
            }
            Inst::Call {
                dst: Some(dst),
                func,
                args,
            } => write!(f, "CALL {dst}, {func}({})", join(args)),
            Inst::Call { dst: None, func, args } => write!(f, "CALL {func}({})", join(args)),
            Inst::Jmp(label) => write!(f, "JMP {label}"),
            Inst::Jz { cond, target } => write!(f, "JZ {cond}, {target}"),
            Inst::Label(label) => write!(f, "{label}:"),
            Inst::Ret(Some(value)) => write!(f, "RET {value}"),
            Inst::Ret(None) => f.write_str("RET"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FUNC {}({})", self.name, join(&self.params))?;
        writeln!(f, "BEGIN")?;
        for inst in &self.body {
            match inst {
                Inst::Label(_) => writeln!(f, "{inst}")?,
                _ => writeln!(f, "    {inst}")?,
            }
        }
        writeln!(f, "END")
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.globals {
            writeln!(f, "{inst}")?;
        }
        for (i, function) in self.functions.values().enumerate() {
            if i > 0 || !self.globals.is_empty() {
                writeln!(f)?;
            }
            write!(f, "{function}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(name: &str) -> Place {
        Place::Local(name.into())
    }

    #[test]
    fn test_instruction_text() {
        let cases = [
            (
                Inst::Global {
                    name: "g".into(),
                    value: Operand::Const(Const::Bool(false)),
                },
                "GLOBAL g, false",
            ),
            (
                Inst::Binary {
                    op: BinOp::Rem,
                    dst: Place::Temp(3),
                    lhs: Operand::Place(local("a")),
                    rhs: Operand::Const(Const::Int(-2)),
                },
                "MOD t3, a, -2",
            ),
            (
                Inst::Unary {
                    op: UnaryOp::Not,
                    dst: Place::Temp(0),
                    operand: Operand::Place(local("flag")),
                },
                "NOT t0, flag",
            ),
            (
                Inst::Call {
                    dst: Some(Place::Temp(1)),
                    func: "add".into(),
                    args: vec![Operand::Place(local("a")), Operand::Const(Const::Int(1))],
                },
                "CALL t1, add(a, 1)",
            ),
            (
                Inst::Call {
                    dst: None,
                    func: "log".into(),
                    args: vec![],
                },
                "CALL log()",
            ),
            (
                Inst::Jz {
                    cond: Operand::Place(Place::Temp(2)),
                    target: Label(4),
                },
                "JZ t2, L4",
            ),
            (Inst::Label(Label(4)), "L4:"),
            (Inst::Ret(None), "RET"),
        ];
        for (inst, text) in cases {
            assert_eq!(inst.to_string(), text);
        }
    }

    #[test]
    fn test_label_positions() {
        let function = Function {
            name: "f".into(),
            params: vec![],
            returns_value: false,
            body: vec![
                Inst::Jmp(Label(1)),
                Inst::Label(Label(0)),
                Inst::Ret(None),
                Inst::Label(Label(1)),
                Inst::Jmp(Label(0)),
            ],
            temps: 0,
        };
        let positions = function.label_positions();
        assert_eq!(positions[&Label(0)], 1);
        assert_eq!(positions[&Label(1)], 3);
    }
}
