use cinder_codegen::Const;
use std::fmt;

use crate::vm::RuntimeError;

/// A runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i32),
    Bool(bool),
}

impl Value {
    pub fn type_name(self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
        }
    }

    pub fn as_int(self) -> Result<i32, RuntimeError> {
        match self {
            Value::Int(v) => Ok(v),
            other => Err(RuntimeError::TypeMismatch {
                expected: "int",
                found: other.type_name(),
            }),
        }
    }

    pub fn as_bool(self) -> Result<bool, RuntimeError> {
        match self {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::TypeMismatch {
                expected: "bool",
                found: other.type_name(),
            }),
        }
    }
}

impl From<Const> for Value {
    fn from(c: Const) -> Self {
        match c {
            Const::Int(v) => Value::Int(v),
            Const::Bool(b) => Value::Bool(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}
