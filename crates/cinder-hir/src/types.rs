use std::fmt;

/// Primitive types of the C++ subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// `int`, always 32-bit signed
    I32,
    Bool,
    /// `void`, only valid as a return type
    Unit,
}

/// Mutability qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mutability {
    #[default]
    Immutable,
    Mutable,
}

/// A type in the HIR.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveType),

    /// Function type fn(A, B) -> C
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
    },

    /// Error type (for error recovery)
    Error,
}

impl Type {
    pub fn unit() -> Self {
        Type::Primitive(PrimitiveType::Unit)
    }

    pub fn bool() -> Self {
        Type::Primitive(PrimitiveType::Bool)
    }

    pub fn i32() -> Self {
        Type::Primitive(PrimitiveType::I32)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveType::Unit))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// Types a variable can hold.
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Type::Primitive(PrimitiveType::I32) | Type::Primitive(PrimitiveType::Bool)
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(PrimitiveType::I32) => f.write_str("int"),
            Type::Primitive(PrimitiveType::Bool) => f.write_str("bool"),
            Type::Primitive(PrimitiveType::Unit) => f.write_str("void"),
            Type::Function { params, ret } => {
                f.write_str("fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::Error => f.write_str("{error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let sig = Type::Function {
            params: vec![Type::i32(), Type::i32()],
            ret: Box::new(Type::i32()),
        };
        assert_eq!(sig.to_string(), "fn(int, int) -> int");
        assert_eq!(Type::unit().to_string(), "void");
        assert!(Type::bool().is_value());
        assert!(!Type::unit().is_value());
    }
}
