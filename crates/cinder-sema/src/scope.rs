//! Lexical scopes for name lookup.
//!
//! Lookup walks from the innermost block outwards and finally falls back to
//! file scope. A name may be shadowed by an inner block but not redeclared
//! within the same block.

use cinder_common::{Span, Symbol};
use cinder_hir::{Mutability, Type};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// What the checker knows about a variable.
#[derive(Debug, Clone)]
pub struct VarInfo {
    pub ty: Type,
    pub mutability: Mutability,
    pub span: Span,
}

/// What the checker knows about a function.
#[derive(Debug, Clone)]
pub struct FnInfo {
    pub params: Vec<Type>,
    pub ret: Type,
    /// A body was seen, not just a prototype.
    pub defined: bool,
    pub span: Span,
}

impl FnInfo {
    pub fn same_signature(&self, other: &FnInfo) -> bool {
        self.params == other.params && self.ret == other.ret
    }
}

/// Block scopes of the function being checked, on top of file scope.
#[derive(Debug, Default)]
pub struct Scopes {
    pub globals: IndexMap<Symbol, VarInfo>,
    blocks: Vec<FxHashMap<Symbol, VarInfo>>,
}

impl Scopes {
    pub fn push(&mut self) {
        self.blocks.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        self.blocks.pop();
    }

    /// Declare in the innermost scope. Fails with the span of the earlier
    /// declaration if the name is already taken there.
    pub fn declare(&mut self, name: Symbol, info: VarInfo) -> Result<(), Span> {
        let scope = match self.blocks.last_mut() {
            Some(block) => block,
            None => {
                if let Some(previous) = self.globals.get(&name) {
                    return Err(previous.span);
                }
                self.globals.insert(name, info);
                return Ok(());
            }
        };
        if let Some(previous) = scope.get(&name) {
            return Err(previous.span);
        }
        scope.insert(name, info);
        Ok(())
    }

    pub fn lookup(&self, name: Symbol) -> Option<&VarInfo> {
        self.blocks
            .iter()
            .rev()
            .find_map(|block| block.get(&name))
            .or_else(|| self.globals.get(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_common::{SourceId, SymbolInterner};

    fn var(ty: Type) -> VarInfo {
        VarInfo {
            ty,
            mutability: Mutability::Mutable,
            span: Span::new(SourceId::new(0), 0, 0),
        }
    }

    #[test]
    fn test_shadowing_and_redeclaration() {
        let interner = SymbolInterner::new();
        let a = interner.intern("a");
        let mut scopes = Scopes::default();

        scopes.declare(a, var(Type::bool())).unwrap();
        assert!(scopes.declare(a, var(Type::i32())).is_err());

        scopes.push();
        scopes.declare(a, var(Type::i32())).unwrap();
        assert_eq!(scopes.lookup(a).unwrap().ty, Type::i32());
        assert!(scopes.declare(a, var(Type::i32())).is_err());
        scopes.pop();

        assert_eq!(scopes.lookup(a).unwrap().ty, Type::bool());
    }
}
