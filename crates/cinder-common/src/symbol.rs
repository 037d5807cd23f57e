use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::sync::{PoisonError, RwLock};

/// An interned identifier. Only meaningful with the interner that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

#[derive(Debug, Default)]
struct Table {
    ids: FxHashMap<SmolStr, Symbol>,
    names: Vec<SmolStr>,
}

/// Identifier table shared by the parser, checker and code generator.
///
/// Interning takes `&self`, so a driver can hand the same interner to every
/// stage. Symbols are numbered in first-seen order.
#[derive(Debug, Default)]
pub struct SymbolInterner {
    table: RwLock<Table>,
}

impl SymbolInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, name: &str) -> Symbol {
        if let Some(&sym) = self.table.read().unwrap_or_else(PoisonError::into_inner).ids.get(name) {
            return sym;
        }

        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let Table { ids, names } = &mut *table;
        *ids.entry(SmolStr::new(name)).or_insert_with_key(|key| {
            names.push(key.clone());
            Symbol(names.len() as u32 - 1)
        })
    }

    /// Text of `sym`; empty if it came from another interner.
    pub fn resolve(&self, sym: Symbol) -> SmolStr {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.names.get(sym.0 as usize).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap_or_else(PoisonError::into_inner).names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
