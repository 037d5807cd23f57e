use cinder_common::{SourceId, Symbol};
use crate::item::{FnDef, GlobalDef, Item, ItemKind};

/// A translation unit in the HIR.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: Symbol,
    pub source: SourceId,
    pub items: Vec<Item>,
}

impl Module {
    pub fn new(name: Symbol, source: SourceId) -> Self {
        Self {
            name,
            source,
            items: Vec::new(),
        }
    }

    pub fn add_item(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Functions with a body, in source order.
    pub fn functions(&self) -> impl Iterator<Item = &FnDef> {
        self.items.iter().filter_map(|item| match &item.kind {
            ItemKind::Function(f) if f.body.is_some() => Some(f),
            _ => None,
        })
    }

    pub fn globals(&self) -> impl Iterator<Item = &GlobalDef> {
        self.items.iter().filter_map(|item| match &item.kind {
            ItemKind::Global(g) => Some(g),
            _ => None,
        })
    }

    pub fn find_function(&self, name: Symbol) -> Option<&FnDef> {
        self.functions().find(|f| f.name == name)
    }
}
