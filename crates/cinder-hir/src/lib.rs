mod types;
mod expr;
mod stmt;
mod item;
mod module;
mod dot;

pub use types::*;
pub use expr::*;
pub use stmt::*;
pub use item::*;
pub use module::*;
pub use dot::to_dot;
