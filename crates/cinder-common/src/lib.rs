mod span;
mod symbol;
mod source;
mod diagnostic;

pub use span::Span;
pub use symbol::{Symbol, SymbolInterner};
pub use source::{is_source_extension, SourceFile, SourceId, SourceMap};
pub use diagnostic::{Diagnostic, DiagnosticLevel, Diagnostics};
