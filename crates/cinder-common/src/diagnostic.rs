//! Diagnostic reporting for the Cinder pipeline.
//!
//! Every stage reports problems as [`Diagnostic`]s carrying a span into the
//! file being compiled. A stage that finds several problems returns them all
//! at once as [`Diagnostics`], which miette renders against the source text.

use crate::source::SourceFile;
use crate::span::Span;
use miette::{Diagnostic as MietteDiagnostic, NamedSource, Severity, SourceSpan};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub label: String,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
            span: None,
            label: String::new(),
            help: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            ..Self::error(message)
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl MietteDiagnostic for Diagnostic {
    fn severity(&self) -> Option<Severity> {
        Some(match self.level {
            DiagnosticLevel::Error => Severity::Error,
            DiagnosticLevel::Warning => Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let span = self.span?;
        let label = (!self.label.is_empty()).then(|| self.label.clone());
        Some(Box::new(std::iter::once(miette::LabeledSpan::new_with_span(
            label, span,
        ))))
    }
}

/// All errors a stage found in one file.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("{stage} failed with {} error(s)", .errors.len())]
pub struct Diagnostics {
    pub stage: &'static str,
    #[source_code]
    pub source_code: NamedSource<String>,
    #[related]
    pub errors: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(stage: &'static str, source: &SourceFile, errors: Vec<Diagnostic>) -> Self {
        Self {
            stage,
            source_code: source.named_source(),
            errors,
        }
    }

    /// Messages only, in report order.
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|d| d.message.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceId;
    use std::path::PathBuf;

    #[test]
    fn test_builder_sets_fields() {
        let span = Span::new(SourceId::new(0), 4, 7);
        let diag = Diagnostic::error("undeclared variable 'x'")
            .with_span(span)
            .with_label("not found in this scope")
            .with_help("declare it first");
        assert!(diag.is_error());
        assert_eq!(diag.span.unwrap().offset(), 4);
        assert_eq!(diag.labels().unwrap().count(), 1);
        assert_eq!(diag.help().unwrap().to_string(), "declare it first");
    }

    #[test]
    fn test_collection_message() {
        let file = SourceFile::new(SourceId::new(0), PathBuf::from("x.cpp"), "x".into());
        let diags = Diagnostics::new(
            "semantic analysis",
            &file,
            vec![Diagnostic::error("a"), Diagnostic::warning("b")],
        );
        assert_eq!(diags.to_string(), "semantic analysis failed with 2 error(s)");
        assert_eq!(diags.messages(), vec!["a", "b"]);
        assert!(!diags.errors[1].is_error());
    }
}
