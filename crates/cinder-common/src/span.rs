use crate::source::SourceId;
use miette::SourceSpan;

/// A byte range inside one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub source: SourceId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(source: SourceId, start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start {start} after end {end}");
        Self { source, start, end }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new((span.start as usize).into(), span.len() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_span_conversion() {
        let span = Span::new(SourceId::new(3), 10, 15);
        assert_eq!(span.len(), 5);
        let converted: SourceSpan = span.into();
        assert_eq!(converted.offset(), 10);
        assert_eq!(converted.len(), 5);
        assert!(Span::new(SourceId::new(3), 7, 7).is_empty());
    }
}
