use miette::SourceSpan;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}

/// Position of a syntax node. Every memo table in the checker is keyed by
/// this value rather than by node identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLocation {
    pub file: FileId,
    pub span: Span,
}

impl SourceLocation {
    pub fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    pub fn between(start: SourceLocation, stop: SourceLocation) -> Self {
        Self {
            file: start.file,
            span: start.span.to(stop.span),
        }
    }

    pub fn contains(&self, other: SourceLocation) -> bool {
        self.file == other.file
            && self.span.start <= other.span.start
            && other.span.end <= self.span.end
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}..{}", self.file.0, self.span.start, self.span.end)
    }
}

pub trait HasLocation {
    fn location(&self) -> SourceLocation;
}

impl HasLocation for SourceLocation {
    fn location(&self) -> SourceLocation {
        *self
    }
}
