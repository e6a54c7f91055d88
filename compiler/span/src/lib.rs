//! Data structures and procedures for handling source locations.

pub use source_map::{FileName, LineWithHighlight, Location, SourceFile, SourceFileIndex, SourceMap};
use std::{
    fmt,
    ops::{Add, AddAssign, Deref},
};

pub mod source_map;

/// A global byte index.
///
/// Here, "global" means relative to a [source map](SourceMap).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
pub struct ByteIndex(u32);

impl ByteIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Add<u32> for ByteIndex {
    type Output = Self;

    fn add(self, offset: u32) -> Self::Output {
        Self(self.0 + offset)
    }
}

impl AddAssign<u32> for ByteIndex {
    fn add_assign(&mut self, offset: u32) {
        self.0 += offset;
    }
}

/// A global byte span of source code.
///
/// The default span starts at the unmapped index zero and is interpreted as an _unknown location_.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    /// The start of the span, inclusive.
    start: ByteIndex,
    /// The end of the span, exclusive.
    end: ByteIndex,
}

impl Span {
    #[cfg_attr(debug_assertions, track_caller)]
    pub fn new(start: ByteIndex, end: ByteIndex) -> Self {
        debug_assert!(
            start <= end,
            "span start ({}) > span end ({})",
            start.0,
            end.0
        );

        Self { start, end }
    }

    /// Create an empty span at the given index.
    pub fn empty(index: ByteIndex) -> Self {
        Self::new(index, index)
    }

    pub fn with_length(start: ByteIndex, length: u32) -> Self {
        Self::new(start, ByteIndex(start.0 + length))
    }

    pub const fn start(self) -> ByteIndex {
        self.start
    }

    pub const fn end(self) -> ByteIndex {
        self.end
    }

    pub fn length(self) -> u32 {
        self.end.0 - self.start.0
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn is_unknown(self) -> bool {
        self == Self::default()
    }

    pub fn contains(self, index: ByteIndex) -> bool {
        self.start <= index && index <= self.end
    }

    #[must_use]
    pub fn merge(self, other: impl Spanning) -> Self {
        let other = other.span();

        if self.is_unknown() {
            return other;
        }
        if other.is_unknown() {
            return self;
        }

        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Extend the end of this span to the end of the given one and hand the latter back.
    pub fn merging<S: Spanning>(&mut self, other: S) -> S {
        *self = self.merge(&other);
        other
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.0, self.end.0)
    }
}

/// Convenience function for constructing a global span in test code.
pub fn span(start: u32, end: u32) -> Span {
    Span::new(ByteIndex::new(start), ByteIndex::new(end))
}

pub trait Spanning {
    fn span(&self) -> Span;
}

impl Spanning for Span {
    fn span(&self) -> Self {
        *self
    }
}

impl<S: Spanning> Spanning for &S {
    fn span(&self) -> Span {
        (**self).span()
    }
}

impl<S: Spanning> Spanning for Box<S> {
    fn span(&self) -> Span {
        (**self).span()
    }
}

/// Something with a source location.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Spanned<Bare> {
    pub bare: Bare,
    pub span: Span,
}

impl<Bare> Spanned<Bare> {
    pub const fn new(span: Span, bare: Bare) -> Self {
        Self { bare, span }
    }

    /// Create a spanned value at an unknown location.
    pub fn bare(bare: Bare) -> Self {
        Self::new(Span::default(), bare)
    }

    pub fn map<U>(self, mapper: impl FnOnce(Bare) -> U) -> Spanned<U> {
        Spanned::new(self.span, mapper(self.bare))
    }

    pub const fn as_ref(&self) -> Spanned<&Bare> {
        Spanned::new(self.span, &self.bare)
    }
}

impl<Bare> Spanning for Spanned<Bare> {
    fn span(&self) -> Span {
        self.span
    }
}

impl<Bare> Deref for Spanned<Bare> {
    type Target = Bare;

    fn deref(&self) -> &Self::Target {
        &self.bare
    }
}

impl<Bare: fmt::Debug> fmt::Debug for Spanned<Bare> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.bare, self.span)
    }
}

impl<Bare: fmt::Display> fmt::Display for Spanned<Bare> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.bare.fmt(f)
    }
}
