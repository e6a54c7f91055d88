//! The diagnostic system.
//!
//! Every phase of the compiler reports at most one diagnostic: the first error aborts the
//! compilation of the current module. Diagnostics are built with [`Diag`] and resolved into a
//! [`CompileError`] at the boundary of the compiler once the source map is at hand.

use span::{FileName, SourceMap, Span, Spanning};
use std::fmt;
use utility::Str;

#[cfg(test)]
mod test;

pub type Result<T = (), E = Diag> = std::result::Result<T, E>;

/// A diagnostic message, optionally with a source location.
#[must_use]
pub struct Diag {
    untagged: Box<UntaggedDiag>,
}

struct UntaggedDiag {
    severity: Severity,
    message: Option<Str>,
    span: Option<Span>,
    notes: Vec<Str>,
}

impl Diag {
    fn new(severity: Severity) -> Self {
        Self {
            untagged: Box::new(UntaggedDiag {
                severity,
                message: None,
                span: None,
                notes: Vec::new(),
            }),
        }
    }

    /// Create a diagnostic for a user error.
    pub fn error() -> Self {
        Self::new(Severity::Error)
    }

    /// Create a diagnostic for an internal compiler error.
    ///
    /// Used for syntax tree shapes that earlier phases should have rejected.
    pub fn bug() -> Self {
        Self::new(Severity::Bug)
    }

    /// Add a text message describing the issue.
    ///
    /// # Guidelines
    ///
    /// * The message should not contain any line breaks
    /// * The message should not start with an upper case letter
    /// * The message should not end in a punctuation mark
    /// * Surround source code snippets with single quotation marks
    pub fn message(mut self, message: impl Into<Str>) -> Self {
        self.untagged.message = Some(message.into());
        self
    }

    /// Reference the code snippet the diagnostic is about.
    ///
    /// Unknown spans are ignored. Calling this function again overwrites the previous span.
    pub fn unlabeled_span(mut self, spanning: impl Spanning) -> Self {
        let span = spanning.span();
        if !span.is_unknown() {
            self.untagged.span = Some(span);
        }
        self
    }

    /// Reference the code snippet unless one was already set.
    pub fn fallback_span(self, spanning: impl Spanning) -> Self {
        if self.untagged.span.is_some() {
            return self;
        }
        self.unlabeled_span(spanning)
    }

    /// Add further clarifying information.
    pub fn note(mut self, message: impl Into<Str>) -> Self {
        self.untagged.notes.push(message.into());
        self
    }

    pub fn with(self, builder: impl FnOnce(Self) -> Self) -> Self {
        builder(self)
    }

    pub fn severity(&self) -> Severity {
        self.untagged.severity
    }

    pub fn text(&self) -> &str {
        self.untagged.message.as_deref().unwrap_or_default()
    }

    pub fn span(&self) -> Option<Span> {
        self.untagged.span
    }

    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.untagged.notes.iter().map(|note| &**note)
    }

    /// Resolve the diagnostic against the source map into the error value handed out to users.
    pub fn resolve(self, map: &SourceMap) -> CompileError {
        let location = self.untagged.span.and_then(|span| map.location(span));
        let UntaggedDiag {
            severity,
            message,
            span,
            notes,
        } = *self.untagged;

        CompileError {
            kind: match severity {
                Severity::Error => ErrorKind::Error,
                Severity::Bug => ErrorKind::Internal,
            },
            message: message.map(Into::into).unwrap_or_default(),
            notes: notes.into_iter().map(Into::into).collect(),
            file: location.as_ref().map(|location| location.file.clone()),
            line: location.as_ref().map_or(0, |location| location.line),
            column: location.map_or(0, |location| location.column),
            span,
        }
    }
}

impl fmt::Debug for Diag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diag")
            .field("severity", &self.untagged.severity)
            .field("message", &self.untagged.message)
            .field("span", &self.untagged.span)
            .finish()
    }
}

/// Level of severity of a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    /// An internal compiler error.
    Bug,
    /// A user error.
    Error,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    Error,
    /// An unexpected syntax tree shape reached a later phase.
    Internal,
}

/// Renders as the prefix of the message of a [`CompileError`].
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => Ok(()),
            Self::Internal => f.write_str("internal error: "),
        }
    }
}

/// The structured error of a failed module compilation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}{message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub notes: Vec<String>,
    pub file: Option<FileName>,
    /// One-based line number, zero if the location is unknown.
    pub line: u32,
    /// Zero-based byte offset into the line.
    pub column: u32,
    pub span: Option<Span>,
}

impl CompileError {
    pub fn is_internal(&self) -> bool {
        self.kind == ErrorKind::Internal
    }
}
