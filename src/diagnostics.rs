use std::fmt;

use thiserror::Error;

/// Represents a byte span within a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The input held no form at all (blank or comment-only).
    EmptyInput,
    Syntax,
    UnbalancedCollection,
    UnbalancedString,
    OddHashMap,
    UnexpectedToken,
    UnboundSymbol,
    NotCallable,
    Arity,
    Type,
    Arithmetic,
    /// Raised from user code through `throw`.
    Thrown,
}

/// Rich diagnostic information surfaced to end users.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(span) = self.span {
            write!(f, " ({}..{})", span.start, span.end)?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Unified error type for the interpreter and its front ends.
#[derive(Debug, Error)]
pub enum MallowError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MallowError {
    pub fn kind(&self) -> Option<&DiagnosticKind> {
        match self {
            MallowError::Diagnostic(diag) => Some(&diag.kind),
            MallowError::Io(_) => None,
        }
    }

    pub fn is_empty_input(&self) -> bool {
        matches!(self.kind(), Some(DiagnosticKind::EmptyInput))
    }
}

/// Shorthand for raising a diagnostic without a span.
pub(crate) fn error<T>(kind: DiagnosticKind, message: impl Into<String>) -> Result<T> {
    Err(MallowError::from(Diagnostic::new(kind, message)))
}

pub type Result<T> = std::result::Result<T, MallowError>;
