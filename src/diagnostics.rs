use std::fmt;

use thiserror::Error;

/// Byte range within a piece of submitted source.
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

/// Which stage of the pipeline produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
    Runtime,
}

/// A user-facing problem report: what went wrong, where, and any extra notes.
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

    pub fn lexer(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Lexer, message)
    }

    pub fn parser(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Parser, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Runtime, message)
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// True for diagnostics raised while turning text into a program,
    /// as opposed to failures of already-compiled code.
    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, DiagnosticKind::Lexer | DiagnosticKind::Parser)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.kind {
            DiagnosticKind::Lexer | DiagnosticKind::Parser => "syntax error",
            DiagnosticKind::Runtime => "runtime error",
        };
        write!(f, "{stage}: {}", self.message)?;
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

/// Unified error type for the Oleander console.
#[derive(Debug, Error)]
pub enum OleanderError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OleanderError {
    /// The diagnostic carried by this error, if it is one.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            OleanderError::Diagnostic(diag) => Some(diag),
            OleanderError::Io(_) => None,
        }
    }

    pub fn is_syntax(&self) -> bool {
        self.diagnostic().map(Diagnostic::is_syntax).unwrap_or(false)
    }

    pub fn is_runtime(&self) -> bool {
        matches!(
            self.diagnostic(),
            Some(Diagnostic {
                kind: DiagnosticKind::Runtime,
                ..
            })
        )
    }
}

pub type Result<T> = std::result::Result<T, OleanderError>;
