//! Diagnostics primitives shared across Jess.

use crate::Span;
use std::path::PathBuf;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A diagnostic attached to the pipeline's own processing (plan skips,
/// best-effort failures). These are collected into the result's notes, never
/// used for control flow.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// A diagnostic reported by the external compiler, tied to an emitted file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CompilerDiagnostic {
    pub file: PathBuf,
    /// 1-based line as reported by the compiler.
    pub line: u32,
    /// 1-based column; `0` when the compiler did not report one.
    pub col: u32,
    pub severity: Severity,
    pub message: String,
}

impl CompilerDiagnostic {
    pub fn new(
        file: impl Into<PathBuf>,
        line: u32,
        col: u32,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            col,
            severity,
            message: message.into(),
        }
    }
}
