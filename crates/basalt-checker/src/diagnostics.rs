//! Non-fatal advisory diagnostics
//!
//! Fatal errors are `CheckError`s; this module carries the ordered list of
//! advisories the pipeline hands to its consumers: fix hints for fatal
//! references, suspicious-but-legal constructs, and so on.

use basalt_ast::Span;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Info,
    Hint,
}

/// A non-fatal advisory with a stable code and a source location
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Advisory code (e.g. "A-REF-001")
    pub code: String,
    pub message: String,
    pub span: Span,
    /// Concrete replacement text, when one would fix the issue
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            span,
            suggestion: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, code, message, span)
    }

    pub fn hint(code: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Hint, code, message, span)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}
