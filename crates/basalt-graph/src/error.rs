//! Analyzer-internal errors

use basalt_ast::Span;
use thiserror::Error;

/// Internal errors indicate a defect in the analyzer itself. They are never
/// downgraded to warnings.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("fixed-point solver exceeded its iteration cap of {cap} passes")]
    IterationCapExceeded {
        cap: usize,
        /// A representative call site, so even internal errors carry a
        /// source location
        span: Span,
    },
}

impl GraphError {
    pub fn span(&self) -> Span {
        match self {
            GraphError::IterationCapExceeded { span, .. } => *span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GraphError::IterationCapExceeded { .. } => "E-INT-001",
        }
    }
}
