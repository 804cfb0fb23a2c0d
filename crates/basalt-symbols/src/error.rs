//! Error types for symbol graph building

use basalt_ast::Span;
use thiserror::Error;

/// Structural errors from symbol graph building. All of these are fatal:
/// the run aborts after the build phase finishes batching them.
#[derive(Debug, Clone, Error)]
pub enum SymbolError {
    #[error("duplicate symbol: {name}")]
    DuplicateSymbol {
        name: String,
        span: Span,
        /// Where the name was first declared
        previous: Span,
    },

    #[error("scope `{name}` may not be declared inside scope `{outer}`")]
    NestedScope {
        name: String,
        outer: String,
        span: Span,
    },

    #[error("unknown type: {name}")]
    UnknownType { name: String, span: Span },

    #[error("`{name}` is not a type")]
    NotAType { name: String, span: Span },

    #[error("array length `{name}` must be a const integer")]
    InvalidArrayLength { name: String, span: Span },

    #[error("duplicate member `{name}` in `{owner}`")]
    DuplicateMember {
        owner: String,
        name: String,
        span: Span,
    },

    #[error("bit field `{field}` exceeds the backing width of bitmap `{bitmap}`")]
    BitFieldOutOfRange {
        bitmap: String,
        field: String,
        span: Span,
    },

    #[error("bitmap backing type must be an unsigned integer")]
    InvalidBitmapBacking { span: Span },
}

impl SymbolError {
    /// Get the source span of this error
    pub fn span(&self) -> Span {
        match self {
            SymbolError::DuplicateSymbol { span, .. } => *span,
            SymbolError::NestedScope { span, .. } => *span,
            SymbolError::UnknownType { span, .. } => *span,
            SymbolError::NotAType { span, .. } => *span,
            SymbolError::InvalidArrayLength { span, .. } => *span,
            SymbolError::DuplicateMember { span, .. } => *span,
            SymbolError::BitFieldOutOfRange { span, .. } => *span,
            SymbolError::InvalidBitmapBacking { span } => *span,
        }
    }

    /// Error code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            SymbolError::DuplicateSymbol { .. } => "E-SYM-001",
            SymbolError::NestedScope { .. } => "E-SYM-002",
            SymbolError::UnknownType { .. } => "E-SYM-003",
            SymbolError::NotAType { .. } => "E-SYM-004",
            SymbolError::InvalidArrayLength { .. } => "E-SYM-005",
            SymbolError::DuplicateMember { .. } => "E-SYM-006",
            SymbolError::BitFieldOutOfRange { .. } => "E-SYM-007",
            SymbolError::InvalidBitmapBacking { .. } => "E-SYM-008",
        }
    }
}
