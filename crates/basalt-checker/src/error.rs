//! Check errors: reference resolution and static type rules
//!
//! Resolution errors are batched (the checker keeps scanning so one run
//! reports every bad reference) and then the whole batch aborts the
//! pipeline. Type errors are computed purely from static information and
//! must never flag code that a declared overflow policy covers.

use basalt_ast::Span;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CheckError {
    // === Resolution errors ===
    #[error("unknown member: {name}")]
    UnknownMember { name: String, span: Span },

    #[error("scope `{scope}` must not name itself; write `this.{member}` instead")]
    SelfScopeReference {
        scope: String,
        member: String,
        span: Span,
    },

    #[error("bare identifier `{name}` is not allowed inside a scope body")]
    BareIdentifier { name: String, span: Span },

    #[error("enum member `{name}` is ambiguous here; qualify it")]
    AmbiguousEnumMember {
        name: String,
        /// Qualified candidates, e.g. `Mode.Idle`
        candidates: Vec<String>,
        span: Span,
    },

    #[error("`this` is only meaningful inside a scope body")]
    ThisOutsideScope { span: Span },

    #[error("`{name}` is private here")]
    PrivateAccess { name: String, span: Span },

    #[error("`{name}` is not callable")]
    NotCallable { name: String, span: Span },

    #[error("`{name}` expects {expected} arguments, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("unknown type: {name}")]
    UnknownType { name: String, span: Span },

    // === Type errors ===
    #[error("narrowing from {from} to {to} requires a `clamp` or `wrap` policy")]
    NarrowingWithoutModifier {
        from: String,
        to: String,
        span: Span,
    },

    #[error("literal {value} does not fit in {ty} and no overflow policy is declared")]
    LiteralOverflow {
        value: i128,
        ty: String,
        span: Span,
    },

    #[error("bit range [{offset}, {width}] exceeds the {limit}-bit operand")]
    BitRangeOverflow {
        offset: i128,
        width: i128,
        limit: u16,
        span: Span,
    },

    #[error("integer division by a constant zero")]
    DivisionByConstZero { span: Span },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("cannot write to const `{name}`")]
    WriteToConst { name: String, span: Span },
}

impl CheckError {
    pub fn span(&self) -> Span {
        match self {
            CheckError::UnknownMember { span, .. } => *span,
            CheckError::SelfScopeReference { span, .. } => *span,
            CheckError::BareIdentifier { span, .. } => *span,
            CheckError::AmbiguousEnumMember { span, .. } => *span,
            CheckError::ThisOutsideScope { span } => *span,
            CheckError::PrivateAccess { span, .. } => *span,
            CheckError::NotCallable { span, .. } => *span,
            CheckError::ArityMismatch { span, .. } => *span,
            CheckError::UnknownType { span, .. } => *span,
            CheckError::NarrowingWithoutModifier { span, .. } => *span,
            CheckError::LiteralOverflow { span, .. } => *span,
            CheckError::BitRangeOverflow { span, .. } => *span,
            CheckError::DivisionByConstZero { span } => *span,
            CheckError::TypeMismatch { span, .. } => *span,
            CheckError::WriteToConst { span, .. } => *span,
        }
    }

    /// Error code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            CheckError::UnknownMember { .. } => "E-RES-001",
            CheckError::SelfScopeReference { .. } => "E-RES-002",
            CheckError::BareIdentifier { .. } => "E-RES-003",
            CheckError::AmbiguousEnumMember { .. } => "E-RES-004",
            CheckError::ThisOutsideScope { .. } => "E-RES-005",
            CheckError::PrivateAccess { .. } => "E-RES-006",
            CheckError::NotCallable { .. } => "E-RES-007",
            CheckError::ArityMismatch { .. } => "E-RES-008",
            CheckError::UnknownType { .. } => "E-RES-009",
            CheckError::NarrowingWithoutModifier { .. } => "E-TYPE-001",
            CheckError::LiteralOverflow { .. } => "E-TYPE-002",
            CheckError::BitRangeOverflow { .. } => "E-TYPE-003",
            CheckError::DivisionByConstZero { .. } => "E-TYPE-004",
            CheckError::TypeMismatch { .. } => "E-TYPE-005",
            CheckError::WriteToConst { .. } => "E-TYPE-006",
        }
    }

    /// Resolution errors are batched before aborting; type errors too
    pub fn is_resolution_error(&self) -> bool {
        self.code().starts_with("E-RES")
    }
}
