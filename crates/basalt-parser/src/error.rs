//! Parser error types

use basalt_ast::Span;
use basalt_lexer::TokenKind;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of file")]
    UnexpectedEof { span: Span },

    #[error("invalid expression")]
    InvalidExpression { span: Span },

    #[error("invalid type")]
    InvalidType { span: Span },

    #[error("expected declaration")]
    ExpectedDeclaration { span: Span },

    #[error("integer literal out of range: {text}")]
    IntOutOfRange { text: String, span: Span },

    #[error("circular include: {cycle}")]
    CircularInclude { cycle: String, span: Span },

    #[error("include target not found: {path}")]
    MissingInclude { path: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::UnexpectedEof { span } => *span,
            ParseError::InvalidExpression { span } => *span,
            ParseError::InvalidType { span } => *span,
            ParseError::ExpectedDeclaration { span } => *span,
            ParseError::IntOutOfRange { span, .. } => *span,
            ParseError::CircularInclude { span, .. } => *span,
            ParseError::MissingInclude { span, .. } => *span,
        }
    }

    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.describe().to_string(),
            span,
        }
    }
}
