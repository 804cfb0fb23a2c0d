//! Statement nodes

use crate::{BinaryOp, Expr, Span, TypeNode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatementKind {
    /// Function-local variable declaration
    Local(LocalDecl),

    /// `target <- value` or a compound form
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },

    /// Expression statement; in practice always a call
    Expr(Expr),

    Return(Option<Expr>),

    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },

    While {
        condition: Expr,
        body: Block,
    },

    For {
        init: Option<Box<Statement>>,
        condition: Option<Expr>,
        step: Option<Box<Statement>>,
        body: Block,
    },

    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
        default_block: Option<Block>,
    },

    /// `critical { ... }`: interrupts disabled for the duration
    Critical(Block),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalDecl {
    pub name: String,
    pub ty: TypeNode,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Block,
    pub span: Span,
}

/// Assignment operators. `Set` is plain `<-`; the rest are the compound
/// forms `+<-`, `-<-`, …
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl AssignOp {
    /// The binary operator a compound assignment desugars to
    pub fn to_binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Rem => Some(BinaryOp::Rem),
            AssignOp::BitAnd => Some(BinaryOp::BitAnd),
            AssignOp::BitOr => Some(BinaryOp::BitOr),
            AssignOp::BitXor => Some(BinaryOp::BitXor),
            AssignOp::Shl => Some(BinaryOp::Shl),
            AssignOp::Shr => Some(BinaryOp::Shr),
        }
    }
}
