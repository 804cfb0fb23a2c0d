//! Expression nodes

use crate::{NodeId, Span};
use serde::{Deserialize, Serialize};

/// How a member access names its root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Qualifier {
    /// `this.X`: the enclosing scope's member
    This,
    /// `global.X`: the top-level namespace
    Global,
    /// `Name.X`: a scope, enum, or local variable
    Name(String),
}

/// An expression with a program-unique identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// Bare identifier: local, parameter, global, or enum member
    Ident(String),

    /// Qualified access: `this.n`, `global.TICKS`, `Counter.n`, `p.x.y`
    Member {
        qualifier: Qualifier,
        /// Remaining segments, outermost first. Never empty.
        path: Vec<String>,
    },

    /// `base[index]`: array element, or a single bit when the base is an
    /// integer (re-typed by the checker)
    ArrayIndex { base: Box<Expr>, index: Box<Expr> },

    /// `base[offset, width]`: a bit field view on an integer
    BitAccess {
        base: Box<Expr>,
        offset: Box<Expr>,
        width: Box<Expr>,
    },

    Int(i128),
    Float(f64),
    Bool(bool),
    Str(String),

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    Call(CallExpr),
}

/// A call expression or call statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Callee,
    pub args: Vec<Expr>,
}

/// The name a call resolves through
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callee {
    pub qualifier: Option<Qualifier>,
    /// Name segments; the last one is the function name
    pub path: Vec<String>,
    pub span: Span,
}

impl Callee {
    /// The function name segment
    pub fn name(&self) -> &str {
        self.path.last().map(|s| s.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
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
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Operators whose result is always `bool`
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

impl Expr {
    /// Strip member/index/bit projections down to the accessed root.
    /// `p.x.y` and `buf[i]` both root at the underlying object; mutation
    /// analysis works at this whole-object granularity.
    pub fn access_root(&self) -> &Expr {
        match &self.kind {
            ExprKind::ArrayIndex { base, .. } => base.access_root(),
            ExprKind::BitAccess { base, .. } => base.access_root(),
            _ => self,
        }
    }
}
