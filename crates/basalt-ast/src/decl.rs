//! Top-level and scope-member declarations

use crate::{Block, Expr, Span, TypeNode};
use serde::{Deserialize, Serialize};

/// Symbol visibility. Top-level symbols default to public; `private`
/// restricts a scope member to its scope and a top-level symbol to its
/// declaring file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub visibility: Visibility,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeclarationKind {
    Scope(ScopeDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
    Bitmap(BitmapDecl),
    Register(RegisterDecl),
    Function(FunctionDecl),
    Variable(VarDecl),
}

impl DeclarationKind {
    pub fn name(&self) -> &str {
        match self {
            DeclarationKind::Scope(d) => &d.name,
            DeclarationKind::Struct(d) => &d.name,
            DeclarationKind::Enum(d) => &d.name,
            DeclarationKind::Bitmap(d) => &d.name,
            DeclarationKind::Register(d) => &d.name,
            DeclarationKind::Function(d) => &d.name,
            DeclarationKind::Variable(d) => &d.name,
        }
    }
}

/// A named, instance-free container. Members get `Name_member` qualified
/// names; nesting another scope inside is rejected by the symbol builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeDecl {
    pub name: String,
    pub members: Vec<Declaration>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeNode,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub variants: Vec<EnumVariant>,
    pub span: Span,
}

/// A variant with an optional explicit value; unvalued variants continue
/// from the previous value, C-style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    pub value: Option<i64>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitmapDecl {
    pub name: String,
    pub backing: TypeNode,
    pub fields: Vec<BitFieldDecl>,
    pub span: Span,
}

/// `name: offset` or `name: offset, width` inside a bitmap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitFieldDecl {
    pub name: String,
    pub offset: u32,
    pub width: u32,
    pub span: Span,
}

/// A memory-mapped register: `register CTRL @ 0x40000000 : u32;`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDecl {
    pub name: String,
    pub address: u64,
    pub ty: TypeNode,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeNode,
    /// Absent for `extern` forward declarations
    pub body: Option<Block>,
    pub is_extern: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeNode,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeNode,
    pub init: Option<Expr>,
    pub span: Span,
}
