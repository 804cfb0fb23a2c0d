//! Symbol information and types

use crate::TypeDescriptor;
use basalt_ast::{FileId, Span, Visibility};
use serde::{Deserialize, Serialize};

/// Unique identifier for a symbol in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// Kind of symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Scope,
    Struct,
    Enum,
    Bitmap,
    Register,
    Function,
    Variable,
}

/// A program symbol: shared header plus kind-specific payload. Modeled as a
/// closed sum so every consumer matches exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    /// Unique ID assigned during table insertion
    pub id: SymbolId,

    /// Globally unique name; scope members are `Scope_member`
    pub qualified_name: String,

    pub kind: SymbolKind,

    pub visibility: Visibility,

    /// The file whose declaration created this symbol
    pub declaring_file: FileId,

    pub span: Span,

    pub data: SymbolData,
}

/// Kind-specific payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SymbolData {
    Scope(ScopeData),
    Struct(StructData),
    Enum(EnumData),
    Bitmap(BitmapData),
    Register(RegisterData),
    Function(FunctionData),
    Variable(VariableData),
}

/// Scope payload: lookup-only back references to members, never an
/// ownership edge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeData {
    pub members: Vec<SymbolId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructData {
    pub fields: Vec<FieldInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumData {
    pub variants: Vec<EnumVariantInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumVariantInfo {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitmapData {
    pub backing: TypeDescriptor,
    pub fields: Vec<BitFieldInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitFieldInfo {
    pub name: String,
    pub offset: u32,
    pub width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub address: u64,
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionData {
    pub params: Vec<ParamInfo>,
    pub return_type: TypeDescriptor,
    pub is_extern: bool,
    /// False while only a forward declaration has been seen
    pub defined: bool,
    /// Scope name for scope-member functions
    pub enclosing_scope: Option<String>,
}

/// An ordered function parameter. The by-value/by-reference decision is
/// computed after the whole-program mutation analysis and delivered as a
/// separate map, keeping the symbol table write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableData {
    pub ty: TypeDescriptor,
    /// Scope name for scope-member variables
    pub enclosing_scope: Option<String>,
    /// Folded literal initializer for const integers, used by the static
    /// provability checks
    pub const_value: Option<i64>,
}

impl Symbol {
    pub fn as_function(&self) -> Option<&FunctionData> {
        match &self.data {
            SymbolData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableData> {
        match &self.data {
            SymbolData::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructData> {
        match &self.data {
            SymbolData::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumData> {
        match &self.data {
            SymbolData::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_bitmap(&self) -> Option<&BitmapData> {
        match &self.data {
            SymbolData::Bitmap(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_scope(&self) -> Option<&ScopeData> {
        match &self.data {
            SymbolData::Scope(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_register(&self) -> Option<&RegisterData> {
        match &self.data {
            SymbolData::Register(r) => Some(r),
            _ => None,
        }
    }

    /// Check if this symbol is a type definition
    pub fn is_type(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Struct | SymbolKind::Enum | SymbolKind::Bitmap
        )
    }
}
