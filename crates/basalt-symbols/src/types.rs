//! Resolved type descriptors
//!
//! A `TypeDescriptor` is the fully computed type of a symbol or expression:
//! base kind, width, signedness, modifiers, overflow policy, array shape.

use crate::SymbolId;
use basalt_ast::{Modifiers, OverflowPolicy};
use serde::{Deserialize, Serialize};

/// Base kind of a resolved type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    Void,
    /// Bounded string with fixed byte capacity
    Str(u32),
    Struct(SymbolId),
    Enum(SymbolId),
    Bitmap(SymbolId),
}

/// One resolved array dimension: a literal length or a const integer symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayDim {
    Literal(u64),
    Const(SymbolId),
}

/// How a parameter is passed in generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassingMode {
    ByValue,
    ByConstPointer,
    ByMutablePointer,
}

/// A fully computed type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub base: BaseKind,
    pub bit_width: u16,
    pub signed: bool,
    pub modifiers: Modifiers,
    pub overflow: OverflowPolicy,
    /// Array dimensions, outermost first. Empty for scalars.
    pub dims: Vec<ArrayDim>,
}

impl TypeDescriptor {
    pub fn scalar(base: BaseKind) -> Self {
        let (bit_width, signed) = base_layout(base);
        Self {
            base,
            bit_width,
            signed,
            modifiers: Modifiers::default(),
            overflow: OverflowPolicy::None,
            dims: Vec::new(),
        }
    }

    pub fn void() -> Self {
        Self::scalar(BaseKind::Void)
    }

    pub fn bool_() -> Self {
        Self::scalar(BaseKind::Bool)
    }

    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.base,
            BaseKind::U8
                | BaseKind::U16
                | BaseKind::U32
                | BaseKind::U64
                | BaseKind::I8
                | BaseKind::I16
                | BaseKind::I32
                | BaseKind::I64
        ) && !self.is_array()
    }

    /// Integer-like for bit views and arithmetic: includes bitmaps, which
    /// are views over their backing integer
    pub fn is_integer_like(&self) -> bool {
        (self.is_integer() || matches!(self.base, BaseKind::Bitmap(_))) && !self.is_array()
    }

    pub fn is_float(&self) -> bool {
        matches!(self.base, BaseKind::F32 | BaseKind::F64) && !self.is_array()
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.base, BaseKind::Bool) && !self.is_array()
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.base, BaseKind::Enum(_)) && !self.is_array()
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.base, BaseKind::Struct(_)) && !self.is_array()
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer_like() || self.is_float()
    }

    /// Struct, array, and bounded-string values: never passed by value
    pub fn is_aggregate(&self) -> bool {
        self.is_array() || matches!(self.base, BaseKind::Struct(_) | BaseKind::Str(_))
    }

    /// Smallest and largest representable value, for integer types
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        if !self.is_integer_like() {
            return None;
        }
        let width = u32::from(self.bit_width);
        if self.signed {
            let max = (1i128 << (width - 1)) - 1;
            Some((-(1i128 << (width - 1)), max))
        } else {
            Some((0, (1i128 << width) - 1))
        }
    }

    /// Same base type ignoring modifiers, policies, and array shape
    pub fn same_base(&self, other: &TypeDescriptor) -> bool {
        self.base == other.base
    }

    pub fn display(&self) -> String {
        let mut out = match self.base {
            BaseKind::U8 => "u8".to_string(),
            BaseKind::U16 => "u16".to_string(),
            BaseKind::U32 => "u32".to_string(),
            BaseKind::U64 => "u64".to_string(),
            BaseKind::I8 => "i8".to_string(),
            BaseKind::I16 => "i16".to_string(),
            BaseKind::I32 => "i32".to_string(),
            BaseKind::I64 => "i64".to_string(),
            BaseKind::F32 => "f32".to_string(),
            BaseKind::F64 => "f64".to_string(),
            BaseKind::Bool => "bool".to_string(),
            BaseKind::Void => "void".to_string(),
            BaseKind::Str(n) => format!("str<{}>", n),
            BaseKind::Struct(_) => "struct".to_string(),
            BaseKind::Enum(_) => "enum".to_string(),
            BaseKind::Bitmap(_) => "bitmap".to_string(),
        };
        for dim in &self.dims {
            match dim {
                ArrayDim::Literal(n) => out.push_str(&format!("[{}]", n)),
                ArrayDim::Const(_) => out.push_str("[..]"),
            }
        }
        out
    }
}

fn base_layout(base: BaseKind) -> (u16, bool) {
    match base {
        BaseKind::U8 => (8, false),
        BaseKind::U16 => (16, false),
        BaseKind::U32 => (32, false),
        BaseKind::U64 => (64, false),
        BaseKind::I8 => (8, true),
        BaseKind::I16 => (16, true),
        BaseKind::I32 => (32, true),
        BaseKind::I64 => (64, true),
        BaseKind::F32 => (32, true),
        BaseKind::F64 => (64, true),
        BaseKind::Bool => (1, false),
        // Enums lower to a 32-bit signed constant type
        BaseKind::Enum(_) => (32, true),
        _ => (0, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_range_unsigned() {
        let u8_ty = TypeDescriptor::scalar(BaseKind::U8);
        assert_eq!(u8_ty.integer_range(), Some((0, 255)));
    }

    #[test]
    fn test_integer_range_signed() {
        let i8_ty = TypeDescriptor::scalar(BaseKind::I8);
        assert_eq!(i8_ty.integer_range(), Some((-128, 127)));
    }

    #[test]
    fn test_array_is_aggregate_not_integer() {
        let mut ty = TypeDescriptor::scalar(BaseKind::U8);
        ty.dims.push(ArrayDim::Literal(16));
        assert!(ty.is_aggregate());
        assert!(!ty.is_integer());
        assert_eq!(ty.integer_range(), None);
    }

    #[test]
    fn test_str_is_aggregate() {
        let ty = TypeDescriptor::scalar(BaseKind::Str(32));
        assert!(ty.is_aggregate());
        assert!(!ty.is_numeric());
    }

    #[test]
    fn test_display() {
        let mut ty = TypeDescriptor::scalar(BaseKind::U32);
        ty.dims.push(ArrayDim::Literal(4));
        assert_eq!(ty.display(), "u32[4]");
    }
}
