//! basalt-symbols: Symbol Graph Builder
//!
//! This crate implements the whole-program symbol phase of the Basalt
//! transpiler:
//! - Register every declaration from every file under its qualified name
//! - Enforce the structural rules: unique symbols, no nested scopes,
//!   extern forward declarations reconciled with exactly one definition
//! - Resolve every declaration's written type into a `TypeDescriptor`
//!
//! The input files must already be in dependency order (the include graph
//! collaborator guarantees every file's includes precede it), so a symbol
//! declared in an included file is always registered before its uses.
//!
//! # Example
//!
//! ```
//! use basalt_parser::parse;
//! use basalt_symbols::build_symbol_table;
//!
//! let program = parse("scope Counter { u32 n; }").unwrap();
//! let table = build_symbol_table(&program).unwrap();
//! assert!(table.contains("Counter_n"));
//! ```

mod builder;
mod error;
mod symbol;
mod table;
mod types;

pub use builder::build_symbol_table;
pub use error::SymbolError;
pub use symbol::{
    BitFieldInfo, BitmapData, EnumData, EnumVariantInfo, FieldInfo, FunctionData, ParamInfo,
    RegisterData, ScopeData, StructData, Symbol, SymbolData, SymbolId, SymbolKind, VariableData,
};
pub use table::SymbolTable;
pub use types::{ArrayDim, BaseKind, PassingMode, TypeDescriptor};
