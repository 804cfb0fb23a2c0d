//! Basalt AST - Core types for the abstract syntax tree
//!
//! This crate defines all AST node types, spans for source locations,
//! and the node identities downstream analysis maps key on.

mod decl;
mod expr;
mod span;
mod stmt;
mod types;

pub use decl::*;
pub use expr::*;
pub use span::*;
pub use stmt::*;
pub use types::*;

use serde::{Deserialize, Serialize};

/// One parsed source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub file: FileId,
    /// Path as given to the front end; also the include key
    pub path: String,
    pub includes: Vec<IncludeDecl>,
    pub declarations: Vec<Declaration>,
    pub span: Span,
}

/// `include "other.blt";`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludeDecl {
    pub path: String,
    pub span: Span,
}

/// A complete program: files in dependency order (every file's includes
/// precede it). The symbol builder relies on this ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub files: Vec<SourceFile>,
}

impl Program {
    pub fn new(files: Vec<SourceFile>) -> Self {
        Self { files }
    }

    /// All top-level declarations across every file, in program order
    pub fn declarations(&self) -> impl Iterator<Item = (&SourceFile, &Declaration)> {
        self.files
            .iter()
            .flat_map(|f| f.declarations.iter().map(move |d| (f, d)))
    }

    /// Look up a file's path by id
    pub fn path_of(&self, file: FileId) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.file == file)
            .map(|f| f.path.as_str())
    }
}
