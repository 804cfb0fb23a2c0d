//! Symbol table data structure
//!
//! Built exactly once per program run by the symbol graph builder and
//! read-only afterwards: the public API exposes no mutating accessors, so
//! later phases cannot alter it. This is the ownership contract the whole
//! pipeline relies on.

use crate::{Symbol, SymbolError, SymbolId, SymbolKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The canonical symbol table for a whole program
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    /// All symbols indexed by numeric ID
    symbols: Vec<Symbol>,

    /// Qualified name to ID mapping for lookup
    by_name: HashMap<String, SymbolId>,

    /// Secondary index: scope name to its member IDs
    scope_index: HashMap<String, Vec<SymbolId>>,
}

impl SymbolTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Get a symbol by qualified name
    pub fn get_by_name(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|id| &self.symbols[id.0 as usize])
    }

    /// Get a symbol by ID
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0 as usize)
    }

    /// Get the ID for a qualified name
    pub fn id_of(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    /// Check if a symbol exists by qualified name
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Member IDs of a scope, in declaration order
    pub fn scope_members(&self, scope: &str) -> &[SymbolId] {
        self.scope_index
            .get(scope)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over all symbols
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Get all function symbols
    pub fn functions(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Function)
    }

    /// Get all enum symbols
    pub fn enums(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.kind == SymbolKind::Enum)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    // === Build-phase access (crate-internal only) ===

    /// Insert a new symbol, returning an error against the previous
    /// declaration if the qualified name is taken
    pub(crate) fn insert(&mut self, mut symbol: Symbol) -> Result<SymbolId, SymbolError> {
        if let Some(existing) = self.get_by_name(&symbol.qualified_name) {
            return Err(SymbolError::DuplicateSymbol {
                name: symbol.qualified_name.clone(),
                span: symbol.span,
                previous: existing.span,
            });
        }

        let id = SymbolId(self.symbols.len() as u32);
        symbol.id = id;
        self.by_name.insert(symbol.qualified_name.clone(), id);
        self.symbols.push(symbol);
        Ok(id)
    }

    pub(crate) fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id.0 as usize)
    }

    pub(crate) fn add_scope_member(&mut self, scope: &str, member: SymbolId) {
        self.scope_index
            .entry(scope.to_string())
            .or_default()
            .push(member);
    }
}
