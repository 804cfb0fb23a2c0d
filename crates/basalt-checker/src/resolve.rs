//! Reference resolutions and function-local scope tracking

use basalt_ast::NodeId;
use basalt_symbols::{SymbolId, TypeDescriptor};
use std::collections::HashMap;

/// What an identifier or member-access expression resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A program-level symbol (variable, register, function, ...)
    Symbol(SymbolId),

    /// A parameter of the enclosing function
    Param { function: SymbolId, index: usize },

    /// A function-local binding. Locals are not table symbols because
    /// qualified names must stay globally unique.
    Local { function: SymbolId, name: String },

    /// An enum variant, resolved through its enum type
    EnumVariant { enum_id: SymbolId, variant: usize },
}

/// Map from AST node identity to its resolution, for every identifier,
/// member-access, and call expression in the program
#[derive(Debug, Default)]
pub struct ResolvedReferences {
    map: HashMap<NodeId, Resolution>,
}

impl ResolvedReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: NodeId, resolution: Resolution) {
        self.map.insert(node, resolution);
    }

    pub fn get(&self, node: NodeId) -> Option<&Resolution> {
        self.map.get(&node)
    }

    /// The program-level symbol a node resolves to, if any
    pub fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        match self.map.get(&node) {
            Some(Resolution::Symbol(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Resolution)> {
        self.map.iter()
    }
}

/// A binding visible inside a function body
#[derive(Debug, Clone)]
pub enum Binding {
    Param { index: usize, ty: TypeDescriptor },
    Local { ty: TypeDescriptor },
}

impl Binding {
    pub fn ty(&self) -> &TypeDescriptor {
        match self {
            Binding::Param { ty, .. } => ty,
            Binding::Local { ty } => ty,
        }
    }
}

/// Lexical scope stack for one function body
#[derive(Debug, Default)]
pub struct LocalScope {
    scopes: Vec<HashMap<String, Binding>>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit(&mut self) {
        self.scopes.pop();
    }

    pub fn bind(&mut self, name: impl Into<String>, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), binding);
        }
    }

    /// Look up a binding from innermost scope outward
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    pub fn clear(&mut self) {
        self.scopes.clear();
    }
}
