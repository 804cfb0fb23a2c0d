//! Call graph with per-site argument bindings

use basalt_ast::Span;
use basalt_symbols::SymbolId;

/// What a caller passes at one argument position, reduced to its access
/// root. Mutation tracking is whole-object, so the root is all that
/// matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRoot {
    /// One of the caller's own parameters
    CallerParam(usize),
    /// A program-level variable (global, scope member, register)
    ProgramVar(SymbolId),
    /// A local, literal, or computed value; nothing to propagate to
    Other,
}

/// One resolved call expression
#[derive(Debug, Clone)]
pub struct CallSite {
    pub caller: SymbolId,
    pub callee: SymbolId,
    pub span: Span,
    /// `(callee parameter index, caller-side argument root)` pairs
    pub bindings: Vec<(usize, ArgRoot)>,
}

/// All call edges of the program. Cross-file calls look exactly like
/// same-file calls here because both resolve through qualified names.
#[derive(Debug, Default)]
pub struct CallGraph {
    sites: Vec<CallSite>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_site(&mut self, site: CallSite) {
        self.sites.push(site);
    }

    pub fn sites(&self) -> &[CallSite] {
        &self.sites
    }

    pub fn edge_count(&self) -> usize {
        self.sites.len()
    }

    /// Callees of a function, for queries and tests
    pub fn callees_of(&self, caller: SymbolId) -> Vec<SymbolId> {
        self.sites
            .iter()
            .filter(|s| s.caller == caller)
            .map(|s| s.callee)
            .collect()
    }

    /// Callers of a function, for queries and tests
    pub fn callers_of(&self, callee: SymbolId) -> Vec<SymbolId> {
        self.sites
            .iter()
            .filter(|s| s.callee == callee)
            .map(|s| s.caller)
            .collect()
    }
}
