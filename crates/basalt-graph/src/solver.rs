//! Whole-program fixed-point propagation of mutation flags
//!
//! Iterates the propagation rule over the full edge set until a complete
//! pass produces no new marks. The flag set only grows and is bounded by
//! the number of `(function, parameter)` pairs, so termination is
//! guaranteed; recursive and mutually-recursive cycles need no special
//! casing because repeated marking is idempotent. A hard iteration cap of
//! `edge count + 1` passes guards against analyzer defects.

use crate::{ArgRoot, CallGraph, GraphError, LocalMutationInfo};
use basalt_ast::Span;
use basalt_symbols::SymbolId;
use std::collections::HashSet;

/// The stable result: which parameters and program variables are mutated,
/// directly or through any chain of calls. Grows monotonically while the
/// solver runs and is immutable afterwards.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ModificationSet {
    params: HashSet<(SymbolId, usize)>,
    vars: HashSet<SymbolId>,
}

impl ModificationSet {
    pub fn is_param_mutated(&self, function: SymbolId, index: usize) -> bool {
        self.params.contains(&(function, index))
    }

    pub fn is_var_mutated(&self, var: SymbolId) -> bool {
        self.vars.contains(&var)
    }

    pub fn mutated_params(&self) -> impl Iterator<Item = &(SymbolId, usize)> {
        self.params.iter()
    }

    pub fn mutated_vars(&self) -> impl Iterator<Item = &SymbolId> {
        self.vars.iter()
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

/// Run the propagation to a fixed point
pub fn solve(
    locals: &[LocalMutationInfo],
    graph: &CallGraph,
) -> Result<ModificationSet, GraphError> {
    let mut set = ModificationSet::default();

    // Seed with the direct writes
    for info in locals {
        for &index in &info.written_params {
            set.params.insert((info.function, index));
        }
        for &var in &info.written_vars {
            set.vars.insert(var);
        }
    }

    // Exceeding the cap indicates a logic defect, not a legitimate
    // non-terminating input
    let cap = graph.edge_count() + 1;
    let mut passes = 0usize;

    loop {
        let mut changed = false;

        for site in graph.sites() {
            for (position, root) in &site.bindings {
                if !set.params.contains(&(site.callee, *position)) {
                    continue;
                }
                match root {
                    ArgRoot::CallerParam(index) => {
                        changed |= set.params.insert((site.caller, *index));
                    }
                    ArgRoot::ProgramVar(var) => {
                        changed |= set.vars.insert(*var);
                    }
                    ArgRoot::Other => {}
                }
            }
        }

        if !changed {
            break;
        }
        passes += 1;
        if passes > cap {
            let span = graph
                .sites()
                .first()
                .map(|s| s.span)
                .unwrap_or_else(Span::dummy);
            return Err(GraphError::IterationCapExceeded { cap, span });
        }
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CallSite;
    use basalt_ast::Span;
    use std::collections::HashSet;

    fn info(function: u32, written: &[usize]) -> LocalMutationInfo {
        LocalMutationInfo {
            function: SymbolId(function),
            written_params: written.iter().copied().collect(),
            written_vars: HashSet::new(),
        }
    }

    fn site(caller: u32, callee: u32, bindings: Vec<(usize, ArgRoot)>) -> CallSite {
        CallSite {
            caller: SymbolId(caller),
            callee: SymbolId(callee),
            span: Span::dummy(),
            bindings,
        }
    }

    #[test]
    fn test_direct_writes_seed_the_set() {
        let locals = vec![info(0, &[1])];
        let set = solve(&locals, &CallGraph::new()).unwrap();
        assert!(set.is_param_mutated(SymbolId(0), 1));
        assert!(!set.is_param_mutated(SymbolId(0), 0));
    }

    #[test]
    fn test_propagation_through_chain() {
        // f2 writes its param 0; f1 forwards its param 0 to f2; f0 forwards
        // its param 0 to f1. All three end up mutated.
        let locals = vec![info(2, &[0]), info(1, &[]), info(0, &[])];
        let mut graph = CallGraph::new();
        graph.add_site(site(1, 2, vec![(0, ArgRoot::CallerParam(0))]));
        graph.add_site(site(0, 1, vec![(0, ArgRoot::CallerParam(0))]));

        let set = solve(&locals, &graph).unwrap();
        assert!(set.is_param_mutated(SymbolId(0), 0));
        assert!(set.is_param_mutated(SymbolId(1), 0));
        assert!(set.is_param_mutated(SymbolId(2), 0));
    }

    #[test]
    fn test_mutual_recursion_reaches_fixed_point() {
        // a and b forward to each other; b also writes its param directly
        let locals = vec![info(0, &[]), info(1, &[0])];
        let mut graph = CallGraph::new();
        graph.add_site(site(0, 1, vec![(0, ArgRoot::CallerParam(0))]));
        graph.add_site(site(1, 0, vec![(0, ArgRoot::CallerParam(0))]));

        let set = solve(&locals, &graph).unwrap();
        assert!(set.is_param_mutated(SymbolId(0), 0));
        assert!(set.is_param_mutated(SymbolId(1), 0));
    }

    #[test]
    fn test_self_recursion_is_idempotent() {
        let locals = vec![info(0, &[0])];
        let mut graph = CallGraph::new();
        graph.add_site(site(0, 0, vec![(0, ArgRoot::CallerParam(0))]));

        let set = solve(&locals, &graph).unwrap();
        assert!(set.is_param_mutated(SymbolId(0), 0));
        assert_eq!(set.param_count(), 1);
    }

    #[test]
    fn test_program_var_marked_through_call() {
        let locals = vec![info(1, &[0])];
        let mut graph = CallGraph::new();
        graph.add_site(site(0, 1, vec![(0, ArgRoot::ProgramVar(SymbolId(9)))]));

        let set = solve(&locals, &graph).unwrap();
        assert!(set.is_var_mutated(SymbolId(9)));
    }

    #[test]
    fn test_unrelated_positions_stay_clean() {
        // Callee mutates param 0, caller passes its param at position 1
        let locals = vec![info(1, &[0]), info(0, &[])];
        let mut graph = CallGraph::new();
        graph.add_site(site(
            0,
            1,
            vec![(0, ArgRoot::Other), (1, ArgRoot::CallerParam(0))],
        ));

        let set = solve(&locals, &graph).unwrap();
        assert!(!set.is_param_mutated(SymbolId(0), 0));
    }

    #[test]
    fn test_determinism() {
        let locals = vec![info(2, &[0]), info(1, &[]), info(0, &[])];
        let mut graph = CallGraph::new();
        graph.add_site(site(1, 2, vec![(0, ArgRoot::CallerParam(0))]));
        graph.add_site(site(0, 1, vec![(0, ArgRoot::CallerParam(0))]));

        let a = solve(&locals, &graph).unwrap();
        let b = solve(&locals, &graph).unwrap();
        assert_eq!(a, b);
    }
}
