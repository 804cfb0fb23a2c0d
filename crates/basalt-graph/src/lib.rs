//! Basalt Graph - whole-program mutation analysis
//!
//! The hardest part of the pipeline: a fixed-point analysis over the full
//! call graph (cycles included) that decides, for every function parameter
//! in the program, whether generated code must pass it by value, by const
//! pointer, or by mutable pointer. The phases:
//!
//! 1. `analyze_mutations`: per-function direct writes and call-site
//!    argument bindings (whole-object granularity)
//! 2. `solve`: worklist propagation over the edge set to a stable
//!    `ModificationSet`, with a hard iteration cap as a defect guard
//! 3. `classify_parameters`: the final passing decision, a pure function
//!    of the modification set and the parameter types

mod call_graph;
mod classify;
mod error;
mod mutation;
mod solver;

pub use call_graph::{ArgRoot, CallGraph, CallSite};
pub use classify::{classify_parameters, PassingConfig, PassingDecisions};
pub use error::GraphError;
pub use mutation::{analyze_mutations, LocalMutationInfo, MutationAnalysis};
pub use solver::{solve, ModificationSet};

use basalt_ast::Program;
use basalt_checker::ResolvedReferences;
use basalt_symbols::SymbolTable;

/// Result of the whole-program analysis
#[derive(Debug)]
pub struct AnalysisResult {
    pub call_graph: CallGraph,
    pub modifications: ModificationSet,
    pub decisions: PassingDecisions,
}

/// Run the full mutation pipeline with the given policy
pub fn analyze(
    program: &Program,
    table: &SymbolTable,
    refs: &ResolvedReferences,
    config: &PassingConfig,
) -> Result<AnalysisResult, GraphError> {
    let MutationAnalysis { locals, call_graph } = analyze_mutations(program, table, refs);
    let modifications = solve(&locals, &call_graph)?;
    let decisions = classify_parameters(table, &modifications, config);
    Ok(AnalysisResult {
        call_graph,
        modifications,
        decisions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_checker::check;
    use basalt_parser::{parse, parse_program};
    use basalt_symbols::{build_symbol_table, PassingMode};

    fn run(source: &str) -> (basalt_symbols::SymbolTable, AnalysisResult) {
        let program = parse(source).expect("parse failed");
        let table = build_symbol_table(&program).expect("symbols failed");
        let result = check(&program, &table).expect("check failed");
        let analysis = analyze(
            &program,
            &table,
            &result.references,
            &PassingConfig::default(),
        )
        .expect("analysis failed");
        (table, analysis)
    }

    #[test]
    fn test_scope_method_mutates_member() {
        let (table, analysis) = run(
            r#"
            scope Counter {
                u32 n;
                void inc() { this.n <- this.n + 1; }
            }
            "#,
        );
        let n = table.id_of("Counter_n").unwrap();
        assert!(analysis.modifications.is_var_mutated(n));
    }

    #[test]
    fn test_struct_param_write_classified_mutable() {
        let (table, analysis) = run(
            r#"
            struct Point { i32 x; i32 y; }
            Point origin;
            void setX(Point p) { p.x <- 1; }
            void main_fn() { setX(origin); }
            "#,
        );

        // Parameter p is written through a field, so whole-object marking
        // makes it by-mutable-pointer
        assert_eq!(
            analysis.decisions.get_by_name(&table, "setX", 0),
            Some(PassingMode::ByMutablePointer)
        );
        // The caller's argument is a program variable; it is marked too
        let origin = table.id_of("origin").unwrap();
        assert!(analysis.modifications.is_var_mutated(origin));
    }

    #[test]
    fn test_unmodified_struct_param_const_pointer() {
        let (table, analysis) = run(
            r#"
            struct Point { i32 x; i32 y; }
            i32 readX(Point p) { return p.x; }
            "#,
        );
        assert_eq!(
            analysis.decisions.get_by_name(&table, "readX", 0),
            Some(PassingMode::ByConstPointer)
        );
    }

    #[test]
    fn test_transitive_mutation_across_calls() {
        let (table, analysis) = run(
            r#"
            struct Point { i32 x; }
            void inner(Point p) { p.x <- 1; }
            void middle(Point q) { inner(q); }
            void outer(Point r) { middle(r); }
            "#,
        );
        for (name, index) in [("inner", 0), ("middle", 0), ("outer", 0)] {
            assert_eq!(
                analysis.decisions.get_by_name(&table, name, index),
                Some(PassingMode::ByMutablePointer),
                "{} parameter should be mutable",
                name
            );
        }
    }

    #[test]
    fn test_mutual_recursion_converges() {
        let (table, analysis) = run(
            r#"
            struct Buf { u8 data[4]; }
            void ping(Buf b, u8 depth) {
                if (depth > 0) { pong(b, depth); }
            }
            void pong(Buf b, u8 depth) {
                b.data[0] <- depth;
                if (depth > 1) { ping(b, depth); }
            }
            "#,
        );
        assert_eq!(
            analysis.decisions.get_by_name(&table, "ping", 0),
            Some(PassingMode::ByMutablePointer)
        );
        assert_eq!(
            analysis.decisions.get_by_name(&table, "pong", 0),
            Some(PassingMode::ByMutablePointer)
        );
        // depth is a small unmodified integer in both
        assert_eq!(
            analysis.decisions.get_by_name(&table, "ping", 1),
            Some(PassingMode::ByValue)
        );
    }

    #[test]
    fn test_cross_file_call_propagates() {
        let program = parse_program(&[
            (
                "lib.blt",
                r#"
                struct Frame { u8 bytes[8]; }
                void fill(Frame f) { f.bytes[0] <- 1; }
                "#,
            ),
            (
                "main.blt",
                r#"
                include "lib.blt";
                void produce(Frame f) { fill(f); }
                "#,
            ),
        ])
        .unwrap();
        let table = build_symbol_table(&program).unwrap();
        let result = check(&program, &table).unwrap();
        let analysis = analyze(
            &program,
            &table,
            &result.references,
            &PassingConfig::default(),
        )
        .unwrap();

        assert_eq!(
            analysis.decisions.get_by_name(&table, "produce", 0),
            Some(PassingMode::ByMutablePointer)
        );
    }

    #[test]
    fn test_float_bool_enum_params_always_by_value() {
        let (table, analysis) = run(
            r#"
            enum Mode { Idle, Run }
            void f(f32 a, bool b, Mode m) {
                a <- 1.0;
                b <- true;
                m <- Run;
            }
            "#,
        );
        for index in 0..3 {
            assert_eq!(
                analysis.decisions.get_by_name(&table, "f", index),
                Some(PassingMode::ByValue)
            );
        }
    }

    #[test]
    fn test_call_graph_edges_recorded() {
        let (table, analysis) = run(
            r#"
            void callee() { }
            void caller() { callee(); callee(); }
            "#,
        );
        let caller = table.id_of("caller").unwrap();
        let callee = table.id_of("callee").unwrap();
        assert_eq!(analysis.call_graph.callees_of(caller), vec![callee, callee]);
        assert_eq!(analysis.call_graph.callers_of(callee).len(), 2);
    }

    #[test]
    fn test_determinism_full_pipeline() {
        let source = r#"
            struct Point { i32 x; }
            Point a;
            void w(Point p) { p.x <- 1; }
            void f(Point p) { w(p); }
            void g() { f(a); }
        "#;
        let program = parse(source).unwrap();
        let table = build_symbol_table(&program).unwrap();
        let result = check(&program, &table).unwrap();

        let m1 = {
            let MutationAnalysis { locals, call_graph } =
                analyze_mutations(&program, &table, &result.references);
            solve(&locals, &call_graph).unwrap()
        };
        let m2 = {
            let MutationAnalysis { locals, call_graph } =
                analyze_mutations(&program, &table, &result.references);
            solve(&locals, &call_graph).unwrap()
        };
        assert_eq!(m1, m2);
    }

    #[test]
    fn test_read_only_forwarding_stays_const() {
        // q is forwarded to a read-only parameter; nothing marks it
        let (table, analysis) = run(
            r#"
            struct Point { i32 x; }
            i32 read(Point p) { return p.x; }
            i32 pass(Point q) { return read(q); }
            "#,
        );
        assert_eq!(
            analysis.decisions.get_by_name(&table, "pass", 0),
            Some(PassingMode::ByConstPointer)
        );
        assert_eq!(
            analysis.decisions.get_by_name(&table, "read", 0),
            Some(PassingMode::ByConstPointer)
        );
    }
}
