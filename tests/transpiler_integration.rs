//! End-to-end integration tests for the Basalt transpiler
//!
//! These drive the full pipeline (parse, symbol graph, check, mutation
//! analysis, C emission) over inline programs, including the scenarios
//! the analysis contract is specified against.

use basalt_checker::{check, CheckError, CheckResult};
use basalt_graph::{analyze, AnalysisResult, PassingConfig};
use basalt_parser::{parse, parse_program};
use basalt_symbols::{build_symbol_table, PassingMode, SymbolError, SymbolKind, SymbolTable};

struct Analyzed {
    table: SymbolTable,
    checked: CheckResult,
    analysis: AnalysisResult,
}

fn analyze_source(source: &str) -> Analyzed {
    let program = parse(source).expect("parse failed");
    let table = build_symbol_table(&program).expect("symbol build failed");
    let checked = check(&program, &table).expect("check failed");
    let analysis = analyze(
        &program,
        &table,
        &checked.references,
        &PassingConfig::default(),
    )
    .expect("analysis failed");
    Analyzed {
        table,
        checked,
        analysis,
    }
}

fn transpile(source: &str) -> String {
    let program = parse(source).expect("parse failed");
    let table = build_symbol_table(&program).expect("symbol build failed");
    let checked = check(&program, &table).expect("check failed");
    let analysis = analyze(
        &program,
        &table,
        &checked.references,
        &PassingConfig::default(),
    )
    .expect("analysis failed");
    basalt_codegen::generate_c(
        &program,
        &table,
        &checked.references,
        &checked.expr_types,
        &analysis.decisions,
    )
    .expect("codegen failed")
}

// === Scenario A: scope member mutation ===

#[test]
fn e2e_scope_counter_mutation() {
    let result = analyze_source(
        r#"
        scope Counter {
            u32 n;
            void inc() { this.n <- this.n + 1; }
        }
        "#,
    );

    // Counter_n exists in the symbol table
    let n = result.table.get_by_name("Counter_n").expect("Counter_n exists");
    assert_eq!(n.kind, SymbolKind::Variable);

    // this.n resolved to Counter_n
    let resolved_to_n = result
        .checked
        .references
        .iter()
        .filter(|(_, r)| matches!(r, basalt_checker::Resolution::Symbol(id) if *id == n.id))
        .count();
    assert!(resolved_to_n >= 2, "both this.n references hit Counter_n");

    // Counter_inc is recorded as mutating it
    assert!(result.analysis.modifications.is_var_mutated(n.id));
}

// === Scenario B: struct parameter passed to a mutating callee ===

#[test]
fn e2e_struct_param_mutation_and_caller_marking() {
    let result = analyze_source(
        r#"
        struct Point { i32 x; i32 y; }
        Point origin;
        void setX(Point p) { p.x <- 1; }
        void run() { setX(origin); }
        "#,
    );

    assert_eq!(
        result.analysis.decisions.get_by_name(&result.table, "setX", 0),
        Some(PassingMode::ByMutablePointer)
    );

    let origin = result.table.id_of("origin").unwrap();
    assert!(result.analysis.modifications.is_var_mutated(origin));
}

// === Scenario C: self-scope reference ===

#[test]
fn e2e_self_scope_reference_rejected() {
    let program = parse(
        r#"
        scope A {
            void f() { A.f(); }
        }
        "#,
    )
    .unwrap();
    let table = build_symbol_table(&program).unwrap();
    let errors = check(&program, &table).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, CheckError::SelfScopeReference { scope, .. } if scope == "A")));
}

// === Scenario D: nested scope ===

#[test]
fn e2e_nested_scope_rejected() {
    let program = parse("scope Outer { scope Inner { } }").unwrap();
    let errors = build_symbol_table(&program).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, SymbolError::NestedScope { name, .. } if name == "Inner")));
}

// === Scenario E: widening and literal overflow ===

#[test]
fn e2e_widening_succeeds() {
    analyze_source(
        r#"
        void f() {
            u8 a <- 10;
            i32 b <- a;
        }
        "#,
    );
}

#[test]
fn e2e_literal_overflow_rejected() {
    let program = parse("void f() { u8 c <- 300; }").unwrap();
    let table = build_symbol_table(&program).unwrap();
    let errors = check(&program, &table).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, CheckError::LiteralOverflow { value: 300, .. })));
}

// === Scenario F: the division asymmetry ===

#[test]
fn e2e_integer_division_by_const_zero_rejected() {
    let program = parse("void f(u32 x) { x <- x / 0; }").unwrap();
    let table = build_symbol_table(&program).unwrap();
    let errors = check(&program, &table).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, CheckError::DivisionByConstZero { .. })));
}

#[test]
fn e2e_float_division_by_zero_accepted() {
    let result = analyze_source("void f(f32 y) { y <- y / 0.0; }");
    assert!(result.checked.diagnostics.is_empty());
}

// === Whole-program properties ===

#[test]
fn e2e_resolved_references_point_into_table() {
    let result = analyze_source(
        r#"
        const u32 LIMIT <- 8;
        scope Counter {
            u32 n;
            void inc() {
                if (this.n < global.LIMIT) { this.n <- this.n + 1; }
            }
        }
        void tick() { Counter.inc(); }
        "#,
    );

    for (_, resolution) in result.checked.references.iter() {
        if let basalt_checker::Resolution::Symbol(id) = resolution {
            let sym = result.table.get(*id).expect("resolution points into table");
            assert_eq!(result.table.id_of(&sym.qualified_name), Some(sym.id));
        }
    }
}

#[test]
fn e2e_fixed_point_is_deterministic() {
    let source = r#"
        struct Frame { u8 bytes[8]; }
        void fill(Frame f) { f.bytes[0] <- 1; }
        void hop(Frame f, u8 n) {
            if (n > 0) { skip(f, n); }
        }
        void skip(Frame f, u8 n) {
            fill(f);
            if (n > 1) { hop(f, n); }
        }
    "#;
    let program = parse(source).unwrap();
    let table = build_symbol_table(&program).unwrap();
    let checked = check(&program, &table).unwrap();

    let run = || {
        let basalt_graph::MutationAnalysis { locals, call_graph } =
            basalt_graph::analyze_mutations(&program, &table, &checked.references);
        basalt_graph::solve(&locals, &call_graph).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn e2e_float_bool_enum_params_always_by_value() {
    let result = analyze_source(
        r#"
        enum Mode { Idle, Run }
        void sink(f64 a, bool b, Mode m) {
            a <- 0.0;
            b <- false;
            m <- Idle;
        }
        "#,
    );
    for index in 0..3 {
        assert_eq!(
            result.analysis.decisions.get_by_name(&result.table, "sink", index),
            Some(PassingMode::ByValue)
        );
    }
}

#[test]
fn e2e_unmutated_struct_is_const_pointer_and_unwritten() {
    let result = analyze_source(
        r#"
        struct Config { u32 rate; u32 depth; }
        u32 rate_of(Config c) { return c.rate; }
        u32 doubled(Config c) { return rate_of(c) * 2; }
        "#,
    );
    for name in ["rate_of", "doubled"] {
        assert_eq!(
            result.analysis.decisions.get_by_name(&result.table, name, 0),
            Some(PassingMode::ByConstPointer)
        );
        let id = result.table.id_of(name).unwrap();
        assert!(!result.analysis.modifications.is_param_mutated(id, 0));
    }
}

// === Cross-file programs ===

#[test]
fn e2e_cross_file_mutation_propagates() {
    let program = parse_program(&[
        (
            "hal.blt",
            r#"
            struct TxBuf { u8 data[32]; u8 len; }
            void hal_send(TxBuf b) { b.len <- 0; }
            "#,
        ),
        (
            "proto.blt",
            r#"
            include "hal.blt";
            void send_frame(TxBuf b) { hal_send(b); }
            "#,
        ),
        (
            "main.blt",
            r#"
            include "proto.blt";
            TxBuf tx;
            void pump() { send_frame(tx); }
            "#,
        ),
    ])
    .unwrap();

    let table = build_symbol_table(&program).unwrap();
    let checked = check(&program, &table).unwrap();
    let analysis = analyze(&program, &table, &checked.references, &PassingConfig::default()).unwrap();

    assert_eq!(
        analysis.decisions.get_by_name(&table, "hal_send", 0),
        Some(PassingMode::ByMutablePointer)
    );
    assert_eq!(
        analysis.decisions.get_by_name(&table, "send_frame", 0),
        Some(PassingMode::ByMutablePointer)
    );
    let tx = table.id_of("tx").unwrap();
    assert!(analysis.modifications.is_var_mutated(tx));
}

#[test]
fn e2e_private_symbol_invisible_across_files() {
    let program = parse_program(&[
        ("lib.blt", "private u32 internal_state;"),
        (
            "main.blt",
            "include \"lib.blt\";\nvoid f() { global.internal_state <- 1; }",
        ),
    ])
    .unwrap();
    let table = build_symbol_table(&program).unwrap();
    let errors = check(&program, &table).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, CheckError::PrivateAccess { name, .. } if name == "internal_state")));
}

// === Emission ===

#[test]
fn e2e_generated_c_reflects_decisions() {
    let c = transpile(
        r#"
        struct Point { i32 x; i32 y; }
        Point origin;
        void setX(Point p) { p.x <- 1; }
        i32 getX(Point p) { return p.x; }
        void run() {
            setX(origin);
            i32 v <- getX(origin);
        }
        "#,
    );

    assert!(c.contains("void setX(Point *p)"), "{}", c);
    assert!(c.contains("int32_t getX(const Point *p)"), "{}", c);
    assert!(c.contains("setX(&origin);"), "{}", c);
    assert!(c.contains("getX(&origin)"), "{}", c);
}

#[test]
fn e2e_full_program_transpiles() {
    let c = transpile(
        r#"
        const u32 MAX_TICKS <- 1000;

        enum Mode { Idle, Run <- 3, Halt }

        bitmap Status : u8 { ready: 0; err: 1; code: 2, 3; }

        register CTRL @ 0x40000000 : u32;

        struct Sample { u32 t; i16 value; }

        scope Sampler {
            private u32 count;
            private Sample last;

            public void record(Sample s) {
                this.count <- this.count + 1;
                this.last.t <- s.t;
            }

            public u32 total() { return this.count; }
        }

        Mode mode <- Idle;

        void step(Sample s) {
            if (mode == Run) {
                Sampler.record(s);
                critical { CTRL <- CTRL | 1; }
            }
        }
        "#,
    );

    assert!(c.contains("typedef enum"), "{}", c);
    assert!(c.contains("#define MAX_TICKS 1000"), "{}", c);
    assert!(c.contains("typedef uint8_t Status;"), "{}", c);
    assert!(c.contains("static uint32_t Sampler_count;"), "{}", c);
    assert!(c.contains("void step(const Sample *s)"), "{}", c);
    assert!(c.contains("BASALT_CRITICAL_ENTER();"), "{}", c);
}
