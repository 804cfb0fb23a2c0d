//! Basalt Checker
//!
//! Scope-qualified reference resolution and static type rules, in one walk
//! over every function body:
//! - `this.X` / `global.X` / `Scope.X` qualification, with the enclosing
//!   scope rejected by name and bare identifiers rejected inside scope
//!   bodies
//! - expected-type resolution of unqualified enum members
//! - widening always allowed; narrowing only under a declared `clamp` or
//!   `wrap` policy; bit-range and constant-division checks with zero false
//!   positives
//!
//! Outputs the node-identity reference map and per-expression types that
//! the mutation analysis and the emitter consume.

mod checker;
mod consteval;
mod diagnostics;
mod error;
mod resolve;

pub use checker::{check, CheckResult, Checker};
pub use consteval::eval_int;
pub use diagnostics::{Diagnostic, Severity};
pub use error::CheckError;
pub use resolve::{Binding, LocalScope, Resolution, ResolvedReferences};

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_parser::parse;
    use basalt_symbols::build_symbol_table;

    fn check_source(source: &str) -> Result<CheckResult, Vec<CheckError>> {
        let program = parse(source).expect("parse failed");
        let table = build_symbol_table(&program).expect("symbol build failed");
        check(&program, &table)
    }

    fn check_ok(source: &str) -> CheckResult {
        match check_source(source) {
            Ok(r) => r,
            Err(errors) => panic!("expected clean check, got {:?}", errors),
        }
    }

    fn check_errs(source: &str) -> Vec<CheckError> {
        match check_source(source) {
            Ok(_) => panic!("expected errors, check passed"),
            Err(errors) => errors,
        }
    }

    // === Scope access rules ===

    #[test]
    fn test_this_resolves_to_scope_member() {
        let result = check_ok(
            r#"
            scope Counter {
                u32 n;
                void inc() { this.n <- this.n + 1; }
            }
            "#,
        );
        assert!(!result.references.is_empty());
    }

    #[test]
    fn test_self_scope_reference_rejected() {
        let errors = check_errs(
            r#"
            scope A {
                void f() { A.f(); }
            }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::SelfScopeReference { scope, .. } if scope == "A")));
    }

    #[test]
    fn test_bare_identifier_in_scope_body_rejected() {
        let errors = check_errs(
            r#"
            u32 total;
            scope A {
                void f() { total <- 1; }
            }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::BareIdentifier { name, .. } if name == "total")));
    }

    #[test]
    fn test_bare_identifier_gets_global_suggestion() {
        let program = parse(
            r#"
            u32 total;
            scope A {
                void f() { total <- 1; }
            }
            "#,
        )
        .unwrap();
        let table = build_symbol_table(&program).unwrap();
        let errors = check(&program, &table).unwrap_err();
        assert!(!errors.is_empty());
        // The advisory suggestion is produced before the abort; rerun to
        // inspect it through a fresh checker whose result we can observe
        // only via the error path, so check the message text instead
        assert!(errors.iter().any(|e| e.code() == "E-RES-003"));
    }

    #[test]
    fn test_global_qualifier_reaches_top_level() {
        check_ok(
            r#"
            u32 total;
            scope A {
                void f() { global.total <- 1; }
            }
            "#,
        );
    }

    #[test]
    fn test_global_chains_through_scope() {
        check_ok(
            r#"
            scope B { u32 m; }
            scope A {
                void f() { global.B.m <- 2; }
            }
            "#,
        );
    }

    #[test]
    fn test_cross_scope_access_by_name() {
        check_ok(
            r#"
            scope B { u32 m; }
            void f() { B.m <- 2; }
            "#,
        );
    }

    #[test]
    fn test_private_scope_member_inaccessible() {
        let errors = check_errs(
            r#"
            scope B { private u32 m; }
            void f() { B.m <- 2; }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::PrivateAccess { name, .. } if name == "B_m")));
    }

    #[test]
    fn test_this_outside_scope_rejected() {
        let errors = check_errs("void f() { this.n <- 1; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::ThisOutsideScope { .. })));
    }

    #[test]
    fn test_unknown_member_reported() {
        let errors = check_errs("void f() { ghost <- 1; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::UnknownMember { name, .. } if name == "ghost")));
    }

    #[test]
    fn test_resolution_errors_are_batched() {
        let errors = check_errs(
            r#"
            void f() {
                ghost1 <- 1;
                ghost2 <- 2;
            }
            "#,
        );
        assert!(errors.len() >= 2, "both bad references should be reported");
    }

    // === Enum member resolution ===

    #[test]
    fn test_enum_member_with_expected_type() {
        check_ok(
            r#"
            enum Mode { Idle, Run, Halt }
            Mode current <- Idle;
            void f(Mode m) { }
            void g() {
                Mode m <- Run;
                m <- Halt;
                f(Idle);
                if (m == Run) { m <- Idle; }
            }
            "#,
        );
    }

    #[test]
    fn test_enum_member_in_return_context() {
        check_ok(
            r#"
            enum Mode { Idle, Run }
            Mode pick() { return Run; }
            "#,
        );
    }

    #[test]
    fn test_enum_member_without_context_is_ambiguous() {
        let errors = check_errs(
            r#"
            enum Mode { Idle, Run }
            void f() {
                u32 x <- Idle;
            }
            "#,
        );
        assert!(errors.iter().any(|e| matches!(
            e,
            CheckError::AmbiguousEnumMember { name, candidates, .. }
                if name == "Idle" && candidates.contains(&"Mode.Idle".to_string())
        )));
    }

    #[test]
    fn test_qualified_enum_member_always_works() {
        check_ok(
            r#"
            enum Mode { Idle, Run }
            void f() {
                u8 x <- 0;
                if (Mode.Idle == Mode.Run) { x <- 1; }
            }
            "#,
        );
    }

    #[test]
    fn test_switch_cases_get_enum_context() {
        check_ok(
            r#"
            enum Mode { Idle, Run }
            void f(Mode m) {
                switch (m) {
                    case Idle { }
                    case Run { }
                }
            }
            "#,
        );
    }

    // === Widening / narrowing ===

    #[test]
    fn test_widening_needs_no_modifier() {
        check_ok(
            r#"
            void f() {
                u8 a <- 10;
                i32 b <- a;
                u64 c <- a;
                f64 d <- a;
            }
            "#,
        );
    }

    #[test]
    fn test_narrowing_without_modifier_rejected() {
        let errors = check_errs(
            r#"
            void f(u32 wide) {
                u8 narrow <- wide;
            }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::NarrowingWithoutModifier { .. })));
    }

    #[test]
    fn test_narrowing_with_clamp_allowed() {
        check_ok(
            r#"
            void f(u32 wide) {
                clamp u8 narrow <- wide;
                wrap u8 wrapped <- wide;
            }
            "#,
        );
    }

    #[test]
    fn test_signedness_change_needs_modifier() {
        let errors = check_errs(
            r#"
            void f(i32 s) {
                u32 u <- s;
            }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::NarrowingWithoutModifier { .. })));
    }

    #[test]
    fn test_literal_overflow_rejected() {
        let errors = check_errs("void f() { u8 c <- 300; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::LiteralOverflow { value: 300, .. })));
    }

    #[test]
    fn test_literal_overflow_with_policy_allowed() {
        check_ok("void f() { clamp u8 c <- 300; }");
    }

    #[test]
    fn test_literal_in_range_ignores_written_width() {
        // A provably in-range literal is fine regardless of its default type
        check_ok("void f() { u8 c <- 255; i8 d <- -128; }");
    }

    // === Bit views ===

    #[test]
    fn test_bit_access_in_range() {
        check_ok(
            r#"
            void f(u32 x) {
                bool b <- x[31];
                u32 field <- x[4, 8];
                x[0] <- true;
            }
            "#,
        );
    }

    #[test]
    fn test_single_bit_out_of_range() {
        let errors = check_errs("void f(u8 x) { bool b <- x[8]; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::BitRangeOverflow { offset: 8, limit: 8, .. })));
    }

    #[test]
    fn test_bit_field_out_of_range() {
        let errors = check_errs("void f(u8 x) { u8 v <- x[4, 8]; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::BitRangeOverflow { offset: 4, width: 8, .. })));
    }

    #[test]
    fn test_unprovable_bit_index_not_flagged() {
        // Zero false positives: a runtime index is never diagnosed
        check_ok("void f(u8 x, u8 i) { bool b <- x[i]; }");
    }

    #[test]
    fn test_bit_range_via_const_symbol() {
        let errors = check_errs(
            r#"
            const u32 OFF <- 30;
            void f(u32 x) { u32 v <- x[OFF, 4]; }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::BitRangeOverflow { offset: 30, width: 4, .. })));
    }

    // === Division ===

    #[test]
    fn test_integer_division_by_const_zero() {
        let errors = check_errs("void f(u32 x) { x <- x / 0; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::DivisionByConstZero { .. })));
    }

    #[test]
    fn test_modulo_by_const_zero() {
        let errors = check_errs("void f(u32 x) { x <- x % 0; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::DivisionByConstZero { .. })));
    }

    #[test]
    fn test_float_division_by_zero_is_legal() {
        // The intentional asymmetry: floats divide by zero at runtime
        let result = check_ok("void f(f32 y) { y <- y / 0.0; }");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_division_by_folded_const_zero() {
        let errors = check_errs(
            r#"
            const u32 ZERO <- 0;
            void f(u32 x) { x <- x / ZERO; }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::DivisionByConstZero { .. })));
    }

    #[test]
    fn test_division_by_unprovable_value_not_flagged() {
        check_ok("void f(u32 x, u32 y) { x <- x / y; }");
    }

    // === Structs, calls, misc ===

    #[test]
    fn test_struct_field_chain() {
        check_ok(
            r#"
            struct Inner { u8 v; }
            struct Outer { Inner inner; }
            void f(Outer o) {
                u8 x <- o.inner.v;
                o.inner.v <- 3;
            }
            "#,
        );
    }

    #[test]
    fn test_unknown_struct_field() {
        let errors = check_errs(
            r#"
            struct Point { i32 x; }
            void f(Point p) { p.z <- 1; }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::UnknownMember { name, .. } if name == "z")));
    }

    #[test]
    fn test_call_arity_checked() {
        let errors = check_errs(
            r#"
            void g(u8 a, u8 b) { }
            void f() { g(1); }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::ArityMismatch { expected: 2, found: 1, .. })));
    }

    #[test]
    fn test_call_argument_narrowing_checked() {
        let errors = check_errs(
            r#"
            void g(u8 v) { }
            void f(u32 wide) { g(wide); }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::NarrowingWithoutModifier { .. })));
    }

    #[test]
    fn test_write_to_const_rejected() {
        let errors = check_errs(
            r#"
            const u32 LIMIT <- 10;
            void f() { global.LIMIT <- 11; }
            "#,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, CheckError::WriteToConst { name, .. } if name == "LIMIT")));
    }

    #[test]
    fn test_scope_function_calls_via_this() {
        check_ok(
            r#"
            scope Counter {
                u32 n;
                void reset() { this.n <- 0; }
                void init() { this.reset(); }
            }
            "#,
        );
    }

    #[test]
    fn test_register_is_writable() {
        check_ok(
            r#"
            register CTRL @ 0x40000000 : u32;
            void f() { CTRL <- 1; }
            "#,
        );
    }

    #[test]
    fn test_expression_statement_advisory() {
        let result = check_ok("void f(u8 x) { u8 y <- x; y + 1; }");
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == "A-STMT-001"));
    }

    #[test]
    fn test_every_reference_has_location() {
        let errors = check_errs("void f() { ghost <- 1; }");
        for e in &errors {
            let span = e.span();
            assert!(span.line >= 1 && span.column >= 1);
        }
    }
}
