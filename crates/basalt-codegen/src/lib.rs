//! Basalt Codegen - MISRA-style C emission
//!
//! Turns a fully analyzed program into one readable C translation unit.
//! Parameter passing follows the classifier's decisions verbatim; the
//! emitter never re-derives them.

mod c_writer;
mod emit;

pub use c_writer::CWriter;
pub use emit::generate_c;

use basalt_ast::Span;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CodegenError {
    /// An expression reached emission without a resolution or type; this
    /// means a phase was skipped, not a user error
    #[error("internal: unresolved expression reached the emitter")]
    Unresolved { span: Span },

    #[error("internal: symbol `{name}` missing from the table")]
    MissingSymbol { name: String, span: Span },

    #[error("unsupported construct: {what}")]
    Unsupported { what: String, span: Span },
}

impl CodegenError {
    pub fn span(&self) -> Span {
        match self {
            CodegenError::Unresolved { span } => *span,
            CodegenError::MissingSymbol { span, .. } => *span,
            CodegenError::Unsupported { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_checker::check;
    use basalt_graph::{analyze, PassingConfig};
    use basalt_parser::parse;
    use basalt_symbols::build_symbol_table;

    fn transpile(source: &str) -> String {
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
        generate_c(
            &program,
            &table,
            &result.references,
            &result.expr_types,
            &analysis.decisions,
        )
        .expect("codegen failed")
    }

    #[test]
    fn test_scope_members_become_prefixed_statics() {
        let c = transpile(
            r#"
            scope Counter {
                private u32 n;
                public void inc() { this.n <- this.n + 1; }
            }
            "#,
        );
        assert!(c.contains("static uint32_t Counter_n;"), "{}", c);
        assert!(c.contains("static void Counter_inc(void)"), "{}", c);
        assert!(c.contains("Counter_n = (Counter_n + 1);"), "{}", c);
    }

    #[test]
    fn test_mutable_struct_param_lowered_to_pointer() {
        let c = transpile(
            r#"
            struct Point { i32 x; i32 y; }
            Point origin;
            void setX(Point p) { p.x <- 1; }
            void run() { setX(origin); }
            "#,
        );
        assert!(c.contains("void setX(Point *p)"), "{}", c);
        assert!(c.contains("p->x = 1;"), "{}", c);
        assert!(c.contains("setX(&origin);"), "{}", c);
    }

    #[test]
    fn test_const_pointer_for_read_only_struct() {
        let c = transpile(
            r#"
            struct Point { i32 x; i32 y; }
            i32 readX(Point p) { return p.x; }
            "#,
        );
        assert!(c.contains("int32_t readX(const Point *p)"), "{}", c);
        assert!(c.contains("return p->x;"), "{}", c);
    }

    #[test]
    fn test_pointer_param_forwarded_without_address_of() {
        let c = transpile(
            r#"
            struct Point { i32 x; }
            void inner(Point p) { p.x <- 1; }
            void outer(Point q) { inner(q); }
            "#,
        );
        assert!(c.contains("inner(q);"), "{}", c);
    }

    #[test]
    fn test_small_scalar_by_value() {
        let c = transpile(
            r#"
            u32 add_one(u32 v) { return v + 1; }
            "#,
        );
        assert!(c.contains("uint32_t add_one(uint32_t v)"), "{}", c);
        assert!(c.contains("return (v + 1);"), "{}", c);
    }

    #[test]
    fn test_mutated_scalar_becomes_pointer() {
        let c = transpile(
            r#"
            void bump(u32 v) { v <- v + 1; }
            "#,
        );
        assert!(c.contains("void bump(uint32_t *v)"), "{}", c);
        assert!(c.contains("(*v) = ((*v) + 1);"), "{}", c);
    }

    #[test]
    fn test_enum_and_typedef_emission() {
        let c = transpile(
            r#"
            enum Mode { Idle, Run <- 3 }
            Mode current <- Idle;
            "#,
        );
        assert!(c.contains("Mode_Idle = 0,"), "{}", c);
        assert!(c.contains("Mode_Run = 3"), "{}", c);
        assert!(c.contains("} Mode;"), "{}", c);
        assert!(c.contains("Mode current = Mode_Idle;"), "{}", c);
    }

    #[test]
    fn test_clamp_assignment_uses_helper() {
        let c = transpile(
            r#"
            void f(u32 wide) {
                clamp u8 narrow <- 0;
                narrow <- wide;
            }
            "#,
        );
        assert!(c.contains("basalt_clamp_u8"), "{}", c);
        assert!(c.contains("static inline uint8_t basalt_clamp_u8(int64_t v)"), "{}", c);
    }

    #[test]
    fn test_register_macro() {
        let c = transpile(
            r#"
            register CTRL @ 0x40000000 : u32;
            void f() { CTRL <- 1; }
            "#,
        );
        assert!(
            c.contains("#define CTRL (*(volatile uint32_t *)0x40000000UL)"),
            "{}",
            c
        );
        assert!(c.contains("CTRL = 1;"), "{}", c);
    }

    #[test]
    fn test_const_becomes_define_usable_as_dim() {
        let c = transpile(
            r#"
            const u32 SIZE <- 4;
            u8 win[SIZE];
            "#,
        );
        assert!(c.contains("#define SIZE 4"), "{}", c);
        assert!(c.contains("uint8_t win[SIZE];"), "{}", c);
    }

    #[test]
    fn test_bit_write_lowering() {
        let c = transpile(
            r#"
            void f(u32 x) {
                x[3] <- true;
            }
            "#,
        );
        assert!(c.contains("1U << (3)"), "{}", c);
    }

    #[test]
    fn test_critical_section_macros() {
        let c = transpile(
            r#"
            void f() {
                critical { }
            }
            "#,
        );
        assert!(c.contains("BASALT_CRITICAL_ENTER();"), "{}", c);
        assert!(c.contains("BASALT_CRITICAL_EXIT();"), "{}", c);
    }

    #[test]
    fn test_extern_emits_prototype_only() {
        let c = transpile(
            r#"
            extern void hal_init();
            void boot() { hal_init(); }
            "#,
        );
        assert!(c.contains("extern void hal_init(void);"), "{}", c);
        assert!(c.contains("hal_init();"), "{}", c);
        assert!(!c.contains("void hal_init(void) {"), "{}", c);
    }

    #[test]
    fn test_generated_unit_has_prelude() {
        let c = transpile("");
        assert!(c.starts_with("/* Generated by basalt. Do not edit. */"));
        assert!(c.contains("#include <stdint.h>"));
        assert!(c.contains("#include <stdbool.h>"));
    }
}
