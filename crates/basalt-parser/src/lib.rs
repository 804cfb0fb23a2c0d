//! Basalt Parser - Recursive descent parser
//!
//! Parses Basalt source into an AST. Notable points:
//! - `<-` is assignment; `==` is equality
//! - declarations are type-led, so `Point origin;` and `u8 f() { }` are
//!   disambiguated by the token after the name
//! - `x[i]` parses as array indexing and `x[i, w]` as a bit-field view;
//!   the checker re-types the former on integer operands

mod error;
mod includes;
mod parser;

pub use error::*;
pub use includes::dependency_order;
pub use parser::*;

use basalt_ast::{FileId, NodeIdGen, Program, SourceFile};
use basalt_lexer::tokenize;

/// Parse one file's source with an externally supplied node-id generator.
/// Use this when assembling multi-file programs so node ids stay unique.
pub fn parse_file(
    source: &str,
    path: &str,
    file: FileId,
    ids: &mut NodeIdGen,
) -> Result<SourceFile, ParseError> {
    let tokens = tokenize(source, file);
    let mut parser = Parser::new(source, path, file, tokens, ids);
    parser.parse_source_file()
}

/// Parse a single standalone source string into a Program
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let mut ids = NodeIdGen::new();
    let file = parse_file(source, "<input>", FileId(0), &mut ids)?;
    Ok(Program::new(vec![file]))
}

/// Parse a set of `(path, source)` pairs and return a Program with the
/// files in dependency order (every file's includes precede it).
pub fn parse_program(sources: &[(&str, &str)]) -> Result<Program, ParseError> {
    let mut ids = NodeIdGen::new();
    let mut files = Vec::with_capacity(sources.len());
    for (i, (path, source)) in sources.iter().enumerate() {
        files.push(parse_file(source, path, FileId(i as u32), &mut ids)?);
    }

    let order = dependency_order(&files)?;
    let mut slots: Vec<Option<SourceFile>> = files.into_iter().map(Some).collect();
    let ordered = order
        .into_iter()
        .map(|i| slots[i].take().expect("order indices are unique"))
        .collect();
    Ok(Program::new(ordered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_ast::*;

    #[test]
    fn test_parse_empty_source() {
        let program = parse("").unwrap();
        assert_eq!(program.files.len(), 1);
        assert!(program.files[0].declarations.is_empty());
    }

    #[test]
    fn test_parse_global_variable() {
        let program = parse("public const u32 TICKS <- 1000;").unwrap();
        let decl = &program.files[0].declarations[0];
        assert_eq!(decl.visibility, Visibility::Public);
        match &decl.kind {
            DeclarationKind::Variable(v) => {
                assert_eq!(v.name, "TICKS");
                assert!(v.ty.modifiers.is_const);
                assert_eq!(v.ty.kind, TypeKind::U32);
                assert!(v.init.is_some());
            }
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_scope_with_members() {
        let source = r#"
            scope Counter {
                private u32 n;
                public void inc() { this.n <- this.n + 1; }
            }
        "#;
        let program = parse(source).unwrap();
        match &program.files[0].declarations[0].kind {
            DeclarationKind::Scope(s) => {
                assert_eq!(s.name, "Counter");
                assert_eq!(s.members.len(), 2);
                assert_eq!(s.members[0].visibility, Visibility::Private);
            }
            other => panic!("expected scope, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_struct_and_enum() {
        let source = r#"
            struct Point { i32 x; i32 y; }
            enum Mode { Idle, Run <- 3, Halt }
        "#;
        let program = parse(source).unwrap();
        match &program.files[0].declarations[0].kind {
            DeclarationKind::Struct(s) => {
                assert_eq!(s.fields.len(), 2);
                assert_eq!(s.fields[0].name, "x");
            }
            other => panic!("expected struct, got {:?}", other),
        }
        match &program.files[0].declarations[1].kind {
            DeclarationKind::Enum(e) => {
                assert_eq!(e.variants.len(), 3);
                assert_eq!(e.variants[1].value, Some(3));
                assert_eq!(e.variants[2].value, None);
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bitmap_and_register() {
        let source = r#"
            bitmap Status : u8 { ready: 0; err: 1; code: 2, 3; }
            register CTRL @ 0x40000000 : u32;
        "#;
        let program = parse(source).unwrap();
        match &program.files[0].declarations[0].kind {
            DeclarationKind::Bitmap(b) => {
                assert_eq!(b.fields.len(), 3);
                assert_eq!(b.fields[0].width, 1);
                assert_eq!(b.fields[2].offset, 2);
                assert_eq!(b.fields[2].width, 3);
            }
            other => panic!("expected bitmap, got {:?}", other),
        }
        match &program.files[0].declarations[1].kind {
            DeclarationKind::Register(r) => {
                assert_eq!(r.address, 0x4000_0000);
            }
            other => panic!("expected register, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_with_params() {
        let source = "void setX(Point p, u8 v) { p.x <- v; }";
        let program = parse(source).unwrap();
        match &program.files[0].declarations[0].kind {
            DeclarationKind::Function(f) => {
                assert_eq!(f.name, "setX");
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.params[0].ty.kind, TypeKind::Named("Point".into()));
                assert!(f.body.is_some());
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_extern_forward_declaration() {
        let program = parse("extern void hal_init();").unwrap();
        match &program.files[0].declarations[0].kind {
            DeclarationKind::Function(f) => {
                assert!(f.is_extern);
                assert!(f.body.is_none());
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_array_declaration() {
        let program = parse("u8 buf[16]; u8 win[SIZE];").unwrap();
        match &program.files[0].declarations[0].kind {
            DeclarationKind::Variable(v) => {
                assert_eq!(v.ty.dims, vec![ArrayLen::Literal(16)]);
            }
            other => panic!("expected variable, got {:?}", other),
        }
        match &program.files[0].declarations[1].kind {
            DeclarationKind::Variable(v) => {
                assert_eq!(v.ty.dims, vec![ArrayLen::Named("SIZE".into())]);
            }
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_qualified_accesses() {
        let source = r#"
            void f() {
                this.n <- global.m + Counter.n;
            }
        "#;
        let program = parse(source).unwrap();
        let func = match &program.files[0].declarations[0].kind {
            DeclarationKind::Function(f) => f,
            other => panic!("expected function, got {:?}", other),
        };
        let body = func.body.as_ref().unwrap();
        match &body.statements[0].kind {
            StatementKind::Assign { target, .. } => match &target.kind {
                ExprKind::Member { qualifier, path } => {
                    assert_eq!(*qualifier, Qualifier::This);
                    assert_eq!(path, &vec!["n".to_string()]);
                }
                other => panic!("expected member, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bit_access_forms() {
        let source = "void f(u32 x) { x[3] <- true; x[4, 8] <- 15; }";
        let program = parse(source).unwrap();
        let func = match &program.files[0].declarations[0].kind {
            DeclarationKind::Function(f) => f,
            _ => unreachable!(),
        };
        let body = func.body.as_ref().unwrap();
        match &body.statements[0].kind {
            StatementKind::Assign { target, .. } => {
                assert!(matches!(target.kind, ExprKind::ArrayIndex { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
        match &body.statements[1].kind {
            StatementKind::Assign { target, .. } => {
                assert!(matches!(target.kind, ExprKind::BitAccess { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_control_flow() {
        let source = r#"
            u8 f(u8 x) {
                for (u8 i <- 0; i < 10; i +<- 1) {
                    if (x == 0) { return 0; } else { x -<- 1; }
                }
                while (x > 0) { x -<- 1; }
                switch (x) {
                    case 1 { return 1; }
                    default { return 2; }
                }
                critical { x <- 0; }
                return x;
            }
        "#;
        let program = parse(source).unwrap();
        let func = match &program.files[0].declarations[0].kind {
            DeclarationKind::Function(f) => f,
            _ => unreachable!(),
        };
        assert_eq!(func.body.as_ref().unwrap().statements.len(), 5);
    }

    #[test]
    fn test_parse_ternary_and_precedence() {
        let source = "u8 f(u8 a, u8 b) { return a + b * 2 > 4 ? a : b; }";
        let program = parse(source).unwrap();
        let func = match &program.files[0].declarations[0].kind {
            DeclarationKind::Function(f) => f,
            _ => unreachable!(),
        };
        match &func.body.as_ref().unwrap().statements[0].kind {
            StatementKind::Return(Some(expr)) => {
                assert!(matches!(expr.kind, ExprKind::Ternary { .. }));
            }
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_call_statement_and_expression() {
        let source = r#"
            void g() {
                setX(origin);
                u8 v <- global.Counter.get() + 1;
            }
        "#;
        let program = parse(source).unwrap();
        let func = match &program.files[0].declarations[0].kind {
            DeclarationKind::Function(f) => f,
            _ => unreachable!(),
        };
        let body = func.body.as_ref().unwrap();
        match &body.statements[0].kind {
            StatementKind::Expr(e) => match &e.kind {
                ExprKind::Call(call) => {
                    assert_eq!(call.callee.name(), "setX");
                    assert_eq!(call.args.len(), 1);
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_node_ids_unique_across_files() {
        let program = parse_program(&[
            ("a.blt", "u8 x <- 1;"),
            ("b.blt", "include \"a.blt\";\nu8 y <- 2;"),
        ])
        .unwrap();

        let mut ids = Vec::new();
        for file in &program.files {
            for decl in &file.declarations {
                if let DeclarationKind::Variable(v) = &decl.kind {
                    if let Some(init) = &v.init {
                        ids.push(init.id);
                    }
                }
            }
        }
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_parse_program_orders_files() {
        let program = parse_program(&[
            ("main.blt", "include \"hal.blt\";\nu8 x <- 1;"),
            ("hal.blt", "u8 base <- 0;"),
        ])
        .unwrap();
        assert_eq!(program.files[0].path, "hal.blt");
        assert_eq!(program.files[1].path, "main.blt");
    }

    #[test]
    fn test_parse_error_has_location() {
        let err = parse("scope {").unwrap_err();
        let span = err.span();
        assert_eq!(span.line, 1);
        assert!(span.column > 1);
    }
}
