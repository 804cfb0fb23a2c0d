//! Combined reference resolution and type checking
//!
//! One walk per function body resolves every identifier against the
//! symbol table under the scope-qualification rules, computes every
//! expression's type, and enforces the static type rules (narrowing,
//! bit ranges, constant division). Resolution errors are batched so a run
//! reports all of them before aborting.

use crate::{
    consteval, Binding, CheckError, Diagnostic, LocalScope, Resolution, ResolvedReferences,
};
use basalt_ast::*;
use basalt_symbols::{
    ArrayDim, BaseKind, Symbol, SymbolId, SymbolKind, SymbolTable, TypeDescriptor,
};
use std::collections::HashMap;

/// Everything the later phases need from the check pass
#[derive(Debug, Default)]
pub struct CheckResult {
    /// AST node identity to resolved target, for every reference
    pub references: ResolvedReferences,
    /// Computed type of every well-typed expression
    pub expr_types: HashMap<NodeId, TypeDescriptor>,
    /// Ordered non-fatal advisories
    pub diagnostics: Vec<Diagnostic>,
}

/// Check a program against its symbol table
pub fn check(program: &Program, table: &SymbolTable) -> Result<CheckResult, Vec<CheckError>> {
    Checker::new(table).run(program)
}

pub struct Checker<'a> {
    table: &'a SymbolTable,
    refs: ResolvedReferences,
    expr_types: HashMap<NodeId, TypeDescriptor>,
    errors: Vec<CheckError>,
    diagnostics: Vec<Diagnostic>,
    locals: LocalScope,
    current_function: Option<SymbolId>,
    current_scope: Option<String>,
    current_file: FileId,
}

impl<'a> Checker<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self {
            table,
            refs: ResolvedReferences::new(),
            expr_types: HashMap::new(),
            errors: Vec::new(),
            diagnostics: Vec::new(),
            locals: LocalScope::new(),
            current_function: None,
            current_scope: None,
            current_file: FileId::dummy(),
        }
    }

    /// Walk the whole program and produce the check result, or every
    /// collected error
    pub fn run(mut self, program: &Program) -> Result<CheckResult, Vec<CheckError>> {
        for file in &program.files {
            self.current_file = file.file;
            for decl in &file.declarations {
                self.check_declaration(decl, None);
            }
        }

        if self.errors.is_empty() {
            Ok(CheckResult {
                references: self.refs,
                expr_types: self.expr_types,
                diagnostics: self.diagnostics,
            })
        } else {
            Err(self.errors)
        }
    }

    fn check_declaration(&mut self, decl: &Declaration, scope: Option<&str>) {
        match &decl.kind {
            DeclarationKind::Scope(s) => {
                if scope.is_none() {
                    for member in &s.members {
                        self.check_declaration(member, Some(&s.name));
                    }
                }
            }
            DeclarationKind::Function(f) => {
                if f.body.is_some() {
                    self.check_function(f, scope);
                }
            }
            DeclarationKind::Variable(v) => self.check_variable_init(v, scope),
            _ => {}
        }
    }

    fn check_variable_init(&mut self, v: &VarDecl, scope: Option<&str>) {
        let Some(init) = &v.init else { return };
        let qname = qualify(scope, &v.name);
        let Some(ty) = self
            .table
            .get_by_name(&qname)
            .and_then(Symbol::as_variable)
            .map(|d| d.ty.clone())
        else {
            return;
        };

        self.current_scope = scope.map(str::to_string);
        if let Some(found) = self.check_expr(init, Some(&ty)) {
            self.check_assign_compat(&ty, &found, Some(init), init.span);
        }
        self.current_scope = None;
    }

    fn check_function(&mut self, f: &FunctionDecl, scope: Option<&str>) {
        let qname = qualify(scope, &f.name);
        let table = self.table;
        let Some(sym) = table.get_by_name(&qname) else {
            return;
        };
        let Some(data) = sym.as_function() else { return };

        let params: Vec<(String, TypeDescriptor)> = data
            .params
            .iter()
            .map(|p| (p.name.clone(), p.ty.clone()))
            .collect();
        let return_type = data.return_type.clone();
        let id = sym.id;

        self.current_function = Some(id);
        self.current_scope = scope.map(str::to_string);
        self.locals.clear();
        self.locals.enter();
        for (index, (name, ty)) in params.into_iter().enumerate() {
            self.locals.bind(name, Binding::Param { index, ty });
        }

        if let Some(body) = &f.body {
            self.check_block(body, &return_type);
        }

        self.locals.exit();
        self.current_function = None;
        self.current_scope = None;
    }

    fn check_block(&mut self, block: &Block, return_type: &TypeDescriptor) {
        self.locals.enter();
        for stmt in &block.statements {
            self.check_statement(stmt, return_type);
        }
        self.locals.exit();
    }

    fn check_statement(&mut self, stmt: &Statement, return_type: &TypeDescriptor) {
        match &stmt.kind {
            StatementKind::Local(decl) => {
                match self.resolve_local_type(&decl.ty) {
                    Some(ty) => {
                        if let Some(init) = &decl.init {
                            if let Some(found) = self.check_expr(init, Some(&ty)) {
                                self.check_assign_compat(&ty, &found, Some(init), init.span);
                            }
                        }
                        self.locals.bind(decl.name.clone(), Binding::Local { ty });
                    }
                    None => {
                        // Keep scanning the initializer for more errors
                        if let Some(init) = &decl.init {
                            self.check_expr(init, None);
                        }
                    }
                }
            }

            StatementKind::Assign { target, op, value } => {
                self.check_assign(target, *op, value);
            }

            StatementKind::Expr(expr) => {
                let is_call = matches!(expr.kind, ExprKind::Call(_));
                self.check_expr(expr, None);
                if !is_call {
                    self.diagnostics.push(Diagnostic::warning(
                        "A-STMT-001",
                        "expression statement has no effect",
                        stmt.span,
                    ));
                }
            }

            StatementKind::Return(value) => {
                let returns_void = return_type.base == BaseKind::Void;
                match (value, returns_void) {
                    (None, true) => {}
                    (Some(v), false) => {
                        if let Some(found) = self.check_expr(v, Some(return_type)) {
                            self.check_assign_compat(return_type, &found, Some(v), v.span);
                        }
                    }
                    (Some(v), true) => {
                        self.check_expr(v, None);
                        self.errors.push(CheckError::TypeMismatch {
                            expected: "void".into(),
                            found: "a return value".into(),
                            span: v.span,
                        });
                    }
                    (None, false) => {
                        self.errors.push(CheckError::TypeMismatch {
                            expected: return_type.display(),
                            found: "void".into(),
                            span: stmt.span,
                        });
                    }
                }
            }

            StatementKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.expect_bool(condition);
                self.check_block(then_block, return_type);
                if let Some(else_block) = else_block {
                    self.check_block(else_block, return_type);
                }
            }

            StatementKind::While { condition, body } => {
                self.expect_bool(condition);
                self.check_block(body, return_type);
            }

            StatementKind::For {
                init,
                condition,
                step,
                body,
            } => {
                self.locals.enter();
                if let Some(init) = init {
                    self.check_statement(init, return_type);
                }
                if let Some(condition) = condition {
                    self.expect_bool(condition);
                }
                if let Some(step) = step {
                    self.check_statement(step, return_type);
                }
                self.check_block(body, return_type);
                self.locals.exit();
            }

            StatementKind::Switch {
                scrutinee,
                cases,
                default_block,
            } => {
                let scrutinee_ty = self.check_expr(scrutinee, None);
                for case in cases {
                    let value_ty = self.check_expr(&case.value, scrutinee_ty.as_ref());
                    if let (Some(s), Some(v)) = (&scrutinee_ty, &value_ty) {
                        self.expect_comparable(s, v, case.value.span);
                    }
                    self.check_block(&case.body, return_type);
                }
                if let Some(default_block) = default_block {
                    self.check_block(default_block, return_type);
                }
            }

            StatementKind::Critical(block) => self.check_block(block, return_type),
        }
    }

    fn check_assign(&mut self, target: &Expr, op: AssignOp, value: &Expr) {
        let target_ty = self.check_expr(target, None);
        self.check_lvalue(target);
        let value_ty = self.check_expr(value, target_ty.as_ref());

        let (Some(target_ty), Some(value_ty)) = (target_ty, value_ty) else {
            return;
        };

        match op.to_binary() {
            None => self.check_assign_compat(&target_ty, &value_ty, Some(value), value.span),
            Some(bin) => {
                if matches!(bin, BinaryOp::Div | BinaryOp::Rem)
                    && target_ty.is_integer_like()
                    && consteval::eval_int(self.table, &self.refs, value) == Some(0)
                {
                    self.errors
                        .push(CheckError::DivisionByConstZero { span: value.span });
                }
                if let Some(result) = self.binary_result(bin, &target_ty, &value_ty, value.span) {
                    self.check_assign_compat(&target_ty, &result, None, value.span);
                }
            }
        }
    }

    /// Reject writes through non-places and const bindings. Mutation is
    /// whole-object, so only the access root matters.
    fn check_lvalue(&mut self, target: &Expr) {
        let root = target.access_root();
        match &root.kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } => {
                let name = root_name(root);
                match self.refs.get(root.id) {
                    Some(Resolution::Symbol(id)) => {
                        if let Some(var) = self.table.get(*id).and_then(Symbol::as_variable) {
                            if var.ty.modifiers.is_const {
                                self.errors.push(CheckError::WriteToConst {
                                    name,
                                    span: root.span,
                                });
                            }
                        }
                    }
                    Some(Resolution::Param { .. }) | Some(Resolution::Local { .. }) => {
                        if let Some(binding) = self.locals.lookup(&name) {
                            if binding.ty().modifiers.is_const {
                                self.errors.push(CheckError::WriteToConst {
                                    name,
                                    span: root.span,
                                });
                            }
                        }
                    }
                    Some(Resolution::EnumVariant { .. }) => {
                        self.errors.push(CheckError::TypeMismatch {
                            expected: "an assignable place".into(),
                            found: "an enum member".into(),
                            span: root.span,
                        });
                    }
                    None => {} // resolution already failed and was reported
                }
            }
            _ => {
                self.errors.push(CheckError::TypeMismatch {
                    expected: "an assignable place".into(),
                    found: "an expression".into(),
                    span: root.span,
                });
            }
        }
    }

    // === Expressions ===

    fn check_expr(&mut self, expr: &Expr, expected: Option<&TypeDescriptor>) -> Option<TypeDescriptor> {
        let ty = match &expr.kind {
            ExprKind::Int(v) => Some(self.int_literal_type(*v, expected)),
            ExprKind::Float(_) => Some(match expected {
                Some(e) if e.is_float() => TypeDescriptor::scalar(e.base),
                _ => TypeDescriptor::scalar(BaseKind::F64),
            }),
            ExprKind::Bool(_) => Some(TypeDescriptor::bool_()),
            ExprKind::Str(s) => Some(TypeDescriptor::scalar(BaseKind::Str(s.len() as u32))),

            ExprKind::Ident(name) => self.check_ident(expr, name, expected),
            ExprKind::Member { qualifier, path } => self.check_member(expr, qualifier, path),

            ExprKind::ArrayIndex { base, index } => self.check_array_index(base, index, expr.span),
            ExprKind::BitAccess {
                base,
                offset,
                width,
            } => self.check_bit_access(base, offset, width, expr.span),

            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, expr.span),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand, expr.span),

            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expect_bool(condition);
                let then_ty = self.check_expr(then_expr, expected);
                let else_ty = self.check_expr(else_expr, expected.or(then_ty.as_ref()));
                match (then_ty, else_ty) {
                    (Some(t), Some(e)) => {
                        self.expect_comparable(&t, &e, expr.span);
                        Some(t)
                    }
                    (t, e) => t.or(e),
                }
            }

            ExprKind::Call(call) => self.check_call(expr, call),
        };

        if let Some(t) = &ty {
            self.expr_types.insert(expr.id, t.clone());
        }
        ty
    }

    /// An integer literal takes the expected integer type when one is in
    /// play; range enforcement happens at the assignment-compat step where
    /// the literal value is still visible.
    fn int_literal_type(&self, value: i128, expected: Option<&TypeDescriptor>) -> TypeDescriptor {
        if let Some(e) = expected {
            if e.is_integer_like() {
                let mut ty = TypeDescriptor::scalar(e.base);
                ty.bit_width = e.bit_width;
                ty.signed = e.signed;
                return ty;
            }
        }
        if i32::try_from(value).is_ok() {
            TypeDescriptor::scalar(BaseKind::I32)
        } else if i64::try_from(value).is_ok() {
            TypeDescriptor::scalar(BaseKind::I64)
        } else {
            TypeDescriptor::scalar(BaseKind::U64)
        }
    }

    fn check_ident(
        &mut self,
        expr: &Expr,
        name: &str,
        expected: Option<&TypeDescriptor>,
    ) -> Option<TypeDescriptor> {
        // 1. Function-local bindings always resolve
        if let Some(binding) = self.locals.lookup(name) {
            let (resolution, ty) = match binding {
                Binding::Param { index, ty } => (
                    Resolution::Param {
                        function: self.current_function.expect("params exist inside functions"),
                        index: *index,
                    },
                    ty.clone(),
                ),
                Binding::Local { ty } => (
                    Resolution::Local {
                        function: self.current_function.expect("locals exist inside functions"),
                        name: name.to_string(),
                    },
                    ty.clone(),
                ),
            };
            self.refs.record(expr.id, resolution);
            return Some(ty);
        }

        // 2. An expected enum type resolves a bare variant name
        if let Some(expected) = expected {
            if let BaseKind::Enum(enum_id) = expected.base {
                if let Some(variant) = self.enum_variant_index(enum_id, name) {
                    self.refs
                        .record(expr.id, Resolution::EnumVariant { enum_id, variant });
                    return Some(TypeDescriptor::scalar(BaseKind::Enum(enum_id)));
                }
            }
        }

        // 3. Inside a scope body, everything else must be qualified
        if let Some(scope) = self.current_scope.clone() {
            self.report_bare_identifier(&scope, name, expr.span);
            return None;
        }

        // 4. Top-level namespace
        let table = self.table;
        if let Some(sym) = table.get_by_name(name) {
            self.check_file_visibility(sym, expr.span);
            self.refs.record(expr.id, Resolution::Symbol(sym.id));
            return self.symbol_value_type(sym, expr.span);
        }

        // 5. Bare enum member with no determining context
        let candidates: Vec<String> = table
            .enums()
            .filter(|e| {
                e.as_enum()
                    .map(|d| d.variants.iter().any(|v| v.name == name))
                    .unwrap_or(false)
            })
            .map(|e| format!("{}.{}", e.qualified_name, name))
            .collect();
        if !candidates.is_empty() {
            self.diagnostics.push(
                Diagnostic::hint(
                    "A-REF-002",
                    format!(
                        "this reference would resolve if written as `{}`",
                        candidates[0]
                    ),
                    expr.span,
                )
                .with_suggestion(candidates[0].clone()),
            );
            self.errors.push(CheckError::AmbiguousEnumMember {
                name: name.to_string(),
                candidates,
                span: expr.span,
            });
            return None;
        }

        self.errors.push(CheckError::UnknownMember {
            name: name.to_string(),
            span: expr.span,
        });
        None
    }

    fn report_bare_identifier(&mut self, scope: &str, name: &str, span: Span) {
        let qualified = format!("{}_{}", scope, name);
        let suggestion = if self.table.contains(&qualified) {
            Some(format!("this.{}", name))
        } else if self.table.contains(name) {
            Some(format!("global.{}", name))
        } else {
            None
        };
        if let Some(s) = suggestion {
            self.diagnostics.push(
                Diagnostic::hint(
                    "A-REF-001",
                    format!("this reference would resolve if written as `{}`", s),
                    span,
                )
                .with_suggestion(s),
            );
        }
        self.errors.push(CheckError::BareIdentifier {
            name: name.to_string(),
            span,
        });
    }

    fn check_member(
        &mut self,
        expr: &Expr,
        qualifier: &Qualifier,
        path: &[String],
    ) -> Option<TypeDescriptor> {
        let table = self.table;
        match qualifier {
            Qualifier::This => {
                let Some(scope) = self.current_scope.clone() else {
                    self.errors
                        .push(CheckError::ThisOutsideScope { span: expr.span });
                    return None;
                };
                let qualified = format!("{}_{}", scope, path[0]);
                let Some(sym) = table.get_by_name(&qualified) else {
                    self.errors.push(CheckError::UnknownMember {
                        name: qualified,
                        span: expr.span,
                    });
                    return None;
                };
                self.refs.record(expr.id, Resolution::Symbol(sym.id));
                let base = self.symbol_value_type(sym, expr.span)?;
                self.project_fields(base, &path[1..], expr.span)
            }

            Qualifier::Global => {
                let Some(sym) = table.get_by_name(&path[0]) else {
                    self.errors.push(CheckError::UnknownMember {
                        name: path[0].clone(),
                        span: expr.span,
                    });
                    return None;
                };
                match sym.kind {
                    // `global.Scope.member` chains through the scope
                    SymbolKind::Scope if path.len() >= 2 => {
                        let qualified = format!("{}_{}", path[0], path[1]);
                        let Some(member) = table.get_by_name(&qualified) else {
                            self.errors.push(CheckError::UnknownMember {
                                name: qualified,
                                span: expr.span,
                            });
                            return None;
                        };
                        self.check_scope_member_visibility(member, &path[0], expr.span);
                        self.refs.record(expr.id, Resolution::Symbol(member.id));
                        let base = self.symbol_value_type(member, expr.span)?;
                        self.project_fields(base, &path[2..], expr.span)
                    }
                    SymbolKind::Enum if path.len() == 2 => {
                        self.resolve_enum_variant(expr, sym, &path[1])
                    }
                    _ => {
                        self.check_file_visibility(sym, expr.span);
                        self.refs.record(expr.id, Resolution::Symbol(sym.id));
                        let base = self.symbol_value_type(sym, expr.span)?;
                        self.project_fields(base, &path[1..], expr.span)
                    }
                }
            }

            Qualifier::Name(q) => {
                // A local or parameter root is a struct field chain
                if let Some(binding) = self.locals.lookup(q) {
                    let (resolution, base) = match binding {
                        Binding::Param { index, ty } => (
                            Resolution::Param {
                                function: self
                                    .current_function
                                    .expect("params exist inside functions"),
                                index: *index,
                            },
                            ty.clone(),
                        ),
                        Binding::Local { ty } => (
                            Resolution::Local {
                                function: self
                                    .current_function
                                    .expect("locals exist inside functions"),
                                name: q.clone(),
                            },
                            ty.clone(),
                        ),
                    };
                    self.refs.record(expr.id, resolution);
                    return self.project_fields(base, path, expr.span);
                }

                // Naming the enclosing scope is rejected outright
                if self.current_scope.as_deref() == Some(q.as_str()) {
                    self.errors.push(CheckError::SelfScopeReference {
                        scope: q.clone(),
                        member: path[0].clone(),
                        span: expr.span,
                    });
                    return None;
                }

                let Some(sym) = table.get_by_name(q) else {
                    self.errors.push(CheckError::UnknownMember {
                        name: q.clone(),
                        span: expr.span,
                    });
                    return None;
                };

                match sym.kind {
                    SymbolKind::Scope => {
                        let qualified = format!("{}_{}", q, path[0]);
                        let Some(member) = table.get_by_name(&qualified) else {
                            self.errors.push(CheckError::UnknownMember {
                                name: qualified,
                                span: expr.span,
                            });
                            return None;
                        };
                        self.check_scope_member_visibility(member, q, expr.span);
                        self.refs.record(expr.id, Resolution::Symbol(member.id));
                        let base = self.symbol_value_type(member, expr.span)?;
                        self.project_fields(base, &path[1..], expr.span)
                    }
                    SymbolKind::Enum => {
                        if path.len() == 1 {
                            self.resolve_enum_variant(expr, sym, &path[0])
                        } else {
                            self.errors.push(CheckError::UnknownMember {
                                name: path[1].clone(),
                                span: expr.span,
                            });
                            None
                        }
                    }
                    SymbolKind::Variable | SymbolKind::Register => {
                        // A global-variable root inside a scope body needs
                        // the `global.` prefix like any bare identifier
                        if let Some(scope) = self.current_scope.clone() {
                            self.report_bare_identifier(&scope, q, expr.span);
                            return None;
                        }
                        self.check_file_visibility(sym, expr.span);
                        self.refs.record(expr.id, Resolution::Symbol(sym.id));
                        let base = self.symbol_value_type(sym, expr.span)?;
                        self.project_fields(base, path, expr.span)
                    }
                    _ => {
                        self.errors.push(CheckError::TypeMismatch {
                            expected: "a value".into(),
                            found: format!("`{}`", q),
                            span: expr.span,
                        });
                        None
                    }
                }
            }
        }
    }

    fn resolve_enum_variant(
        &mut self,
        expr: &Expr,
        enum_sym: &Symbol,
        variant_name: &str,
    ) -> Option<TypeDescriptor> {
        match self.enum_variant_index(enum_sym.id, variant_name) {
            Some(variant) => {
                self.refs.record(
                    expr.id,
                    Resolution::EnumVariant {
                        enum_id: enum_sym.id,
                        variant,
                    },
                );
                Some(TypeDescriptor::scalar(BaseKind::Enum(enum_sym.id)))
            }
            None => {
                self.errors.push(CheckError::UnknownMember {
                    name: format!("{}.{}", enum_sym.qualified_name, variant_name),
                    span: expr.span,
                });
                None
            }
        }
    }

    fn enum_variant_index(&self, enum_id: SymbolId, name: &str) -> Option<usize> {
        self.table
            .get(enum_id)
            .and_then(Symbol::as_enum)
            .and_then(|d| d.variants.iter().position(|v| v.name == name))
    }

    fn check_array_index(
        &mut self,
        base: &Expr,
        index: &Expr,
        span: Span,
    ) -> Option<TypeDescriptor> {
        let base_ty = self.check_expr(base, None);
        let index_ty = self.check_expr(index, None);
        if let Some(t) = &index_ty {
            if !t.is_integer_like() {
                self.errors.push(CheckError::TypeMismatch {
                    expected: "an integer index".into(),
                    found: t.display(),
                    span: index.span,
                });
            }
        }
        let base_ty = base_ty?;

        if base_ty.is_array() {
            if let (ArrayDim::Literal(len), Some(value)) = (
                base_ty.dims[0],
                consteval::eval_int(self.table, &self.refs, index),
            ) {
                if value < 0 || value >= i128::from(len) {
                    self.diagnostics.push(Diagnostic::warning(
                        "A-IDX-001",
                        format!("index {} is out of bounds for length {}", value, len),
                        index.span,
                    ));
                }
            }
            let mut elem = base_ty;
            elem.dims.remove(0);
            return Some(elem);
        }

        if base_ty.is_integer_like() {
            // Single-subscript on an integer is a one-bit view
            let limit = base_ty.bit_width;
            if let Some(offset) = consteval::eval_int(self.table, &self.refs, index) {
                if offset < 0 || offset >= i128::from(limit) {
                    self.errors.push(CheckError::BitRangeOverflow {
                        offset,
                        width: 1,
                        limit,
                        span,
                    });
                    return None;
                }
            }
            return Some(TypeDescriptor::bool_());
        }

        self.errors.push(CheckError::TypeMismatch {
            expected: "an array or integer".into(),
            found: base_ty.display(),
            span,
        });
        None
    }

    fn check_bit_access(
        &mut self,
        base: &Expr,
        offset: &Expr,
        width: &Expr,
        span: Span,
    ) -> Option<TypeDescriptor> {
        let base_ty = self.check_expr(base, None);
        self.check_expr(offset, None);
        self.check_expr(width, None);
        let base_ty = base_ty?;

        if !base_ty.is_integer_like() {
            self.errors.push(CheckError::TypeMismatch {
                expected: "an integer operand".into(),
                found: base_ty.display(),
                span,
            });
            return None;
        }

        let limit = base_ty.bit_width;
        let offset_value = consteval::eval_int(self.table, &self.refs, offset);
        let width_value = consteval::eval_int(self.table, &self.refs, width);

        // Only statically provable violations are flagged
        let out_of_range = match (offset_value, width_value) {
            (Some(i), Some(w)) => i < 0 || w <= 0 || i + w > i128::from(limit),
            (Some(i), None) => i < 0 || i >= i128::from(limit),
            (None, Some(w)) => w <= 0 || w > i128::from(limit),
            (None, None) => false,
        };
        if out_of_range {
            self.errors.push(CheckError::BitRangeOverflow {
                offset: offset_value.unwrap_or(0),
                width: width_value.unwrap_or(1),
                limit,
                span,
            });
            return None;
        }

        Some(unsigned_of_width(limit))
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        span: Span,
    ) -> Option<TypeDescriptor> {
        let lhs_ty = self.check_expr(lhs, None);
        // Comparing against an enum gives the right-hand side its context
        let rhs_expected = lhs_ty.as_ref().filter(|t| t.is_enum() && op.is_comparison());
        let rhs_ty = self.check_expr(rhs, rhs_expected);
        let (lhs_ty, rhs_ty) = (lhs_ty?, rhs_ty?);

        if op.is_logical() {
            for (t, e) in [(&lhs_ty, lhs), (&rhs_ty, rhs)] {
                if !t.is_bool() {
                    self.errors.push(CheckError::TypeMismatch {
                        expected: "bool".into(),
                        found: t.display(),
                        span: e.span,
                    });
                }
            }
            return Some(TypeDescriptor::bool_());
        }

        if op.is_comparison() {
            self.expect_comparable(&lhs_ty, &rhs_ty, span);
            return Some(TypeDescriptor::bool_());
        }

        if matches!(op, BinaryOp::Div | BinaryOp::Rem)
            && rhs_ty.is_integer_like()
            && consteval::eval_int(self.table, &self.refs, rhs) == Some(0)
        {
            // Integer division by a provable zero. The float case is legal
            // and yields infinity/NaN at runtime.
            self.errors.push(CheckError::DivisionByConstZero { span });
            return None;
        }

        self.binary_result(op, &lhs_ty, &rhs_ty, span)
    }

    fn binary_result(
        &mut self,
        op: BinaryOp,
        lhs: &TypeDescriptor,
        rhs: &TypeDescriptor,
        span: Span,
    ) -> Option<TypeDescriptor> {
        let bitwise = matches!(
            op,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
        );
        if bitwise {
            if !lhs.is_integer_like() || !rhs.is_integer_like() {
                self.errors.push(CheckError::TypeMismatch {
                    expected: "integer operands".into(),
                    found: format!("{} and {}", lhs.display(), rhs.display()),
                    span,
                });
                return None;
            }
        } else if !lhs.is_numeric() || !rhs.is_numeric() {
            self.errors.push(CheckError::TypeMismatch {
                expected: "numeric operands".into(),
                found: format!("{} and {}", lhs.display(), rhs.display()),
                span,
            });
            return None;
        } else if matches!(op, BinaryOp::Rem) && (lhs.is_float() || rhs.is_float()) {
            self.errors.push(CheckError::TypeMismatch {
                expected: "integer operands".into(),
                found: format!("{} and {}", lhs.display(), rhs.display()),
                span,
            });
            return None;
        }

        Some(promote(lhs, rhs))
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> Option<TypeDescriptor> {
        let ty = self.check_expr(operand, None)?;
        match op {
            UnaryOp::Not => {
                if !ty.is_bool() {
                    self.errors.push(CheckError::TypeMismatch {
                        expected: "bool".into(),
                        found: ty.display(),
                        span,
                    });
                    return None;
                }
                Some(TypeDescriptor::bool_())
            }
            UnaryOp::Neg => {
                if !ty.is_numeric() {
                    self.errors.push(CheckError::TypeMismatch {
                        expected: "a numeric operand".into(),
                        found: ty.display(),
                        span,
                    });
                    return None;
                }
                Some(ty)
            }
            UnaryOp::BitNot => {
                if !ty.is_integer_like() {
                    self.errors.push(CheckError::TypeMismatch {
                        expected: "an integer operand".into(),
                        found: ty.display(),
                        span,
                    });
                    return None;
                }
                Some(ty)
            }
        }
    }

    fn check_call(&mut self, expr: &Expr, call: &CallExpr) -> Option<TypeDescriptor> {
        let fn_id = self.resolve_callee(&call.callee)?;
        let table = self.table;
        let sym = table.get(fn_id)?;
        let Some(data) = sym.as_function() else {
            self.errors.push(CheckError::NotCallable {
                name: sym.qualified_name.clone(),
                span: call.callee.span,
            });
            return None;
        };

        self.refs.record(expr.id, Resolution::Symbol(fn_id));

        let name = sym.qualified_name.clone();
        let params: Vec<TypeDescriptor> = data.params.iter().map(|p| p.ty.clone()).collect();
        let return_type = data.return_type.clone();

        if call.args.len() != params.len() {
            self.errors.push(CheckError::ArityMismatch {
                name,
                expected: params.len(),
                found: call.args.len(),
                span: expr.span,
            });
        }

        for (arg, param_ty) in call.args.iter().zip(params.iter()) {
            if let Some(found) = self.check_expr(arg, Some(param_ty)) {
                self.check_assign_compat(param_ty, &found, Some(arg), arg.span);
            }
        }
        for arg in call.args.iter().skip(params.len()) {
            self.check_expr(arg, None);
        }

        Some(return_type)
    }

    fn resolve_callee(&mut self, callee: &Callee) -> Option<SymbolId> {
        let table = self.table;
        let span = callee.span;

        let lookup_function = |this: &mut Self, qualified: &str| -> Option<SymbolId> {
            match table.get_by_name(qualified) {
                Some(sym) if sym.kind == SymbolKind::Function => Some(sym.id),
                Some(_) => {
                    this.errors.push(CheckError::NotCallable {
                        name: qualified.to_string(),
                        span,
                    });
                    None
                }
                None => {
                    this.errors.push(CheckError::UnknownMember {
                        name: qualified.to_string(),
                        span,
                    });
                    None
                }
            }
        };

        match &callee.qualifier {
            None => {
                let name = &callee.path[0];
                if let Some(scope) = self.current_scope.clone() {
                    self.report_bare_identifier(&scope, name, span);
                    return None;
                }
                let id = lookup_function(self, name)?;
                let sym = table.get(id)?;
                self.check_file_visibility(sym, span);
                Some(id)
            }

            Some(Qualifier::This) => {
                let Some(scope) = self.current_scope.clone() else {
                    self.errors.push(CheckError::ThisOutsideScope { span });
                    return None;
                };
                lookup_function(self, &format!("{}_{}", scope, callee.path[0]))
            }

            Some(Qualifier::Global) => match callee.path.len() {
                1 => lookup_function(self, &callee.path[0]),
                2 => {
                    let Some(scope_sym) = table.get_by_name(&callee.path[0]) else {
                        self.errors.push(CheckError::UnknownMember {
                            name: callee.path[0].clone(),
                            span,
                        });
                        return None;
                    };
                    if scope_sym.kind != SymbolKind::Scope {
                        self.errors.push(CheckError::NotCallable {
                            name: callee.path.join("."),
                            span,
                        });
                        return None;
                    }
                    let qualified = format!("{}_{}", callee.path[0], callee.path[1]);
                    let id = lookup_function(self, &qualified)?;
                    let member = table.get(id)?;
                    self.check_scope_member_visibility(member, &callee.path[0], span);
                    Some(id)
                }
                _ => {
                    self.errors.push(CheckError::UnknownMember {
                        name: callee.path.join("."),
                        span,
                    });
                    None
                }
            },

            Some(Qualifier::Name(q)) => {
                if self.current_scope.as_deref() == Some(q.as_str()) {
                    self.errors.push(CheckError::SelfScopeReference {
                        scope: q.clone(),
                        member: callee.path[0].clone(),
                        span,
                    });
                    return None;
                }
                let Some(sym) = table.get_by_name(q) else {
                    self.errors.push(CheckError::UnknownMember {
                        name: q.clone(),
                        span,
                    });
                    return None;
                };
                if sym.kind != SymbolKind::Scope {
                    self.errors.push(CheckError::NotCallable {
                        name: format!("{}.{}", q, callee.path[0]),
                        span,
                    });
                    return None;
                }
                let qualified = format!("{}_{}", q, callee.path[0]);
                let id = lookup_function(self, &qualified)?;
                let member = table.get(id)?;
                self.check_scope_member_visibility(member, q, span);
                Some(id)
            }
        }
    }

    // === Shared rules ===

    /// Value-preserving assignments are free; anything that can lose
    /// information needs an overflow policy on the destination. A literal
    /// with a provable value is judged by that value, not by its written
    /// type, which is what keeps the rule zero-false-positive.
    fn check_assign_compat(
        &mut self,
        dest: &TypeDescriptor,
        src: &TypeDescriptor,
        value: Option<&Expr>,
        span: Span,
    ) {
        use basalt_ast::OverflowPolicy;

        // Whole-array and bounded-string shape rules
        if dest.is_array() || src.is_array() {
            self.errors.push(CheckError::TypeMismatch {
                expected: dest.display(),
                found: src.display(),
                span,
            });
            return;
        }
        if let (BaseKind::Str(d), BaseKind::Str(s)) = (dest.base, src.base) {
            if s > d {
                self.errors.push(CheckError::TypeMismatch {
                    expected: dest.display(),
                    found: src.display(),
                    span,
                });
            }
            return;
        }

        let has_policy = dest.overflow != OverflowPolicy::None;

        if dest.is_integer_like() && src.is_integer_like() {
            if let Some(v) = value.and_then(|e| consteval::eval_int(self.table, &self.refs, e)) {
                let (min, max) = dest.integer_range().expect("integer destination");
                if (v < min || v > max) && !has_policy {
                    self.errors.push(CheckError::LiteralOverflow {
                        value: v,
                        ty: dest.display(),
                        span,
                    });
                }
                return;
            }
            let (dmin, dmax) = dest.integer_range().expect("integer destination");
            let (smin, smax) = src.integer_range().expect("integer source");
            let value_preserving = dmin <= smin && dmax >= smax;
            if !value_preserving && !has_policy {
                self.errors.push(CheckError::NarrowingWithoutModifier {
                    from: src.display(),
                    to: dest.display(),
                    span,
                });
            }
            return;
        }

        if dest.is_float() && src.is_float() {
            if dest.bit_width < src.bit_width && !has_policy {
                self.errors.push(CheckError::NarrowingWithoutModifier {
                    from: src.display(),
                    to: dest.display(),
                    span,
                });
            }
            return;
        }

        // Integer to float widens; float to integer needs a policy
        if dest.is_float() && src.is_integer_like() {
            return;
        }
        if dest.is_integer_like() && src.is_float() {
            if !has_policy {
                self.errors.push(CheckError::NarrowingWithoutModifier {
                    from: src.display(),
                    to: dest.display(),
                    span,
                });
            }
            return;
        }

        let compatible = match (dest.base, src.base) {
            (BaseKind::Bool, BaseKind::Bool) => true,
            (BaseKind::Enum(a), BaseKind::Enum(b)) => a == b,
            (BaseKind::Struct(a), BaseKind::Struct(b)) => a == b,
            _ => false,
        };
        if !compatible {
            self.errors.push(CheckError::TypeMismatch {
                expected: dest.display(),
                found: src.display(),
                span,
            });
        }
    }

    fn expect_bool(&mut self, condition: &Expr) {
        if let Some(ty) = self.check_expr(condition, None) {
            if !ty.is_bool() {
                self.errors.push(CheckError::TypeMismatch {
                    expected: "bool".into(),
                    found: ty.display(),
                    span: condition.span,
                });
            }
        }
    }

    fn expect_comparable(&mut self, a: &TypeDescriptor, b: &TypeDescriptor, span: Span) {
        let ok = (a.is_numeric() && b.is_numeric())
            || (a.is_bool() && b.is_bool())
            || matches!((a.base, b.base), (BaseKind::Enum(x), BaseKind::Enum(y)) if x == y);
        if !ok {
            self.errors.push(CheckError::TypeMismatch {
                expected: a.display(),
                found: b.display(),
                span,
            });
        }
    }

    fn symbol_value_type(&mut self, sym: &Symbol, span: Span) -> Option<TypeDescriptor> {
        match sym.kind {
            SymbolKind::Variable => sym.as_variable().map(|v| v.ty.clone()),
            SymbolKind::Register => sym.as_register().map(|r| {
                let mut ty = r.ty.clone();
                ty.modifiers.is_volatile = true;
                ty
            }),
            _ => {
                self.errors.push(CheckError::TypeMismatch {
                    expected: "a value".into(),
                    found: format!("`{}`", sym.qualified_name),
                    span,
                });
                None
            }
        }
    }

    fn project_fields(
        &mut self,
        base: TypeDescriptor,
        path: &[String],
        span: Span,
    ) -> Option<TypeDescriptor> {
        let table = self.table;
        let mut ty = base;
        for field in path {
            if ty.is_array() {
                self.errors.push(CheckError::TypeMismatch {
                    expected: "a struct".into(),
                    found: ty.display(),
                    span,
                });
                return None;
            }
            match ty.base {
                BaseKind::Struct(id) => {
                    let data = table.get(id).and_then(Symbol::as_struct)?;
                    match data.fields.iter().find(|f| f.name == *field) {
                        Some(f) => ty = f.ty.clone(),
                        None => {
                            self.errors.push(CheckError::UnknownMember {
                                name: field.clone(),
                                span,
                            });
                            return None;
                        }
                    }
                }
                _ => {
                    self.errors.push(CheckError::UnknownMember {
                        name: field.clone(),
                        span,
                    });
                    return None;
                }
            }
        }
        Some(ty)
    }

    fn check_scope_member_visibility(&mut self, member: &Symbol, scope: &str, span: Span) {
        if member.visibility == Visibility::Private && self.current_scope.as_deref() != Some(scope)
        {
            self.errors.push(CheckError::PrivateAccess {
                name: member.qualified_name.clone(),
                span,
            });
        }
    }

    fn check_file_visibility(&mut self, sym: &Symbol, span: Span) {
        if sym.visibility == Visibility::Private && sym.declaring_file != self.current_file {
            self.errors.push(CheckError::PrivateAccess {
                name: sym.qualified_name.clone(),
                span,
            });
        }
    }

    fn resolve_local_type(&mut self, ty: &TypeNode) -> Option<TypeDescriptor> {
        let table = self.table;
        let base = match &ty.kind {
            TypeKind::U8 => BaseKind::U8,
            TypeKind::U16 => BaseKind::U16,
            TypeKind::U32 => BaseKind::U32,
            TypeKind::U64 => BaseKind::U64,
            TypeKind::I8 => BaseKind::I8,
            TypeKind::I16 => BaseKind::I16,
            TypeKind::I32 => BaseKind::I32,
            TypeKind::I64 => BaseKind::I64,
            TypeKind::F32 => BaseKind::F32,
            TypeKind::F64 => BaseKind::F64,
            TypeKind::Bool => BaseKind::Bool,
            TypeKind::Void => BaseKind::Void,
            TypeKind::Str(n) => BaseKind::Str(*n),
            TypeKind::Named(name) => match table.get_by_name(name) {
                Some(sym) if sym.kind == SymbolKind::Struct => BaseKind::Struct(sym.id),
                Some(sym) if sym.kind == SymbolKind::Enum => BaseKind::Enum(sym.id),
                Some(sym) if sym.kind == SymbolKind::Bitmap => BaseKind::Bitmap(sym.id),
                _ => {
                    self.errors.push(CheckError::UnknownType {
                        name: name.clone(),
                        span: ty.span,
                    });
                    return None;
                }
            },
        };

        let mut desc = TypeDescriptor::scalar(base);
        if let BaseKind::Bitmap(id) = base {
            if let Some(b) = table.get(id).and_then(Symbol::as_bitmap) {
                desc.bit_width = b.backing.bit_width;
                desc.signed = false;
            }
        }
        desc.modifiers = ty.modifiers;
        desc.overflow = ty.overflow;
        for dim in &ty.dims {
            match dim {
                ArrayLen::Literal(n) => desc.dims.push(ArrayDim::Literal(*n)),
                ArrayLen::Named(name) => match table.get_by_name(name) {
                    Some(sym)
                        if sym
                            .as_variable()
                            .map(|v| v.ty.modifiers.is_const && v.ty.is_integer())
                            .unwrap_or(false) =>
                    {
                        desc.dims.push(ArrayDim::Const(sym.id));
                    }
                    _ => {
                        self.errors.push(CheckError::UnknownType {
                            name: name.clone(),
                            span: ty.span,
                        });
                        return None;
                    }
                },
            }
        }
        Some(desc)
    }
}

fn qualify(scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(s) => format!("{}_{}", s, name),
        None => name.to_string(),
    }
}

fn root_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Member { qualifier, path } => match qualifier {
            Qualifier::Name(q) => q.clone(),
            _ => path.first().cloned().unwrap_or_default(),
        },
        _ => String::new(),
    }
}

fn unsigned_of_width(bit_width: u16) -> TypeDescriptor {
    let base = match bit_width {
        0..=8 => BaseKind::U8,
        9..=16 => BaseKind::U16,
        17..=32 => BaseKind::U32,
        _ => BaseKind::U64,
    };
    TypeDescriptor::scalar(base)
}

/// Usual arithmetic result: floats win, then the wider width
fn promote(lhs: &TypeDescriptor, rhs: &TypeDescriptor) -> TypeDescriptor {
    if lhs.is_float() || rhs.is_float() {
        let width = lhs.bit_width.max(rhs.bit_width);
        return TypeDescriptor::scalar(if width > 32 { BaseKind::F64 } else { BaseKind::F32 });
    }
    let width = lhs.bit_width.max(rhs.bit_width);
    let signed = lhs.signed || rhs.signed;
    let base = match (width, signed) {
        (0..=8, false) => BaseKind::U8,
        (0..=8, true) => BaseKind::I8,
        (9..=16, false) => BaseKind::U16,
        (9..=16, true) => BaseKind::I16,
        (17..=32, false) => BaseKind::U32,
        (17..=32, true) => BaseKind::I32,
        (_, false) => BaseKind::U64,
        (_, true) => BaseKind::I64,
    };
    TypeDescriptor::scalar(base)
}
