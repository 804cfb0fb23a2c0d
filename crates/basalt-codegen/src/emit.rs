//! C code emission
//!
//! Consumes the resolved maps (symbol table, reference map, expression
//! types, passing decisions) and writes one C translation unit. All
//! analysis is already final here: passing modes come from the decisions
//! map and are never recomputed.

use crate::{CWriter, CodegenError};
use basalt_ast::*;
use basalt_checker::{Resolution, ResolvedReferences};
use basalt_graph::PassingDecisions;
use basalt_symbols::{
    ArrayDim, BaseKind, PassingMode, Symbol, SymbolTable, TypeDescriptor,
};
use std::collections::{BTreeSet, HashMap};

/// Emit a complete C translation unit for a fully analyzed program
pub fn generate_c(
    program: &Program,
    table: &SymbolTable,
    refs: &ResolvedReferences,
    expr_types: &HashMap<NodeId, TypeDescriptor>,
    decisions: &PassingDecisions,
) -> Result<String, CodegenError> {
    let mut emitter = Emitter {
        table,
        refs,
        expr_types,
        decisions,
        helpers: BTreeSet::new(),
        uses_string: false,
    };
    emitter.emit(program)
}

/// Overflow helper key: `(clamp?, width, signed)`; BTreeSet keeps the
/// emitted order deterministic
type HelperKey = (bool, u16, bool);

struct Emitter<'a> {
    table: &'a SymbolTable,
    refs: &'a ResolvedReferences,
    expr_types: &'a HashMap<NodeId, TypeDescriptor>,
    decisions: &'a PassingDecisions,
    helpers: BTreeSet<HelperKey>,
    uses_string: bool,
}

/// Per-function emission context: how each parameter is spelled and passed
struct FnCtx {
    params: Vec<ParamCtx>,
}

struct ParamCtx {
    name: String,
    mode: PassingMode,
    ty: TypeDescriptor,
}

impl<'a> Emitter<'a> {
    fn emit(&mut self, program: &Program) -> Result<String, CodegenError> {
        let mut types = CWriter::new();
        let mut globals = CWriter::new();
        let mut protos = CWriter::new();
        let mut bodies = CWriter::new();

        for file in &program.files {
            for decl in &file.declarations {
                self.emit_type_decl(decl, None, &mut types)?;
            }
        }
        for file in &program.files {
            for decl in &file.declarations {
                self.emit_global_decl(decl, None, &mut globals)?;
            }
        }
        for file in &program.files {
            for decl in &file.declarations {
                self.emit_prototype(decl, None, &mut protos)?;
            }
        }
        for file in &program.files {
            for decl in &file.declarations {
                self.emit_function(decl, None, &mut bodies)?;
            }
        }

        let mut out = CWriter::new();
        out.line("/* Generated by basalt. Do not edit. */");
        out.line("#include <stdbool.h>");
        out.line("#include <stdint.h>");
        if self.uses_string {
            out.line("#include <string.h>");
        }
        out.blank();
        out.line("#ifndef BASALT_CRITICAL_ENTER");
        out.line("#define BASALT_CRITICAL_ENTER() do { } while (0)");
        out.line("#define BASALT_CRITICAL_EXIT() do { } while (0)");
        out.line("#endif");
        out.blank();

        for key in self.helpers.clone() {
            self.emit_helper(key, &mut out);
        }

        let mut result = out.finish();
        for section in [types, globals, protos, bodies] {
            if !section.is_empty() {
                result.push('\n');
                result.push_str(&section.finish());
            }
        }
        Ok(result)
    }

    // === Type definitions ===

    fn emit_type_decl(
        &mut self,
        decl: &Declaration,
        scope: Option<&str>,
        w: &mut CWriter,
    ) -> Result<(), CodegenError> {
        match &decl.kind {
            DeclarationKind::Scope(s) => {
                for member in &s.members {
                    self.emit_type_decl(member, Some(&s.name), w)?;
                }
            }
            DeclarationKind::Struct(s) => {
                let sym = self.lookup(scope, &s.name, s.span)?;
                let data = sym.as_struct().ok_or(CodegenError::MissingSymbol {
                    name: sym.qualified_name.clone(),
                    span: s.span,
                })?;
                w.open("typedef struct");
                for field in &data.fields {
                    let (base, suffix) = self.c_type(&field.ty);
                    w.line(format!("{} {}{};", base, field.name, suffix));
                }
                w.close(&format!(" {};", sym.qualified_name));
                w.blank();
            }
            DeclarationKind::Enum(e) => {
                let sym = self.lookup(scope, &e.name, e.span)?;
                let data = sym.as_enum().ok_or(CodegenError::MissingSymbol {
                    name: sym.qualified_name.clone(),
                    span: e.span,
                })?;
                w.open("typedef enum");
                for (i, variant) in data.variants.iter().enumerate() {
                    let comma = if i + 1 < data.variants.len() { "," } else { "" };
                    w.line(format!(
                        "{}_{} = {}{}",
                        sym.qualified_name, variant.name, variant.value, comma
                    ));
                }
                w.close(&format!(" {};", sym.qualified_name));
                w.blank();
            }
            DeclarationKind::Bitmap(b) => {
                let sym = self.lookup(scope, &b.name, b.span)?;
                let data = sym.as_bitmap().ok_or(CodegenError::MissingSymbol {
                    name: sym.qualified_name.clone(),
                    span: b.span,
                })?;
                let (base, _) = self.c_type(&data.backing);
                w.line(format!("typedef {} {};", base, sym.qualified_name));
                w.blank();
            }
            _ => {}
        }
        Ok(())
    }

    // === Globals ===

    fn emit_global_decl(
        &mut self,
        decl: &Declaration,
        scope: Option<&str>,
        w: &mut CWriter,
    ) -> Result<(), CodegenError> {
        match &decl.kind {
            DeclarationKind::Scope(s) => {
                for member in &s.members {
                    self.emit_global_decl(member, Some(&s.name), w)?;
                }
            }
            DeclarationKind::Register(r) => {
                let sym = self.lookup(scope, &r.name, r.span)?;
                let data = sym.as_register().ok_or(CodegenError::MissingSymbol {
                    name: sym.qualified_name.clone(),
                    span: r.span,
                })?;
                let (base, _) = self.c_type(&data.ty);
                w.line(format!(
                    "#define {} (*(volatile {} *)0x{:X}UL)",
                    sym.qualified_name, base, data.address
                ));
            }
            DeclarationKind::Variable(v) => {
                let sym = self.lookup(scope, &v.name, v.span)?;
                let data = sym.as_variable().ok_or(CodegenError::MissingSymbol {
                    name: sym.qualified_name.clone(),
                    span: v.span,
                })?;

                // Const integers with a known value become object-like
                // macros so they stay usable as array lengths
                if let Some(value) = data.const_value {
                    w.line(format!("#define {} {}", sym.qualified_name, value));
                    return Ok(());
                }

                let ty = data.ty.clone();
                let (base, suffix) = self.c_type(&ty);
                let mut prefix = String::new();
                if sym.visibility == Visibility::Private || scope.is_some() {
                    prefix.push_str("static ");
                }
                if ty.modifiers.is_volatile {
                    prefix.push_str("volatile ");
                }
                if ty.modifiers.is_const {
                    prefix.push_str("const ");
                }

                let init = match &v.init {
                    Some(expr) => {
                        let ctx = FnCtx { params: Vec::new() };
                        format!(" = {}", self.emit_expr(expr, &ctx)?)
                    }
                    None => String::new(),
                };
                w.line(format!(
                    "{}{} {}{}{};",
                    prefix, base, sym.qualified_name, suffix, init
                ));
            }
            _ => {}
        }
        Ok(())
    }

    // === Functions ===

    fn emit_prototype(
        &mut self,
        decl: &Declaration,
        scope: Option<&str>,
        w: &mut CWriter,
    ) -> Result<(), CodegenError> {
        match &decl.kind {
            DeclarationKind::Scope(s) => {
                for member in &s.members {
                    self.emit_prototype(member, Some(&s.name), w)?;
                }
                Ok(())
            }
            DeclarationKind::Function(f) => {
                let sym = self.lookup(scope, &f.name, f.span)?;
                let Some(data) = sym.as_function() else {
                    return Ok(());
                };
                // Redundant forward declarations collapse onto one symbol;
                // emit the prototype only at the defining declaration (or
                // at the lone extern declaration)
                if data.defined && f.body.is_none() {
                    return Ok(());
                }
                let signature = self.c_signature(sym)?;
                if data.defined {
                    let prefix = if sym.visibility == Visibility::Private || scope.is_some() {
                        "static "
                    } else {
                        ""
                    };
                    w.line(format!("{}{};", prefix, signature));
                } else {
                    w.line(format!("extern {};", signature));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn emit_function(
        &mut self,
        decl: &Declaration,
        scope: Option<&str>,
        w: &mut CWriter,
    ) -> Result<(), CodegenError> {
        match &decl.kind {
            DeclarationKind::Scope(s) => {
                for member in &s.members {
                    self.emit_function(member, Some(&s.name), w)?;
                }
                Ok(())
            }
            DeclarationKind::Function(f) => {
                let Some(body) = &f.body else { return Ok(()) };
                let sym = self.lookup(scope, &f.name, f.span)?;
                let Some(data) = sym.as_function() else {
                    return Ok(());
                };

                let ctx = FnCtx {
                    params: data
                        .params
                        .iter()
                        .enumerate()
                        .map(|(i, p)| ParamCtx {
                            name: p.name.clone(),
                            mode: self
                                .decisions
                                .get(sym.id, i)
                                .unwrap_or(PassingMode::ByValue),
                            ty: p.ty.clone(),
                        })
                        .collect(),
                };

                let prefix = if sym.visibility == Visibility::Private || scope.is_some() {
                    "static "
                } else {
                    ""
                };
                w.blank();
                w.open(format!("{}{}", prefix, self.c_signature(sym)?));
                for stmt in &body.statements {
                    self.emit_statement(stmt, &ctx, w)?;
                }
                w.close("");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn c_signature(&mut self, sym: &Symbol) -> Result<String, CodegenError> {
        let data = sym.as_function().ok_or(CodegenError::MissingSymbol {
            name: sym.qualified_name.clone(),
            span: sym.span,
        })?;
        let (ret, _) = self.c_type(&data.return_type);

        if data.params.is_empty() {
            return Ok(format!("{} {}(void)", ret, sym.qualified_name));
        }

        let params: Vec<String> = data
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mode = self
                    .decisions
                    .get(sym.id, i)
                    .unwrap_or(PassingMode::ByValue);
                self.c_param(&p.ty, &p.name, mode)
            })
            .collect();
        Ok(format!(
            "{} {}({})",
            ret,
            sym.qualified_name,
            params.join(", ")
        ))
    }

    fn c_param(&self, ty: &TypeDescriptor, name: &str, mode: PassingMode) -> String {
        let (base, _) = self.c_type(&scalar_of(ty));
        match mode {
            PassingMode::ByValue => format!("{} {}", base, name),
            PassingMode::ByConstPointer => format!("const {} *{}", base, name),
            PassingMode::ByMutablePointer => format!("{} *{}", base, name),
        }
    }

    // === Statements ===

    fn emit_statement(
        &mut self,
        stmt: &Statement,
        ctx: &FnCtx,
        w: &mut CWriter,
    ) -> Result<(), CodegenError> {
        match &stmt.kind {
            StatementKind::Local(decl) => {
                let line = self.emit_local(decl, ctx)?;
                w.line(format!("{};", line));
            }

            StatementKind::Assign { target, op, value } => {
                let line = self.emit_assign(target, *op, value, ctx)?;
                w.line(format!("{};", line));
            }

            StatementKind::Expr(expr) => {
                let text = self.emit_expr(expr, ctx)?;
                w.line(format!("{};", text));
            }

            StatementKind::Return(value) => match value {
                Some(v) => {
                    let text = self.emit_expr(v, ctx)?;
                    w.line(format!("return {};", text));
                }
                None => w.line("return;"),
            },

            StatementKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let cond = self.emit_expr(condition, ctx)?;
                w.open(format!("if ({})", cond));
                for s in &then_block.statements {
                    self.emit_statement(s, ctx, w)?;
                }
                if let Some(else_block) = else_block {
                    w.reopen("else");
                    for s in &else_block.statements {
                        self.emit_statement(s, ctx, w)?;
                    }
                }
                w.close("");
            }

            StatementKind::While { condition, body } => {
                let cond = self.emit_expr(condition, ctx)?;
                w.open(format!("while ({})", cond));
                for s in &body.statements {
                    self.emit_statement(s, ctx, w)?;
                }
                w.close("");
            }

            StatementKind::For {
                init,
                condition,
                step,
                body,
            } => {
                let init_text = match init {
                    Some(s) => self.emit_inline_statement(s, ctx)?,
                    None => String::new(),
                };
                let cond_text = match condition {
                    Some(c) => self.emit_expr(c, ctx)?,
                    None => String::new(),
                };
                let step_text = match step {
                    Some(s) => self.emit_inline_statement(s, ctx)?,
                    None => String::new(),
                };
                w.open(format!("for ({}; {}; {})", init_text, cond_text, step_text));
                for s in &body.statements {
                    self.emit_statement(s, ctx, w)?;
                }
                w.close("");
            }

            StatementKind::Switch {
                scrutinee,
                cases,
                default_block,
            } => {
                let s = self.emit_expr(scrutinee, ctx)?;
                w.open(format!("switch ({})", s));
                for case in cases {
                    let v = self.emit_expr(&case.value, ctx)?;
                    w.open(format!("case {}:", v));
                    for inner in &case.body.statements {
                        self.emit_statement(inner, ctx, w)?;
                    }
                    w.line("break;");
                    w.close("");
                }
                if let Some(default_block) = default_block {
                    w.open("default:");
                    for inner in &default_block.statements {
                        self.emit_statement(inner, ctx, w)?;
                    }
                    w.line("break;");
                    w.close("");
                }
                w.close("");
            }

            StatementKind::Critical(block) => {
                w.open("");
                w.line("BASALT_CRITICAL_ENTER();");
                for s in &block.statements {
                    self.emit_statement(s, ctx, w)?;
                }
                w.line("BASALT_CRITICAL_EXIT();");
                w.close("");
            }
        }
        Ok(())
    }

    fn emit_inline_statement(
        &mut self,
        stmt: &Statement,
        ctx: &FnCtx,
    ) -> Result<String, CodegenError> {
        match &stmt.kind {
            StatementKind::Local(decl) => self.emit_local(decl, ctx),
            StatementKind::Assign { target, op, value } => {
                self.emit_assign(target, *op, value, ctx)
            }
            StatementKind::Expr(expr) => self.emit_expr(expr, ctx),
            _ => Err(CodegenError::Unsupported {
                what: "statement form in for-header".into(),
                span: stmt.span,
            }),
        }
    }

    fn emit_local(&mut self, decl: &LocalDecl, ctx: &FnCtx) -> Result<String, CodegenError> {
        let (base, suffix) = self.c_type_node(&decl.ty);
        let mut prefix = String::new();
        if decl.ty.modifiers.is_const {
            prefix.push_str("const ");
        }
        if decl.ty.modifiers.is_volatile {
            prefix.push_str("volatile ");
        }
        match &decl.init {
            Some(init) => {
                let value = self.emit_expr(init, ctx)?;
                Ok(format!(
                    "{}{} {}{} = {}",
                    prefix, base, decl.name, suffix, value
                ))
            }
            None => Ok(format!("{}{} {}{}", prefix, base, decl.name, suffix)),
        }
    }

    fn emit_assign(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: &Expr,
        ctx: &FnCtx,
    ) -> Result<String, CodegenError> {
        // Bit-level targets expand to mask-and-shift writes
        match &target.kind {
            ExprKind::ArrayIndex { base, index } => {
                let base_ty = self.type_of(base)?;
                if base_ty.is_integer_like() {
                    return self.emit_bit_write(base, index, None, value, ctx);
                }
            }
            ExprKind::BitAccess {
                base,
                offset,
                width,
            } => {
                return self.emit_bit_write(base, offset, Some(width), value, ctx);
            }
            _ => {}
        }

        let target_ty = self.type_of(target)?;
        let target_c = self.emit_expr(target, ctx)?;
        let value_c = self.emit_expr(value, ctx)?;

        // Bounded strings copy through strncpy
        if let BaseKind::Str(_) = target_ty.base {
            self.uses_string = true;
            return Ok(format!(
                "(void)strncpy({}, {}, sizeof({}))",
                target_c, value_c, target_c
            ));
        }

        // Destinations with an overflow policy route through a helper
        if target_ty.overflow != OverflowPolicy::None && target_ty.is_integer_like() {
            let helper = self.overflow_helper(&target_ty);
            let rhs = match op.to_binary() {
                None => value_c,
                Some(bin) => format!("({} {} {})", target_c, bin.symbol(), value_c),
            };
            return Ok(format!(
                "{} = {}((int64_t)({}))",
                target_c, helper, rhs
            ));
        }

        match op.to_binary() {
            None => Ok(format!("{} = {}", target_c, value_c)),
            Some(bin) => Ok(format!("{} {}= {}", target_c, bin.symbol(), value_c)),
        }
    }

    fn emit_bit_write(
        &mut self,
        base: &Expr,
        offset: &Expr,
        width: Option<&Expr>,
        value: &Expr,
        ctx: &FnCtx,
    ) -> Result<String, CodegenError> {
        let base_ty = self.type_of(base)?;
        let (base_c_ty, _) = self.c_type(&scalar_of(&base_ty));
        let one = if base_ty.bit_width > 32 { "1ULL" } else { "1U" };

        let base_c = self.emit_expr(base, ctx)?;
        let offset_c = self.emit_expr(offset, ctx)?;
        let value_c = self.emit_expr(value, ctx)?;

        match width {
            None => {
                // Single-bit set/clear from a boolean
                Ok(format!(
                    "{base} = ({ty})(({val}) ? ({base} | ({one} << ({off}))) : ({base} & ~({one} << ({off}))))",
                    base = base_c,
                    ty = base_c_ty,
                    val = value_c,
                    one = one,
                    off = offset_c,
                ))
            }
            Some(width) => {
                let width_c = self.emit_expr(width, ctx)?;
                Ok(format!(
                    "{base} = ({ty})(({base} & ~((({one} << ({w})) - {one}) << ({off}))) | \
                     ((({uty})({val}) << ({off})) & ((({one} << ({w})) - {one}) << ({off}))))",
                    base = base_c,
                    ty = base_c_ty,
                    one = one,
                    w = width_c,
                    off = offset_c,
                    uty = if base_ty.bit_width > 32 {
                        "uint64_t"
                    } else {
                        "uint32_t"
                    },
                    val = value_c,
                ))
            }
        }
    }

    // === Expressions ===

    fn emit_expr(&mut self, expr: &Expr, ctx: &FnCtx) -> Result<String, CodegenError> {
        match &expr.kind {
            ExprKind::Int(v) => Ok(v.to_string()),
            ExprKind::Float(f) => {
                let is_f32 = self
                    .expr_types
                    .get(&expr.id)
                    .map(|t| t.base == BaseKind::F32)
                    .unwrap_or(false);
                let text = if f.fract() == 0.0 {
                    format!("{:.1}", f)
                } else {
                    format!("{}", f)
                };
                Ok(if is_f32 { format!("{}f", text) } else { text })
            }
            ExprKind::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
            ExprKind::Str(s) => Ok(format!("\"{}\"", escape_c(s))),

            ExprKind::Ident(_) => self.emit_place(expr, &[], ctx),
            ExprKind::Member { qualifier, path } => {
                self.emit_member_place(expr, qualifier, path, ctx)
            }

            ExprKind::ArrayIndex { base, index } => {
                let base_ty = self.type_of(base)?;
                let base_c = self.emit_expr(base, ctx)?;
                let index_c = self.emit_expr(index, ctx)?;
                if base_ty.is_array() {
                    Ok(format!("{}[{}]", base_c, index_c))
                } else {
                    let one = if base_ty.bit_width > 32 { "1ULL" } else { "1U" };
                    Ok(format!(
                        "(((({}) >> ({})) & {}) != 0)",
                        base_c, index_c, one
                    ))
                }
            }

            ExprKind::BitAccess {
                base,
                offset,
                width,
            } => {
                let base_ty = self.type_of(base)?;
                let one = if base_ty.bit_width > 32 { "1ULL" } else { "1U" };
                let base_c = self.emit_expr(base, ctx)?;
                let offset_c = self.emit_expr(offset, ctx)?;
                let width_c = self.emit_expr(width, ctx)?;
                Ok(format!(
                    "((({}) >> ({})) & (({} << ({})) - {}))",
                    base_c, offset_c, one, width_c, one
                ))
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.emit_expr(lhs, ctx)?;
                let r = self.emit_expr(rhs, ctx)?;
                Ok(format!("({} {} {})", l, op.symbol(), r))
            }

            ExprKind::Unary { op, operand } => {
                let inner = self.emit_expr(operand, ctx)?;
                Ok(format!("({}{})", op.symbol(), inner))
            }

            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                let c = self.emit_expr(condition, ctx)?;
                let t = self.emit_expr(then_expr, ctx)?;
                let e = self.emit_expr(else_expr, ctx)?;
                Ok(format!("(({}) ? ({}) : ({}))", c, t, e))
            }

            ExprKind::Call(call) => self.emit_call(expr, call, ctx),
        }
    }

    /// Emit an identifier-rooted place with a field path appended
    fn emit_place(
        &mut self,
        expr: &Expr,
        fields: &[String],
        ctx: &FnCtx,
    ) -> Result<String, CodegenError> {
        let resolution = self.refs.get(expr.id).ok_or(CodegenError::Unresolved {
            span: expr.span,
        })?;

        let mut out = match resolution {
            Resolution::Param { index, .. } => {
                let param = &ctx.params[*index];
                match param.mode {
                    PassingMode::ByValue => param.name.clone(),
                    _ if param.ty.is_array() || matches!(param.ty.base, BaseKind::Str(_)) => {
                        // Array-shaped pointers index like the original
                        param.name.clone()
                    }
                    _ if !fields.is_empty() => {
                        // Pointer-to-struct roots chain with ->
                        return Ok(format!("{}->{}", param.name, fields.join(".")));
                    }
                    _ => format!("(*{})", param.name),
                }
            }
            Resolution::Local { name, .. } => name.clone(),
            Resolution::Symbol(id) => {
                let sym = self.table.get(*id).ok_or(CodegenError::Unresolved {
                    span: expr.span,
                })?;
                sym.qualified_name.clone()
            }
            Resolution::EnumVariant { enum_id, variant } => {
                let sym = self.table.get(*enum_id).ok_or(CodegenError::Unresolved {
                    span: expr.span,
                })?;
                let data = sym.as_enum().ok_or(CodegenError::MissingSymbol {
                    name: sym.qualified_name.clone(),
                    span: expr.span,
                })?;
                format!("{}_{}", sym.qualified_name, data.variants[*variant].name)
            }
        };

        if !fields.is_empty() {
            out.push('.');
            out.push_str(&fields.join("."));
        }
        Ok(out)
    }

    fn emit_member_place(
        &mut self,
        expr: &Expr,
        qualifier: &Qualifier,
        path: &[String],
        ctx: &FnCtx,
    ) -> Result<String, CodegenError> {
        let fields: Vec<String> = match self.refs.get(expr.id) {
            Some(Resolution::Param { .. }) | Some(Resolution::Local { .. }) => path.to_vec(),
            Some(Resolution::EnumVariant { .. }) => Vec::new(),
            Some(Resolution::Symbol(id)) => {
                let sym = self.table.get(*id).ok_or(CodegenError::Unresolved {
                    span: expr.span,
                })?;
                member_field_path(&sym.qualified_name, qualifier, path)
            }
            None => {
                return Err(CodegenError::Unresolved { span: expr.span });
            }
        };
        self.emit_place(expr, &fields, ctx)
    }

    fn emit_call(
        &mut self,
        expr: &Expr,
        call: &CallExpr,
        ctx: &FnCtx,
    ) -> Result<String, CodegenError> {
        let callee_id = self
            .refs
            .symbol_of(expr.id)
            .ok_or(CodegenError::Unresolved { span: expr.span })?;
        let callee = self.table.get(callee_id).ok_or(CodegenError::Unresolved {
            span: expr.span,
        })?;
        let callee_name = callee.qualified_name.clone();

        let mut args = Vec::with_capacity(call.args.len());
        for (i, arg) in call.args.iter().enumerate() {
            let mode = self
                .decisions
                .get(callee_id, i)
                .unwrap_or(PassingMode::ByValue);
            args.push(self.emit_arg(arg, mode, ctx)?);
        }
        Ok(format!("{}({})", callee_name, args.join(", ")))
    }

    /// Adapt an argument to the callee's passing mode: forward pointers,
    /// take addresses of places, wrap rvalues in compound literals
    fn emit_arg(
        &mut self,
        arg: &Expr,
        mode: PassingMode,
        ctx: &FnCtx,
    ) -> Result<String, CodegenError> {
        if mode == PassingMode::ByValue {
            return self.emit_expr(arg, ctx);
        }

        // Whole parameter forwarded: it is already a pointer
        if let Some(Resolution::Param { index, .. }) = self.refs.get(arg.id) {
            let param = &ctx.params[*index];
            if param.mode != PassingMode::ByValue && field_free(arg) {
                return Ok(param.name.clone());
            }
        }

        // Arrays and bounded strings decay to pointers on their own
        if let Ok(ty) = self.type_of(arg) {
            if ty.is_array() || matches!(ty.base, BaseKind::Str(_)) {
                return self.emit_expr(arg, ctx);
            }
        }

        match &arg.kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::ArrayIndex { .. } => {
                let place = self.emit_expr(arg, ctx)?;
                Ok(format!("&{}", place))
            }
            _ => {
                // Computed value to a pointer parameter: materialize a
                // temporary with a compound literal
                let ty = self.type_of(arg)?;
                let (base, _) = self.c_type(&scalar_of(&ty));
                let value = self.emit_expr(arg, ctx)?;
                Ok(format!("&({}){{ {} }}", base, value))
            }
        }
    }

    // === Types and helpers ===

    /// C spelling of a resolved type: `(base, array suffix)`
    fn c_type(&self, ty: &TypeDescriptor) -> (String, String) {
        let base = match ty.base {
            BaseKind::U8 => "uint8_t".to_string(),
            BaseKind::U16 => "uint16_t".to_string(),
            BaseKind::U32 => "uint32_t".to_string(),
            BaseKind::U64 => "uint64_t".to_string(),
            BaseKind::I8 => "int8_t".to_string(),
            BaseKind::I16 => "int16_t".to_string(),
            BaseKind::I32 => "int32_t".to_string(),
            BaseKind::I64 => "int64_t".to_string(),
            BaseKind::F32 => "float".to_string(),
            BaseKind::F64 => "double".to_string(),
            BaseKind::Bool => "bool".to_string(),
            BaseKind::Void => "void".to_string(),
            BaseKind::Str(n) => {
                return (
                    "char".to_string(),
                    format!("[{}]{}", n, self.dims_suffix(ty)),
                )
            }
            BaseKind::Struct(id) | BaseKind::Enum(id) | BaseKind::Bitmap(id) => self
                .table
                .get(id)
                .map(|s| s.qualified_name.clone())
                .unwrap_or_else(|| "void".to_string()),
        };
        (base, self.dims_suffix(ty))
    }

    fn dims_suffix(&self, ty: &TypeDescriptor) -> String {
        let mut out = String::new();
        for dim in &ty.dims {
            match dim {
                ArrayDim::Literal(n) => out.push_str(&format!("[{}]", n)),
                ArrayDim::Const(id) => {
                    let name = self
                        .table
                        .get(*id)
                        .map(|s| s.qualified_name.clone())
                        .unwrap_or_default();
                    out.push_str(&format!("[{}]", name));
                }
            }
        }
        out
    }

    /// Spell a local declaration from its written type node. Named types
    /// resolve by their written name, which equals the qualified name for
    /// any program that passed the checker.
    fn c_type_node(&self, node: &TypeNode) -> (String, String) {
        let base = match &node.kind {
            TypeKind::U8 => "uint8_t".to_string(),
            TypeKind::U16 => "uint16_t".to_string(),
            TypeKind::U32 => "uint32_t".to_string(),
            TypeKind::U64 => "uint64_t".to_string(),
            TypeKind::I8 => "int8_t".to_string(),
            TypeKind::I16 => "int16_t".to_string(),
            TypeKind::I32 => "int32_t".to_string(),
            TypeKind::I64 => "int64_t".to_string(),
            TypeKind::F32 => "float".to_string(),
            TypeKind::F64 => "double".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Str(n) => return ("char".to_string(), format!("[{}]{}", n, self.node_dims(node))),
            TypeKind::Named(name) => name.clone(),
        };
        (base, self.node_dims(node))
    }

    fn node_dims(&self, node: &TypeNode) -> String {
        let mut out = String::new();
        for dim in &node.dims {
            match dim {
                ArrayLen::Literal(n) => out.push_str(&format!("[{}]", n)),
                ArrayLen::Named(name) => out.push_str(&format!("[{}]", name)),
            }
        }
        out
    }

    fn overflow_helper(&mut self, ty: &TypeDescriptor) -> String {
        let clamp = ty.overflow == OverflowPolicy::Clamp;
        self.helpers.insert((clamp, ty.bit_width, ty.signed));
        format!(
            "basalt_{}_{}{}",
            if clamp { "clamp" } else { "wrap" },
            if ty.signed { "i" } else { "u" },
            ty.bit_width
        )
    }

    fn emit_helper(&self, key: HelperKey, w: &mut CWriter) {
        let (clamp, width, signed) = key;
        let c_ty = match (width, signed) {
            (8, false) => "uint8_t",
            (16, false) => "uint16_t",
            (32, false) => "uint32_t",
            (64, false) => "uint64_t",
            (8, true) => "int8_t",
            (16, true) => "int16_t",
            (32, true) => "int32_t",
            _ => "int64_t",
        };
        let name = format!(
            "basalt_{}_{}{}",
            if clamp { "clamp" } else { "wrap" },
            if signed { "i" } else { "u" },
            width
        );

        if !clamp {
            w.open(format!("static inline {} {}(int64_t v)", c_ty, name));
            w.line(format!("return ({})v;", c_ty));
            w.close("");
            w.blank();
            return;
        }

        w.open(format!("static inline {} {}(int64_t v)", c_ty, name));
        if signed {
            if width < 64 {
                let max = (1i64 << (width - 1)) - 1;
                let min = -(1i64 << (width - 1));
                w.line(format!("if (v < {}) {{ return {}; }}", min, min));
                w.line(format!("if (v > {}) {{ return {}; }}", max, max));
            }
            w.line(format!("return ({})v;", c_ty));
        } else {
            w.line("if (v < 0) { return 0; }".to_string());
            if width < 64 {
                let max = (1u64 << width) - 1;
                w.line(format!("if (v > {}) {{ return {}U; }}", max, max));
            }
            w.line(format!("return ({})v;", c_ty));
        }
        w.close("");
        w.blank();
    }

    fn type_of(&self, expr: &Expr) -> Result<TypeDescriptor, CodegenError> {
        self.expr_types
            .get(&expr.id)
            .cloned()
            .ok_or(CodegenError::Unresolved { span: expr.span })
    }

    fn lookup(
        &self,
        scope: Option<&str>,
        name: &str,
        span: Span,
    ) -> Result<&'a Symbol, CodegenError> {
        let qualified = match scope {
            Some(s) => format!("{}_{}", s, name),
            None => name.to_string(),
        };
        self.table
            .get_by_name(&qualified)
            .ok_or(CodegenError::MissingSymbol {
                name: qualified,
                span,
            })
    }
}

/// The scalar view of a type: same base, no array shape
fn scalar_of(ty: &TypeDescriptor) -> TypeDescriptor {
    let mut scalar = ty.clone();
    scalar.dims.clear();
    scalar
}

/// Whether a member expression names a whole object (no field projection)
fn field_free(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Ident(_))
}

/// Given a resolved symbol and the written path, the trailing field
/// projections (the leading segments spell the symbol itself)
fn member_field_path(qualified_name: &str, qualifier: &Qualifier, path: &[String]) -> Vec<String> {
    match qualifier {
        Qualifier::This => path[1..].to_vec(),
        Qualifier::Global => {
            if path.len() >= 2 && qualified_name == format!("{}_{}", path[0], path[1]) {
                path[2..].to_vec()
            } else {
                path[1..].to_vec()
            }
        }
        Qualifier::Name(q) => {
            if qualified_name == format!("{}_{}", q, path[0]) {
                path[1..].to_vec()
            } else {
                path.to_vec()
            }
        }
    }
}
