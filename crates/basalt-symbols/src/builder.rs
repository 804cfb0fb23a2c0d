//! Symbol graph construction
//!
//! Walks the program's files in dependency order and produces the canonical
//! symbol table. Pass 1 registers every declaration under its qualified
//! name, enforcing the structural rules (no duplicate symbols, no nested
//! scopes, extern reconciliation). Pass 2 resolves every declaration's type
//! into a `TypeDescriptor`, which may reference symbols registered later in
//! the same file.

use crate::{
    ArrayDim, BaseKind, BitFieldInfo, BitmapData, EnumData, EnumVariantInfo, FieldInfo,
    FunctionData, ParamInfo, RegisterData, ScopeData, StructData, Symbol, SymbolData, SymbolError,
    SymbolId, SymbolKind, SymbolTable, TypeDescriptor, VariableData,
};
use basalt_ast::{
    ArrayLen, Declaration, DeclarationKind, Expr, ExprKind, FileId, Program, TypeKind, TypeNode,
    UnaryOp,
};
use std::collections::{HashMap, HashSet};

/// Build the symbol table for a whole program. The input files must be in
/// dependency order (includes first); the table is immutable on return.
pub fn build_symbol_table(program: &Program) -> Result<SymbolTable, Vec<SymbolError>> {
    SymbolGraphBuilder::new().build(program)
}

struct SymbolGraphBuilder {
    table: SymbolTable,
    errors: Vec<SymbolError>,
    /// Resolved signatures, for extern reconciliation checks
    signatures: HashMap<SymbolId, (Vec<TypeDescriptor>, TypeDescriptor)>,
}

impl SymbolGraphBuilder {
    fn new() -> Self {
        Self {
            table: SymbolTable::new(),
            errors: Vec::new(),
            signatures: HashMap::new(),
        }
    }

    fn build(mut self, program: &Program) -> Result<SymbolTable, Vec<SymbolError>> {
        // Pass 1: register headers
        for file in &program.files {
            for decl in &file.declarations {
                self.register(file.file, decl, None);
            }
        }

        // Pass 2: resolve declaration types
        for file in &program.files {
            for decl in &file.declarations {
                self.resolve_decl(decl, None);
            }
        }

        if self.errors.is_empty() {
            Ok(self.table)
        } else {
            Err(self.errors)
        }
    }

    // === Pass 1 ===

    fn register(
        &mut self,
        file: FileId,
        decl: &Declaration,
        scope: Option<&str>,
    ) -> Option<SymbolId> {
        match &decl.kind {
            DeclarationKind::Scope(s) => {
                if let Some(outer) = scope {
                    self.errors.push(SymbolError::NestedScope {
                        name: s.name.clone(),
                        outer: outer.to_string(),
                        span: s.span,
                    });
                    return None;
                }

                let scope_id = self.insert(Symbol {
                    id: SymbolId(0),
                    qualified_name: s.name.clone(),
                    kind: SymbolKind::Scope,
                    visibility: decl.visibility,
                    declaring_file: file,
                    span: s.span,
                    data: SymbolData::Scope(ScopeData::default()),
                })?;

                let mut member_ids = Vec::new();
                for member in &s.members {
                    if let Some(id) = self.register(file, member, Some(&s.name)) {
                        member_ids.push(id);
                        self.table.add_scope_member(&s.name, id);
                    }
                }
                if let Some(SymbolData::Scope(data)) =
                    self.table.get_mut(scope_id).map(|sym| &mut sym.data)
                {
                    data.members = member_ids;
                }
                Some(scope_id)
            }

            DeclarationKind::Struct(s) => {
                self.check_unique_members(&s.name, s.fields.iter().map(|f| (&f.name, f.span)));
                self.insert(Symbol {
                    id: SymbolId(0),
                    qualified_name: self.qualify(scope, &s.name),
                    kind: SymbolKind::Struct,
                    visibility: decl.visibility,
                    declaring_file: file,
                    span: s.span,
                    data: SymbolData::Struct(StructData { fields: Vec::new() }),
                })
            }

            DeclarationKind::Enum(e) => {
                self.check_unique_members(&e.name, e.variants.iter().map(|v| (&v.name, v.span)));
                let mut next = 0i64;
                let variants = e
                    .variants
                    .iter()
                    .map(|v| {
                        let value = v.value.unwrap_or(next);
                        next = value + 1;
                        EnumVariantInfo {
                            name: v.name.clone(),
                            value,
                        }
                    })
                    .collect();
                self.insert(Symbol {
                    id: SymbolId(0),
                    qualified_name: self.qualify(scope, &e.name),
                    kind: SymbolKind::Enum,
                    visibility: decl.visibility,
                    declaring_file: file,
                    span: e.span,
                    data: SymbolData::Enum(EnumData { variants }),
                })
            }

            DeclarationKind::Bitmap(b) => {
                self.check_unique_members(&b.name, b.fields.iter().map(|f| (&f.name, f.span)));

                if !b.backing.kind.is_integer() || b.backing.kind.is_signed() {
                    self.errors.push(SymbolError::InvalidBitmapBacking {
                        span: b.backing.span,
                    });
                    return None;
                }
                let backing = primitive_descriptor(&b.backing)
                    .expect("unsigned integer backing resolves without lookups");
                let width = u32::from(backing.bit_width);

                let mut fields = Vec::new();
                for f in &b.fields {
                    if f.width == 0 || f.offset + f.width > width {
                        self.errors.push(SymbolError::BitFieldOutOfRange {
                            bitmap: b.name.clone(),
                            field: f.name.clone(),
                            span: f.span,
                        });
                        continue;
                    }
                    fields.push(BitFieldInfo {
                        name: f.name.clone(),
                        offset: f.offset,
                        width: f.width,
                    });
                }

                self.insert(Symbol {
                    id: SymbolId(0),
                    qualified_name: self.qualify(scope, &b.name),
                    kind: SymbolKind::Bitmap,
                    visibility: decl.visibility,
                    declaring_file: file,
                    span: b.span,
                    data: SymbolData::Bitmap(BitmapData { backing, fields }),
                })
            }

            DeclarationKind::Register(r) => self.insert(Symbol {
                id: SymbolId(0),
                qualified_name: self.qualify(scope, &r.name),
                kind: SymbolKind::Register,
                visibility: decl.visibility,
                declaring_file: file,
                span: r.span,
                data: SymbolData::Register(RegisterData {
                    address: r.address,
                    ty: TypeDescriptor::void(),
                }),
            }),

            DeclarationKind::Function(f) => {
                self.check_unique_members(&f.name, f.params.iter().map(|p| (&p.name, p.span)));
                let qname = self.qualify(scope, &f.name);

                if let Some(existing_id) = self.table.id_of(&qname) {
                    return self.reconcile_function(existing_id, &qname, decl, f.body.is_some());
                }

                self.insert(Symbol {
                    id: SymbolId(0),
                    qualified_name: qname,
                    kind: SymbolKind::Function,
                    visibility: decl.visibility,
                    declaring_file: file,
                    span: f.span,
                    data: SymbolData::Function(FunctionData {
                        params: Vec::new(),
                        return_type: TypeDescriptor::void(),
                        is_extern: f.is_extern,
                        defined: f.body.is_some(),
                        enclosing_scope: scope.map(str::to_string),
                    }),
                })
            }

            DeclarationKind::Variable(v) => {
                // Primitive-typed variables resolve immediately; named types
                // wait for pass 2 when the whole table is registered.
                let ty = primitive_descriptor(&v.ty).unwrap_or_else(TypeDescriptor::void);
                let const_value = if v.ty.modifiers.is_const {
                    v.init.as_ref().and_then(fold_literal)
                } else {
                    None
                };
                self.insert(Symbol {
                    id: SymbolId(0),
                    qualified_name: self.qualify(scope, &v.name),
                    kind: SymbolKind::Variable,
                    visibility: decl.visibility,
                    declaring_file: file,
                    span: v.span,
                    data: SymbolData::Variable(VariableData {
                        ty,
                        enclosing_scope: scope.map(str::to_string),
                        const_value,
                    }),
                })
            }
        }
    }

    /// A second declaration of an existing function name: legal only as an
    /// extern forward-reference paired with one full definition.
    fn reconcile_function(
        &mut self,
        existing_id: SymbolId,
        qname: &str,
        decl: &Declaration,
        new_has_body: bool,
    ) -> Option<SymbolId> {
        let existing = self.table.get(existing_id)?;
        let previous = existing.span;

        if let Some(data) = existing.as_function() {
            if !data.defined && new_has_body {
                // Definition reconciles the forward declaration
                let sym = self.table.get_mut(existing_id)?;
                sym.span = decl.span;
                if let SymbolData::Function(d) = &mut sym.data {
                    d.defined = true;
                    d.is_extern = false;
                }
                return Some(existing_id);
            }
            if data.defined && !new_has_body {
                // Redundant forward declaration after the definition
                return Some(existing_id);
            }
        }

        self.errors.push(SymbolError::DuplicateSymbol {
            name: qname.to_string(),
            span: decl.span,
            previous,
        });
        None
    }

    fn insert(&mut self, symbol: Symbol) -> Option<SymbolId> {
        match self.table.insert(symbol) {
            Ok(id) => Some(id),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    fn qualify(&self, scope: Option<&str>, name: &str) -> String {
        match scope {
            Some(s) => format!("{}_{}", s, name),
            None => name.to_string(),
        }
    }

    fn check_unique_members<'n>(
        &mut self,
        owner: &str,
        names: impl Iterator<Item = (&'n String, basalt_ast::Span)>,
    ) {
        let mut seen = HashSet::new();
        for (name, span) in names {
            if !seen.insert(name.clone()) {
                self.errors.push(SymbolError::DuplicateMember {
                    owner: owner.to_string(),
                    name: name.clone(),
                    span,
                });
            }
        }
    }

    // === Pass 2 ===

    fn resolve_decl(&mut self, decl: &Declaration, scope: Option<&str>) {
        match &decl.kind {
            DeclarationKind::Scope(s) => {
                if scope.is_some() {
                    return; // nested scope already rejected in pass 1
                }
                for member in &s.members {
                    self.resolve_decl(member, Some(&s.name));
                }
            }

            DeclarationKind::Struct(s) => {
                let qname = self.qualify(scope, &s.name);
                let mut fields = Vec::new();
                for f in &s.fields {
                    if let Some(ty) = self.resolve_type(&f.ty) {
                        fields.push(FieldInfo {
                            name: f.name.clone(),
                            ty,
                        });
                    }
                }
                if let Some(id) = self.table.id_of(&qname) {
                    if let Some(SymbolData::Struct(data)) =
                        self.table.get_mut(id).map(|sym| &mut sym.data)
                    {
                        data.fields = fields;
                    }
                }
            }

            DeclarationKind::Enum(_) | DeclarationKind::Bitmap(_) => {
                // Fully resolved in pass 1
            }

            DeclarationKind::Register(r) => {
                let qname = self.qualify(scope, &r.name);
                if let Some(ty) = self.resolve_type(&r.ty) {
                    if let Some(id) = self.table.id_of(&qname) {
                        if let Some(SymbolData::Register(data)) =
                            self.table.get_mut(id).map(|sym| &mut sym.data)
                        {
                            data.ty = ty;
                        }
                    }
                }
            }

            DeclarationKind::Function(f) => {
                let qname = self.qualify(scope, &f.name);
                let Some(id) = self.table.id_of(&qname) else {
                    return; // registration failed earlier
                };

                let mut params = Vec::new();
                for p in &f.params {
                    if let Some(ty) = self.resolve_type(&p.ty) {
                        params.push(ParamInfo {
                            name: p.name.clone(),
                            ty,
                        });
                    }
                }
                let return_type = self
                    .resolve_type(&f.return_type)
                    .unwrap_or_else(TypeDescriptor::void);

                let param_types: Vec<TypeDescriptor> =
                    params.iter().map(|p| p.ty.clone()).collect();
                match self.signatures.get(&id).cloned() {
                    None => {
                        self.signatures
                            .insert(id, (param_types, return_type.clone()));
                        if let Some(SymbolData::Function(data)) =
                            self.table.get_mut(id).map(|sym| &mut sym.data)
                        {
                            data.params = params;
                            data.return_type = return_type;
                        }
                    }
                    Some((prev_params, prev_ret)) => {
                        // Forward declaration and definition must agree
                        if prev_params != param_types || prev_ret != return_type {
                            let previous = self.table.get(id).map(|s| s.span).unwrap_or(f.span);
                            self.errors.push(SymbolError::DuplicateSymbol {
                                name: qname,
                                span: f.span,
                                previous,
                            });
                        } else if f.body.is_some() {
                            if let Some(SymbolData::Function(data)) =
                                self.table.get_mut(id).map(|sym| &mut sym.data)
                            {
                                data.params = params;
                                data.return_type = return_type;
                            }
                        }
                    }
                }
            }

            DeclarationKind::Variable(v) => {
                let qname = self.qualify(scope, &v.name);
                if primitive_descriptor(&v.ty).is_some() {
                    // But arrays of primitives still need their dims resolved
                    if v.ty.dims.is_empty() {
                        return;
                    }
                }
                if let Some(ty) = self.resolve_type(&v.ty) {
                    if let Some(id) = self.table.id_of(&qname) {
                        if let Some(SymbolData::Variable(data)) =
                            self.table.get_mut(id).map(|sym| &mut sym.data)
                        {
                            data.ty = ty;
                        }
                    }
                }
            }
        }
    }

    /// Resolve a written type into a descriptor, recording errors
    fn resolve_type(&mut self, ty: &TypeNode) -> Option<TypeDescriptor> {
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
            TypeKind::Named(name) => match self.table.get_by_name(name) {
                Some(sym) => match sym.kind {
                    SymbolKind::Struct => BaseKind::Struct(sym.id),
                    SymbolKind::Enum => BaseKind::Enum(sym.id),
                    SymbolKind::Bitmap => BaseKind::Bitmap(sym.id),
                    _ => {
                        self.errors.push(SymbolError::NotAType {
                            name: name.clone(),
                            span: ty.span,
                        });
                        return None;
                    }
                },
                None => {
                    self.errors.push(SymbolError::UnknownType {
                        name: name.clone(),
                        span: ty.span,
                    });
                    return None;
                }
            },
        };

        let mut desc = TypeDescriptor::scalar(base);
        if let BaseKind::Bitmap(id) = base {
            if let Some(backing) = self.table.get(id).and_then(Symbol::as_bitmap) {
                desc.bit_width = backing.backing.bit_width;
                desc.signed = false;
            }
        }
        desc.modifiers = ty.modifiers;
        desc.overflow = ty.overflow;

        for dim in &ty.dims {
            match dim {
                ArrayLen::Literal(n) => desc.dims.push(ArrayDim::Literal(*n)),
                ArrayLen::Named(name) => match self.table.get_by_name(name) {
                    Some(sym)
                        if sym
                            .as_variable()
                            .map(|v| v.ty.modifiers.is_const && v.ty.is_integer())
                            .unwrap_or(false) =>
                    {
                        desc.dims.push(ArrayDim::Const(sym.id));
                    }
                    _ => {
                        self.errors.push(SymbolError::InvalidArrayLength {
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

/// Resolve a primitive type without table lookups, if possible
fn primitive_descriptor(ty: &TypeNode) -> Option<TypeDescriptor> {
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
        TypeKind::Named(_) => return None,
    };
    let mut desc = TypeDescriptor::scalar(base);
    desc.modifiers = ty.modifiers;
    desc.overflow = ty.overflow;
    // Dims may reference const symbols; only literal-only shapes resolve here
    for dim in &ty.dims {
        match dim {
            ArrayLen::Literal(n) => desc.dims.push(ArrayDim::Literal(*n)),
            ArrayLen::Named(_) => return None,
        }
    }
    Some(desc)
}

/// Fold a literal initializer to an integer, for const provability
fn fold_literal(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Int(v) => i64::try_from(*v).ok(),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => fold_literal(operand).map(|v| -v),
        _ => None,
    }
}
