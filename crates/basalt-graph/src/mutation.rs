//! Per-function mutation analysis
//!
//! Records, for every function body, which of its own parameters and which
//! program-level variables it writes directly, and builds the call graph
//! with argument-root bindings for the global propagation pass. Precision
//! is whole-object: a write to any field, element, or bit of `p` marks `p`.

use crate::{ArgRoot, CallGraph, CallSite};
use basalt_ast::*;
use basalt_checker::{Resolution, ResolvedReferences};
use basalt_symbols::{SymbolId, SymbolKind, SymbolTable};
use std::collections::HashSet;

/// Direct effects of one function body
#[derive(Debug, Clone)]
pub struct LocalMutationInfo {
    pub function: SymbolId,
    /// Parameter indices written directly
    pub written_params: HashSet<usize>,
    /// Program-level variables written directly
    pub written_vars: HashSet<SymbolId>,
}

/// Output of the local pass: one record per function plus the call graph
#[derive(Debug)]
pub struct MutationAnalysis {
    pub locals: Vec<LocalMutationInfo>,
    pub call_graph: CallGraph,
}

/// Analyze every function body in the program. References must already be
/// resolved; unresolved programs never reach this phase.
pub fn analyze_mutations(
    program: &Program,
    table: &SymbolTable,
    refs: &ResolvedReferences,
) -> MutationAnalysis {
    let mut analyzer = MutationAnalyzer {
        table,
        refs,
        locals: Vec::new(),
        call_graph: CallGraph::new(),
        current: None,
    };

    for file in &program.files {
        for decl in &file.declarations {
            analyzer.visit_declaration(decl, None);
        }
    }

    MutationAnalysis {
        locals: analyzer.locals,
        call_graph: analyzer.call_graph,
    }
}

struct MutationAnalyzer<'a> {
    table: &'a SymbolTable,
    refs: &'a ResolvedReferences,
    locals: Vec<LocalMutationInfo>,
    call_graph: CallGraph,
    current: Option<LocalMutationInfo>,
}

impl<'a> MutationAnalyzer<'a> {
    fn visit_declaration(&mut self, decl: &Declaration, scope: Option<&str>) {
        match &decl.kind {
            DeclarationKind::Scope(s) => {
                for member in &s.members {
                    self.visit_declaration(member, Some(&s.name));
                }
            }
            DeclarationKind::Function(f) => {
                let Some(body) = &f.body else { return };
                let qname = match scope {
                    Some(s) => format!("{}_{}", s, f.name),
                    None => f.name.clone(),
                };
                let Some(id) = self.table.id_of(&qname) else {
                    return;
                };
                self.current = Some(LocalMutationInfo {
                    function: id,
                    written_params: HashSet::new(),
                    written_vars: HashSet::new(),
                });
                self.visit_block(body);
                if let Some(info) = self.current.take() {
                    self.locals.push(info);
                }
            }
            _ => {}
        }
    }

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.visit_statement(stmt);
        }
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        match &stmt.kind {
            StatementKind::Local(decl) => {
                if let Some(init) = &decl.init {
                    self.visit_expr(init);
                }
            }
            StatementKind::Assign { target, value, .. } => {
                self.record_write(target);
                // Index and offset expressions inside the target can still
                // contain calls
                self.visit_expr(target);
                self.visit_expr(value);
            }
            StatementKind::Expr(expr) => self.visit_expr(expr),
            StatementKind::Return(value) => {
                if let Some(v) = value {
                    self.visit_expr(v);
                }
            }
            StatementKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.visit_expr(condition);
                self.visit_block(then_block);
                if let Some(e) = else_block {
                    self.visit_block(e);
                }
            }
            StatementKind::While { condition, body } => {
                self.visit_expr(condition);
                self.visit_block(body);
            }
            StatementKind::For {
                init,
                condition,
                step,
                body,
            } => {
                if let Some(i) = init {
                    self.visit_statement(i);
                }
                if let Some(c) = condition {
                    self.visit_expr(c);
                }
                if let Some(s) = step {
                    self.visit_statement(s);
                }
                self.visit_block(body);
            }
            StatementKind::Switch {
                scrutinee,
                cases,
                default_block,
            } => {
                self.visit_expr(scrutinee);
                for case in cases {
                    self.visit_expr(&case.value);
                    self.visit_block(&case.body);
                }
                if let Some(d) = default_block {
                    self.visit_block(d);
                }
            }
            StatementKind::Critical(block) => self.visit_block(block),
        }
    }

    /// Record a direct write through an lvalue at whole-object granularity
    fn record_write(&mut self, target: &Expr) {
        let root = target.access_root();
        let Some(info) = self.current.as_mut() else {
            return;
        };
        match self.refs.get(root.id) {
            Some(Resolution::Param { function, index }) if *function == info.function => {
                info.written_params.insert(*index);
            }
            Some(Resolution::Symbol(id)) => {
                if let Some(sym) = self.table.get(*id) {
                    if matches!(sym.kind, SymbolKind::Variable | SymbolKind::Register) {
                        info.written_vars.insert(*id);
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Call(call) => {
                for arg in &call.args {
                    self.visit_expr(arg);
                }
                self.record_call(expr, call);
            }
            ExprKind::ArrayIndex { base, index } => {
                self.visit_expr(base);
                self.visit_expr(index);
            }
            ExprKind::BitAccess {
                base,
                offset,
                width,
            } => {
                self.visit_expr(base);
                self.visit_expr(offset);
                self.visit_expr(width);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
            ExprKind::Unary { operand, .. } => self.visit_expr(operand),
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.visit_expr(condition);
                self.visit_expr(then_expr);
                self.visit_expr(else_expr);
            }
            ExprKind::Ident(_)
            | ExprKind::Member { .. }
            | ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_) => {}
        }
    }

    fn record_call(&mut self, expr: &Expr, call: &CallExpr) {
        let Some(info) = self.current.as_ref() else {
            return;
        };
        let caller = info.function;
        let Some(callee) = self.refs.symbol_of(expr.id) else {
            return;
        };

        let bindings = call
            .args
            .iter()
            .enumerate()
            .map(|(position, arg)| (position, self.arg_root(caller, arg)))
            .collect();

        self.call_graph.add_site(CallSite {
            caller,
            callee,
            span: expr.span,
            bindings,
        });
    }

    fn arg_root(&self, caller: SymbolId, arg: &Expr) -> ArgRoot {
        let root = arg.access_root();
        match self.refs.get(root.id) {
            Some(Resolution::Param { function, index }) if *function == caller => {
                ArgRoot::CallerParam(*index)
            }
            Some(Resolution::Symbol(id)) => {
                match self.table.get(*id).map(|s| s.kind) {
                    Some(SymbolKind::Variable) | Some(SymbolKind::Register) => {
                        ArgRoot::ProgramVar(*id)
                    }
                    _ => ArgRoot::Other,
                }
            }
            _ => ArgRoot::Other,
        }
    }
}
