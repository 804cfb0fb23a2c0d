//! Constant folding for static provability
//!
//! "Statically provable" means provable by this folder: integer literals,
//! const integer symbols with literal initializers, enum variants, unary
//! `-`/`~`, and integer arithmetic over provable operands. Anything else
//! evaluates to `None`, and callers must stay silent: the type rules have
//! a zero-false-positive contract.

use crate::{Resolution, ResolvedReferences};
use basalt_ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use basalt_symbols::SymbolTable;

/// Evaluate an integer-valued expression, if statically provable.
/// Resolutions for the expression's identifier nodes must already be
/// recorded.
pub fn eval_int(table: &SymbolTable, refs: &ResolvedReferences, expr: &Expr) -> Option<i128> {
    match &expr.kind {
        ExprKind::Int(v) => Some(*v),

        ExprKind::Ident(_) | ExprKind::Member { .. } => match refs.get(expr.id)? {
            Resolution::Symbol(id) => {
                let sym = table.get(*id)?;
                sym.as_variable()?.const_value.map(i128::from)
            }
            Resolution::EnumVariant { enum_id, variant } => {
                let data = table.get(*enum_id)?.as_enum()?;
                data.variants.get(*variant).map(|v| i128::from(v.value))
            }
            _ => None,
        },

        ExprKind::Unary { op, operand } => {
            let v = eval_int(table, refs, operand)?;
            match op {
                UnaryOp::Neg => Some(-v),
                UnaryOp::BitNot => Some(!v),
                UnaryOp::Not => None,
            }
        }

        ExprKind::Binary { op, lhs, rhs } => {
            let a = eval_int(table, refs, lhs)?;
            let b = eval_int(table, refs, rhs)?;
            match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                BinaryOp::Rem => a.checked_rem(b),
                BinaryOp::BitAnd => Some(a & b),
                BinaryOp::BitOr => Some(a | b),
                BinaryOp::BitXor => Some(a ^ b),
                BinaryOp::Shl => u32::try_from(b).ok().and_then(|s| a.checked_shl(s)),
                BinaryOp::Shr => u32::try_from(b).ok().and_then(|s| a.checked_shr(s)),
                _ => None,
            }
        }

        _ => None,
    }
}
