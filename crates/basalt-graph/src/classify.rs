//! Parameter passing classification
//!
//! A pure function of the stable `ModificationSet` and each parameter's
//! `TypeDescriptor`. Nothing downstream may assign a passing mode ad hoc;
//! this is the single place the decision is made.

use crate::ModificationSet;
use basalt_symbols::{PassingMode, SymbolId, SymbolTable, TypeDescriptor};
use std::collections::HashMap;

/// Policy knobs. The by-value threshold is a performance policy, not part
/// of the semantic contract; tests treat it as implementation-defined.
#[derive(Debug, Clone, Copy)]
pub struct PassingConfig {
    /// Unmodified scalar integers at or below this width pass by value
    pub max_by_value_bits: u16,
}

impl Default for PassingConfig {
    fn default() -> Self {
        Self {
            max_by_value_bits: 32,
        }
    }
}

/// Final by-value/by-reference decision per `(function, parameter index)`
#[derive(Debug, Default)]
pub struct PassingDecisions {
    map: HashMap<(SymbolId, usize), PassingMode>,
}

impl PassingDecisions {
    pub fn get(&self, function: SymbolId, index: usize) -> Option<PassingMode> {
        self.map.get(&(function, index)).copied()
    }

    /// Look up by qualified function name, for consumers holding the table
    pub fn get_by_name(
        &self,
        table: &SymbolTable,
        function: &str,
        index: usize,
    ) -> Option<PassingMode> {
        self.get(table.id_of(function)?, index)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(SymbolId, usize), &PassingMode)> {
        self.map.iter()
    }
}

/// Classify every parameter of every function. Applied only after the
/// fixed point is reached.
pub fn classify_parameters(
    table: &SymbolTable,
    modifications: &ModificationSet,
    config: &PassingConfig,
) -> PassingDecisions {
    let mut decisions = PassingDecisions::default();

    for sym in table.functions() {
        let Some(data) = sym.as_function() else {
            continue;
        };
        for (index, param) in data.params.iter().enumerate() {
            let mutated = modifications.is_param_mutated(sym.id, index);
            decisions
                .map
                .insert((sym.id, index), classify_one(&param.ty, mutated, config));
        }
    }

    decisions
}

fn classify_one(ty: &TypeDescriptor, mutated: bool, config: &PassingConfig) -> PassingMode {
    // Scalar floats, bools, and enums always pass by value
    if ty.is_float() || ty.is_bool() || ty.is_enum() {
        return PassingMode::ByValue;
    }

    // Structs, arrays, and bounded strings are never demoted to by-value
    if ty.is_aggregate() {
        return if mutated {
            PassingMode::ByMutablePointer
        } else {
            PassingMode::ByConstPointer
        };
    }

    // Fixed-width integers (and bitmaps over them) default to references;
    // small unmodified ones are reclassified for efficiency
    if mutated {
        PassingMode::ByMutablePointer
    } else if ty.bit_width <= config.max_by_value_bits {
        PassingMode::ByValue
    } else {
        PassingMode::ByConstPointer
    }
}
