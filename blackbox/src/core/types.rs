//! Shared deterministic types for the exploration pipeline.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::collections::BTreeMap;

/// One assignment of a single example value to every declared variable,
/// ordered like [`VariableSet::names`].
pub type InputTuple = Vec<String>;

/// Decoded program output: field name to value.
///
/// A `BTreeMap` keeps keys in lexicographic order, which is the order output
/// columns are derived in.
pub type OutputRecord = BTreeMap<String, String>;

/// One persisted row: input values followed by output values (or the header).
pub type ResultRow = Vec<String>;

/// One table row and the 1-based line it was read from.
///
/// Blank lines are skipped when reading, so `line` can run ahead of the row's
/// index in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub line: usize,
    pub cells: Vec<String>,
}

/// Declared variables and their example values, in table order.
///
/// `names[i]` owns the examples in `examples[i]`. Names are non-empty and
/// unique; every example set is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSet {
    pub names: Vec<String>,
    pub examples: Vec<Vec<String>>,
}

impl VariableSet {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Lifecycle of one exploration driver pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    NotStarted,
    Running,
    /// Every combination was invoked and emitted.
    Completed,
    /// An invocation or emission failed, or the run was cancelled.
    Failed,
}
