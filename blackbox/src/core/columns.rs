//! Stable output column order and result row assembly.

use crate::core::types::{OutputRecord, ResultRow};

/// Output field names fixed by the first successful invocation.
///
/// Columns are sorted lexicographically. Later records are projected onto this
/// set: unknown fields are dropped and absent fields render as `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumns {
    names: Vec<String>,
}

impl OutputColumns {
    pub fn from_record(record: &OutputRecord) -> Self {
        let mut names: Vec<String> = record.keys().cloned().collect();
        names.sort();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Header row: variable names followed by output column names.
    pub fn header(&self, variables: &[String]) -> ResultRow {
        variables.iter().chain(&self.names).cloned().collect()
    }

    /// Data row: input values followed by the record projected onto the columns.
    pub fn row(&self, input: &[String], record: &OutputRecord) -> ResultRow {
        let mut row = Vec::with_capacity(input.len() + self.names.len());
        row.extend_from_slice(input);
        row.extend(
            self.names
                .iter()
                .map(|name| record.get(name).cloned().unwrap_or_default()),
        );
        row
    }
}
