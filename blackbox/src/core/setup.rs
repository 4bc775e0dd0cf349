//! Parsing of variable-definition rows into a [`VariableSet`].
//!
//! Each row is `(variable name, comma-separated examples)`. Row numbers in
//! errors are the 1-based table lines the offending rows were read from.

use std::collections::HashSet;

use thiserror::Error;

use crate::core::types::{TableRow, VariableSet};

/// Characters stripped around a variable name.
const NAME_TRIM: &[char] = &['\t', ' ', '\n'];
/// Characters stripped around each example.
const EXAMPLE_TRIM: &[char] = &[' ', '\t'];

/// Malformed variable-definition input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("no variable definitions found")]
    NoRows,
    #[error("could not extract variable name from row {row}")]
    MissingName { row: usize },
    #[error("could not extract examples from row {row}")]
    MissingExamples { row: usize },
    #[error("duplicate variable name '{name}' in row {row}")]
    DuplicateName { row: usize, name: String },
}

/// Split an examples cell on commas, trimming each entry and dropping empties.
pub fn extract_examples(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(|example| example.trim_matches(EXAMPLE_TRIM))
        .filter(|example| !example.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse raw rows into ordered names and parallel example sets.
///
/// Cells beyond the second are ignored. Fails on the first offending row.
pub fn parse_variables(rows: &[TableRow]) -> Result<VariableSet, SetupError> {
    if rows.is_empty() {
        return Err(SetupError::NoRows);
    }

    let mut names = Vec::with_capacity(rows.len());
    let mut examples = Vec::with_capacity(rows.len());
    let mut seen = HashSet::new();

    for TableRow { line: row, cells } in rows {
        let row = *row;
        let name = cells
            .first()
            .map(|cell| cell.trim_matches(NAME_TRIM))
            .unwrap_or_default();
        if name.is_empty() {
            return Err(SetupError::MissingName { row });
        }
        let set = cells
            .get(1)
            .map(|cell| extract_examples(cell))
            .unwrap_or_default();
        if set.is_empty() {
            return Err(SetupError::MissingExamples { row });
        }
        if !seen.insert(name.to_string()) {
            return Err(SetupError::DuplicateName {
                row,
                name: name.to_string(),
            });
        }
        names.push(name.to_string());
        examples.push(set);
    }

    Ok(VariableSet { names, examples })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    fn table(rows: &[&[&str]]) -> Vec<TableRow> {
        rows.iter()
            .enumerate()
            .map(|(index, cells)| TableRow {
                line: index + 1,
                cells: row(cells),
            })
            .collect()
    }

    #[test]
    fn examples_are_trimmed_and_empties_dropped() {
        assert_eq!(
            extract_examples(" 1 ,\t2,, ,3\t"),
            vec!["1".to_string(), "2".to_string(), "3".to_string()]
        );
    }

    #[test]
    fn parses_names_and_examples_in_table_order() {
        let vars = parse_variables(&table(&[&["  x\t", "1, 2"], &["y", "a,b ,c"]]))
            .expect("parse");
        assert_eq!(vars.names, vec!["x", "y"]);
        assert_eq!(
            vars.examples,
            vec![row(&["1", "2"]), row(&["a", "b", "c"])]
        );
    }

    #[test]
    fn extra_cells_are_ignored() {
        let vars = parse_variables(&table(&[&["x", "1", "note"]])).expect("parse");
        assert_eq!(vars.examples, vec![row(&["1"])]);
    }

    #[test]
    fn empty_table_is_rejected() {
        assert_eq!(parse_variables(&[]), Err(SetupError::NoRows));
    }

    #[test]
    fn blank_name_reports_row() {
        let err = parse_variables(&table(&[&["x", "1"], &[" \t", "2"]])).unwrap_err();
        assert_eq!(err, SetupError::MissingName { row: 2 });
        assert_eq!(err.to_string(), "could not extract variable name from row 2");
    }

    #[test]
    fn missing_examples_cell_reports_row() {
        let err = parse_variables(&table(&[&["x"]])).unwrap_err();
        assert_eq!(err, SetupError::MissingExamples { row: 1 });
    }

    #[test]
    fn examples_of_only_separators_are_rejected() {
        let err = parse_variables(&table(&[&["x", " , ,\t"]])).unwrap_err();
        assert_eq!(err, SetupError::MissingExamples { row: 1 });
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = parse_variables(&table(&[&["x", "1"], &["x ", "2"]])).unwrap_err();
        assert_eq!(
            err,
            SetupError::DuplicateName {
                row: 2,
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn errors_report_the_line_the_row_came_from() {
        let rows = vec![
            TableRow {
                line: 2,
                cells: row(&["x", "1"]),
            },
            TableRow {
                line: 5,
                cells: row(&["y"]),
            },
        ];
        assert_eq!(
            parse_variables(&rows),
            Err(SetupError::MissingExamples { row: 5 })
        );
    }
}
