//! File-backed workbook: a directory of append-only tables.
//!
//! Each table is `<name>.jsonl`, one JSON array of string cells per line. Rows
//! are addressed by 1-based position in file order.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, instrument};

use crate::core::types::{ResultRow, TableRow};
use crate::io::sink::RowSink;

const TABLE_EXTENSION: &str = "jsonl";

/// Position of the first row in every table.
pub const FIRST_ROW_POSITION: usize = 1;

/// Handle to a workbook directory.
#[derive(Debug, Clone)]
pub struct Workbook {
    root: PathBuf,
}

impl Workbook {
    /// Open an existing workbook directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(anyhow!("workbook {} is not a directory", root.display()));
        }
        Ok(Self { root })
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{TABLE_EXTENSION}"))
    }

    /// Read the cells of every row of `name`, skipping blank lines.
    pub fn read_rows(&self, name: &str) -> Result<Vec<Vec<String>>> {
        let rows = self.read_table(name)?;
        Ok(rows.into_iter().map(|row| row.cells).collect())
    }

    /// Read every row of `name` with the line it sits on, skipping blank lines.
    #[instrument(skip(self))]
    pub fn read_table(&self, name: &str) -> Result<Vec<TableRow>> {
        validate_table_name(name)?;
        let path = self.table_path(name);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("read table {}", path.display()))?;
        let mut rows = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_number = index + 1;
            let cells: Vec<String> = serde_json::from_str(line).with_context(|| {
                format!(
                    "parse {} line {line_number} as an array of strings",
                    path.display()
                )
            })?;
            rows.push(TableRow {
                line: line_number,
                cells,
            });
        }
        debug!(rows = rows.len(), "table read");
        Ok(rows)
    }

    /// Create a new, empty table and return a writer positioned at row 1.
    ///
    /// Fails if a table with this name already exists.
    #[instrument(skip(self))]
    pub fn create_table(&self, name: &str) -> Result<TableWriter> {
        validate_table_name(name)?;
        let path = self.table_path(name);
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                bail!("table '{name}' already exists at {}", path.display());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("create table {}", path.display()));
            }
        };
        info!(path = %path.display(), "created table");
        Ok(TableWriter {
            name: name.to_string(),
            path,
            file,
            next_position: FIRST_ROW_POSITION,
        })
    }
}

/// Table names are plain file stems: no separators, no leading dot.
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("table name must be non-empty");
    }
    if name.starts_with('.') || name.contains(['/', '\\']) {
        bail!("invalid table name '{name}'");
    }
    Ok(())
}

/// Sequential writer for one freshly created table.
#[derive(Debug)]
pub struct TableWriter {
    name: String,
    path: PathBuf,
    file: File,
    next_position: usize,
}

impl TableWriter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position the next row must be written at.
    pub fn next_position(&self) -> usize {
        self.next_position
    }
}

impl RowSink for TableWriter {
    /// Append `row` at `position`, then flush and sync it to disk.
    fn write_row(&mut self, position: usize, row: &ResultRow) -> Result<()> {
        if position != self.next_position {
            bail!(
                "table '{}' expects row {} but got row {}",
                self.name,
                self.next_position,
                position
            );
        }
        let mut line = serde_json::to_string(row).context("serialize row")?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .with_context(|| format!("write row {position} to {}", self.path.display()))?;
        self.file
            .flush()
            .with_context(|| format!("flush {}", self.path.display()))?;
        self.file
            .sync_data()
            .with_context(|| format!("sync {}", self.path.display()))?;
        self.next_position += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn open_requires_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(Workbook::open(temp.path().join("missing")).is_err());
        assert!(Workbook::open(temp.path()).is_ok());
    }

    #[test]
    fn read_rows_skips_blank_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(
            temp.path().join("inputs.jsonl"),
            "[\"x\", \"1, 2\"]\n\n[\"y\", \"a\"]\n",
        )
        .expect("write");

        let rows = Workbook::open(temp.path())
            .expect("open")
            .read_rows("inputs")
            .expect("read");
        assert_eq!(rows, vec![strings(&["x", "1, 2"]), strings(&["y", "a"])]);
    }

    #[test]
    fn read_table_keeps_line_numbers_across_blank_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(
            temp.path().join("inputs.jsonl"),
            "\n[\"x\", \"1\"]\n\n[\"y\"]\n",
        )
        .expect("write");

        let rows = Workbook::open(temp.path())
            .expect("open")
            .read_table("inputs")
            .expect("read");
        let lines: Vec<usize> = rows.iter().map(|row| row.line).collect();
        assert_eq!(lines, vec![2, 4]);
        assert_eq!(rows[1].cells, strings(&["y"]));
    }

    #[test]
    fn read_rows_reports_bad_line() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("inputs.jsonl"), "[\"x\", \"1\"]\n[\"y\", 2]\n").expect("write");

        let err = Workbook::open(temp.path())
            .expect("open")
            .read_rows("inputs")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn missing_table_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workbook = Workbook::open(temp.path()).expect("open");
        assert!(workbook.read_rows("inputs").is_err());
    }

    #[test]
    fn writer_appends_rows_in_position_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workbook = Workbook::open(temp.path()).expect("open");
        let mut writer = workbook.create_table("result_1").expect("create");

        writer.write_row(1, &strings(&["x", "sum"])).expect("row 1");
        writer.write_row(2, &strings(&["1", "2"])).expect("row 2");
        assert_eq!(writer.next_position(), 3);

        let rows = workbook.read_rows("result_1").expect("read back");
        assert_eq!(rows, vec![strings(&["x", "sum"]), strings(&["1", "2"])]);
    }

    #[test]
    fn writer_rejects_out_of_sequence_position() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workbook = Workbook::open(temp.path()).expect("open");
        let mut writer = workbook.create_table("result_1").expect("create");

        let err = writer.write_row(2, &strings(&["x"])).unwrap_err();
        assert!(err.to_string().contains("expects row 1 but got row 2"));
    }

    #[test]
    fn create_table_refuses_existing_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workbook = Workbook::open(temp.path()).expect("open");
        workbook.create_table("result_1").expect("create");

        let err = workbook.create_table("result_1").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn table_names_must_be_plain() {
        assert!(validate_table_name("result_17").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("../escape").is_err());
        assert!(validate_table_name(".hidden").is_err());
    }
}
