//! Result sink: persists emitted rows in arrival order.

use std::sync::mpsc::Receiver;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::types::ResultRow;
use crate::io::workbook::FIRST_ROW_POSITION;

/// Destination that stores rows at sequential positions.
pub trait RowSink {
    /// Durably store `row` at `position` before returning.
    fn write_row(&mut self, position: usize, row: &ResultRow) -> Result<()>;
}

/// Drain `rows` into `sink` one at a time, starting at row 1.
///
/// Returns the number of rows written once the sending side hangs up. Stops at
/// the first write failure, which drops `rows` and so stops the producer too.
#[instrument(skip_all)]
pub fn record_results<S: RowSink>(sink: &mut S, rows: Receiver<ResultRow>) -> Result<usize> {
    let mut position = FIRST_ROW_POSITION;
    for row in rows {
        sink.write_row(position, &row)
            .with_context(|| format!("write result row {position}"))?;
        debug!(position, cells = row.len(), "row persisted");
        position += 1;
    }
    Ok(position - FIRST_ROW_POSITION)
}
