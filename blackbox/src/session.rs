//! Orchestration for one exploration session.
//!
//! A session reads the variable definitions from the workbook, creates a fresh
//! result table named after the start time, and streams every combination's
//! row into it.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::core::combinations::combination_count;
use crate::core::setup::parse_variables;
use crate::error::FailureKind;
use crate::io::config::HarnessConfig;
use crate::io::invoker::ProgramInvoker;
use crate::io::workbook::Workbook;
use crate::pipeline::{PipelineOptions, run_pipeline};

/// Inputs for [`run_session`].
#[derive(Debug, Clone)]
pub struct SessionRequest<'a> {
    pub workbook: &'a Path,
    pub program: &'a Path,
    pub config: &'a HarnessConfig,
    pub show_progress: bool,
}

/// Outcome of a successful session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Name of the table the results were written to.
    pub table: String,
    pub variables: usize,
    pub combinations: usize,
    /// Rows persisted, header included.
    pub rows_written: usize,
    pub columns: Vec<String>,
}

/// Result table name for a run started at `started_at`.
pub fn result_table_name(prefix: &str, started_at: DateTime<Utc>) -> String {
    format!("{prefix}_{}", started_at.timestamp())
}

/// Run one exploration session end to end.
#[instrument(skip_all, fields(workbook = %request.workbook.display(), program = %request.program.display()))]
pub fn run_session(request: &SessionRequest<'_>) -> Result<SessionOutcome> {
    let started_at = Utc::now();
    let config = request.config;

    let workbook = Workbook::open(request.workbook).context(FailureKind::Config)?;
    let rows = workbook
        .read_table(&config.inputs_table)
        .context(FailureKind::Config)?;
    let variables = parse_variables(&rows)
        .with_context(|| format!("table '{}'", config.inputs_table))
        .context(FailureKind::Config)?;
    let total = combination_count(&variables.examples)
        .ok_or_else(|| anyhow!("combination count overflows"))
        .context(FailureKind::Config)?;
    info!(
        combinations = total,
        variables = variables.len(),
        "got {total} input sets for {} variables",
        variables.len()
    );

    let table = result_table_name(&config.result_table_prefix, started_at);
    let mut writer = workbook
        .create_table(&table)
        .context(FailureKind::Sink)?;
    debug!(table = writer.name(), "result table ready");

    let invoker = ProgramInvoker::new(request.program, config);
    let options = PipelineOptions {
        channel_capacity: config.channel_capacity,
        show_progress: request.show_progress,
    };
    let outcome = run_pipeline(&variables, &invoker, &mut writer, &options)
        .with_context(|| format!("explore into table '{table}'"))?;

    Ok(SessionOutcome {
        table,
        variables: variables.len(),
        combinations: outcome.exploration.combinations,
        rows_written: outcome.rows_written,
        columns: outcome.exploration.columns,
    })
}
