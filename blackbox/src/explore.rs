//! Exploration driver: one invocation per combination, rows out in order.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::columns::OutputColumns;
use crate::core::combinations::Combinations;
use crate::core::types::{DriverState, ResultRow, VariableSet};
use crate::error::FailureKind;
use crate::io::invoker::Invoker;
use crate::io::progress::Progress;

/// Result of a completed exploration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorationSummary {
    /// Combinations invoked successfully.
    pub combinations: usize,
    /// Rows emitted, header included.
    pub rows_emitted: usize,
    /// Output columns fixed by the first record (empty if nothing ran).
    pub columns: Vec<String>,
}

/// Drives the invoker over every combination of `variables`.
///
/// Combinations run sequentially in generator order. The first successful
/// record fixes the output columns and triggers the header row.
pub struct ExplorationDriver<'a, I: ?Sized, W: Write> {
    variables: &'a VariableSet,
    invoker: &'a I,
    progress: Progress<W>,
    cancel: Option<&'a AtomicBool>,
    state: DriverState,
}

impl<'a, I: Invoker + ?Sized, W: Write> ExplorationDriver<'a, I, W> {
    pub fn new(variables: &'a VariableSet, invoker: &'a I, progress: Progress<W>) -> Self {
        Self {
            variables,
            invoker,
            progress,
            cancel: None,
            state: DriverState::NotStarted,
        }
    }

    /// Stop before the next invocation once `flag` is set.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run every combination, handing each row to `emit`.
    ///
    /// Any invocation or emit failure stops the pass; remaining combinations
    /// are never run. Invocation failures carry [`FailureKind::Invocation`].
    #[instrument(skip_all, fields(variables = self.variables.len()))]
    pub fn run<F>(&mut self, mut emit: F) -> Result<ExplorationSummary>
    where
        F: FnMut(ResultRow) -> Result<()>,
    {
        self.state = DriverState::Running;
        let result = self.run_inner(&mut emit);
        self.state = match result {
            Ok(_) => DriverState::Completed,
            Err(_) => DriverState::Failed,
        };
        result
    }

    fn run_inner<F>(&mut self, emit: &mut F) -> Result<ExplorationSummary>
    where
        F: FnMut(ResultRow) -> Result<()>,
    {
        let combinations = Combinations::new(&self.variables.examples)
            .ok_or_else(|| anyhow!("combination count overflows"))?;
        let total = combinations.len();
        info!(total, "exploration started");

        let mut columns: Option<OutputColumns> = None;
        let mut rows_emitted = 0usize;
        let mut invoked = 0usize;

        for (offset, input) in combinations.enumerate() {
            let index = offset + 1;
            if self.cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                warn!(index, total, "exploration cancelled");
                return Err(anyhow!("exploration cancelled before combination {index}/{total}"));
            }

            self.progress.begin(index, total);
            let result = self.invoker.invoke(&self.variables.names, &input);
            self.progress.end();
            let record = result
                .with_context(|| format!("combination {index}/{total} {input:?}"))
                .context(FailureKind::Invocation)?;
            invoked += 1;

            let fixed = match columns.as_ref() {
                Some(fixed) => fixed,
                None => {
                    let fixed = OutputColumns::from_record(&record);
                    debug!(columns = ?fixed.names(), "output columns fixed");
                    emit(fixed.header(&self.variables.names)).context("emit header row")?;
                    rows_emitted += 1;
                    &*columns.insert(fixed)
                }
            };
            emit(fixed.row(&input, &record))
                .with_context(|| format!("emit row for combination {index}/{total}"))?;
            rows_emitted += 1;
        }

        info!(invoked, rows_emitted, "exploration completed");
        Ok(ExplorationSummary {
            combinations: invoked,
            rows_emitted,
            columns: columns
                .map(|fixed| fixed.names().to_vec())
                .unwrap_or_default(),
        })
    }
}
