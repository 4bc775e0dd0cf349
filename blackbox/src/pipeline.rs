//! Concurrent producer/consumer pipeline.
//!
//! The exploration driver and the result sink run on two scoped threads joined
//! by a bounded row channel. Both report on one outcome channel; the
//! coordinator reacts to whichever outcome arrives first:
//!
//! - sink failure: the run fails with the sink error. The driver is cancelled
//!   (cancel flag plus the dropped row receiver) and joined when the scope
//!   ends, after at most its in-flight invocation.
//! - driver failure: the sink drains rows already emitted, then the run fails
//!   with the driver error (unless the sink failed meanwhile).
//! - driver success: the run succeeds once the sink has written every row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::types::{ResultRow, VariableSet};
use crate::error::FailureKind;
use crate::explore::{ExplorationDriver, ExplorationSummary};
use crate::io::invoker::Invoker;
use crate::io::progress::Progress;
use crate::io::sink::{RowSink, record_results};

/// Knobs for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Rows buffered between driver and sink (0 = hand-off).
    pub channel_capacity: usize,
    /// Write the progress line to stderr.
    pub show_progress: bool,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub exploration: ExplorationSummary,
    /// Rows the sink persisted, header included.
    pub rows_written: usize,
}

/// Completion report from one of the two pipeline tasks.
#[derive(Debug)]
enum TaskOutcome {
    Driver(Result<ExplorationSummary>),
    Sink(Result<usize>),
}

/// Explore every combination of `variables`, streaming rows into `sink`.
#[instrument(skip_all, fields(variables = variables.len(), channel_capacity = options.channel_capacity))]
pub fn run_pipeline<I, S>(
    variables: &VariableSet,
    invoker: &I,
    sink: &mut S,
    options: &PipelineOptions,
) -> Result<PipelineOutcome>
where
    I: Invoker + Sync + ?Sized,
    S: RowSink + Send,
{
    let cancel = AtomicBool::new(false);
    let (rows_tx, rows_rx) = mpsc::sync_channel::<ResultRow>(options.channel_capacity);
    let (outcome_tx, outcome_rx) = mpsc::channel::<TaskOutcome>();

    thread::scope(|scope| {
        let sink_outcomes = outcome_tx.clone();
        scope.spawn(move || {
            let result = record_results(sink, rows_rx).context(FailureKind::Sink);
            let _ = sink_outcomes.send(TaskOutcome::Sink(result));
        });

        let driver_outcomes = outcome_tx;
        let cancel = &cancel;
        let show_progress = options.show_progress;
        scope.spawn(move || {
            let progress = if show_progress {
                Progress::stderr()
            } else {
                Progress::silent()
            };
            let mut driver = ExplorationDriver::new(variables, invoker, progress).with_cancel(cancel);
            let result = driver.run(|row| {
                rows_tx
                    .send(row)
                    .map_err(|_| anyhow!("result sink stopped accepting rows"))
            });
            drop(rows_tx);
            let _ = driver_outcomes.send(TaskOutcome::Driver(result));
        });

        await_outcomes(&outcome_rx, cancel)
    })
}

/// Wait for both tasks, short-circuiting on a sink failure.
fn await_outcomes(
    outcomes: &mpsc::Receiver<TaskOutcome>,
    cancel: &AtomicBool,
) -> Result<PipelineOutcome> {
    let mut exploration: Option<Result<ExplorationSummary>> = None;
    let mut rows_written: Option<usize> = None;

    while exploration.is_none() || rows_written.is_none() {
        let outcome = outcomes
            .recv()
            .map_err(|_| anyhow!("pipeline task exited without reporting an outcome"))?;
        match outcome {
            TaskOutcome::Sink(Err(err)) => {
                let message = format!("{err:#}");
                warn!(err = %message, "result sink failed, cancelling exploration");
                cancel.store(true, Ordering::SeqCst);
                return Err(err);
            }
            TaskOutcome::Sink(Ok(written)) => {
                debug!(written, "sink finished");
                rows_written = Some(written);
            }
            TaskOutcome::Driver(result) => {
                if let Err(err) = &result {
                    let message = format!("{err:#}");
                    warn!(err = %message, "exploration failed, draining sink");
                }
                exploration = Some(result);
            }
        }
    }

    match (exploration, rows_written) {
        (Some(Ok(exploration)), Some(rows_written)) => {
            info!(rows_written, combinations = exploration.combinations, "pipeline completed");
            Ok(PipelineOutcome {
                exploration,
                rows_written,
            })
        }
        (Some(Err(err)), _) => Err(err),
        _ => Err(anyhow!("pipeline finished without both outcomes")),
    }
}
