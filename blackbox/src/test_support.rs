//! Test-only helpers: scripted invokers, recording sinks, and fixtures.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::core::types::{InputTuple, OutputRecord, ResultRow, VariableSet};
use crate::io::invoker::Invoker;
use crate::io::sink::RowSink;

/// Build a [`VariableSet`] from `(name, examples)` pairs.
pub fn variables(defs: &[(&str, &[&str])]) -> VariableSet {
    VariableSet {
        names: defs.iter().map(|(name, _)| name.to_string()).collect(),
        examples: defs
            .iter()
            .map(|(_, examples)| examples.iter().map(|value| value.to_string()).collect())
            .collect(),
    }
}

/// Build an [`OutputRecord`] from `(field, value)` pairs.
pub fn record(pairs: &[(&str, &str)]) -> OutputRecord {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Invoker that replays queued outcomes and records every input it sees.
///
/// Queued `Err` strings become invocation errors. With [`ScriptedInvoker::repeating`]
/// the same record is returned for every call.
pub struct ScriptedInvoker {
    queue: Mutex<VecDeque<Result<OutputRecord, String>>>,
    fallback: Option<OutputRecord>,
    calls: Mutex<Vec<InputTuple>>,
    delay: Duration,
}

impl ScriptedInvoker {
    pub fn new(outcomes: Vec<Result<OutputRecord, String>>) -> Self {
        Self {
            queue: Mutex::new(outcomes.into()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn repeating(output: OutputRecord) -> Self {
        Self {
            fallback: Some(output),
            ..Self::new(Vec::new())
        }
    }

    /// Sleep this long inside every invocation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Inputs passed to `invoke`, in call order.
    pub fn calls(&self) -> Vec<InputTuple> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl Invoker for ScriptedInvoker {
    fn invoke(&self, _names: &[String], values: &[String]) -> Result<OutputRecord> {
        self.calls
            .lock()
            .map_err(|_| anyhow!("calls lock poisoned"))?
            .push(values.to_vec());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let next = self
            .queue
            .lock()
            .map_err(|_| anyhow!("queue lock poisoned"))?
            .pop_front();
        match (next, &self.fallback) {
            (Some(Ok(output)), _) => Ok(output),
            (Some(Err(message)), _) => Err(anyhow!(message)),
            (None, Some(output)) => Ok(output.clone()),
            (None, None) => Err(anyhow!("scripted invoker exhausted")),
        }
    }
}

/// Sink that keeps rows in memory, optionally slow or failing at a position.
///
/// Clones share storage, so a clone handed to the pipeline can be inspected
/// afterwards through the original.
#[derive(Clone, Default)]
pub struct RecordingSink {
    rows: Arc<Mutex<Vec<(usize, ResultRow)>>>,
    fail_at: Option<usize>,
    delay: Duration,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when asked to write `position`.
    pub fn failing_at(position: usize) -> Self {
        Self {
            fail_at: Some(position),
            ..Self::default()
        }
    }

    /// Sleep this long before storing every row.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `(position, row)` pairs in write order.
    pub fn rows(&self) -> Vec<(usize, ResultRow)> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }
}

impl RowSink for RecordingSink {
    fn write_row(&mut self, position: usize, row: &ResultRow) -> Result<()> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail_at == Some(position) {
            return Err(anyhow!("scripted write failure at row {position}"));
        }
        self.rows
            .lock()
            .map_err(|_| anyhow!("rows lock poisoned"))?
            .push((position, row.clone()));
        Ok(())
    }
}

/// Write an executable `/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_program(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .with_context(|| format!("write program {}", path.display()))?;
    let mut perms = std::fs::metadata(&path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms)
        .with_context(|| format!("chmod {}", path.display()))?;
    Ok(path)
}

/// Write a workbook `inputs` table from `(name, examples cell)` rows.
pub fn write_inputs(workbook: &Path, rows: &[(&str, &str)]) -> Result<()> {
    let mut buf = String::new();
    for (name, examples) in rows {
        buf.push_str(&serde_json::to_string(&[name, examples])?);
        buf.push('\n');
    }
    let path = workbook.join("inputs.jsonl");
    std::fs::write(&path, buf).with_context(|| format!("write {}", path.display()))
}
