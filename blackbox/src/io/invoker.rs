//! Black-box program invocation.
//!
//! The [`Invoker`] trait decouples the exploration driver from the actual
//! program backend. Tests use scripted invokers that return predetermined
//! records without spawning processes.
//!
//! Protocol: the program is started with no arguments, receives one JSON object
//! (variable name to value) on stdin followed by EOF, and must print one JSON
//! object of string fields on stdout and exit with status 0.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, instrument, warn};

use crate::core::types::OutputRecord;
use crate::io::config::HarnessConfig;
use crate::io::process::{CommandOutput, run_command_with_timeout};

/// Abstraction over black-box backends.
pub trait Invoker {
    /// Run the program once for `values` (ordered like `names`).
    fn invoke(&self, names: &[String], values: &[String]) -> Result<OutputRecord>;
}

/// Invoker that spawns an executable once per combination.
#[derive(Debug, Clone)]
pub struct ProgramInvoker {
    pub program: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl ProgramInvoker {
    pub fn new(program: impl Into<PathBuf>, config: &HarnessConfig) -> Self {
        Self {
            program: program.into(),
            timeout: config.invocation_timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    /// Turn a finished run into a record.
    ///
    /// Timeout, exit status, and decoding are judged first; a stdin write
    /// error only fails an otherwise successful run.
    fn read_output(&self, output: CommandOutput) -> Result<OutputRecord> {
        if output.timed_out {
            return Err(anyhow!("program timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "program failed");
            let stderr = output.stderr_text();
            if stderr.is_empty() {
                bail!("program exited with status {:?}", output.status.code());
            }
            bail!(
                "program exited with status {:?}: {}",
                output.status.code(),
                stderr
            );
        }
        if output.stdout_truncated > 0 {
            bail!(
                "program output exceeded {} bytes ({} bytes truncated)",
                self.output_limit_bytes,
                output.stdout_truncated
            );
        }
        let record = decode_response(&output.stdout)?;
        if let Some(err) = output.stdin_error {
            return Err(err.context("feed request to program"));
        }

        debug!(fields = record.len(), "program output decoded");
        Ok(record)
    }
}

impl Invoker for ProgramInvoker {
    #[instrument(skip_all, fields(program = %self.program.display(), timeout_secs = self.timeout.as_secs()))]
    fn invoke(&self, names: &[String], values: &[String]) -> Result<OutputRecord> {
        let request = encode_request(names, values)?;
        let output = run_command_with_timeout(
            Command::new(&self.program),
            Some(request),
            self.timeout,
            self.output_limit_bytes,
        )
        .with_context(|| format!("run {}", self.program.display()))?;
        self.read_output(output)
    }
}

/// Encode `values` keyed by `names` as one JSON object.
pub fn encode_request(names: &[String], values: &[String]) -> Result<Vec<u8>> {
    if names.len() != values.len() {
        bail!(
            "input has {} values for {} variables",
            values.len(),
            names.len()
        );
    }
    let request: BTreeMap<&str, &str> = names
        .iter()
        .map(String::as_str)
        .zip(values.iter().map(String::as_str))
        .collect();
    serde_json::to_vec(&request).context("encode request")
}

/// Decode program stdout as a flat object of string fields.
pub fn decode_response(stdout: &[u8]) -> Result<OutputRecord> {
    serde_json::from_slice(stdout).context("decode program output as a flat JSON object of strings")
}
