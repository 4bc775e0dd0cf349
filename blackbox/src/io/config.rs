//! Harness configuration, read from `<workbook>/blackbox.toml` by default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File name looked up inside the workbook when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "blackbox.toml";

/// Harness configuration (TOML).
///
/// Missing fields default to the values in [`HarnessConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Table holding the variable definitions.
    pub inputs_table: String,

    /// Results go to a new table named `<prefix>_<unix seconds>`.
    pub result_table_prefix: String,

    /// Wall-clock budget for a single program invocation.
    pub invocation_timeout_secs: u64,

    /// Keep at most this many bytes of program stdout/stderr per invocation.
    pub output_limit_bytes: usize,

    /// Rows buffered between the driver and the sink (0 = hand-off).
    pub channel_capacity: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            inputs_table: "inputs".to_string(),
            result_table_prefix: "result".to_string(),
            invocation_timeout_secs: 60,
            output_limit_bytes: 1_000_000,
            channel_capacity: 0,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.inputs_table.trim().is_empty() {
            return Err(anyhow!("inputs_table must be non-empty"));
        }
        if self.result_table_prefix.trim().is_empty() {
            return Err(anyhow!("result_table_prefix must be non-empty"));
        }
        if self.invocation_timeout_secs == 0 {
            return Err(anyhow!("invocation_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.invocation_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate().with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
