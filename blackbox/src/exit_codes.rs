//! Stable exit codes for the blackbox CLI.

use crate::error::{FailureKind, failure_kind};

/// Every combination ran and every row was written.
pub const OK: i32 = 0;
/// Failed for a reason outside the classified stages.
pub const FAILED: i32 = 1;
/// Bad command line (reported by clap).
pub const USAGE: i32 = 2;
/// Config file or variable definitions are invalid; nothing was invoked.
pub const CONFIG: i32 = 3;
/// The black-box program failed for some combination.
pub const INVOCATION: i32 = 4;
/// Results could not be written.
pub const SINK: i32 = 5;

/// Exit code for a fatal error.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match failure_kind(err) {
        Some(FailureKind::Config) => CONFIG,
        Some(FailureKind::Invocation) => INVOCATION,
        Some(FailureKind::Sink) => SINK,
        None => FAILED,
    }
}
