//! Failure classification attached to error chains.
//!
//! Every fatal error carries one [`FailureKind`] as anyhow context, recovered
//! with `downcast_ref` to pick the process exit code.

use std::fmt;

/// Stage a fatal error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Config file or variable definitions are unusable.
    Config,
    /// The black-box program could not be run or answered badly.
    Invocation,
    /// Result rows could not be persisted.
    Sink,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "configuration error",
            Self::Invocation => "invocation error",
            Self::Sink => "result sink error",
        };
        f.write_str(label)
    }
}

/// Find the failure kind recorded anywhere in `err`'s chain.
pub fn failure_kind(err: &anyhow::Error) -> Option<FailureKind> {
    err.downcast_ref::<FailureKind>().copied()
}
