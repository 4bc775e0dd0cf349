//! Exploratory black-box test harness.
//!
//! Every combination of declared example values is fed to an external program
//! over a JSON stdin/stdout protocol, and the combined input and output rows
//! are streamed into a workbook table as they are produced. The architecture
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (definition parsing, cartesian
//!   product, column ordering). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, child processes, tables).
//!   Isolated behind traits so tests can script them.
//!
//! Orchestration modules ([`explore`], [`pipeline`], [`session`]) coordinate
//! core logic with I/O to implement the CLI.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod explore;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
