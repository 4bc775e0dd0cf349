//! I/O adapters for the harness: configuration, child processes, and tables.

pub mod config;
pub mod invoker;
pub mod process;
pub mod progress;
pub mod sink;
pub mod workbook;
