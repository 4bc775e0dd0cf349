//! Progress line for the diagnostic stream.
//!
//! Progress is written as ` ===> [i/n] <===` before each invocation and a
//! carriage return after it, so the line is overwritten in place on a
//! terminal. It never shares a stream with result rows.

use std::io::{self, Stderr, Write};

use tracing::debug;

/// Writes combination progress to an optional writer.
#[derive(Debug)]
pub struct Progress<W: Write> {
    out: Option<W>,
}

impl Progress<Stderr> {
    pub fn stderr() -> Self {
        Self {
            out: Some(io::stderr()),
        }
    }

    pub fn silent() -> Self {
        Self { out: None }
    }
}

impl<W: Write> Progress<W> {
    pub fn to_writer(out: W) -> Self {
        Self { out: Some(out) }
    }

    /// Announce combination `index` (1-based) of `total`.
    pub fn begin(&mut self, index: usize, total: usize) {
        self.emit(&format!(" ===> [{index}/{total}] <==="));
    }

    /// Return to the start of the line.
    pub fn end(&mut self) {
        self.emit("\r");
    }

    pub fn into_inner(self) -> Option<W> {
        self.out
    }

    fn emit(&mut self, text: &str) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            debug!(err = %e, "progress write failed");
        }
    }
}
