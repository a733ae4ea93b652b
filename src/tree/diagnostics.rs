// src/tree/diagnostics.rs
//
// Where `print_tree` and `print_parent_chain` write their lines.

use std::sync::{Arc, Mutex};

/// Append-only, human-readable diagnostic output.
///
/// Injected into the tree at construction. Never used from the render
/// context.
pub trait DiagnosticSink: Send {
    fn line(&mut self, line: &str);
}

/// Forwards every line to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn line(&mut self, line: &str) {
        log::info!(target: "synthtree::tree", "{line}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn line(&mut self, _line: &str) {}
}

/// Collects lines in memory; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct SharedSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every line collected so far.
    pub fn take(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(mut lines) => std::mem::take(&mut *lines),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DiagnosticSink for SharedSink {
    fn line(&mut self, line: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_owned()),
            Err(poisoned) => poisoned.into_inner().push(line.to_owned()),
        }
    }
}

impl DiagnosticSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_owned());
    }
}
