//! Operator-facing progress output.
//!
//! Orchestrators never reach for a global logger; they take a `&dyn Reporter`
//! so the CLI decides where lines go and tests can capture them.

use std::cell::RefCell;

/// Severity of a progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Success,
}

pub trait Reporter {
    fn emit(&self, level: Level, msg: &str);

    fn info(&self, msg: &str) {
        self.emit(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.emit(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.emit(Level::Error, msg);
    }

    fn success(&self, msg: &str) {
        self.emit(Level::Success, msg);
    }
}

/// Forwards progress lines to `tracing`, tagged with a component name such as
/// `AUDIT` or `BENCH`.
#[derive(Debug, Clone, Copy)]
pub struct TracingReporter {
    component: &'static str,
}

impl TracingReporter {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl Reporter for TracingReporter {
    fn emit(&self, level: Level, msg: &str) {
        let component = self.component;
        match level {
            Level::Info => tracing::info!(component, "{msg}"),
            Level::Warn => tracing::warn!(component, "{msg}"),
            Level::Error => tracing::error!(component, "{msg}"),
            Level::Success => tracing::info!(component, outcome = "success", "{msg}"),
        }
    }
}

/// Keeps every line in memory. Useful for tests and for embedding the toolkit.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: RefCell<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    /// Messages logged at `level`, in order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, level: Level, msg: &str) {
        self.lines.borrow_mut().push((level, msg.to_string()));
    }
}
