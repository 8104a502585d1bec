//! The host console facility
//!
//! Host code writes to a [`Console`]; what happens to those writes is decided by the
//! currently installed [`ConsoleSink`]. Interception works by swapping the sink and
//! chaining to the previous one.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::events::LogLevel;
use crate::value::{serialize_value, ConsoleValue};

/// Destination for console writes
pub trait ConsoleSink: Send + Sync {
    fn write(&self, level: LogLevel, values: &[ConsoleValue]);
}

impl<F> ConsoleSink for F
where
    F: Fn(LogLevel, &[ConsoleValue]) + Send + Sync,
{
    fn write(&self, level: LogLevel, values: &[ConsoleValue]) {
        self(level, values)
    }
}

/// Default sink: forwards console output to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ConsoleSink for TracingSink {
    fn write(&self, level: LogLevel, values: &[ConsoleValue]) {
        let message = values
            .iter()
            .map(serialize_value)
            .collect::<Vec<_>>()
            .join(" ");
        match level {
            LogLevel::Log => debug!(target: "codepane::console", "{}", message),
            LogLevel::Info => info!(target: "codepane::console", "{}", message),
            LogLevel::Warn => warn!(target: "codepane::console", "{}", message),
            LogLevel::Error => error!(target: "codepane::console", "{}", message),
        }
    }
}

/// Shared logging facility with four levels
pub struct Console {
    sink: RwLock<Arc<dyn ConsoleSink>>,
}

impl Console {
    /// Create a console that writes through `tracing`
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn ConsoleSink>) -> Self {
        Self {
            sink: RwLock::new(sink),
        }
    }

    pub fn log(&self, values: &[ConsoleValue]) {
        self.emit(LogLevel::Log, values);
    }

    pub fn info(&self, values: &[ConsoleValue]) {
        self.emit(LogLevel::Info, values);
    }

    pub fn warn(&self, values: &[ConsoleValue]) {
        self.emit(LogLevel::Warn, values);
    }

    pub fn error(&self, values: &[ConsoleValue]) {
        self.emit(LogLevel::Error, values);
    }

    pub fn emit(&self, level: LogLevel, values: &[ConsoleValue]) {
        // Release the lock before writing so sinks may log or swap sinks themselves.
        let sink = self.current_sink();
        sink.write(level, values);
    }

    pub fn current_sink(&self) -> Arc<dyn ConsoleSink> {
        Arc::clone(&self.sink.read())
    }

    /// Install a new sink, returning the one it replaced
    pub fn replace_sink(&self, sink: Arc<dyn ConsoleSink>) -> Arc<dyn ConsoleSink> {
        std::mem::replace(&mut *self.sink.write(), sink)
    }

    /// Install `sink` only if `expected` is still the current sink
    ///
    /// Returns whether the swap happened.
    pub fn replace_sink_if(
        &self,
        expected: &Arc<dyn ConsoleSink>,
        sink: Arc<dyn ConsoleSink>,
    ) -> bool {
        let mut current = self.sink.write();
        if !same_sink(&current, expected) {
            return false;
        }
        *current = sink;
        true
    }
}

/// Identity comparison on the sink allocation, ignoring vtables
fn same_sink(a: &Arc<dyn ConsoleSink>, b: &Arc<dyn ConsoleSink>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}
