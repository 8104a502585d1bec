//! Captured events and fault records

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::value::{serialize_value, ConsoleValue};

/// Console severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Plain `log` output (debug-equivalent)
    Log,
    /// General information
    Info,
    /// Warning about potential issues
    Warn,
    /// Error output
    Error,
}

impl LogLevel {
    /// All levels in toolbar order
    pub const ALL: [LogLevel; 4] = [LogLevel::Log, LogLevel::Info, LogLevel::Warn, LogLevel::Error];

    /// Lowercase name as used by the host console
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Log => "log",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Uppercase label used in plain-text exports
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Log => "LOG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "debug" => Ok(LogLevel::Log),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(CaptureError::UnknownLevel(other.to_string())),
        }
    }
}

/// One captured line of console output
///
/// Arguments are already rendered to display strings, so an event never holds on to the
/// values that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    level: LogLevel,
    arguments: Vec<String>,
    timestamp: DateTime<Local>,
}

impl LogEvent {
    /// Create an event from already-serialized arguments
    pub fn new(level: LogLevel, arguments: Vec<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            level,
            arguments,
            timestamp,
        }
    }

    /// Capture raw console values at the current wall-clock time
    pub fn capture(level: LogLevel, values: &[ConsoleValue]) -> Self {
        Self::new(level, values.iter().map(serialize_value).collect(), Local::now())
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Render as `[HH:MM:SS] LEVEL arg1 arg2 ...`
    pub fn plain_text(&self) -> String {
        let mut line = format!("[{}] {}", self.timestamp.format("%H:%M:%S"), self.level.label());
        for argument in &self.arguments {
            line.push(' ');
            line.push_str(argument);
        }
        line
    }
}

/// Which host channel a fault arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Uncaught synchronous fault
    Error,
    /// Unhandled asynchronous rejection
    UnhandledRejection,
}

/// The underlying fault object, kept for inspection only
pub type FaultCause = Arc<dyn std::error::Error + Send + Sync>;

/// A normalized uncaught fault
#[derive(Debug, Clone)]
pub struct FaultRecord {
    pub kind: FaultKind,
    /// Never empty
    pub message: String,
    /// Stack text or `file:line:column`
    pub origin: Option<String>,
    pub cause: Option<FaultCause>,
}

impl FaultRecord {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            message
        };
        Self {
            kind,
            message,
            origin: None,
            cause: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        if !origin.is_empty() {
            self.origin = Some(origin);
        }
        self
    }

    pub fn with_cause(mut self, cause: FaultCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Console level used when the fault is mirrored into an event log
    pub fn level(&self) -> LogLevel {
        match self.kind {
            FaultKind::Error => LogLevel::Error,
            FaultKind::UnhandledRejection => LogLevel::Warn,
        }
    }
}
