//! Codepane console capture
//!
//! This crate owns the event-capture side of a Codepane editor widget: it redirects the
//! host console through an interception layer, observes uncaught faults, and keeps a
//! bounded, filterable log of everything captured for each widget instance.
//!
//! ## Architecture
//!
//! - **Console**: the host logging facility, with a replaceable sink
//! - **OutputInterceptor**: installs itself on the console while at least one listener is
//!   registered and fans every call out as a [`LogEvent`]
//! - **FaultObserver**: chains onto the host fault channels and fans out [`FaultRecord`]s
//! - **BoundedEventLog**: 500-entry FIFO log with level filters and pause buffering
//! - **ConsoleSession**: one widget's wiring between the hub and its event log
//!
//! The process-wide pieces live in a [`CaptureHub`] that is constructed once and handed
//! to every widget instead of being reached through ambient globals.
//!
//! ## Usage
//!
//! ```rust
//! use codepane_capture::{CaptureHub, ConsoleSession, ConsoleValue, SessionConfig};
//!
//! let hub = CaptureHub::new();
//! let session = ConsoleSession::attach(hub.clone(), SessionConfig::default());
//!
//! hub.console().info(&[ConsoleValue::from("ready"), ConsoleValue::from(3)]);
//!
//! assert_eq!(session.with_log(|log| log.len()), 1);
//! ```

pub mod console;
pub mod error;
pub mod event_log;
pub mod events;
pub mod faults;
pub mod hub;
pub mod interceptor;
pub mod listeners;
pub mod session;
pub mod value;

// Re-export commonly used types
pub use console::{Console, ConsoleSink, TracingSink};
pub use error::{CaptureError, CaptureResult};
pub use event_log::{BoundedEventLog, LevelFilters, DEFAULT_DOWNLOAD_NAME, MAX_CONSOLE_ENTRIES};
pub use events::{FaultCause, FaultKind, FaultRecord, LogEvent, LogLevel};
pub use faults::{ErrorEvent, FaultChannels, FaultObserver, RejectionEvent, RejectionReason};
pub use hub::CaptureHub;
pub use interceptor::{LogListener, OutputInterceptor};
pub use listeners::ListenerToken;
pub use session::{ConsoleSession, SessionConfig};
pub use value::{serialize_value, Composite, ConsoleValue, ErrorValue};
