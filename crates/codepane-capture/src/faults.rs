//! Host fault channels and the fault observer
//!
//! [`FaultChannels`] models the host's two global fault handlers: one slot for uncaught
//! synchronous faults and one for unhandled asynchronous rejections. The
//! [`FaultObserver`] chains onto both slots exactly once and fans normalized
//! [`FaultRecord`]s out to its listeners, always handing the event on to whatever
//! handler was installed before it.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::{FaultCause, FaultKind, FaultRecord};
use crate::listeners::{ListenerSet, ListenerToken};

/// Fallback message for unhandled rejections
pub const UNHANDLED_REJECTION: &str = "Unhandled Promise rejection";

/// Fallback message for synchronous faults
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// An uncaught synchronous fault as reported by the host
#[derive(Debug, Clone, Default)]
pub struct ErrorEvent {
    pub message: Option<String>,
    pub filename: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Detailed trace, when the host has one
    pub stack: Option<String>,
    pub error: Option<FaultCause>,
}

impl ErrorEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn at(mut self, filename: impl Into<String>, line: u32, column: u32) -> Self {
        self.filename = Some(filename.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_error(mut self, error: FaultCause) -> Self {
        self.error = Some(error);
        self
    }

    fn from_location(message: String, location: &Location<'_>) -> Self {
        Self::new(message).at(location.file(), location.line(), location.column())
    }

    /// Normalize into a fault record
    pub fn to_record(&self) -> FaultRecord {
        let message = self
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| {
                self.error
                    .as_ref()
                    .map(|e| e.to_string())
                    .filter(|m| !m.trim().is_empty())
            })
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string());

        let origin = match (&self.stack, &self.filename) {
            (Some(stack), _) if !stack.is_empty() => stack.clone(),
            (_, Some(file)) => format!(
                "{}:{}:{}",
                file,
                self.line.unwrap_or(0),
                self.column.unwrap_or(0)
            ),
            _ => String::new(),
        };

        let mut record = FaultRecord::new(FaultKind::Error, message).with_origin(origin);
        if let Some(cause) = &self.error {
            record = record.with_cause(Arc::clone(cause));
        }
        record
    }
}

/// Why an asynchronous operation was rejected
#[derive(Debug, Clone)]
pub enum RejectionReason {
    Error {
        cause: FaultCause,
        stack: Option<String>,
    },
    Message(String),
    /// A reason with no usable text
    Opaque,
}

/// An unhandled asynchronous rejection as reported by the host
#[derive(Debug, Clone, Default)]
pub struct RejectionEvent {
    pub reason: Option<RejectionReason>,
}

impl RejectionEvent {
    pub fn new(reason: RejectionReason) -> Self {
        Self {
            reason: Some(reason),
        }
    }

    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(RejectionReason::Error {
            cause: Arc::new(error),
            stack: None,
        })
    }

    /// Normalize into a fault record
    pub fn to_record(&self) -> FaultRecord {
        match &self.reason {
            Some(RejectionReason::Error { cause, stack }) => {
                let text = cause.to_string();
                let message = if text.is_empty() {
                    UNHANDLED_REJECTION.to_string()
                } else {
                    format!("{}: {}", UNHANDLED_REJECTION, text)
                };
                FaultRecord::new(FaultKind::UnhandledRejection, message)
                    .with_origin(stack.clone().unwrap_or_default())
                    .with_cause(Arc::clone(cause))
            }
            Some(RejectionReason::Message(text)) if !text.is_empty() => FaultRecord::new(
                FaultKind::UnhandledRejection,
                format!("{}: {}", UNHANDLED_REJECTION, text),
            ),
            _ => FaultRecord::new(FaultKind::UnhandledRejection, UNHANDLED_REJECTION),
        }
    }
}

pub type ErrorHandler = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;
pub type RejectionHandler = Arc<dyn Fn(&RejectionEvent) + Send + Sync>;

/// The host's global fault handler slots
#[derive(Default)]
pub struct FaultChannels {
    on_error: RwLock<Option<ErrorHandler>>,
    on_rejection: RwLock<Option<RejectionHandler>>,
}

impl FaultChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an error handler, returning the previous one
    pub fn set_error_handler(&self, handler: Option<ErrorHandler>) -> Option<ErrorHandler> {
        std::mem::replace(&mut *self.on_error.write(), handler)
    }

    /// Install a rejection handler, returning the previous one
    pub fn set_rejection_handler(
        &self,
        handler: Option<RejectionHandler>,
    ) -> Option<RejectionHandler> {
        std::mem::replace(&mut *self.on_rejection.write(), handler)
    }

    /// Replace the error handler with one built from the current handler, atomically
    pub fn chain_error_handler(
        &self,
        build: impl FnOnce(Option<ErrorHandler>) -> ErrorHandler,
    ) {
        let mut slot = self.on_error.write();
        let previous = slot.take();
        *slot = Some(build(previous));
    }

    /// Replace the rejection handler with one built from the current handler, atomically
    pub fn chain_rejection_handler(
        &self,
        build: impl FnOnce(Option<RejectionHandler>) -> RejectionHandler,
    ) {
        let mut slot = self.on_rejection.write();
        let previous = slot.take();
        *slot = Some(build(previous));
    }

    /// Deliver an uncaught synchronous fault
    pub fn report_error(&self, event: &ErrorEvent) {
        let handler = self.on_error.read().clone();
        match handler {
            Some(handler) => handler(event),
            None => debug!("Uncaught fault with no handler: {:?}", event.message),
        }
    }

    /// Deliver an unhandled asynchronous rejection
    pub fn report_rejection(&self, event: &RejectionEvent) {
        let handler = self.on_rejection.read().clone();
        match handler {
            Some(handler) => handler(event),
            None => debug!("Unhandled rejection with no handler"),
        }
    }

    /// Run `f`, reporting a panic as an uncaught synchronous fault
    ///
    /// The origin of the reported fault is the caller's location.
    #[track_caller]
    pub fn catch<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let location = Location::caller();
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(payload) => {
                let message = panic_message(payload.as_ref()).unwrap_or_default();
                self.report_error(&ErrorEvent::from_location(message, location));
                None
            }
        }
    }

    /// Spawn a task whose failure is reported as an unhandled rejection
    ///
    /// An `Err` result or a panic inside the task resolves the returned handle to `None`.
    pub fn spawn_observed<F, T, E>(self: &Arc<Self>, future: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let channels = Arc::clone(self);
        let task = tokio::spawn(future);
        tokio::spawn(async move {
            match task.await {
                Ok(Ok(value)) => Some(value),
                Ok(Err(err)) => {
                    channels.report_rejection(&RejectionEvent::from_error(err));
                    None
                }
                Err(join_err) if join_err.is_panic() => {
                    let payload = join_err.into_panic();
                    let reason = match panic_message(payload.as_ref()) {
                        Some(message) => RejectionReason::Message(message),
                        None => RejectionReason::Opaque,
                    };
                    channels.report_rejection(&RejectionEvent::new(reason));
                    None
                }
                Err(_) => None,
            }
        })
    }
}

impl fmt::Debug for FaultChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultChannels")
            .field("error_handler", &self.on_error.read().is_some())
            .field("rejection_handler", &self.on_rejection.read().is_some())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}

/// Callback receiving normalized faults
pub type FaultListener = dyn Fn(FaultKind, &FaultRecord) + Send + Sync;

/// Observes both fault channels and fans faults out to listeners
pub struct FaultObserver {
    channels: Arc<FaultChannels>,
    listeners: Arc<ListenerSet<FaultListener>>,
    installed: AtomicBool,
}

impl FaultObserver {
    pub fn new(channels: Arc<FaultChannels>) -> Self {
        Self {
            channels,
            listeners: Arc::new(ListenerSet::new()),
            installed: AtomicBool::new(false),
        }
    }

    pub fn channels(&self) -> &Arc<FaultChannels> {
        &self.channels
    }

    pub fn add_listener(&self, listener: Arc<FaultListener>) -> ListenerToken {
        self.install();
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, token: ListenerToken) {
        self.listeners.remove(token);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Subscribe to the host channels; only the first call has an effect
    fn install(&self) {
        if self.installed.swap(true, Ordering::AcqRel) {
            return;
        }

        let listeners = Arc::clone(&self.listeners);
        self.channels.chain_error_handler(move |previous| {
            Arc::new(move |event: &ErrorEvent| {
                let record = event.to_record();
                listeners.notify(|listener| listener(FaultKind::Error, &record));
                if let Some(previous) = &previous {
                    forward(|| previous(event));
                }
            })
        });

        let listeners = Arc::clone(&self.listeners);
        self.channels.chain_rejection_handler(move |previous| {
            Arc::new(move |event: &RejectionEvent| {
                let record = event.to_record();
                listeners.notify(|listener| listener(FaultKind::UnhandledRejection, &record));
                if let Some(previous) = &previous {
                    forward(|| previous(event));
                }
            })
        });

        debug!("Fault observer subscribed to host channels");
    }
}

impl fmt::Debug for FaultObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultObserver")
            .field("installed", &self.is_installed())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Call a pre-existing host handler without letting it unwind into the host
fn forward(call: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(call)).is_err() {
        warn!("Pre-existing fault handler panicked");
    }
}
