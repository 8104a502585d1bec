//! Per-widget console session

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event_log::{BoundedEventLog, LevelFilters};
use crate::events::{FaultKind, FaultRecord, LogEvent, LogLevel};
use crate::hub::CaptureHub;
use crate::listeners::ListenerToken;
use crate::value::ConsoleValue;

/// How a widget's console behaves when it is attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capture host console output
    pub capture_console: bool,
    /// Capture uncaught faults and unhandled rejections
    pub capture_faults: bool,
    pub filters: LevelFilters,
    pub start_paused: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_console: true,
            capture_faults: true,
            filters: LevelFilters::default(),
            start_paused: false,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    log: BoundedEventLog,
    last_fault: Option<FaultRecord>,
}

/// One widget's console: an event log wired to the shared [`CaptureHub`]
///
/// Listeners are registered on attach and removed when the session is dropped. Log
/// access goes through closures holding the session lock, so those closures must not
/// write to the hub console themselves.
pub struct ConsoleSession {
    hub: Arc<CaptureHub>,
    state: Arc<Mutex<SessionState>>,
    console_token: Mutex<Option<ListenerToken>>,
    fault_token: Option<ListenerToken>,
}

impl ConsoleSession {
    pub fn attach(hub: Arc<CaptureHub>, config: SessionConfig) -> Self {
        let mut log = BoundedEventLog::with_filters(config.filters);
        log.set_paused(config.start_paused);
        let state = Arc::new(Mutex::new(SessionState {
            log,
            last_fault: None,
        }));

        let fault_token = if config.capture_faults {
            let sink = Arc::clone(&state);
            Some(hub.observer().add_listener(Arc::new(
                move |kind: FaultKind, record: &FaultRecord| {
                    let mut state = sink.lock();
                    state.log.record_event(fault_entry(kind, record));
                    state.last_fault = Some(record.clone());
                },
            )))
        } else {
            None
        };

        let session = Self {
            hub,
            state,
            console_token: Mutex::new(None),
            fault_token,
        };
        session.set_capture_console(config.capture_console);
        debug!(
            "Console session attached (console: {}, faults: {})",
            config.capture_console, config.capture_faults
        );
        session
    }

    /// Start or stop mirroring host console output into this session's log
    pub fn set_capture_console(&self, enabled: bool) {
        let mut token = self.console_token.lock();
        match (enabled, token.is_some()) {
            (true, false) => {
                let sink = Arc::clone(&self.state);
                *token = Some(self.hub.interceptor().add_listener(Arc::new(
                    move |event: &LogEvent| sink.lock().log.record_event(event.clone()),
                )));
            }
            (false, true) => {
                if let Some(existing) = token.take() {
                    self.hub.interceptor().remove_listener(existing);
                }
            }
            _ => {}
        }
    }

    pub fn is_capturing_console(&self) -> bool {
        self.console_token.lock().is_some()
    }

    /// Record a host-side message directly, bypassing the console
    pub fn append(&self, level: LogLevel, values: &[ConsoleValue]) {
        let event = LogEvent::capture(level, values);
        self.state.lock().log.record_event(event);
    }

    pub fn with_log<R>(&self, f: impl FnOnce(&BoundedEventLog) -> R) -> R {
        f(&self.state.lock().log)
    }

    pub fn with_log_mut<R>(&self, f: impl FnOnce(&mut BoundedEventLog) -> R) -> R {
        f(&mut self.state.lock().log)
    }

    pub fn set_paused(&self, paused: bool) {
        self.with_log_mut(|log| log.set_paused(paused));
    }

    pub fn set_filter(&self, level: LogLevel, visible: bool) {
        self.with_log_mut(|log| log.set_filter(level, visible));
    }

    pub fn clear(&self) {
        self.with_log_mut(BoundedEventLog::clear);
    }

    pub fn to_plain_text(&self) -> String {
        self.with_log(BoundedEventLog::to_plain_text)
    }

    /// Snapshot of the stored entries, oldest first
    pub fn entries(&self) -> Vec<LogEvent> {
        self.with_log(|log| log.entries().cloned().collect())
    }

    /// Most recent fault, for an error overlay
    pub fn last_fault(&self) -> Option<FaultRecord> {
        self.state.lock().last_fault.clone()
    }

    pub fn dismiss_fault(&self) {
        self.state.lock().last_fault = None;
    }
}

impl Drop for ConsoleSession {
    fn drop(&mut self) {
        if let Some(token) = self.console_token.get_mut().take() {
            self.hub.interceptor().remove_listener(token);
        }
        if let Some(token) = self.fault_token.take() {
            self.hub.observer().remove_listener(token);
        }
        debug!("Console session detached");
    }
}

impl fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("capturing_console", &self.is_capturing_console())
            .field("capturing_faults", &self.fault_token.is_some())
            .field("entries", &self.with_log(BoundedEventLog::len))
            .finish()
    }
}

fn fault_entry(kind: FaultKind, record: &FaultRecord) -> LogEvent {
    let mut arguments = vec![record.message.clone()];
    if kind == FaultKind::Error {
        arguments.extend(record.origin.clone());
    }
    LogEvent::new(record.level(), arguments, chrono::Local::now())
}
