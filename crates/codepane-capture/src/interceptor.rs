//! Console output interception
//!
//! The interceptor is reference-counted by listener count: the first registered listener
//! installs an intercepting sink on the console, and removing the last one restores the
//! sink that was there before.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::console::{Console, ConsoleSink};
use crate::events::{LogEvent, LogLevel};
use crate::listeners::{ListenerSet, ListenerToken};
use crate::value::ConsoleValue;

/// Callback receiving every captured console line
pub type LogListener = dyn Fn(&LogEvent) + Send + Sync;

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Resets the dispatch flag even if a dispatch unwinds
struct DispatchGuard;

impl DispatchGuard {
    fn enter() -> Option<Self> {
        DISPATCHING.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(DispatchGuard)
            }
        })
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(false));
    }
}

struct InterceptingSink {
    listeners: Arc<ListenerSet<LogListener>>,
    original: Arc<dyn ConsoleSink>,
    /// Cleared when the sink could not be unhooked; it then only forwards
    active: Arc<AtomicBool>,
}

impl ConsoleSink for InterceptingSink {
    fn write(&self, level: LogLevel, values: &[ConsoleValue]) {
        if !self.active.load(Ordering::Acquire) {
            self.original.write(level, values);
            return;
        }
        // Console calls made by a listener mid-dispatch are forwarded but not re-captured.
        if let Some(_guard) = DispatchGuard::enter() {
            let event = LogEvent::capture(level, values);
            self.listeners.notify(|listener| listener(&event));
        }
        self.original.write(level, values);
    }
}

/// An installed intercepting sink and the sink it wraps
struct Installation {
    sink: Arc<dyn ConsoleSink>,
    original: Arc<dyn ConsoleSink>,
    active: Arc<AtomicBool>,
}

/// Redirects a [`Console`] through itself and fans events out to listeners
pub struct OutputInterceptor {
    console: Arc<Console>,
    listeners: Arc<ListenerSet<LogListener>>,
    /// `Some` while installed
    installation: Mutex<Option<Installation>>,
}

impl OutputInterceptor {
    pub fn new(console: Arc<Console>) -> Self {
        Self {
            console,
            listeners: Arc::new(ListenerSet::new()),
            installation: Mutex::new(None),
        }
    }

    pub fn console(&self) -> &Arc<Console> {
        &self.console
    }

    /// Register a listener, installing the interception if this is the first one
    pub fn add_listener(&self, listener: Arc<LogListener>) -> ListenerToken {
        let mut installation = self.installation.lock();
        let token = self.listeners.add(listener);
        if installation.is_none() {
            let original = self.console.current_sink();
            let active = Arc::new(AtomicBool::new(true));
            let sink: Arc<dyn ConsoleSink> = Arc::new(InterceptingSink {
                listeners: Arc::clone(&self.listeners),
                original: Arc::clone(&original),
                active: Arc::clone(&active),
            });
            self.console.replace_sink(Arc::clone(&sink));
            *installation = Some(Installation {
                sink,
                original,
                active,
            });
            debug!("Console interception installed");
        }
        trace!("Console listener registered ({} active)", self.listeners.len());
        token
    }

    /// Deregister a listener, restoring the original sink once none remain
    ///
    /// If the console sink was replaced by someone else in the meantime, that sink is
    /// left in place and the intercepting sink it wraps turns into a pass-through.
    pub fn remove_listener(&self, token: ListenerToken) {
        let mut installation = self.installation.lock();
        if !self.listeners.remove(token) {
            return;
        }
        if !self.listeners.is_empty() {
            return;
        }
        if let Some(installed) = installation.take() {
            installed.active.store(false, Ordering::Release);
            if self
                .console
                .replace_sink_if(&installed.sink, installed.original)
            {
                debug!("Console interception removed");
            } else {
                debug!("Console sink replaced since install; leaving it in place");
            }
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installation.lock().is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for OutputInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputInterceptor")
            .field("installed", &self.is_installed())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
