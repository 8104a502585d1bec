//! Process-wide capture registry

use std::sync::Arc;

use crate::console::Console;
use crate::faults::{FaultChannels, FaultObserver};
use crate::interceptor::OutputInterceptor;

/// Shared interception state for every widget in the process
///
/// Construct one hub at startup and pass it to each [`ConsoleSession`]. The interceptor
/// and observer it holds install themselves lazily when the first session registers.
///
/// [`ConsoleSession`]: crate::session::ConsoleSession
#[derive(Debug)]
pub struct CaptureHub {
    console: Arc<Console>,
    faults: Arc<FaultChannels>,
    interceptor: OutputInterceptor,
    observer: FaultObserver,
}

impl CaptureHub {
    /// Create a hub over a fresh console and fresh fault channels
    pub fn new() -> Arc<Self> {
        Self::with_host(Arc::new(Console::new()), Arc::new(FaultChannels::new()))
    }

    /// Create a hub over an existing console and fault channels
    pub fn with_host(console: Arc<Console>, faults: Arc<FaultChannels>) -> Arc<Self> {
        Arc::new(Self {
            interceptor: OutputInterceptor::new(Arc::clone(&console)),
            observer: FaultObserver::new(Arc::clone(&faults)),
            console,
            faults,
        })
    }

    pub fn console(&self) -> &Arc<Console> {
        &self.console
    }

    pub fn faults(&self) -> &Arc<FaultChannels> {
        &self.faults
    }

    pub fn interceptor(&self) -> &OutputInterceptor {
        &self.interceptor
    }

    pub fn observer(&self) -> &FaultObserver {
        &self.observer
    }
}
