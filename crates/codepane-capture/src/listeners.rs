//! Listener registries shared by the interceptor and the fault observer

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Opaque handle returned when a listener is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

impl ListenerToken {
    fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// Ordered set of listeners
///
/// Dispatch iterates over a snapshot taken before the first callback runs, so
/// registrations and removals made from inside a callback never skip or repeat
/// another listener in the same dispatch.
pub(crate) struct ListenerSet<F: ?Sized> {
    entries: Mutex<Vec<(ListenerToken, Arc<F>)>>,
}

impl<F: ?Sized> ListenerSet<F> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, listener: Arc<F>) -> ListenerToken {
        let token = ListenerToken::next();
        self.entries.lock().push((token, listener));
        token
    }

    pub(crate) fn remove(&self, token: ListenerToken) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(t, _)| *t != token);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Invoke `call` for every listener, containing panics.
    ///
    /// Returns the number of listeners that panicked.
    pub(crate) fn notify(&self, mut call: impl FnMut(&F)) -> usize {
        let mut failures = 0;
        for listener in self.snapshot() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(listener.as_ref())));
            if outcome.is_err() {
                failures += 1;
                warn!("Capture listener panicked; continuing with remaining listeners");
            }
        }
        failures
    }
}
