//! Filesystem event source for the DICOM intake sorter.
//!
//! The watch loop in `dis-core` consumes an [`EventSource`]: a lazy,
//! unbounded, cancellable sequence of "path became stable" events. This
//! crate defines that seam and provides the production implementation
//! backed by the `notify` crate, which maps raw inotify events onto
//! stable-path events. Back-pressure is delegated to the notification
//! backend's own buffering; no additional queue is kept here beyond the
//! paths of a single multi-path event.

mod notify_source;

pub use notify_source::NotifyEventSource;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Errors that can occur on the event subscription
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The notification backend failed to subscribe or unsubscribe
    #[error("filesystem notification backend error: {0}")]
    Backend(#[from] notify::Error),

    /// The event channel closed while the subscription was still live
    #[error("event source disconnected")]
    Disconnected,
}

/// A lazy, cancellable sequence of stable-path events.
///
/// `next_stable_path` polls with a timeout so the consumer can
/// interleave stop-signal checks with event dispatch; `Ok(None)` means
/// "nothing stable yet, poll again". `close` unsubscribes; after it
/// returns the source yields no further events.
pub trait EventSource {
    /// Waits up to `timeout` for the next stable path.
    fn next_stable_path(&mut self, timeout: Duration) -> Result<Option<PathBuf>, WatchError>;

    /// Unsubscribes from the underlying notification backend.
    fn close(&mut self) -> Result<(), WatchError>;
}

/// Cooperative stop signal for a watch loop.
///
/// Cloneable so it can be handed to a signal handler while the watch
/// driver polls it. Stopping only prevents new events from being
/// dispatched; it never interrupts work in flight.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Creates a handle in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the watch loop to stop after the current invocation.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_handle_starts_running() {
        let handle = StopHandle::new();
        assert!(!handle.is_stopped());
    }

    #[test]
    fn test_stop_handle_propagates_to_clones() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        handle.stop();
        assert!(clone.is_stopped());
    }
}
