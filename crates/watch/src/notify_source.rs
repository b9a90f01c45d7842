//! `notify`-backed event source.
//!
//! A file in the staging directory becomes stable in one of two ways:
//! the writer closes it (inotify close-write), or it is renamed into
//! the directory already complete. Both are forwarded as stable-path
//! events; everything else (creates mid-write, metadata churn) is
//! dropped here so the watch loop only ever sees finished files.

use crate::{EventSource, WatchError};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, warn};

/// Event source backed by the platform's recommended `notify` watcher.
pub struct NotifyEventSource {
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    dir: PathBuf,
    /// Paths from a multi-path event not yet handed out
    pending: VecDeque<PathBuf>,
}

impl NotifyEventSource {
    /// Subscribes to stable-file events for `dir` (non-recursive).
    ///
    /// # Errors
    ///
    /// Returns `WatchError::Backend` if the watcher cannot be created
    /// or the directory cannot be watched.
    pub fn subscribe(dir: &Path) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        debug!(dir = %dir.display(), "subscribed to close events");
        Ok(Self {
            watcher,
            rx,
            dir: dir.to_owned(),
            pending: VecDeque::new(),
        })
    }

    fn is_stable(kind: &EventKind) -> bool {
        matches!(
            kind,
            EventKind::Access(AccessKind::Close(AccessMode::Write))
                | EventKind::Modify(ModifyKind::Name(RenameMode::To))
        )
    }
}

impl EventSource for NotifyEventSource {
    fn next_stable_path(&mut self, timeout: Duration) -> Result<Option<PathBuf>, WatchError> {
        if let Some(path) = self.pending.pop_front() {
            return Ok(Some(path));
        }

        match self.rx.recv_timeout(timeout) {
            Ok(Ok(event)) if Self::is_stable(&event.kind) => {
                self.pending.extend(event.paths);
                Ok(self.pending.pop_front())
            }
            Ok(Ok(_)) => Ok(None),
            Ok(Err(err)) => {
                // Backend hiccups are per-event; the subscription stays up.
                warn!(error = %err, "notification backend error");
                Ok(None)
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WatchError::Disconnected),
        }
    }

    fn close(&mut self) -> Result<(), WatchError> {
        self.watcher.unwatch(&self.dir)?;
        debug!(dir = %self.dir.display(), "unsubscribed from close events");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Polls the source until a path arrives or the deadline passes.
    fn wait_for_path(source: &mut NotifyEventSource, secs: u64) -> Option<PathBuf> {
        for _ in 0..(secs * 10) {
            if let Ok(Some(path)) = source.next_stable_path(Duration::from_millis(100)) {
                return Some(path);
            }
        }
        None
    }

    #[test]
    fn test_subscribe_missing_directory_fails() {
        let result = NotifyEventSource::subscribe(Path::new("/non-existent/staging"));
        assert!(matches!(result, Err(WatchError::Backend(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_written_file_becomes_stable() {
        let temp = TempDir::new().unwrap();
        let mut source = NotifyEventSource::subscribe(temp.path()).unwrap();

        let file = temp.path().join("incoming.dcm");
        fs::write(&file, b"payload").unwrap();

        let path = wait_for_path(&mut source, 5).expect("stable event for written file");
        assert_eq!(path, file);
        source.close().unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_renamed_in_file_becomes_stable() {
        let outside = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let mut source = NotifyEventSource::subscribe(staging.path()).unwrap();

        let src = outside.path().join("done.dcm");
        fs::write(&src, b"payload").unwrap();
        let dest = staging.path().join("done.dcm");
        fs::rename(&src, &dest).unwrap();

        let path = wait_for_path(&mut source, 5).expect("stable event for renamed file");
        assert_eq!(path, dest);
        source.close().unwrap();
    }
}
