//! Batch and watch drivers for the sorting pipeline.
//!
//! [`SorterService`] runs the full pipeline for one file: classify,
//! build the destination, resolve collisions, relocate. The batch
//! driver applies it to an explicit file list; the watch driver applies
//! it to a live event stream. In both, every per-file failure is caught
//! at the file boundary, logged with the offending path, and never
//! terminates the driver.

use crate::constants::EVENT_POLL_INTERVAL;
use crate::layout;
use crate::relocate::{RelocationReceipt, Relocator};
use crate::SortError;
use dis_header::FieldExtractor;
use dis_watch::{EventSource, StopHandle, WatchError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Runs the classify → build → resolve → relocate pipeline.
///
/// Stateless across files; the destination tree on disk is the only
/// shared resource, owned by the inner [`Relocator`].
#[derive(Debug)]
pub struct SorterService {
    extractor: FieldExtractor,
    relocator: Relocator,
}

impl SorterService {
    pub fn new(extractor: FieldExtractor, relocator: Relocator) -> Self {
        Self {
            extractor,
            relocator,
        }
    }

    /// Sorts a single file into the destination tree.
    ///
    /// # Errors
    ///
    /// Returns `SortError::UnreadableHeader` if the file is not
    /// parseable DICOM, or `SortError::RelocationFailed` if directory
    /// creation or the move fails. On failure the file stays at its
    /// source path.
    pub fn sort_one(&self, source: &Path) -> Result<RelocationReceipt, SortError> {
        let record = self.extractor.classify(source)?;
        let dest = layout::build_destination(&record);
        let series_dir = self.relocator.ensure_series_dir(&dest)?;
        let final_path = layout::resolve_collision(&series_dir, dest.file_name());
        Ok(self.relocator.relocate(source, &final_path)?)
    }

    /// Applies the pipeline to an explicit, finite list of paths.
    ///
    /// Continues past individual failures; the batch never aborts
    /// early. Failures are reported in the outcome, not raised.
    pub fn run_batch(&self, paths: &[PathBuf]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for path in paths {
            match self.sort_one(path) {
                Ok(receipt) => outcome.receipts.push(receipt),
                Err(error) => {
                    warn!(path = %path.display(), %error, "failed to sort file, continuing");
                    outcome.failures.push(BatchFailure {
                        path: path.clone(),
                        error,
                    });
                }
            }
        }
        outcome
    }
}

/// One failed file from a batch run.
#[derive(Debug)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: SortError,
}

/// Result of a batch run: what moved and what did not.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub receipts: Vec<RelocationReceipt>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    /// Returns `true` if every file was relocated.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Lifecycle of the watch loop. There is no transition out of
/// `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Starting,
    DrainingBacklog,
    Watching,
    Stopping,
    Stopped,
}

/// Long-running driver reacting to stable-file events.
///
/// On `run`, drains the backlog of files already present in the source
/// directory, then processes every stable-path event until the stop
/// handle fires. Each file's pipeline invocation is isolated: a failure
/// is logged and the loop continues. The stop signal only prevents new
/// events from being dispatched; work in flight always finishes.
#[derive(Debug)]
pub struct WatchDriver<'s> {
    service: &'s SorterService,
    source_dir: PathBuf,
    stop: StopHandle,
    state: WatchState,
}

impl<'s> WatchDriver<'s> {
    pub fn new(service: &'s SorterService, source_dir: PathBuf, stop: StopHandle) -> Self {
        Self {
            service,
            source_dir,
            stop,
            state: WatchState::Starting,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Drives the watch loop to completion.
    ///
    /// Runs until the stop handle fires or the event source
    /// disconnects; either way the subscription is closed and the
    /// driver ends in `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns `WatchError` if the event source disconnects or fails to
    /// close. Per-file pipeline failures are never returned.
    pub fn run(&mut self, events: &mut dyn EventSource) -> Result<(), WatchError> {
        self.state = WatchState::DrainingBacklog;
        self.drain_backlog();

        self.state = WatchState::Watching;
        let outcome = loop {
            if self.stop.is_stopped() {
                break Ok(());
            }
            match events.next_stable_path(EVENT_POLL_INTERVAL) {
                Ok(Some(path)) => self.dispatch(&path),
                Ok(None) => {}
                Err(err) => break Err(err),
            }
        };

        self.state = WatchState::Stopping;
        let closed = events.close();
        self.state = WatchState::Stopped;
        info!(dir = %self.source_dir.display(), "watch loop stopped");

        outcome.and(closed)
    }

    /// Runs the pipeline over files already present at start-up,
    /// in name order, with the same per-file isolation as events.
    fn drain_backlog(&self) {
        let entries = match fs::read_dir(&self.source_dir) {
            Ok(entries) => entries,
            Err(err) => {
                // The subscription is already up; an unreadable backlog
                // leaves the watcher running on events alone.
                warn!(
                    dir = %self.source_dir.display(),
                    error = %err,
                    "cannot enumerate backlog"
                );
                return;
            }
        };

        let mut backlog: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        backlog.sort();

        info!(
            dir = %self.source_dir.display(),
            files = backlog.len(),
            "draining backlog"
        );
        for path in backlog {
            self.dispatch(&path);
        }
    }

    /// One isolated pipeline invocation.
    fn dispatch(&self, path: &Path) {
        if path.is_dir() {
            return;
        }
        match self.service.sort_one(path) {
            Ok(receipt) => {
                info!(
                    from = %path.display(),
                    to = %receipt.destination.display(),
                    "sorted file"
                );
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to sort file, watch continues");
            }
        }
    }
}
