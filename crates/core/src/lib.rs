//! # DIS Core
//!
//! Classification, path construction and collision-safe relocation for
//! the DICOM intake sorter, together with the batch and watch drivers
//! that run the pipeline over files.
//!
//! For each file the pipeline runs field extraction (`dis-header`),
//! path building, collision resolution and relocation in sequence. No
//! component keeps state across files; the destination tree on disk is
//! the only shared resource, and only the [`Relocator`] writes to it.
//!
//! **No process concerns**: argument parsing, log sink configuration
//! and signal handling belong in `dis-cli`.

pub mod config;
pub mod constants;
pub mod layout;
pub mod pipeline;
pub mod relocate;

pub use config::{ConfigError, Ownership, SorterConfig};
pub use layout::{build_destination, resolve_collision, DestinationPath};
pub use pipeline::{BatchFailure, BatchOutcome, SorterService, WatchDriver, WatchState};
pub use relocate::{RelocateError, RelocationReceipt, Relocator};

/// Errors a single file's pipeline run can fail with.
///
/// Both kinds are caught at the per-file boundary in the batch and
/// watch drivers; neither is ever fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// The source file is not a parseable DICOM header
    #[error("unreadable header: {0}")]
    UnreadableHeader(#[from] dis_header::HeaderError),

    /// Directory creation or the move could not complete
    #[error("relocation failed: {0}")]
    RelocationFailed(#[from] relocate::RelocateError),
}
