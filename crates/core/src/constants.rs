//! Constants used throughout the DIS core crate.

use std::time::Duration;

/// File extension given to relocated DICOM files.
pub const DICOM_EXTENSION: &str = "dcm";

/// Maximum number of disambiguating suffixes probed on a name collision.
pub const MAX_COLLISION_PROBES: u32 = 9999;

/// Default permission mode for created destination directories.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Default permission mode for relocated files.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// How long the watch loop waits for an event before re-checking the
/// stop signal.
pub const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(200);
