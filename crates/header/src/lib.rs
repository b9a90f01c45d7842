//! DICOM header classification for the DICOM intake sorter.
//!
//! This crate reads the identifying fields out of a DICOM file's header
//! and normalizes them into a [`ClassificationRecord`], the immutable
//! set of facts the rest of the pipeline derives a destination path
//! from.
//!
//! ## Design Principles
//!
//! - Only header-level data is read; parsing stops before `PixelData`
//! - Each classification field is read independently: a missing or
//!   malformed field yields its documented default, never an error
//! - The whole extraction fails only when the file is not parseable as
//!   DICOM at all
//! - All text fields are sanitized at extraction time, so downstream
//!   path construction needs no further validation

mod extract;
mod record;

pub use extract::FieldExtractor;
pub use record::{ClassificationRecord, DEFAULT_TEXT, NO_DATE_TOKEN};

use std::path::PathBuf;

/// Errors that can occur during header classification
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// The file could not be opened or parsed as a DICOM header
    #[error("failed to read DICOM header from {path}: {source}", path = path.display())]
    UnreadableHeader {
        path: PathBuf,
        #[source]
        source: dicom_object::ReadError,
    },
}
