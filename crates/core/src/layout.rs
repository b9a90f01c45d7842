//! Destination path construction and collision resolution.
//!
//! Path building is a pure function of the classification record:
//! identical records always map to the same [`DestinationPath`] before
//! collision resolution. Collision resolution is the only part of this
//! module that touches the filesystem, and only to check existence.

use crate::constants::{DICOM_EXTENSION, MAX_COLLISION_PROBES};
use dis_header::ClassificationRecord;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The three-level destination layout derived from one record:
/// subject directory, series directory, file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPath {
    subject_dir: String,
    series_dir: String,
    file_name: String,
}

impl DestinationPath {
    /// Subject-level directory name, `{subject_id}+{subject_name}`.
    pub fn subject_dir(&self) -> &str {
        &self.subject_dir
    }

    /// Series-level directory name,
    /// `{acquisition_date}+{series_number:03}-{series_description}`.
    pub fn series_dir(&self) -> &str {
        &self.series_dir
    }

    /// Desired base file name, `{instance_number:05}.dcm`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Maps a classification record onto its destination layout.
///
/// Pure function; all inputs are pre-sanitized, so there are no error
/// conditions.
pub fn build_destination(record: &ClassificationRecord) -> DestinationPath {
    DestinationPath {
        subject_dir: format!("{}+{}", record.subject_id, record.subject_name),
        series_dir: format!(
            "{}+{:03}-{}",
            record.acquisition_date, record.series_number, record.series_description
        ),
        file_name: format!("{:05}.{}", record.instance_number, DICOM_EXTENSION),
    }
}

/// Finds the first available path for `file_name` under `series_dir`.
///
/// Tests the desired path first, then probes `{stem}_0001.{ext}`,
/// `{stem}_0002.{ext}` and so on in increasing order. After
/// [`MAX_COLLISION_PROBES`] occupied probes the last candidate is
/// returned anyway (best-effort; uniqueness beyond the bound is not
/// guaranteed). The check-then-use sequence is racy under concurrent
/// writers to the same series directory; callers running pipelines
/// concurrently must serialise resolve-then-move per series directory.
pub fn resolve_collision(series_dir: &Path, file_name: &str) -> PathBuf {
    let desired = series_dir.join(file_name);
    if !desired.exists() {
        return desired;
    }

    let base = Path::new(file_name);
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = base
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(DICOM_EXTENSION);

    let mut candidate = desired;
    for probe in 1..=MAX_COLLISION_PROBES {
        candidate = series_dir.join(format!("{stem}_{probe:04}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }

    warn!(
        path = %candidate.display(),
        probes = MAX_COLLISION_PROBES,
        "collision suffixes exhausted, returning last probed path"
    );
    candidate
}
