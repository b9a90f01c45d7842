//! Directory creation and collision-safe file relocation.
//!
//! The [`Relocator`] is the only component that writes to the
//! destination tree. Directories are created one level at a time with
//! "create if absent" semantics, so two invocations racing to create
//! the same subject or series directory never error; permission mode
//! and ownership are applied only to directories this process actually
//! created, never to pre-existing ones.

use crate::config::SorterConfig;
use crate::layout::DestinationPath;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

#[cfg(unix)]
use crate::config::Ownership;

/// Errors that can occur while creating directories or moving files.
#[derive(Debug, thiserror::Error)]
pub enum RelocateError {
    #[error("failed to create destination directory {path}: {source}", path = path.display())]
    DirCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to set permissions on {path}: {source}", path = path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to change ownership of {path}: {source}", path = path.display())]
    Ownership {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "failed to move {from} to {to}: {source}",
        from = from.display(),
        to = to.display()
    )]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "failed to copy {from} to {to}: {source}",
        from = from.display(),
        to = to.display()
    )]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove source {path} after copy: {source}", path = path.display())]
    SourceRemoval {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read metadata of {path}: {source}", path = path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Record of one completed relocation.
///
/// Provides an auditable trail of what moved where without carrying any
/// clinical content.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelocationReceipt {
    /// Where the file arrived from
    pub source: PathBuf,

    /// Final path in the destination tree, after collision resolution
    pub destination: PathBuf,

    /// Size of the relocated file in bytes
    pub size_bytes: u64,

    /// UTC timestamp when the move completed
    pub relocated_at: DateTime<Utc>,
}

/// Owner of the destination tree.
///
/// Creates missing directory levels and performs the atomic move.
/// Within one volume the move is a rename, atomic with respect to other
/// readers of the destination path; a cross-volume move degrades to
/// copy + remove and is not atomic. The source file is never removed
/// without the destination having been written first.
#[derive(Debug)]
pub struct Relocator {
    config: SorterConfig,
}

impl Relocator {
    /// Creates a relocator writing under the configured destination root.
    pub fn new(config: SorterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    /// Ensures the subject and series directories for `dest` exist.
    ///
    /// Idempotent: levels that already exist are left untouched, and a
    /// concurrent creator winning the race counts as success.
    ///
    /// # Errors
    ///
    /// Returns `RelocateError` if a missing level cannot be created or
    /// a created level cannot receive its attributes.
    pub fn ensure_series_dir(&self, dest: &DestinationPath) -> Result<PathBuf, RelocateError> {
        let subject_dir = self.config.dest_dir().join(dest.subject_dir());
        self.ensure_dir(&subject_dir)?;
        let series_dir = subject_dir.join(dest.series_dir());
        self.ensure_dir(&series_dir)?;
        Ok(series_dir)
    }

    /// Moves `source` to the resolved `destination` path.
    ///
    /// # Errors
    ///
    /// Returns `RelocateError` if the move cannot complete or the moved
    /// file cannot receive its attributes.
    pub fn relocate(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<RelocationReceipt, RelocateError> {
        match fs::rename(source, destination) {
            Ok(()) => {}
            Err(err) if is_cross_device(&err) => {
                // Cross-volume move: copy first, remove the source only
                // once the destination has been fully written.
                fs::copy(source, destination).map_err(|e| RelocateError::Copy {
                    from: source.to_owned(),
                    to: destination.to_owned(),
                    source: e,
                })?;
                fs::remove_file(source).map_err(|e| RelocateError::SourceRemoval {
                    path: source.to_owned(),
                    source: e,
                })?;
            }
            Err(err) => {
                return Err(RelocateError::Move {
                    from: source.to_owned(),
                    to: destination.to_owned(),
                    source: err,
                })
            }
        }

        self.apply_file_attributes(destination)?;

        let size_bytes = fs::metadata(destination)
            .map_err(|e| RelocateError::Metadata {
                path: destination.to_owned(),
                source: e,
            })?
            .len();

        info!(
            from = %source.display(),
            to = %destination.display(),
            size_bytes,
            "relocated file"
        );

        Ok(RelocationReceipt {
            source: source.to_owned(),
            destination: destination.to_owned(),
            size_bytes,
            relocated_at: Utc::now(),
        })
    }

    /// Creates one directory level if absent, applying attributes only
    /// when this call actually created it.
    fn ensure_dir(&self, path: &Path) -> Result<(), RelocateError> {
        match fs::create_dir(path) {
            Ok(()) => {
                info!(path = %path.display(), "created directory");
                apply_mode(path, self.config.dir_mode()).map_err(|e| {
                    RelocateError::Permissions {
                        path: path.to_owned(),
                        source: e,
                    }
                })?;
                self.apply_owner(path)
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(RelocateError::DirCreation {
                path: path.to_owned(),
                source: err,
            }),
        }
    }

    fn apply_file_attributes(&self, path: &Path) -> Result<(), RelocateError> {
        apply_mode(path, self.config.file_mode()).map_err(|e| RelocateError::Permissions {
            path: path.to_owned(),
            source: e,
        })?;
        self.apply_owner(path)
    }

    #[cfg(unix)]
    fn apply_owner(&self, path: &Path) -> Result<(), RelocateError> {
        if let Some(owner) = self.config.owner() {
            chown_path(path, owner).map_err(|e| RelocateError::Ownership {
                path: path.to_owned(),
                source: e,
            })?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn apply_owner(&self, _path: &Path) -> Result<(), RelocateError> {
        Ok(())
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn chown_path(path: &Path, owner: Ownership) -> io::Result<()> {
    use nix::unistd::{chown, Gid, Uid};
    chown(
        path,
        Some(Uid::from_raw(owner.uid)),
        Some(Gid::from_raw(owner.gid)),
    )
    .map_err(|errno| io::Error::from_raw_os_error(errno as i32))
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(nix::libc::EXDEV)
}

#[cfg(not(unix))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::build_destination;
    use dis_header::ClassificationRecord;
    use dis_types::Sanitizer;
    use tempfile::TempDir;

    fn destination() -> DestinationPath {
        let sanitizer = Sanitizer::new();
        build_destination(&ClassificationRecord {
            subject_id: sanitizer.sanitize("P001"),
            subject_name: sanitizer.sanitize("John Doe"),
            series_number: 2,
            series_description: sanitizer.sanitize("T1 MRI"),
            instance_number: 15,
            acquisition_date: sanitizer.sanitize("20230615"),
        })
    }

    fn relocator(dest_root: &Path) -> Relocator {
        Relocator::new(SorterConfig::new(dest_root).unwrap())
    }

    #[test]
    fn test_ensure_series_dir_creates_both_levels() {
        let temp = TempDir::new().unwrap();
        let relocator = relocator(temp.path());

        let series_dir = relocator.ensure_series_dir(&destination()).unwrap();

        assert!(series_dir.is_dir());
        assert!(series_dir.ends_with("P001+John_Doe/20230615+002-T1_MRI"));
    }

    #[test]
    fn test_ensure_series_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let relocator = relocator(temp.path());

        let first = relocator.ensure_series_dir(&destination()).unwrap();
        let second = relocator.ensure_series_dir(&destination()).unwrap();

        assert_eq!(first, second);
        assert!(second.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_created_directories_receive_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let config = SorterConfig::new(temp.path()).unwrap().with_dir_mode(0o750);
        let relocator = Relocator::new(config);

        let series_dir = relocator.ensure_series_dir(&destination()).unwrap();

        let mode = fs::metadata(&series_dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[test]
    fn test_relocate_moves_file_and_returns_receipt() {
        let temp = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let relocator = relocator(temp.path());

        let source = staging.path().join("incoming.dcm");
        fs::write(&source, b"header and payload").unwrap();

        let series_dir = relocator.ensure_series_dir(&destination()).unwrap();
        let target = series_dir.join("00015.dcm");
        let receipt = relocator.relocate(&source, &target).unwrap();

        assert!(!source.exists());
        assert!(target.is_file());
        assert_eq!(receipt.destination, target);
        assert_eq!(receipt.size_bytes, 18);
    }

    #[cfg(unix)]
    #[test]
    fn test_relocated_file_receives_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let config = SorterConfig::new(temp.path()).unwrap().with_file_mode(0o600);
        let relocator = Relocator::new(config);

        let source = staging.path().join("incoming.dcm");
        fs::write(&source, b"x").unwrap();
        let target = temp.path().join("00001.dcm");
        relocator.relocate(&source, &target).unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_relocate_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let relocator = relocator(temp.path());

        let result = relocator.relocate(
            Path::new("/non-existent/gone.dcm"),
            &temp.path().join("00001.dcm"),
        );
        assert!(matches!(result, Err(RelocateError::Move { .. })));
    }

    #[test]
    fn test_receipt_serialization() {
        let receipt = RelocationReceipt {
            source: PathBuf::from("/staging/a.dcm"),
            destination: PathBuf::from("/archive/P001+X/20230615+002-Y/00015.dcm"),
            size_bytes: 42,
            relocated_at: "2023-06-15T12:00:00Z".parse().unwrap(),
        };

        let json = serde_json::to_string(&receipt).unwrap();
        assert!(json.contains("00015.dcm"));
        let back: RelocationReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, receipt);
    }
}
