//! Sorter runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into
//! the services that need it. Permission modes and the owning identity
//! are parameters here rather than module-level state, so tests and
//! embedders can vary them per instance.

use crate::constants::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use std::path::{Path, PathBuf};

/// Errors that can occur when resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Destination root does not exist, is not a directory, or cannot
    /// be canonicalised
    #[error("invalid destination directory: {0}")]
    InvalidDestination(String),
}

/// Owning identity applied to created directories and relocated files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

/// Configuration for the relocation side of the pipeline.
///
/// Carries the destination root and the filesystem attributes given to
/// everything the sorter creates. The destination root is validated and
/// canonicalised at construction time; no I/O beyond that happens here.
#[derive(Debug, Clone)]
pub struct SorterConfig {
    dest_dir: PathBuf,
    dir_mode: u32,
    file_mode: u32,
    owner: Option<Ownership>,
}

impl SorterConfig {
    /// Creates a configuration rooted at `dest_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDestination` if `dest_dir` does not
    /// exist, is not a directory, or cannot be canonicalised.
    pub fn new(dest_dir: &Path) -> Result<Self, ConfigError> {
        if !dest_dir.exists() {
            return Err(ConfigError::InvalidDestination(format!(
                "directory does not exist: {}",
                dest_dir.display()
            )));
        }

        if !dest_dir.is_dir() {
            return Err(ConfigError::InvalidDestination(format!(
                "path is not a directory: {}",
                dest_dir.display()
            )));
        }

        let dest_dir = dest_dir.canonicalize().map_err(|e| {
            ConfigError::InvalidDestination(format!(
                "cannot canonicalize path {}: {}",
                dest_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            dest_dir,
            dir_mode: DEFAULT_DIR_MODE,
            file_mode: DEFAULT_FILE_MODE,
            owner: None,
        })
    }

    /// Sets the permission mode for created directories.
    #[must_use]
    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Sets the permission mode for relocated files.
    #[must_use]
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Sets the owning identity for created paths.
    #[must_use]
    pub fn with_owner(mut self, owner: Ownership) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Returns the canonicalised destination root.
    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    pub fn dir_mode(&self) -> u32 {
        self.dir_mode
    }

    pub fn file_mode(&self) -> u32 {
        self.file_mode
    }

    pub fn owner(&self) -> Option<Ownership> {
        self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_valid_destination() {
        let temp = TempDir::new().unwrap();
        let config = SorterConfig::new(temp.path()).unwrap();

        assert_eq!(config.dir_mode(), DEFAULT_DIR_MODE);
        assert_eq!(config.file_mode(), DEFAULT_FILE_MODE);
        assert!(config.owner().is_none());
        assert!(config.dest_dir().is_absolute());
    }

    #[test]
    fn test_config_missing_destination() {
        let temp = TempDir::new().unwrap();
        let result = SorterConfig::new(&temp.path().join("missing"));
        assert!(matches!(result, Err(ConfigError::InvalidDestination(_))));
    }

    #[test]
    fn test_config_destination_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "not a directory").unwrap();

        let result = SorterConfig::new(&file);
        assert!(matches!(result, Err(ConfigError::InvalidDestination(_))));
    }

    #[test]
    fn test_config_builders() {
        let temp = TempDir::new().unwrap();
        let config = SorterConfig::new(temp.path())
            .unwrap()
            .with_dir_mode(0o750)
            .with_file_mode(0o640)
            .with_owner(Ownership { uid: 1000, gid: 1000 });

        assert_eq!(config.dir_mode(), 0o750);
        assert_eq!(config.file_mode(), 0o640);
        assert_eq!(config.owner(), Some(Ownership { uid: 1000, gid: 1000 }));
    }
}
