//! The transient staging area owned by one transaction.
//!
//! Layout under the configured staging directory:
//!
//! ```text
//! .update/
//! ├── update.zip     downloaded archive
//! ├── extracted/     archive contents
//! └── journal/       pre-images of files the merge overwrote
//! ```
//!
//! The directory is removed when the transaction ends, on success and on
//! failure. [`StagingArea::cleanup`] reports removal errors; dropping the
//! value without calling it removes the directory on a best-effort basis.

use crate::config::UpdaterConfig;
use crate::core::KeepupError;
use crate::utils::fs::{ensure_dir, remove_dir_all};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Staging directory for one update attempt.
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    archive_path: PathBuf,
    extracted_dir: PathBuf,
    journal_dir: PathBuf,
    cleaned: bool,
}

impl StagingArea {
    /// Creates a fresh staging area, discarding one left by an earlier run.
    pub fn create(config: &UpdaterConfig) -> Result<Self> {
        let root = config.staging_dir.clone();
        if root.exists() {
            debug!(path = %root.display(), "Removing stale staging area");
            remove_dir_all(&root)
                .with_context(|| KeepupError::fs("remove stale staging area", &root))?;
        }
        ensure_dir(&root).with_context(|| KeepupError::fs("create staging area", &root))?;

        Ok(Self {
            archive_path: config.staged_archive_path(),
            extracted_dir: config.extracted_dir(),
            journal_dir: config.journal_dir(),
            root,
            cleaned: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the downloaded archive is written.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Where the archive is unpacked.
    pub fn extracted_dir(&self) -> &Path {
        &self.extracted_dir
    }

    /// Where the merge journal stores pre-images.
    pub fn journal_dir(&self) -> &Path {
        &self.journal_dir
    }

    /// Removes the staging directory.
    pub fn cleanup(mut self) -> Result<()> {
        self.cleaned = true;
        remove_dir_all(&self.root).with_context(|| KeepupError::fs("remove staging area", &self.root))
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if !self.cleaned
            && let Err(e) = remove_dir_all(&self.root)
        {
            warn!(path = %self.root.display(), error = %e, "Failed to remove staging area");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_cleanup() {
        let temp = TempDir::new().unwrap();
        let config = UpdaterConfig::with_defaults(temp.path()).unwrap();

        let staging = StagingArea::create(&config).unwrap();
        assert!(staging.root().is_dir());
        assert_eq!(staging.archive_path(), temp.path().join(".update/update.zip"));
        assert_eq!(staging.extracted_dir(), temp.path().join(".update/extracted"));

        std::fs::write(staging.archive_path(), b"zip").unwrap();
        staging.cleanup().unwrap();
        assert!(!temp.path().join(".update").exists());
    }

    #[test]
    fn test_stale_area_is_replaced() {
        let temp = TempDir::new().unwrap();
        let config = UpdaterConfig::with_defaults(temp.path()).unwrap();
        std::fs::create_dir_all(temp.path().join(".update/extracted/old")).unwrap();

        let staging = StagingArea::create(&config).unwrap();
        assert!(!staging.extracted_dir().exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let temp = TempDir::new().unwrap();
        let config = UpdaterConfig::with_defaults(temp.path()).unwrap();

        let staging = StagingArea::create(&config).unwrap();
        let root = staging.root().to_path_buf();
        drop(staging);
        assert!(!root.exists());
    }
}
