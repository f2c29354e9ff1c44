//! Snapshot and restore of critical files.
//!
//! Before anything in the live tree changes, [`BackupManager::snapshot`]
//! copies every existing critical file into the backup directory, mirroring
//! its project-relative path. The snapshot is consulted when the transaction
//! restores critical files (on success and on rollback) and destroyed when
//! the transaction commits.
//!
//! All operations are blocking; the transaction runs them on the blocking
//! thread pool.

use crate::config::{CriticalFileSet, UpdaterConfig};
use crate::core::KeepupError;
use crate::utils::fs::{
    atomic_copy, copy_dir_preserving, copy_preserving, ensure_dir, ensure_parent_dir,
    relative_slash_path, remove_dir_all,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Attempts per file when restoring; a file in use may be briefly locked.
const MAX_RESTORE_ATTEMPTS: u32 = 3;

/// Delay between restore attempts.
const RESTORE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Creates, restores and discards critical-file backups for one project.
///
/// # Examples
///
/// ```rust,no_run
/// use keepup_cli::config::CriticalFileSet;
/// use keepup_cli::update::BackupManager;
/// use std::path::PathBuf;
///
/// # fn example() -> anyhow::Result<()> {
/// let manager = BackupManager::new(PathBuf::from("/opt/app"), PathBuf::from("/opt/app/.backup"));
/// let critical = CriticalFileSet::new(["config.json"], &[".update", ".backup"])?;
///
/// let snapshot = manager.snapshot(&critical)?;
/// // ... mutate the live tree ...
/// manager.restore(&snapshot)?;
/// manager.discard()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    project_root: PathBuf,
    backup_dir: PathBuf,
}

/// A completed backup on disk.
///
/// Lists the files it holds as `/`-joined paths relative to both the backup
/// directory and the project root.
#[derive(Debug, Clone)]
pub struct BackupSnapshot {
    root: PathBuf,
    files: Vec<String>,
}

impl BackupSnapshot {
    /// Directory holding the backed-up files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Backed-up files, sorted.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl BackupManager {
    pub fn new(project_root: PathBuf, backup_dir: PathBuf) -> Self {
        Self {
            project_root,
            backup_dir,
        }
    }

    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self::new(config.project_root.clone(), config.backup_dir.clone())
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Whether a backup directory exists, e.g. left behind by a failed run.
    pub fn backup_exists(&self) -> bool {
        self.backup_dir.is_dir()
    }

    /// Copies every existing critical path into a fresh backup directory.
    ///
    /// Any backup left by an interrupted run is destroyed first. Entries that
    /// do not exist are skipped; entries naming a directory are copied
    /// recursively. Content, permissions and modification time are kept.
    ///
    /// # Errors
    ///
    /// Returns [`KeepupError::FileSystemError`] if any copy fails. The partial
    /// backup is removed before returning, and nothing in the live tree has
    /// been touched.
    pub fn snapshot(&self, critical: &CriticalFileSet) -> Result<BackupSnapshot> {
        if self.backup_dir.exists() {
            debug!(path = %self.backup_dir.display(), "Removing stale backup");
            remove_dir_all(&self.backup_dir)
                .with_context(|| KeepupError::fs("remove stale backup", &self.backup_dir))?;
        }

        match self.copy_critical(critical) {
            Ok(snapshot) => {
                info!(files = snapshot.files.len(), "Critical files backed up");
                Ok(snapshot)
            }
            Err(e) => {
                if let Err(cleanup) = remove_dir_all(&self.backup_dir) {
                    warn!(error = %cleanup, "Failed to remove partial backup");
                }
                Err(e)
            }
        }
    }

    fn copy_critical(&self, critical: &CriticalFileSet) -> Result<BackupSnapshot> {
        ensure_dir(&self.backup_dir)
            .with_context(|| KeepupError::fs("create backup directory", &self.backup_dir))?;

        for relative in critical.iter() {
            let source = self.project_root.join(relative);
            let target = self.backup_dir.join(relative);

            let metadata = match std::fs::metadata(&source) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = relative, "Critical file absent, skipping");
                    continue;
                }
                Err(e) => {
                    return Err(e).with_context(|| KeepupError::fs("back up", &source));
                }
            };

            if metadata.is_dir() {
                copy_dir_preserving(&source, &target)
                    .with_context(|| KeepupError::fs("back up", &source))?;
            } else {
                ensure_parent_dir(&target)
                    .and_then(|()| copy_preserving(&source, &target))
                    .with_context(|| KeepupError::fs("back up", &source))?;
            }
            debug!(path = relative, "Backed up");
        }

        self.open_at(self.backup_dir.clone())
    }

    /// Opens the backup currently on disk.
    ///
    /// # Errors
    ///
    /// Returns [`KeepupError::NoBackup`] if the backup directory is absent.
    pub fn existing(&self) -> Result<BackupSnapshot> {
        if !self.backup_exists() {
            return Err(KeepupError::NoBackup {
                path: self.backup_dir.display().to_string(),
            }
            .into());
        }
        self.open_at(self.backup_dir.clone())
    }

    fn open_at(&self, root: PathBuf) -> Result<BackupSnapshot> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| KeepupError::fs("read backup", &root))?;
            if entry.file_type().is_file()
                && let Some(relative) = relative_slash_path(&root, entry.path())
            {
                files.push(relative);
            }
        }
        Ok(BackupSnapshot {
            root,
            files,
        })
    }

    /// Copies every file in `snapshot` back over the live tree.
    ///
    /// Each file replaces its live counterpart atomically, with missing parent
    /// directories created. Restoring the same snapshot twice leaves the same
    /// tree.
    ///
    /// # Returns
    ///
    /// The number of files restored.
    pub fn restore(&self, snapshot: &BackupSnapshot) -> Result<usize> {
        for relative in &snapshot.files {
            let source = snapshot.root.join(relative);
            let target = self.project_root.join(relative);
            restore_with_retry(&source, &target)
                .with_context(|| KeepupError::fs("restore", &target))?;
            debug!(path = %relative, "Restored");
        }
        Ok(snapshot.files.len())
    }

    /// Deletes the backup directory.
    pub fn discard(&self) -> Result<()> {
        remove_dir_all(&self.backup_dir)
            .with_context(|| KeepupError::fs("remove backup", &self.backup_dir))
    }
}

fn restore_with_retry(source: &Path, target: &Path) -> Result<()> {
    let mut attempt = 1;
    loop {
        match atomic_copy(source, target) {
            Ok(_) => return Ok(()),
            Err(e) if attempt < MAX_RESTORE_ATTEMPTS => {
                warn!(path = %target.display(), attempt, error = %e, "Restore attempt failed, retrying");
                std::thread::sleep(RESTORE_RETRY_DELAY);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
