//! Undo log for the merge step.
//!
//! Before the merger writes a file, it records what was there: a copy of the
//! previous content (a *pre-image*) when the file existed, the link target
//! when it was a symlink, or a creation marker when it did not. [`MergeJournal::revert`] replays the records in
//! reverse, returning every non-critical file to its pre-merge state.

use crate::core::KeepupError;
use crate::utils::fs::{atomic_copy, copy_preserving, ensure_parent_dir, remove_path};
use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
enum JournalEntry {
    /// `target` existed; its previous content is at `preimage`.
    Overwritten {
        target: PathBuf,
        preimage: PathBuf,
    },
    /// `target` was a symlink pointing at `link_to`.
    Linked {
        target: PathBuf,
        link_to: PathBuf,
    },
    /// `target` did not exist. `created_dirs` lists the parent directories
    /// the merge will create for it, outermost first.
    Created {
        target: PathBuf,
        created_dirs: Vec<PathBuf>,
    },
}

/// Ordered record of the files a merge touched.
#[derive(Debug)]
pub struct MergeJournal {
    project_root: PathBuf,
    preimage_dir: PathBuf,
    entries: Vec<JournalEntry>,
}

impl MergeJournal {
    /// A journal for merges into `project_root`, storing pre-images under
    /// `preimage_dir`.
    pub fn new(project_root: PathBuf, preimage_dir: PathBuf) -> Self {
        Self {
            project_root,
            preimage_dir,
            entries: Vec::new(),
        }
    }

    /// Number of recorded files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records the state of `relative` before it is written.
    ///
    /// Must be called before the write. A directory target is not recorded;
    /// the write to it will fail on its own.
    pub fn record(&mut self, relative: &str) -> Result<()> {
        let target = self.project_root.join(relative);
        match std::fs::symlink_metadata(&target) {
            Ok(metadata) if metadata.is_file() => {
                let preimage = self.preimage_dir.join(relative);
                ensure_parent_dir(&preimage)
                    .and_then(|()| copy_preserving(&target, &preimage).map(|_| ()))
                    .with_context(|| KeepupError::fs("journal", &target))?;
                self.entries.push(JournalEntry::Overwritten {
                    target,
                    preimage,
                });
            }
            Ok(metadata) if metadata.file_type().is_symlink() => {
                let link_to = std::fs::read_link(&target)
                    .with_context(|| KeepupError::fs("journal", &target))?;
                self.entries.push(JournalEntry::Linked {
                    target,
                    link_to,
                });
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let created_dirs = self.missing_parents(&target);
                self.entries.push(JournalEntry::Created {
                    target,
                    created_dirs,
                });
            }
            Err(e) => return Err(e).with_context(|| KeepupError::fs("journal", &target)),
        }
        Ok(())
    }

    fn missing_parents(&self, target: &Path) -> Vec<PathBuf> {
        let mut missing: Vec<PathBuf> = target
            .ancestors()
            .skip(1)
            .take_while(|dir| *dir != self.project_root && !dir.exists())
            .map(Path::to_path_buf)
            .collect();
        missing.reverse();
        missing
    }

    /// Undoes every recorded change, newest first.
    ///
    /// Keeps going past individual failures so as much as possible is
    /// restored.
    ///
    /// # Returns
    ///
    /// The number of entries reverted.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first file that could not be reverted,
    /// after all others have been attempted.
    pub fn revert(&self) -> Result<usize> {
        let mut reverted = 0;
        let mut first_failure: Option<anyhow::Error> = None;

        for entry in self.entries.iter().rev() {
            let result = match entry {
                JournalEntry::Overwritten {
                    target,
                    preimage,
                } => atomic_copy(preimage, target)
                    .map(|_| ())
                    .with_context(|| KeepupError::fs("revert", target)),
                JournalEntry::Linked {
                    target,
                    link_to,
                } => relink(target, link_to).with_context(|| KeepupError::fs("revert", target)),
                JournalEntry::Created {
                    target,
                    created_dirs,
                } => remove_created(target, created_dirs),
            };

            match result {
                Ok(()) => reverted += 1,
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "Failed to revert merged file");
                    first_failure.get_or_insert(e);
                }
            }
        }

        debug!(reverted, total = self.entries.len(), "Merge journal replayed");
        match first_failure {
            None => Ok(reverted),
            Some(e) => Err(e.context(format!(
                "Reverted {reverted} of {} merged files",
                self.entries.len()
            ))),
        }
    }
}

fn relink(target: &Path, link_to: &Path) -> Result<()> {
    remove_path(target)?;
    #[cfg(unix)]
    std::os::unix::fs::symlink(link_to, target)?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_file(link_to, target)?;
    Ok(())
}

fn remove_created(target: &Path, created_dirs: &[PathBuf]) -> Result<()> {
    match std::fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| KeepupError::fs("revert", target)),
    }
    // Innermost first; a directory another entry still uses is left alone.
    for dir in created_dirs.iter().rev() {
        if std::fs::remove_dir(dir).is_err() {
            break;
        }
    }
    Ok(())
}
