//! Project-level mutual exclusion for update transactions.
//!
//! Only one transaction may mutate an installation at a time. The lock is an
//! exclusive OS file lock on `<project>/.keepup.lock`, held for the lifetime
//! of the [`ProjectLock`] value and released when it is dropped.
//!
//! The lock file itself stays on disk. Unlinking it would split waiters and
//! newcomers across two inodes.
//!
//! # Async Safety
//!
//! File operations run in `spawn_blocking` so lock polling never blocks a
//! tokio worker thread.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use crate::core::KeepupError;
use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

/// An exclusive lock on a project root.
///
/// # Example
///
/// ```rust,no_run
/// use keepup_cli::update::ProjectLock;
/// use std::path::Path;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let lock_path = Path::new("/opt/app/.keepup.lock");
/// let _lock = ProjectLock::acquire(lock_path, Duration::from_secs(5)).await?;
/// // Mutate the installation...
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ProjectLock {
    /// The file handle; the OS lock is released when it closes.
    _file: Arc<File>,
    lock_path: PathBuf,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        if let Err(e) = self._file.unlock() {
            debug!(path = %self.lock_path.display(), error = %e, "Failed to unlock project lock");
        }
        debug!(path = %self.lock_path.display(), "Project lock released");
    }
}

impl ProjectLock {
    /// Acquires the lock at `lock_path`, waiting up to `timeout`.
    ///
    /// Polls with non-blocking lock attempts and exponential backoff
    /// (10ms, 20ms, 40ms... capped at 500ms).
    ///
    /// # Errors
    ///
    /// Returns [`KeepupError::UpdateInProgress`] if another holder keeps the
    /// lock past `timeout`, or an IO error if the lock file cannot be opened.
    pub async fn acquire(lock_path: &Path, timeout: Duration) -> Result<Self> {
        debug!(path = %lock_path.display(), "Waiting for project lock");

        let path = lock_path.to_path_buf();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&path)
        })
        .await
        .context("spawn_blocking panicked")?
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        let file = Arc::new(file);

        let start = std::time::Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let file_clone = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || file_clone.try_lock_exclusive())
                .await
                .context("spawn_blocking panicked")?;

            if matches!(locked, Ok(true)) {
                debug!(
                    path = %lock_path.display(),
                    wait_ms = start.elapsed().as_millis(),
                    "Project lock acquired"
                );
                return Ok(Self {
                    _file: file,
                    lock_path: lock_path.to_path_buf(),
                });
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        let root = lock_path.parent().unwrap_or(lock_path);
        Err(KeepupError::UpdateInProgress {
            path: root.display().to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::find_kind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lock_acquire_and_release() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join(".keepup.lock");

        let lock = ProjectLock::acquire(&lock_path, Duration::from_secs(1)).await.unwrap();
        assert!(lock_path.exists());

        drop(lock);
        assert!(lock_path.exists(), "lock file must outlive the lock");
        let _again = ProjectLock::acquire(&lock_path, Duration::from_millis(100)).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_holder_gets_update_in_progress() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join(".keepup.lock");

        let _held = ProjectLock::acquire(&lock_path, Duration::from_secs(1)).await.unwrap();

        let start = std::time::Instant::now();
        let err = ProjectLock::acquire(&lock_path, Duration::from_millis(100)).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(find_kind(&err), Some(KeepupError::UpdateInProgress { .. })));
        assert!(elapsed >= Duration::from_millis(50), "Timeout too quick: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1000), "Timeout too slow: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_waiter_acquires_after_release() {
        use std::time::Instant;
        use tokio::sync::Barrier;

        let temp_dir = TempDir::new().unwrap();
        let lock_path = Arc::new(temp_dir.path().join(".keepup.lock"));
        let barrier = Arc::new(Barrier::new(2));

        let path1 = lock_path.clone();
        let barrier1 = barrier.clone();
        let holder = tokio::spawn(async move {
            let _lock = ProjectLock::acquire(&path1, Duration::from_secs(1)).await.unwrap();
            barrier1.wait().await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        let path2 = lock_path.clone();
        let waiter = tokio::spawn(async move {
            barrier.wait().await;
            let start = Instant::now();
            let _lock = ProjectLock::acquire(&path2, Duration::from_secs(5)).await.unwrap();
            assert!(start.elapsed() >= Duration::from_millis(50));
        });

        holder.await.unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_late_arrival_cannot_join_released_waiter() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join(".keepup.lock");

        let first = ProjectLock::acquire(&lock_path, Duration::from_secs(1)).await.unwrap();
        let waiter = tokio::spawn({
            let path = lock_path.clone();
            async move { ProjectLock::acquire(&path, Duration::from_secs(5)).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(first);
        let second = waiter.await.unwrap().unwrap();

        let err = ProjectLock::acquire(&lock_path, Duration::from_millis(300)).await.unwrap_err();
        assert!(matches!(find_kind(&err), Some(KeepupError::UpdateInProgress { .. })));

        drop(second);
        ProjectLock::acquire(&lock_path, Duration::from_millis(300)).await.unwrap();
    }
}
