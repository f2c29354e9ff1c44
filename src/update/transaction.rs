//! The update transaction.
//!
//! One [`UpdateTransaction`] drives a single update attempt through these
//! states:
//!
//! ```text
//! Idle → Checking ─┬─────────────────────────────→ Idle  (no update / check unavailable)
//!                  └→ AwaitingConfirmation ─┬────→ Idle  (declined)
//!                                           └→ BackingUp → Downloading → Applying
//!                                                → RestoringCritical → Committed
//! ```
//!
//! Failure handling depends on how far the attempt got:
//!
//! | Failing state       | Live tree touched? | Terminal state | Recovery                         |
//! |---------------------|--------------------|----------------|----------------------------------|
//! | `BackingUp`         | no                 | `Failed`       | partial backup removed           |
//! | `Downloading`       | no                 | `Failed`       | staging and backup removed       |
//! | `Applying`          | yes                | `RolledBack`   | journal replayed, backup restored|
//! | `RestoringCritical` | yes                | `RolledBack`   | journal replayed, backup restored|
//!
//! The transaction holds the project lock from start to finish and consumes
//! itself, so it cannot be reused after reaching a terminal state.
//!
//! # Examples
//!
//! ```rust,no_run
//! use keepup_cli::config::UpdaterConfig;
//! use keepup_cli::update::{Confirmation, TransactionOutcome, UpdateTransaction};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::for_project(Path::new("/opt/app"))?;
//! let outcome = UpdateTransaction::open(config)?.run(Confirmation::Preapproved).await?;
//! if let TransactionOutcome::Committed(summary) = outcome {
//!     println!("updated {} -> {}", summary.from, summary.to);
//! }
//! # Ok(())
//! # }
//! ```

use super::archive::extract_zip_blocking;
use super::backup::{BackupManager, BackupSnapshot};
use super::fetcher::ArtifactFetcher;
use super::journal::MergeJournal;
use super::lock::ProjectLock;
use super::merger::{AppliedFiles, FileMerger};
use super::oracle::{ReleaseInfo, UpdateCheck, VersionOracle};
use super::staging::StagingArea;
use crate::config::{UpdaterConfig, VersionDescriptor};
use crate::core::KeepupError;
use crate::utils::ProgressBar;
use crate::version::Version;
use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// States of an update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    Idle,
    Checking,
    AwaitingConfirmation,
    BackingUp,
    Downloading,
    Applying,
    RestoringCritical,
    Committed,
    RolledBack,
    Failed,
}

impl TransactionState {
    /// Whether the attempt is over in this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack | Self::Failed)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Checking => "checking for updates",
            Self::AwaitingConfirmation => "awaiting confirmation",
            Self::BackingUp => "backing up critical files",
            Self::Downloading => "downloading",
            Self::Applying => "applying",
            Self::RestoringCritical => "restoring critical files",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
            Self::Failed => "failed",
        })
    }
}

/// What a rollback managed to restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Merged files returned to their previous state by the journal.
    pub reverted_files: usize,
    /// Why the journal could not be fully replayed.
    pub journal_error: Option<String>,
    /// Critical files restored from the backup.
    pub restored_critical: usize,
    /// Why the backup could not be fully restored.
    pub restore_error: Option<String>,
    /// Backup left on disk for `keepup rollback`, when the restore failed.
    pub backup_kept: Option<PathBuf>,
}

impl RollbackReport {
    /// Whether every rollback step succeeded.
    pub fn is_complete(&self) -> bool {
        self.journal_error.is_none() && self.restore_error.is_none()
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            write!(
                f,
                "Rollback complete: restored {} critical file(s), reverted {} merged file(s)",
                self.restored_critical, self.reverted_files
            )?;
        } else {
            write!(f, "Rollback incomplete")?;
            if let Some(e) = &self.journal_error {
                write!(f, "\n  merged files: {e}")?;
            }
            if let Some(e) = &self.restore_error {
                write!(f, "\n  critical files: {e}")?;
            }
        }
        if let Some(path) = &self.backup_kept {
            write!(f, "\nBackup kept at {}; run 'keepup rollback' to retry", path.display())?;
        }
        Ok(())
    }
}

/// Receives progress notifications from a running transaction.
///
/// All methods default to doing nothing.
pub trait TransactionObserver: Send + Sync {
    /// Called on every state change.
    fn on_transition(&self, _from: TransactionState, _to: TransactionState) {}

    /// Called with the result of the release check.
    fn on_check(&self, _check: &UpdateCheck) {}

    /// Called once a rollback has finished, successful or not.
    fn on_rollback(&self, _report: &RollbackReport) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TransactionObserver for NoopObserver {}

/// Decides whether a found release is installed.
pub enum Confirmation {
    /// Install without asking.
    Preapproved,
    /// Never install; only report what was found.
    Declined,
    /// Ask the callback with the installed version and the release.
    Ask(Box<dyn FnOnce(&Version, &ReleaseInfo) -> bool + Send>),
}

impl Confirmation {
    /// Wraps a decision callback.
    pub fn ask(decide: impl FnOnce(&Version, &ReleaseInfo) -> bool + Send + 'static) -> Self {
        Self::Ask(Box::new(decide))
    }

    fn decide(self, current: &Version, release: &ReleaseInfo) -> bool {
        match self {
            Self::Preapproved => true,
            Self::Declined => false,
            Self::Ask(decide) => decide(current, release),
        }
    }
}

impl fmt::Debug for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preapproved => f.write_str("Preapproved"),
            Self::Declined => f.write_str("Declined"),
            Self::Ask(_) => f.write_str("Ask(..)"),
        }
    }
}

/// A committed update.
#[derive(Debug, Clone)]
pub struct UpdateSummary {
    pub from: Version,
    pub to: Version,
    /// Release tag as published.
    pub tag: String,
    pub files: AppliedFiles,
    /// Critical files put back after the merge.
    pub restored_critical: usize,
    pub downloaded_bytes: u64,
    /// Archive checksum, `sha256:<hex>`.
    pub sha256: String,
}

/// How a transaction ended without error.
#[derive(Debug, Clone)]
pub enum TransactionOutcome {
    /// The installed version is current.
    UpToDate {
        current: Version,
        latest: Version,
    },
    /// The release endpoint could not be queried; nothing was changed.
    CheckUnavailable {
        reason: String,
    },
    /// A newer release exists but was not approved.
    Declined {
        release: ReleaseInfo,
    },
    /// The release was installed.
    Committed(UpdateSummary),
}

/// One update attempt against one project root.
pub struct UpdateTransaction {
    config: UpdaterConfig,
    descriptor: VersionDescriptor,
    observer: Box<dyn TransactionObserver>,
    state: TransactionState,
}

impl UpdateTransaction {
    /// Loads the version descriptor and prepares a transaction in `Idle`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the descriptor is missing or
    /// malformed. Nothing has been touched at that point.
    pub fn open(config: UpdaterConfig) -> Result<Self> {
        let descriptor = VersionDescriptor::load(&config)?;
        Ok(Self::with_descriptor(config, descriptor))
    }

    /// Prepares a transaction from an already loaded descriptor.
    pub fn with_descriptor(config: UpdaterConfig, descriptor: VersionDescriptor) -> Self {
        Self {
            config,
            descriptor,
            observer: Box::new(NoopObserver),
            state: TransactionState::Idle,
        }
    }

    /// Sets the observer notified of state changes.
    #[must_use]
    pub fn with_observer(mut self, observer: impl TransactionObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn descriptor(&self) -> &VersionDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Runs the attempt to a terminal state.
    ///
    /// # Errors
    ///
    /// - [`KeepupError::UpdateInProgress`] if another transaction holds the
    ///   project lock
    /// - [`KeepupError::TransactionFailed`] wrapping the cause when backup,
    ///   download, apply or critical-file restore fails; the error records
    ///   whether the attempt ended `Failed` or `RolledBack`
    pub async fn run(mut self, confirmation: Confirmation) -> Result<TransactionOutcome> {
        let oracle = VersionOracle::for_update(&self.config)?;
        let fetcher = ArtifactFetcher::new(&self.config.network, self.config.show_progress)?;
        let _lock = ProjectLock::acquire(&self.config.lock_path(), self.config.lock_timeout).await?;

        self.transition(TransactionState::Checking);
        let check = oracle.check_for_update(&self.descriptor).await;
        self.observer.on_check(&check);
        let (current, release) = match check {
            UpdateCheck::Available { current, release } => (current, release),
            UpdateCheck::UpToDate { current, latest } => {
                self.transition(TransactionState::Idle);
                return Ok(TransactionOutcome::UpToDate {
                    current,
                    latest,
                });
            }
            UpdateCheck::Unavailable { reason } => {
                self.transition(TransactionState::Idle);
                return Ok(TransactionOutcome::CheckUnavailable {
                    reason,
                });
            }
        };

        self.transition(TransactionState::AwaitingConfirmation);
        if !confirmation.decide(&current, &release) {
            info!(release = %release.version, "Update declined");
            self.transition(TransactionState::Idle);
            return Ok(TransactionOutcome::Declined {
                release,
            });
        }

        self.transition(TransactionState::BackingUp);
        let backup = BackupManager::from_config(&self.config);
        let snapshot = {
            let backup = backup.clone();
            let critical = self.descriptor.critical_files.clone();
            match blocking(move || backup.snapshot(&critical)).await {
                Ok(snapshot) => snapshot,
                Err(e) => return Err(self.fail(TransactionState::BackingUp, e)),
            }
        };

        self.transition(TransactionState::Downloading);
        let staging = {
            let config = self.config.clone();
            match blocking(move || StagingArea::create(&config)).await {
                Ok(staging) => staging,
                Err(e) => {
                    discard_backup(&backup).await;
                    return Err(self.fail(TransactionState::Downloading, e));
                }
            }
        };
        let artifact = match fetcher.fetch(&release.archive_url, staging.archive_path()).await {
            Ok(artifact) => artifact,
            Err(e) => {
                cleanup_staging(staging).await;
                discard_backup(&backup).await;
                return Err(self.fail(TransactionState::Downloading, e));
            }
        };

        self.transition(TransactionState::Applying);
        let (journal, applied) = self.apply(&staging).await;
        let files = match applied {
            Ok(files) => files,
            Err(e) => {
                return Err(self
                    .roll_back(TransactionState::Applying, e, journal, &backup, &snapshot, staging)
                    .await);
            }
        };

        self.transition(TransactionState::RestoringCritical);
        let restored = {
            let backup = backup.clone();
            let snapshot = snapshot.clone();
            blocking(move || backup.restore(&snapshot)).await
        };
        let restored_critical = match restored {
            Ok(count) => count,
            Err(e) => {
                return Err(self
                    .roll_back(
                        TransactionState::RestoringCritical,
                        e,
                        journal,
                        &backup,
                        &snapshot,
                        staging,
                    )
                    .await);
            }
        };

        self.transition(TransactionState::Committed);
        discard_backup(&backup).await;
        cleanup_staging(staging).await;

        info!(from = %current, to = %release.version, files = files.applied.len(), "Update committed");
        Ok(TransactionOutcome::Committed(UpdateSummary {
            from: current,
            to: release.version,
            tag: release.tag,
            files,
            restored_critical,
            downloaded_bytes: artifact.bytes,
            sha256: artifact.sha256,
        }))
    }

    /// Extracts the staged archive and merges it, returning the journal so a
    /// failure can be undone.
    async fn apply(&self, staging: &StagingArea) -> (Option<MergeJournal>, Result<AppliedFiles>) {
        let mut journal = self.config.strict_rollback.then(|| {
            MergeJournal::new(self.config.project_root.clone(), staging.journal_dir().to_path_buf())
        });
        let merger = FileMerger::new(&self.config, self.descriptor.critical_files.clone());
        let archive = staging.archive_path().to_path_buf();
        let extracted = staging.extracted_dir().to_path_buf();

        let progress = ProgressBar::new_spinner(self.config.show_progress);
        progress.set_message("Applying update");

        let joined = tokio::task::spawn_blocking(move || {
            let result = extract_zip_blocking(&archive, &extracted)
                .and_then(|_| merger.apply(&extracted, journal.as_mut()));
            (journal, result)
        })
        .await;
        progress.finish_and_clear();

        match joined {
            Ok(pair) => pair,
            Err(e) => (None, Err(anyhow::Error::new(e).context("Merge task panicked"))),
        }
    }

    async fn roll_back(
        &mut self,
        phase: TransactionState,
        cause: anyhow::Error,
        journal: Option<MergeJournal>,
        backup: &BackupManager,
        snapshot: &BackupSnapshot,
        staging: StagingArea,
    ) -> anyhow::Error {
        error!(phase = %phase, error = %format!("{cause:#}"), "Update failed, rolling back");

        let task_backup = backup.clone();
        let task_snapshot = snapshot.clone();
        let journal_expected = self.config.strict_rollback;
        let report = tokio::task::spawn_blocking(move || {
            restore_everything(journal.as_ref(), journal_expected, &task_backup, &task_snapshot)
        })
        .await
        .unwrap_or_else(|e| RollbackReport {
            restore_error: Some(format!("rollback task panicked: {e}")),
            backup_kept: Some(backup.backup_dir().to_path_buf()),
            ..RollbackReport::default()
        });

        // The journal's pre-images live in staging, so it goes last.
        cleanup_staging(staging).await;

        if report.is_complete() {
            info!(%report, "Rollback finished");
        } else {
            warn!(%report, "Rollback finished with errors");
        }
        self.transition(TransactionState::RolledBack);
        self.observer.on_rollback(&report);

        let reason = format!("{cause:#}");
        cause.context(KeepupError::TransactionFailed {
            phase,
            state: TransactionState::RolledBack,
            reason,
            rollback: Some(report),
        })
    }

    fn fail(&mut self, phase: TransactionState, cause: anyhow::Error) -> anyhow::Error {
        error!(phase = %phase, error = %format!("{cause:#}"), "Update failed");
        self.transition(TransactionState::Failed);
        let reason = format!("{cause:#}");
        cause.context(KeepupError::TransactionFailed {
            phase,
            state: TransactionState::Failed,
            reason,
            rollback: None,
        })
    }

    fn transition(&mut self, to: TransactionState) {
        let from = self.state;
        debug!(from = %from, to = %to, "Transaction state change");
        self.state = to;
        self.observer.on_transition(from, to);
    }
}

/// Replays the journal, then restores critical files.
///
/// When `journal_expected` is set but no journal survived (the merge task
/// panicked), the report says so and is not complete. The backup is removed
/// when the restore succeeds and kept otherwise.
fn restore_everything(
    journal: Option<&MergeJournal>,
    journal_expected: bool,
    backup: &BackupManager,
    snapshot: &BackupSnapshot,
) -> RollbackReport {
    let mut report = RollbackReport::default();

    match journal {
        Some(journal) => match journal.revert() {
            Ok(count) => report.reverted_files = count,
            Err(e) => report.journal_error = Some(format!("{e:#}")),
        },
        None if journal_expected => {
            report.journal_error =
                Some("merge journal was lost; merged files were not reverted".to_string());
        }
        None => {}
    }

    match backup.restore(snapshot) {
        Ok(count) => {
            report.restored_critical = count;
            if let Err(e) = backup.discard() {
                warn!(error = %format!("{e:#}"), "Failed to remove backup after rollback");
            }
        }
        Err(e) => {
            report.restore_error = Some(format!("{e:#}"));
            report.backup_kept = Some(backup.backup_dir().to_path_buf());
        }
    }
    report
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.context("spawn_blocking panicked")?
}

async fn discard_backup(backup: &BackupManager) {
    let backup = backup.clone();
    if let Err(e) = blocking(move || backup.discard()).await {
        warn!(error = %format!("{e:#}"), "Failed to remove backup");
    }
}

async fn cleanup_staging(staging: StagingArea) {
    if let Err(e) = blocking(move || staging.cleanup()).await {
        warn!(error = %format!("{e:#}"), "Failed to remove staging area");
    }
}

/// Restores critical files from a backup left by an interrupted or failed
/// update, then removes the backup and any stale staging area.
///
/// # Returns
///
/// The number of files restored.
///
/// # Errors
///
/// - [`KeepupError::UpdateInProgress`] if a transaction is running
/// - [`KeepupError::NoBackup`] if there is nothing to restore
/// - [`KeepupError::FileSystemError`] if a file cannot be restored; the
///   backup is kept
pub async fn recover_from_backup(config: &UpdaterConfig) -> Result<usize> {
    let _lock = ProjectLock::acquire(&config.lock_path(), config.lock_timeout).await?;

    let backup = BackupManager::from_config(config);
    let staging_dir = config.staging_dir.clone();
    blocking(move || {
        let snapshot = backup.existing()?;
        let restored = backup.restore(&snapshot)?;
        backup.discard()?;
        crate::utils::fs::remove_dir_all(&staging_dir)
            .with_context(|| KeepupError::fs("remove staging area", &staging_dir))?;
        info!(files = restored, "Critical files restored from backup");
        Ok(restored)
    })
    .await
}
