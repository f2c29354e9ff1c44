//! The update pipeline.
//!
//! Components, leaves first:
//!
//! - [`oracle`] - fetches release metadata and decides whether it is newer
//! - [`backup`] - snapshots critical files before anything changes
//! - [`fetcher`] - streams the release archive into the staging area
//! - [`archive`] - unpacks the archive and checks its layout
//! - [`merger`] - overlays the release onto the live tree
//! - [`journal`] - undo log for the merge
//! - [`staging`] - the transient directory one attempt works in
//! - [`lock`] - mutual exclusion between attempts
//! - [`transaction`] - the state machine tying them together
//!
//! Most callers only need [`UpdateTransaction`] and, for startup checks,
//! [`notify_check`].

pub mod archive;
pub mod backup;
pub mod fetcher;
pub mod journal;
pub mod lock;
pub mod merger;
pub mod oracle;
pub mod staging;
pub mod transaction;

pub use backup::{BackupManager, BackupSnapshot};
pub use fetcher::{ArtifactFetcher, FetchedArtifact};
pub use journal::MergeJournal;
pub use lock::ProjectLock;
pub use merger::{AppliedFiles, FileMerger};
pub use oracle::{ReleaseInfo, UpdateCheck, VersionOracle, notify_check};
pub use staging::StagingArea;
pub use transaction::{
    Confirmation, NoopObserver, RollbackReport, TransactionObserver, TransactionOutcome,
    TransactionState, UpdateSummary, UpdateTransaction, recover_from_backup,
};
