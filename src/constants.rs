//! Global constants used throughout the keepup codebase.
//!
//! File names, timeout durations and backoff parameters that are shared by
//! more than one module live here so the defaults are discoverable in one
//! place. Every value is only a default: [`crate::config::UpdaterSettings`]
//! can override the ones that matter to a deployment.

use std::time::Duration;

/// Default name of the version descriptor at the project root.
pub const DEFAULT_VERSION_FILE: &str = "version.json";

/// Optional settings file read from the project root.
pub const SETTINGS_FILE: &str = "keepup.toml";

/// Default staging directory, relative to the project root.
pub const DEFAULT_STAGING_DIR: &str = ".update";

/// Default backup directory, relative to the project root.
pub const DEFAULT_BACKUP_DIR: &str = ".backup";

/// Path segments starting with this prefix are never merged into the live tree.
pub const DEFAULT_RESERVED_PREFIX: &str = ".";

/// Lock file guarding the project root against concurrent transactions.
pub const LOCK_FILE_NAME: &str = ".keepup.lock";

/// File name of the downloaded archive inside the staging area.
pub const STAGED_ARCHIVE_NAME: &str = "update.zip";

/// Directory inside the staging area holding the extracted archive.
pub const EXTRACTED_DIR_NAME: &str = "extracted";

/// Directory inside the staging area holding merge pre-images.
pub const JOURNAL_DIR_NAME: &str = "journal";

/// Timeout for the explicit update check (10 seconds).
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the startup notifier check (5 seconds).
///
/// Shorter than [`CHECK_TIMEOUT`] because it runs on every application start.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for establishing the archive download connection (10 seconds).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall deadline for the archive download (10 minutes).
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// How long a second transaction waits for the project lock (5 seconds).
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum backoff delay while polling for the project lock (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for lock polling backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Environment variable that hides all progress bars.
pub const NO_PROGRESS_ENV: &str = "KEEPUP_NO_PROGRESS";

/// User agent sent with every HTTP request.
///
/// Release APIs such as GitHub reject requests without one.
pub fn default_user_agent() -> String {
    format!("keepup/{}", env!("CARGO_PKG_VERSION"))
}
