//! keepup - keep a locally installed application up to date
//!
//! keepup checks a release endpoint for a newer version of an application
//! installed in a project directory and, when one exists, downloads and
//! applies it in place while preserving a configurable set of critical files
//! (user configuration, databases, licences). A failed update is rolled back.
//!
//! # Architecture Overview
//!
//! The installation describes itself with a `version.json` at its root:
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "update_url": "https://api.github.com/repos/owner/app/releases/latest",
//!   "critical_files": ["config.json", "data/app.db"]
//! }
//! ```
//!
//! An update is a transaction:
//!
//! 1. **Check** - fetch the latest release and compare dotted versions
//! 2. **Confirm** - a caller-supplied decision (prompt, `--yes`, or a callback)
//! 3. **Back up** - snapshot critical files into `.backup/`
//! 4. **Download** - stream the release zip into `.update/`
//! 5. **Apply** - extract, then overlay every non-critical, non-hidden file
//! 6. **Restore critical** - put the snapshot back over the merged tree
//! 7. **Commit** - remove `.backup/` and `.update/`
//!
//! A failure while applying or restoring rolls back: merged files are
//! reverted from a journal and critical files are restored from the backup.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface (`check`, `update`, `rollback`)
//! - [`config`] - Settings, version descriptor and critical-file set
//! - [`core`] - Error types and user-facing error formatting
//! - [`update`] - The update pipeline and its transaction
//! - [`version`] - Dotted version parsing and comparison
//! - [`utils`] - Filesystem helpers and progress bars
//!
//! # Example
//!
//! ```rust,no_run
//! use keepup_cli::config::UpdaterConfig;
//! use keepup_cli::update::{Confirmation, UpdateTransaction};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::for_project(Path::new("/opt/app"))?;
//! let outcome = UpdateTransaction::open(config)?
//!     .run(Confirmation::ask(|current, release| {
//!         println!("{current} -> {}", release.version);
//!         true
//!     }))
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod update;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
