//! Test utilities for keepup
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`ProjectFixture`] - a temporary installation with a `version.json`
//! - [`build_archive`] - an in-memory release zip
//! - [`init_test_logging`] - tracing output for test runs
//!
//! # Example
//!
//! ```rust,no_run
//! use keepup_cli::test_utils::{ArchiveEntry, ProjectFixture, build_archive};
//!
//! let project = ProjectFixture::new("1.0.0", "http://127.0.0.1:8080/latest", &["config.json"]);
//! project.write("config.json", "{}");
//!
//! let archive = build_archive(&[ArchiveEntry::file("app-1.2.0/app.bin", b"new")]);
//! assert!(!archive.is_empty());
//! ```

pub mod archive;
pub mod fixtures;

pub use archive::{ArchiveEntry, build_archive};
pub use fixtures::ProjectFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. `level` wins over `RUST_LOG`; with
/// neither set, tests run without log output.
///
/// ```bash
/// RUST_LOG=keepup_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
