//! Error handling for keepup
//!
//! This module provides the error types and user-facing error reporting for
//! the updater. It follows two principles:
//! 1. **Strongly-typed errors** so callers (and tests) can tell a malformed
//!    descriptor from a broken archive or a failed download
//! 2. **User-friendly messages** with details and a suggestion for CLI users
//!
//! # Architecture
//!
//! - [`KeepupError`] - Enumerated error kinds for every classified failure
//! - [`ErrorContext`] - Wrapper adding details and a suggestion for display
//!
//! Operations return [`anyhow::Result`]. Classified failures are raised as
//! [`KeepupError`] values and then enriched with [`anyhow::Context`], so the
//! kind survives while the message gains the phase and path. Use
//! [`find_kind`] to recover the kind.
//!
//! # Error Categories
//!
//! - **Configuration**: [`KeepupError::ConfigError`], [`KeepupError::InvalidCriticalPath`],
//!   [`KeepupError::InvalidVersion`]
//! - **Network**: [`KeepupError::NetworkError`], [`KeepupError::DownloadIncomplete`]
//! - **Archive layout**: [`KeepupError::StructuralError`]
//! - **File system**: [`KeepupError::FileSystemError`]
//! - **Transaction**: [`KeepupError::UpdateInProgress`], [`KeepupError::TransactionFailed`],
//!   [`KeepupError::NoBackup`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use keepup_cli::core::{KeepupError, find_kind};
//!
//! let err = anyhow::Error::from(KeepupError::StructuralError {
//!     reason: "archive has no top-level directory".to_string(),
//! })
//! .context("Failed to apply update");
//!
//! assert!(matches!(find_kind(&err), Some(KeepupError::StructuralError { .. })));
//! ```

use crate::update::transaction::{RollbackReport, TransactionState};
use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for keepup operations.
///
/// Each variant names one failure mode and carries the context needed to
/// diagnose it without reading the source: the file or URL involved, the
/// phase that was running and the underlying reason.
#[derive(Error, Debug)]
pub enum KeepupError {
    /// The version descriptor or settings file is missing or malformed.
    ///
    /// Always fatal and always raised before anything is written.
    #[error("Invalid configuration in {file}: {reason}")]
    ConfigError {
        /// File that failed to load
        file: String,
        /// Why it was rejected
        reason: String,
    },

    /// A critical-file entry is absolute, traverses upward, or overlaps a
    /// directory owned by the updater.
    #[error("Invalid critical file path '{path}': {reason}")]
    InvalidCriticalPath {
        /// The entry as written in the descriptor
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// A version string is not a dot-separated list of non-negative integers.
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The offending version string
        version: String,
        /// Which segment failed to parse
        reason: String,
    },

    /// A network operation failed, including timeouts.
    #[error("Network error during {operation}: {reason}")]
    NetworkError {
        /// The network operation that failed (e.g., "release check", "download")
        operation: String,
        /// Reason for the failure
        reason: String,
    },

    /// The download stream ended before the declared length was reached.
    #[error("Download incomplete: received {received} of {expected} bytes")]
    DownloadIncomplete {
        /// Length declared by the server
        expected: u64,
        /// Bytes actually received
        received: u64,
    },

    /// The archive does not have the expected single top-level directory,
    /// or one of its entries would escape the extraction root.
    #[error("Unexpected archive layout: {reason}")]
    StructuralError {
        /// Description of the layout problem
        reason: String,
    },

    /// A file system operation failed.
    #[error("File system error: failed to {operation} {path}")]
    FileSystemError {
        /// The operation that failed (e.g., "copy", "remove")
        operation: String,
        /// Path where the failure occurred
        path: String,
    },

    /// Another transaction holds the project lock.
    #[error("Another update is already in progress for {path}")]
    UpdateInProgress {
        /// The project root that is locked
        path: String,
    },

    /// A transaction failed after it started mutating state.
    ///
    /// `state` is the terminal state ([`TransactionState::Failed`] or
    /// [`TransactionState::RolledBack`]); `rollback` describes the restore
    /// that ran, if any.
    #[error("Update failed while {phase}: {reason}")]
    TransactionFailed {
        /// Phase that was running when the failure happened
        phase: TransactionState,
        /// Terminal state the transaction ended in
        state: TransactionState,
        /// Underlying cause, rendered for display
        reason: String,
        /// Outcome of the rollback, when one was attempted
        rollback: Option<RollbackReport>,
    },

    /// `keepup rollback` found no backup to restore.
    #[error("No backup found at {path}")]
    NoBackup {
        /// Expected backup directory
        path: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl KeepupError {
    /// Shorthand for a [`KeepupError::FileSystemError`].
    pub fn fs(operation: impl Into<String>, path: &std::path::Path) -> Self {
        Self::FileSystemError {
            operation: operation.into(),
            path: path.display().to_string(),
        }
    }

    /// Shorthand for a [`KeepupError::NetworkError`].
    pub fn network(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::NetworkError {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error belongs to the configuration category.
    ///
    /// Configuration errors are fatal and never trigger a rollback.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. }
                | Self::InvalidCriticalPath { .. }
                | Self::InvalidVersion { .. }
        )
    }

    /// Whether this error belongs to the network category.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::DownloadIncomplete { .. })
    }
}

/// Find the outermost [`KeepupError`] attached to an error.
///
/// Kinds may be the source error or a context layer added with
/// [`anyhow::Context`]; both are found.
pub fn find_kind(error: &anyhow::Error) -> Option<&KeepupError> {
    error.downcast_ref::<KeepupError>()
}

/// Find the innermost [`KeepupError`] raised as a source error.
///
/// For a [`KeepupError::TransactionFailed`] wrapping a cause, this returns the
/// cause's kind (e.g. the [`KeepupError::StructuralError`] that triggered the
/// rollback) rather than the wrapper. Falls back to [`find_kind`] when no
/// source in the chain is a [`KeepupError`].
pub fn root_kind(error: &anyhow::Error) -> Option<&KeepupError> {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<KeepupError>())
        .last()
        .or_else(|| find_kind(error))
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`KeepupError`] and adds optional details and a
/// suggestion for resolving it. This is the way keepup presents errors to
/// CLI users.
///
/// # Display Format
///
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context in yellow (optional)
/// 3. **Suggestion**: Actionable next step in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use keepup_cli::core::{ErrorContext, KeepupError};
///
/// let context = ErrorContext::new(KeepupError::NoBackup { path: ".backup".into() })
///     .with_suggestion("Nothing to roll back")
///     .with_details("No failed update left a backup behind");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: KeepupError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no details or suggestion.
    #[must_use]
    pub const fn new(error: KeepupError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}
