//! Error formatting utilities for keepup
//!
//! This module converts internal errors into clear, actionable messages for
//! users of the `keepup` binary.

use super::error::{ErrorContext, KeepupError, find_kind, root_kind};

/// Keywords that indicate network-related errors
const NETWORK_ERROR_KEYWORDS: &[&str] = &["network", "connection", "timed out", "dns"];

/// Keywords that indicate permission-related errors
const PERMISSION_ERROR_KEYWORDS: &[&str] = &["permission", "denied", "access"];

/// Convert any error into a user-friendly format with contextual suggestions
///
/// The outermost [`KeepupError`] decides the message. Errors without a
/// classified kind fall back to keyword matching on the rendered chain.
///
/// # Arguments
///
/// * `error` - The error to convert to a user-friendly format
///
/// # Returns
///
/// An [`ErrorContext`] with user-friendly messages and suggestions
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(kind) = find_kind(&error) {
        let mut context = create_error_context(kind);
        if let KeepupError::TransactionFailed { .. } = kind
            && let Some(root) = root_kind(&error)
            && !std::ptr::eq(root, kind)
            && let Some(suggestion) = create_error_context(root).suggestion
        {
            // The wrapper only carries the phase; the root kind knows the fix.
            context.suggestion = Some(suggestion);
        }
        return context;
    }

    let rendered = format!("{error:#}");
    let lower = rendered.to_lowercase();

    if NETWORK_ERROR_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return ErrorContext::new(KeepupError::Other {
            message: rendered,
        })
        .with_suggestion("Check your internet connection and try again");
    }

    if PERMISSION_ERROR_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return ErrorContext::new(KeepupError::Other {
            message: rendered,
        })
        .with_suggestion("Check file permissions on the installation directory");
    }

    ErrorContext::new(KeepupError::Other {
        message: rendered,
    })
    .with_details("An unexpected error occurred. Run with RUST_LOG=debug for more details.")
}

/// Create a user-friendly error context from a [`KeepupError`]
///
/// The error is re-created for the context because [`KeepupError`] wraps
/// foreign errors that cannot be cloned.
pub fn create_error_context(error: &KeepupError) -> ErrorContext {
    match error {
        KeepupError::ConfigError {
            file,
            reason,
        } => ErrorContext::new(KeepupError::ConfigError {
            file: file.clone(),
            reason: reason.clone(),
        })
        .with_suggestion(format!(
            "Check that '{file}' exists at the installation root and is valid"
        ))
        .with_details("Nothing was changed; the update never started"),
        KeepupError::InvalidCriticalPath {
            path,
            reason,
        } => ErrorContext::new(KeepupError::InvalidCriticalPath {
            path: path.clone(),
            reason: reason.clone(),
        })
        .with_suggestion(
            "Critical files must be relative paths inside the installation directory",
        ),
        KeepupError::InvalidVersion {
            version,
            reason,
        } => ErrorContext::new(KeepupError::InvalidVersion {
            version: version.clone(),
            reason: reason.clone(),
        })
        .with_suggestion("Versions must look like '1.2.0' (an optional leading 'v' is accepted)"),
        KeepupError::NetworkError {
            operation,
            reason,
        } => ErrorContext::new(KeepupError::NetworkError {
            operation: operation.clone(),
            reason: reason.clone(),
        })
        .with_suggestion("Check your internet connection and the update URL, then try again"),
        KeepupError::DownloadIncomplete {
            expected,
            received,
        } => ErrorContext::new(KeepupError::DownloadIncomplete {
            expected: *expected,
            received: *received,
        })
        .with_suggestion("The connection dropped during download; try again"),
        KeepupError::StructuralError {
            reason,
        } => ErrorContext::new(KeepupError::StructuralError {
            reason: reason.clone(),
        })
        .with_suggestion("The release archive is malformed; report it to the publisher")
        .with_details(
            "Release archives must contain exactly one top-level directory with the new files",
        ),
        KeepupError::FileSystemError {
            operation,
            path,
        } => ErrorContext::new(KeepupError::FileSystemError {
            operation: operation.clone(),
            path: path.clone(),
        })
        .with_suggestion("Check that the path exists and you have the necessary permissions"),
        KeepupError::UpdateInProgress {
            path,
        } => ErrorContext::new(KeepupError::UpdateInProgress {
            path: path.clone(),
        })
        .with_suggestion("Wait for the other update to finish and try again"),
        KeepupError::TransactionFailed {
            phase,
            state,
            reason,
            rollback,
        } => {
            let mut details = format!("The update ended in state '{state}'");
            if let Some(report) = rollback {
                details.push_str(&format!("\n{report}"));
            }
            ErrorContext::new(KeepupError::TransactionFailed {
                phase: *phase,
                state: *state,
                reason: reason.clone(),
                rollback: rollback.clone(),
            })
            .with_details(details)
            .with_suggestion("Fix the cause above and run 'keepup update' again")
        }
        KeepupError::NoBackup {
            path,
        } => ErrorContext::new(KeepupError::NoBackup {
            path: path.clone(),
        })
        .with_details("Backups only survive an update whose rollback could not finish")
        .with_suggestion("Nothing to roll back"),
        KeepupError::Other {
            message,
        } => ErrorContext::new(KeepupError::Other {
            message: message.clone(),
        })
        .with_suggestion("Check the error message above for more details"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::transaction::TransactionState;
    use anyhow::Context;

    #[test]
    fn test_config_error_context() {
        let err: anyhow::Error = KeepupError::ConfigError {
            file: "version.json".to_string(),
            reason: "missing".to_string(),
        }
        .into();
        let ctx = user_friendly_error(err.context("Failed to open update"));
        assert!(matches!(ctx.error, KeepupError::ConfigError { .. }));
        assert!(ctx.suggestion.unwrap().contains("version.json"));
    }

    #[test]
    fn test_transaction_failure_uses_root_suggestion() {
        let cause: anyhow::Result<()> = Err(KeepupError::StructuralError {
            reason: "2 top-level directories".to_string(),
        }
        .into());
        let err = cause
            .context(KeepupError::TransactionFailed {
                phase: TransactionState::Applying,
                state: TransactionState::RolledBack,
                reason: "2 top-level directories".to_string(),
                rollback: None,
            })
            .unwrap_err();

        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, KeepupError::TransactionFailed { .. }));
        assert!(ctx.details.unwrap().contains("rolled back"));
        assert!(ctx.suggestion.unwrap().contains("malformed"));
    }

    #[test]
    fn test_unclassified_network_error() {
        let err = anyhow::anyhow!("connection refused");
        let ctx = user_friendly_error(err);
        assert!(ctx.suggestion.unwrap().contains("internet connection"));
    }

    #[test]
    fn test_unclassified_fallback() {
        let err = anyhow::anyhow!("something odd");
        let ctx = user_friendly_error(err);
        assert!(ctx.suggestion.is_none());
        assert!(ctx.details.is_some());
    }
}
