//! Terminal reporting of transaction progress.

use crate::update::{RollbackReport, TransactionObserver, TransactionState, UpdateCheck};
use colored::Colorize;

/// Prints every phase change and the rollback outcome.
///
/// Status lines go to stdout; failures go to stderr so they survive `--quiet`
/// being piped away.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleObserver {
    quiet: bool,
}

impl ConsoleObserver {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
        }
    }

    fn status(&self, line: impl std::fmt::Display) {
        if !self.quiet {
            println!("{line}");
        }
    }
}

impl TransactionObserver for ConsoleObserver {
    fn on_transition(&self, _from: TransactionState, to: TransactionState) {
        match to {
            TransactionState::Checking => self.status("Checking for updates...".cyan()),
            TransactionState::BackingUp => self.status("Backing up critical files...".cyan()),
            TransactionState::Downloading => self.status("Downloading update...".cyan()),
            TransactionState::Applying => self.status("Applying update...".cyan()),
            TransactionState::RestoringCritical => {
                self.status("Restoring critical files...".cyan());
            }
            TransactionState::Committed => self.status("Update committed".green()),
            TransactionState::RolledBack => {
                eprintln!("{}", "Update failed; changes were rolled back".red());
            }
            TransactionState::Failed => {
                eprintln!("{}", "Update failed; nothing was changed".red());
            }
            TransactionState::Idle | TransactionState::AwaitingConfirmation => {}
        }
    }

    fn on_check(&self, check: &UpdateCheck) {
        match check {
            UpdateCheck::Available { current, release } => {
                self.status(format!("Update available: {current} -> {}", release.version).green());
            }
            UpdateCheck::UpToDate { current, .. } => {
                self.status(format!("You are on the latest version ({current})").green());
            }
            UpdateCheck::Unavailable { reason } => {
                self.status(format!("Could not check for updates: {reason}").yellow());
            }
        }
    }

    fn on_rollback(&self, report: &RollbackReport) {
        if report.is_complete() {
            eprintln!("{}", report.to_string().green());
        } else {
            eprintln!("{}", report.to_string().red());
        }
    }
}
