//! Install the latest release.
//!
//! Runs one update transaction against the project directory. Without
//! `--yes` the user is asked before anything is changed; when stdin is not a
//! terminal the update is declined instead of blocking.
//!
//! # Examples
//!
//! ```bash
//! keepup update          # prompt before installing
//! keepup update --yes    # install without prompting
//! ```
//!
//! # Exit Status
//!
//! 0 when the release was installed, no update was found, the check could
//! not reach the endpoint, or the update was declined. 1 when the
//! transaction failed; the phase, the cause, and the rollback outcome are
//! printed.

use super::CliConfig;
use super::output::ConsoleObserver;
use crate::update::{
    Confirmation, ReleaseInfo, TransactionOutcome, UpdateSummary, UpdateTransaction,
};
use crate::version::Version;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::io::{self, BufRead, IsTerminal, Write};

/// Command to download and install the latest release.
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Install without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl UpdateCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let updater_config = config.updater_config()?;
        let transaction = UpdateTransaction::open(updater_config)?
            .with_observer(ConsoleObserver::new(config.quiet));

        let confirmation = if self.yes {
            Confirmation::Preapproved
        } else {
            Confirmation::ask(prompt_for_install)
        };

        match transaction.run(confirmation).await? {
            TransactionOutcome::Committed(summary) => print_summary(&summary, config.quiet),
            TransactionOutcome::Declined { release } => {
                if !config.quiet {
                    println!("Update to {} declined; nothing was changed", release.version);
                }
            }
            TransactionOutcome::UpToDate { .. } | TransactionOutcome::CheckUnavailable { .. } => {}
        }
        Ok(())
    }
}

fn print_summary(summary: &UpdateSummary, quiet: bool) {
    if quiet {
        return;
    }
    println!(
        "{}",
        format!("Updated {} -> {} ({})", summary.from, summary.to, summary.tag).green().bold()
    );
    println!("  {} file(s) written", summary.files.applied.len());
    if !summary.files.skipped_critical.is_empty() {
        println!(
            "  {} critical file(s) kept: {}",
            summary.files.skipped_critical.len(),
            summary.files.skipped_critical.join(", ")
        );
    }
    if !summary.files.skipped_reserved.is_empty() {
        println!("  {} reserved path(s) skipped", summary.files.skipped_reserved.len());
    }
    println!("  archive {} ({} bytes)", summary.sha256.dimmed(), summary.downloaded_bytes);
}

fn prompt_for_install(current: &Version, release: &ReleaseInfo) -> bool {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        println!(
            "{}",
            "Not running in a terminal; pass --yes to install without prompting".yellow()
        );
        return false;
    }

    print!("Install version {} (currently {current})? [y/N] ", release.version);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if stdin.lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
