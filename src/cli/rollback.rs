//! Restore critical files after a failed or interrupted update.
//!
//! A transaction that rolls back cleanly removes its backup. The backup
//! survives only when the process died mid-update or the automatic restore
//! failed; this command finishes that restore.

use super::CliConfig;
use crate::update::recover_from_backup;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Command to restore critical files from a leftover backup.
#[derive(Args, Debug)]
pub struct RollbackCommand {}

impl RollbackCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let updater_config = config.updater_config()?;

        if !config.quiet {
            println!("{}", "Restoring critical files from backup...".yellow());
        }
        let restored = recover_from_backup(&updater_config).await?;
        if !config.quiet {
            println!("{}", format!("Restored {restored} critical file(s)").green());
        }
        Ok(())
    }
}
