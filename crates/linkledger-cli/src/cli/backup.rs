use crate::cli::{print_json, OutputFormat, RestoreArgs};
use anyhow::Result;
use linkledger_core::{Ledger, Snapshot};

pub fn run(ledger: &Ledger, format: OutputFormat) -> Result<()> {
    let path = ledger.backup()?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "backup_file": path })),
        OutputFormat::Table => {
            println!("✅ Backup complete: {}", path.display());
            Ok(())
        }
    }
}

pub fn run_restore(args: RestoreArgs, ledger: &Ledger, format: OutputFormat) -> Result<()> {
    // Validates the file before anything is asked or written
    let snapshot = Snapshot::load(&args.path)?;

    if !args.yes {
        use inquire::Confirm;
        println!(
            "Snapshot {} from {}: {} blacklisted links (source: {})",
            args.path.display(),
            snapshot.backup_date,
            snapshot.total_blacklisted,
            snapshot.source_identifier
        );
        let confirmed = Confirm::new("Re-apply these blacklist entries?")
            .with_default(false)
            .prompt()?;

        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let outcome = ledger.restore(&args.path)?;

    match format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Table => {
            println!(
                "✅ Restored {} of {} blacklisted links from {}",
                outcome.restored_count,
                outcome.total_in_backup,
                outcome.backup_file.display()
            );
            if !outcome.skipped.is_empty() {
                println!(
                    "   {} entries skipped (no matching link in this ledger)",
                    outcome.skipped.len()
                );
            }
            Ok(())
        }
    }
}
