use crate::cli::{print_json, CleanupArgs, OutputFormat};
use anyhow::Result;
use linkledger_core::Ledger;

/// Delete runs older than the retention window. Links are kept.
pub fn run(args: CleanupArgs, ledger: &Ledger, format: OutputFormat) -> Result<()> {
    let outcome = ledger.cleanup(args.days)?;

    match format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Table => {
            println!(
                "✅ Deleted {} runs dated before {}",
                outcome.runs_deleted, outcome.cutoff_date
            );
            Ok(())
        }
    }
}
