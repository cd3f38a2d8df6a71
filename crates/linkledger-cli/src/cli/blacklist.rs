use crate::cli::{print_json, BlacklistArgs, OutputFormat, UnblacklistArgs};
use anyhow::Result;
use linkledger_core::Ledger;

pub fn run(args: BlacklistArgs, ledger: &Ledger, format: OutputFormat) -> Result<()> {
    if !ledger.blacklist(&args.url, &args.reason)? {
        anyhow::bail!("URL not found in ledger: {}", args.url);
    }

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "url": args.url,
            "reason": args.reason,
        })),
        OutputFormat::Table => {
            println!("✅ Blacklisted {} ({})", args.url, args.reason);
            Ok(())
        }
    }
}

pub fn run_unblacklist(args: UnblacklistArgs, ledger: &Ledger, format: OutputFormat) -> Result<()> {
    if !ledger.unblacklist(&args.url)? {
        anyhow::bail!("URL not found in ledger: {}", args.url);
    }

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "url": args.url })),
        OutputFormat::Table => {
            println!("✅ Removed from blacklist: {}", args.url);
            Ok(())
        }
    }
}
