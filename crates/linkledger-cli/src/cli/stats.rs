use crate::cli::rewind::print_entries;
use crate::cli::{print_json, rule, truncate, OutputFormat, RecentArgs};
use anyhow::Result;
use linkledger_core::Ledger;

pub fn run(ledger: &Ledger, format: OutputFormat) -> Result<()> {
    let stats = ledger.stats()?;
    let blacklist = ledger.blacklist_stats()?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "ledger": stats,
            "blacklist": blacklist,
        }));
    }

    let db_mb = stats.db_size_bytes as f64 / 1_048_576.0;

    println!();
    println!("Ledger Overview");
    println!("{}", rule());
    println!("Links:        {:>8}", stats.total_links);
    println!("  active      {:>8}", stats.active_links);
    println!(
        "  blacklisted {:>8} ({:.1}%)",
        stats.blacklisted_links, stats.blacklist_ratio
    );
    println!("Runs:         {:>8}", stats.total_runs);
    println!("DB Size:      {:>7.1} MB", db_mb);

    if !stats.top_domains.is_empty() {
        println!();
        println!("Top domains:");
        for domain in &stats.top_domains {
            println!("  {:32} {:>8}", truncate(&domain.domain, 32), domain.count);
        }
    }

    if !stats.recent_activity.is_empty() {
        println!();
        println!("Last 7 days:       new   opened");
        for (date, day) in &stats.recent_activity {
            println!("  {}   {:>6}   {:>6}", date, day.new_links, day.opened_links);
        }
    }

    if !blacklist.reasons.is_empty() {
        println!();
        println!("Blacklist reasons:");
        for reason in &blacklist.reasons {
            println!("  {:32} {:>8}", truncate(&reason.reason, 32), reason.count);
        }
    }
    println!("{}", rule());
    println!();

    Ok(())
}

pub fn run_recent(args: RecentArgs, ledger: &Ledger, format: OutputFormat) -> Result<()> {
    let entries = ledger.recent(args.days)?;

    match format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("No links blacklisted in the last {} days.", args.days);
            } else {
                println!("{} links blacklisted in the last {} days:", entries.len(), args.days);
                print_entries(&entries)?;
            }
            Ok(())
        }
    }
}
