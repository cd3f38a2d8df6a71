use crate::cli::{print_json, rule, truncate, OutputFormat, RecordArgs, UrlInputArgs};
use anyhow::Result;
use linkledger_core::Ledger;
use std::io::Read;

pub fn run_analyze(args: UrlInputArgs, ledger: &Ledger, format: OutputFormat) -> Result<()> {
    let urls = collect_urls(&args)?;
    let analysis = ledger.analyze(&urls)?;

    if format == OutputFormat::Json {
        return print_json(&analysis);
    }

    let stats = &analysis.stats;
    println!();
    println!("Analysis of {} urls", stats.total);
    println!("{}", rule());
    println!(
        "admitted {} (new {}, existing {}), blocked {} (throttled {}), duplicates {}, failed {}",
        stats.admitted,
        stats.new,
        stats.existing,
        stats.blocked,
        stats.throttled,
        stats.duplicates,
        stats.failed
    );

    for candidate in &analysis.admitted {
        let tag = if candidate.last_seen.is_some() { "existing" } else { "new" };
        println!("  + {:<9} {}", tag, truncate(&candidate.url, 80));
    }
    for blocked in &analysis.blocked {
        println!(
            "  - {:<9} {} ({})",
            format!("{:?}", blocked.kind).to_lowercase(),
            truncate(&blocked.url, 60),
            blocked.reason
        );
    }
    for failure in &analysis.failed {
        println!("  ! #{:<7} {} ({})", failure.position, truncate(&failure.url, 60), failure.error);
    }
    println!("{}", rule());
    println!();

    Ok(())
}

pub fn run_record(args: RecordArgs, ledger: &Ledger, format: OutputFormat) -> Result<()> {
    let urls = collect_urls(&args.input)?;
    let report = ledger.record(&urls, args.fingerprint.as_deref())?;

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            println!(
                "✅ Recorded {} links ({} new, {} existing)",
                report.recorded_count, report.new_links, report.existing_links
            );
            if report.auto_blacklisted_aged > 0 {
                println!("   {} old links auto-blacklisted", report.auto_blacklisted_aged);
            }
            for failure in &report.failed {
                println!("   skipped #{}: {}", failure.position, failure.error);
            }
            Ok(())
        }
    }
}

/// Positional URLs followed by the lines of `--file`. Blank lines and `#`
/// comments in the file are ignored.
fn collect_urls(args: &UrlInputArgs) -> Result<Vec<String>> {
    let mut urls = args.urls.clone();

    if let Some(path) = &args.file {
        let text = if path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(path)?
        };
        urls.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string),
        );
    }

    if urls.is_empty() {
        anyhow::bail!("no URLs given; pass them as arguments or with --file");
    }
    Ok(urls)
}
