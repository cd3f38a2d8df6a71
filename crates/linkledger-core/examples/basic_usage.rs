use linkledger_core::{Ledger, LedgerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Link Ledger Basic Usage ===\n");

    let config = LedgerConfig::default()
        .with_domain_blacklist(["ads.example.com"])
        .with_url_patterns(["*utm_source=*"]);
    let ledger = Ledger::open("./data/example.redb", config)?;
    println!("Opened ./data/example.redb\n");

    let candidates = [
        "https://blog.example.org/rust-ownership",
        "https://ads.example.com/banner",
        "https://news.example.net/story?id=7&utm_source=feed",
        "https://blog.example.org/rust-ownership#comments",
    ];

    let analysis = ledger.analyze(candidates)?;
    println!(
        "Analyzed {} urls: {} admitted, {} blocked, {} duplicates",
        analysis.stats.total,
        analysis.stats.admitted,
        analysis.stats.blocked,
        analysis.stats.duplicates
    );
    for blocked in &analysis.blocked {
        println!("  blocked {} ({})", blocked.url, blocked.reason);
    }

    let report = ledger.record(analysis.admitted_urls(), Some("digest-0001"))?;
    println!(
        "\nRecorded {} links ({} new)",
        report.recorded_count, report.new_links
    );

    ledger.blacklist("https://blog.example.org/rust-ownership", "read")?;
    let preview = ledger.preview(7)?;
    println!("\nRewinding 7 days would restore {} links", preview.restore_count);

    let outcome = ledger.rewind(7, true)?;
    if let Some(path) = &outcome.backup_file {
        println!("Backup written to {}", path.display());
    }
    println!("Restored {} links", outcome.restored_count);

    let stats = ledger.stats()?;
    println!(
        "\nLedger: {} links, {} blacklisted ({}%)",
        stats.total_links, stats.blacklisted_links, stats.blacklist_ratio
    );

    Ok(())
}
