use crate::cli::{print_json, rule, truncate, OutputFormat, PreviewArgs, RewindArgs};
use anyhow::Result;
use linkledger_core::{BlacklistEntry, Ledger, RewindOutcome, RewindPreview};
use std::io::{self, Write};

pub fn run_preview(args: PreviewArgs, ledger: &Ledger, format: OutputFormat) -> Result<()> {
    let preview = ledger.preview(args.days)?;
    match format {
        OutputFormat::Json => print_json(&preview),
        OutputFormat::Table => Ok(write_preview(&mut std::io::stdout().lock(), &preview)?),
    }
}

pub fn run(args: RewindArgs, ledger: &Ledger, format: OutputFormat) -> Result<()> {
    let preview = ledger.preview(args.days)?;

    if preview.restore_count == 0 {
        return match format {
            OutputFormat::Json => print_json(&RewindOutcome {
                cutoff_date: preview.cutoff_date,
                days_rewound: preview.days_back,
                restored_count: 0,
                restored: Vec::new(),
                backup_file: None,
            }),
            OutputFormat::Table => {
                println!("No links blacklisted in the last {} days.", args.days);
                Ok(())
            }
        };
    }

    if !args.yes {
        use inquire::Confirm;
        // stdout is reserved for the result
        write_preview(&mut std::io::stderr().lock(), &preview)?;
        let confirmed = Confirm::new(&format!(
            "Restore {} links blacklisted since {}?",
            preview.restore_count, preview.cutoff_date
        ))
        .with_default(false)
        .prompt()?;

        if !confirmed {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    let outcome = ledger.rewind(args.days, !args.no_backup)?;

    match format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Table => {
            if let Some(path) = &outcome.backup_file {
                println!("Backup written: {}", path.display());
            }
            println!(
                "✅ Restored {} links blacklisted since {}",
                outcome.restored_count, outcome.cutoff_date
            );
            Ok(())
        }
    }
}

fn write_preview(out: &mut dyn Write, preview: &RewindPreview) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Rewind preview: last {} days (since {})",
        preview.days_back, preview.cutoff_date
    )?;
    writeln!(out, "{}", rule())?;
    writeln!(out, "Links to restore: {}", preview.restore_count)?;

    if !preview.reason_breakdown.is_empty() {
        writeln!(out, "By reason:")?;
        for (reason, count) in &preview.reason_breakdown {
            writeln!(out, "  {:24} {:>6}", reason, count)?;
        }
    }
    if !preview.domain_breakdown.is_empty() {
        writeln!(out, "By domain:")?;
        for (domain, count) in &preview.domain_breakdown {
            writeln!(out, "  {:24} {:>6}", truncate(domain, 24), count)?;
        }
    }

    if !preview.candidates.is_empty() {
        writeln!(out)?;
        write_entries(out, &preview.candidates)?;
    }
    writeln!(out, "{}", rule())?;
    writeln!(out)
}

pub fn print_entries(entries: &[BlacklistEntry]) -> io::Result<()> {
    write_entries(&mut std::io::stdout().lock(), entries)
}

fn write_entries(out: &mut dyn Write, entries: &[BlacklistEntry]) -> io::Result<()> {
    writeln!(out, "{:<12} {:>5}  {:<16} URL", "DATE", "AGO", "REASON")?;
    for entry in entries {
        writeln!(
            out,
            "{:<12} {:>4}d  {:<16} {}",
            entry.blacklisted_date,
            entry.days_ago,
            truncate(&entry.reason, 16),
            truncate(&entry.url, 70)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkledger_core::LedgerConfig;
    use tempfile::tempdir;

    #[test]
    fn test_preview_goes_to_given_writer() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path().join("ledger.redb"), LedgerConfig::default()).unwrap();
        ledger.record(["https://a.example/1"], None).unwrap();
        assert!(ledger.blacklist("https://a.example/1", "read").unwrap());
        let preview = ledger.preview(7).unwrap();

        let mut buf = Vec::new();
        write_preview(&mut buf, &preview).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Links to restore: 1"));
        assert!(text.contains("https://a.example/1"));
    }
}
