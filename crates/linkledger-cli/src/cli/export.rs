use crate::cli::ExportArgs;
use anyhow::Result;
use linkledger_core::Ledger;
use std::io::Write;

pub fn run(args: ExportArgs, ledger: &Ledger) -> Result<()> {
    let document = ledger.export()?;
    let output = serde_json::to_string_pretty(&document)?;

    if let Some(out_path) = args.output {
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&out_path, &output)?;
        println!("Exported {} links to {}", document.total_links, out_path.display());
    } else {
        let mut stdout = std::io::stdout();
        stdout.write_all(output.as_bytes())?;
        stdout.write_all(b"\n")?;
    }

    Ok(())
}
