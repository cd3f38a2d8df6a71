use crate::cli::ConfigCommands;
use crate::config::LinkledgerConfig;
use anyhow::Result;
use std::path::Path;

pub fn run(cmd: ConfigCommands, config_path: &Path, resolved: &LinkledgerConfig) -> Result<()> {
    match cmd {
        ConfigCommands::Validate => validate(config_path, resolved),
        ConfigCommands::Show => show(resolved),
    }
}

fn validate(config_path: &Path, resolved: &LinkledgerConfig) -> Result<()> {
    let errors = resolved.validate();
    if errors.is_empty() {
        println!("✅ {} is valid.", config_path.display());
        return Ok(());
    }

    println!("❌ Validation errors in {}:", config_path.display());
    for e in &errors {
        println!("  - {}", e);
    }
    anyhow::bail!("{} configuration error(s)", errors.len())
}

/// Prints the effective configuration, file plus overrides.
fn show(resolved: &LinkledgerConfig) -> Result<()> {
    match toml::to_string_pretty(resolved) {
        Ok(s) => println!("{}", s),
        Err(e) => anyhow::bail!("Failed to serialize config: {}", e),
    }
    Ok(())
}
