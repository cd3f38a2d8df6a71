pub mod backup;
pub mod blacklist;
pub mod cleanup;
pub mod config_cmd;
pub mod export;
pub mod ingest;
pub mod rewind;
pub mod stats;

use crate::config::LinkledgerConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use linkledger_core::Ledger;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "linkledger")]
#[command(version, about = "Link ledger: dedup, blacklist and rewind for periodic link ingestion")]
pub struct Cli {
    /// Path to linkledger.toml
    #[arg(
        long,
        global = true,
        env = "LINKLEDGER_CONFIG",
        default_value = "linkledger.toml"
    )]
    pub config: PathBuf,

    /// Path to data directory (overrides config file)
    #[arg(long, global = true, env = "LINKLEDGER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub overrides: LedgerOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that override the `[ledger]` table of the config file.
#[derive(Args, Debug, Default)]
pub struct LedgerOverrides {
    /// Run the age sweep before recording
    #[arg(
        long,
        global = true,
        env = "AUTO_BLACKLIST_ENABLED",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub auto_blacklist_enabled: Option<bool>,

    /// Age, in days, after which unseen links are blacklisted
    #[arg(long, global = true, env = "AUTO_BLACKLIST_DAYS")]
    pub auto_blacklist_days: Option<u32>,

    /// Links opened within this many days are throttled
    #[arg(long, global = true, env = "RECENT_LINK_DAYS")]
    pub recent_link_days: Option<u32>,

    /// Comma-separated hosts to block
    #[arg(long, global = true, env = "DOMAIN_BLACKLIST", value_delimiter = ',')]
    pub domain_blacklist: Option<Vec<String>>,

    /// Comma-separated URL glob patterns to block
    #[arg(long, global = true, env = "URL_PATTERN_BLACKLIST", value_delimiter = ',')]
    pub url_pattern_blacklist: Option<Vec<String>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show what a rewind would restore
    Preview(PreviewArgs),
    /// Un-blacklist everything blacklisted in the last N days
    Rewind(RewindArgs),
    /// Snapshot the current blacklist
    Backup,
    /// Re-apply a blacklist snapshot
    Restore(RestoreArgs),
    /// Ledger and blacklist statistics
    Stats,
    /// Recently blacklisted links
    Recent(RecentArgs),
    /// Blacklist a known URL
    Blacklist(BlacklistArgs),
    /// Remove a URL from the blacklist
    Unblacklist(UnblacklistArgs),
    /// Classify candidate URLs without recording anything
    Analyze(UrlInputArgs),
    /// Record URLs that were opened
    Record(RecordArgs),
    /// Export every link as JSON
    Export(ExportArgs),
    /// Delete old run history
    Cleanup(CleanupArgs),
    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Validate,
    Show,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Days to look back
    #[arg(default_value = "7")]
    pub days: u32,
}

#[derive(Args, Debug)]
pub struct RewindArgs {
    /// Days to look back
    #[arg(default_value = "7")]
    pub days: u32,
    /// Skip the snapshot normally written before rewinding
    #[arg(long)]
    pub no_backup: bool,
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    pub path: PathBuf,
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct RecentArgs {
    #[arg(default_value = "7")]
    pub days: u32,
}

#[derive(Args, Debug)]
pub struct BlacklistArgs {
    pub url: String,
    #[arg(long, default_value = "read")]
    pub reason: String,
}

#[derive(Args, Debug)]
pub struct UnblacklistArgs {
    pub url: String,
}

#[derive(Args, Debug)]
pub struct UrlInputArgs {
    pub urls: Vec<String>,
    /// Read URLs from a file, one per line ("-" for stdin)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[command(flatten)]
    pub input: UrlInputArgs,
    /// Fingerprint of the source content this run was built from
    #[arg(long)]
    pub fingerprint: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Write to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Days of run history to keep (defaults to retention_days)
    pub days: Option<u32>,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = LinkledgerConfig::resolve(&cli)?;
    let format = cli.format;

    match cli.command {
        Commands::Preview(a) => rewind::run_preview(a, &open(&config)?, format),
        Commands::Rewind(a) => rewind::run(a, &open(&config)?, format),
        Commands::Backup => backup::run(&open(&config)?, format),
        Commands::Restore(a) => backup::run_restore(a, &open(&config)?, format),
        Commands::Stats => stats::run(&open(&config)?, format),
        Commands::Recent(a) => stats::run_recent(a, &open(&config)?, format),
        Commands::Blacklist(a) => blacklist::run(a, &open(&config)?, format),
        Commands::Unblacklist(a) => blacklist::run_unblacklist(a, &open(&config)?, format),
        Commands::Analyze(a) => ingest::run_analyze(a, &open(&config)?, format),
        Commands::Record(a) => ingest::run_record(a, &open(&config)?, format),
        Commands::Export(a) => export::run(a, &open(&config)?),
        Commands::Cleanup(a) => cleanup::run(a, &open(&config)?, format),
        Commands::Config(cmd) => config_cmd::run(cmd, &cli.config, &config),
    }
}

fn open(config: &LinkledgerConfig) -> anyhow::Result<Ledger> {
    Ok(Ledger::open(config.db_path(), config.ledger.clone())?)
}

/// `{"success": true, "data": ...}` on stdout.
pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let envelope = serde_json::json!({ "success": true, "data": data });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

pub fn rule() -> String {
    "─".repeat(60)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
