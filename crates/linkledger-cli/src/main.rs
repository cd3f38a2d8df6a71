mod cli;
mod config;

use clap::Parser;
use cli::{Cli, OutputFormat};
use linkledger_core::LedgerError;
use std::process::ExitCode;

/// `EX_TEMPFAIL`: the database is locked by another process, try again.
const EXIT_RETRYABLE: u8 = 75;

fn main() -> ExitCode {
    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("linkledger v{}", env!("CARGO_PKG_VERSION"));
    let format = cli.format;

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let retryable = e
                .downcast_ref::<LedgerError>()
                .is_some_and(LedgerError::is_retryable);

            if format == OutputFormat::Json {
                let envelope = serde_json::json!({
                    "success": false,
                    "error": format!("{:#}", e),
                    "retryable": retryable,
                });
                println!("{}", envelope);
            }
            eprintln!("Error: {:#}", e);

            if retryable {
                ExitCode::from(EXIT_RETRYABLE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
