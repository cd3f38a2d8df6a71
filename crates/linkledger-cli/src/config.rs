use crate::cli::Cli;
use linkledger_core::LedgerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DB_FILE: &str = "linkledger.redb";

/// Contents of `linkledger.toml`.
///
/// ```toml
/// data_dir = "./data"
///
/// [ledger]
/// auto_blacklist_enabled = true
/// auto_blacklist_days = 30
/// recent_link_days = 3
/// domain_blacklist = ["ads.example.com"]
/// url_pattern_blacklist = ["*utm_source=*"]
/// retention_days = 90
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkledgerConfig {
    pub data_dir: PathBuf,
    pub ledger: LedgerConfig,
}

impl Default for LinkledgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            ledger: LedgerConfig::default(),
        }
    }
}

impl LinkledgerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Falls back to defaults when the file is absent. A file that exists but
    /// does not parse is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load the file, then apply `--data-dir` and the environment overrides
    /// carried on the command line.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Self::load_or_default(&cli.config)?;

        if let Some(dir) = &cli.data_dir {
            config.data_dir = dir.clone();
        }

        let ledger = &mut config.ledger;
        let overrides = &cli.overrides;
        if let Some(enabled) = overrides.auto_blacklist_enabled {
            ledger.auto_blacklist_enabled = enabled;
        }
        if let Some(days) = overrides.auto_blacklist_days {
            ledger.auto_blacklist_days = days;
        }
        if let Some(days) = overrides.recent_link_days {
            ledger.recent_link_days = days;
        }
        if let Some(domains) = &overrides.domain_blacklist {
            ledger.domain_blacklist = clean_list(domains);
        }
        if let Some(patterns) = &overrides.url_pattern_blacklist {
            ledger.url_pattern_blacklist = clean_list(patterns);
        }

        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    /// Every problem found, empty when the configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }
        if let Err(e) = self.ledger.validate() {
            errors.push(e.to_string());
        }
        errors
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
