use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger behaviour knobs. Every field has a compile-time default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Run the age sweep before every recording. Default: false.
    pub auto_blacklist_enabled: bool,

    /// Links unseen for longer than this are aged out. Default: 30.
    pub auto_blacklist_days: u32,

    /// Links opened within this many days are throttled. Default: 3.
    pub recent_link_days: u32,

    /// Hosts blocked outright, exact match after lowercasing.
    pub domain_blacklist: Vec<String>,

    /// Glob patterns (`*`, `?`, `[...]`) matched against the lowercased URL.
    pub url_pattern_blacklist: Vec<String>,

    /// Runs older than this are removed by the retention sweep. Default: 90.
    pub retention_days: u32,

    /// Where snapshot files are written. Defaults to `<store dir>/backups`.
    pub backup_dir: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            auto_blacklist_enabled: false,
            auto_blacklist_days: 30,
            recent_link_days: 3,
            domain_blacklist: Vec::new(),
            url_pattern_blacklist: Vec::new(),
            retention_days: 90,
            backup_dir: None,
        }
    }
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_blacklist(mut self, enabled: bool, days: u32) -> Self {
        self.auto_blacklist_enabled = enabled;
        self.auto_blacklist_days = days;
        self
    }

    pub fn with_recent_link_days(mut self, days: u32) -> Self {
        self.recent_link_days = days;
        self
    }

    pub fn with_domain_blacklist<I, T>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.domain_blacklist = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_url_patterns<I, T>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.url_pattern_blacklist = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.auto_blacklist_enabled && self.auto_blacklist_days == 0 {
            return Err(LedgerError::Validation(
                "auto_blacklist_days must be > 0 when auto-blacklisting is enabled".into(),
            ));
        }

        if self.retention_days == 0 {
            return Err(LedgerError::Validation("retention_days must be > 0".into()));
        }

        if let Some(domain) = self.domain_blacklist.iter().find(|d| d.trim().is_empty()) {
            return Err(LedgerError::Validation(format!(
                "domain_blacklist contains an empty entry: {:?}",
                domain
            )));
        }

        for pattern in &self.url_pattern_blacklist {
            if pattern.trim().is_empty() {
                return Err(LedgerError::Validation(
                    "url_pattern_blacklist contains an empty pattern".into(),
                ));
            }
            crate::rules::compile_pattern(pattern)?;
        }

        Ok(())
    }
}
