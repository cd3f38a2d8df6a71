use crate::admission::{AdmissionAnalyzer, Analysis};
use crate::blacklist::BlacklistManager;
use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::insights::{BlacklistStats, ExportDocument, Insights, LedgerStats};
use crate::recorder::{RecordReport, RunRecorder};
use crate::report::{default_reporter, Reporter};
use crate::retention::{RetentionEngine, SweepOutcome};
use crate::rewind::{BlacklistEntry, RestoreOutcome, RewindEngine, RewindOutcome, RewindPreview};
use crate::storage::{LinkStore, RedbLinkStore};
use crate::types::Link;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_BACKUP_DIR: &str = "backups";

/// High-level, embedded ledger API. Wires every component to one store.
///
/// # Example
/// ```rust,no_run
/// use linkledger_core::{Ledger, LedgerConfig};
///
/// let ledger = Ledger::open("./links.redb", LedgerConfig::default()).unwrap();
/// let analysis = ledger.analyze(["https://example.com/post"]).unwrap();
/// ledger.record(analysis.admitted_urls(), None).unwrap();
/// ```
pub struct Ledger<S: LinkStore = RedbLinkStore> {
    store: Arc<S>,
    config: LedgerConfig,
    analyzer: AdmissionAnalyzer<S>,
    recorder: RunRecorder<S>,
    blacklist: BlacklistManager<S>,
    rewind: RewindEngine<S>,
    retention: RetentionEngine<S>,
    insights: Insights<S>,
}

impl Ledger<RedbLinkStore> {
    /// Open (or create) a ledger database at the given path. Snapshots go to
    /// `config.backup_dir`, or `backups/` next to the database.
    pub fn open(path: impl AsRef<Path>, config: LedgerConfig) -> Result<Self> {
        let path = path.as_ref();
        let config = match config.backup_dir {
            Some(_) => config,
            None => {
                let parent = path.parent().unwrap_or_else(|| Path::new("."));
                config.with_backup_dir(parent.join(DEFAULT_BACKUP_DIR))
            }
        };

        let store = Arc::new(RedbLinkStore::open(path)?);
        Self::with_store(store, config, Arc::new(SystemClock), default_reporter())
    }
}

impl<S: LinkStore> Ledger<S> {
    /// Build a ledger over any store, clock and reporter.
    pub fn with_store(
        store: Arc<S>,
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        config.validate()?;

        let backup_dir = config
            .backup_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));

        let analyzer =
            AdmissionAnalyzer::new(store.clone(), &config, clock.clone(), reporter.clone())?;
        let recorder = RunRecorder::new(store.clone(), &config, clock.clone(), reporter.clone());
        let blacklist =
            BlacklistManager::new(store.clone(), &config, clock.clone(), reporter.clone());
        let rewind = RewindEngine::new(store.clone(), backup_dir, clock.clone(), reporter.clone());
        let retention = RetentionEngine::new(store.clone(), clock.clone(), reporter);
        let insights = Insights::new(store.clone(), clock);

        Ok(Self {
            store,
            config,
            analyzer,
            recorder,
            blacklist,
            rewind,
            retention,
            insights,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn backup_dir(&self) -> &Path {
        self.rewind.backup_dir()
    }

    // === Admission ===

    /// Classify candidate URLs. Never writes.
    pub fn analyze<I, T>(&self, urls: I) -> Result<Analysis>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.analyzer.analyze(urls)
    }

    /// Record URLs confirmed as opened.
    pub fn record<I, T>(&self, opened: I, content_fingerprint: Option<&str>) -> Result<RecordReport>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.recorder.record(opened, content_fingerprint)
    }

    /// False when a run recorded today already carries this fingerprint.
    pub fn content_changed(&self, content_fingerprint: &str) -> Result<bool> {
        self.recorder.content_changed(content_fingerprint)
    }

    // === Blacklist ===

    pub fn blacklist(&self, url: &str, reason: &str) -> Result<bool> {
        self.blacklist.blacklist(url, reason)
    }

    pub fn unblacklist(&self, url: &str) -> Result<bool> {
        self.blacklist.unblacklist(url)
    }

    /// Blacklist links unseen for longer than the configured age.
    pub fn sweep_aged(&self) -> Result<Vec<Link>> {
        self.blacklist.sweep_aged()
    }

    // === Rewind ===

    pub fn preview(&self, days: u32) -> Result<RewindPreview> {
        self.rewind.preview(days)
    }

    pub fn rewind(&self, days: u32, with_backup: bool) -> Result<RewindOutcome> {
        self.rewind.rewind(days, with_backup)
    }

    pub fn backup(&self) -> Result<PathBuf> {
        self.rewind.backup()
    }

    pub fn restore(&self, backup_file: &Path) -> Result<RestoreOutcome> {
        self.rewind.restore(backup_file)
    }

    // === Maintenance and reporting ===

    /// Delete run history older than `days_to_keep`, or the configured
    /// retention when `None`.
    pub fn cleanup(&self, days_to_keep: Option<u32>) -> Result<SweepOutcome> {
        self.retention
            .sweep(days_to_keep.unwrap_or(self.config.retention_days))
    }

    pub fn stats(&self) -> Result<LedgerStats> {
        self.insights.ledger_stats()
    }

    pub fn blacklist_stats(&self) -> Result<BlacklistStats> {
        self.insights.blacklist_stats()
    }

    pub fn recent(&self, days: u32) -> Result<Vec<BlacklistEntry>> {
        self.insights.recent_blacklists(days)
    }

    pub fn export(&self) -> Result<ExportDocument> {
        self.insights.export()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::LedgerError;
    use crate::report::MemoryReporter;
    use crate::storage::MemoryLinkStore;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_open_defaults_backup_dir_next_to_database() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("links.redb"), LedgerConfig::default()).unwrap();
        assert_eq!(ledger.backup_dir(), dir.path().join("backups"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = Arc::new(MemoryLinkStore::new());
        let result = Ledger::with_store(
            store,
            LedgerConfig::default().with_retention_days(0),
            Arc::new(SystemClock),
            MemoryReporter::new(),
        );
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_analyze_then_record_then_blacklist() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let ledger = Ledger::with_store(
            Arc::new(MemoryLinkStore::new()),
            LedgerConfig::default(),
            Arc::new(FixedClock::on(today)),
            MemoryReporter::new(),
        )
        .unwrap();

        let analysis = ledger.analyze(["https://example.com/a"]).unwrap();
        assert_eq!(analysis.admitted_urls(), vec!["https://example.com/a".to_string()]);

        let report = ledger.record(analysis.admitted_urls(), Some("fp")).unwrap();
        assert_eq!(report.recorded_count, 1);
        assert!(!ledger.content_changed("fp").unwrap());

        assert!(ledger.blacklist("https://example.com/a", "read").unwrap());
        assert_eq!(ledger.recent(7).unwrap().len(), 1);
        assert_eq!(ledger.stats().unwrap().blacklisted_links, 1);
    }
}
