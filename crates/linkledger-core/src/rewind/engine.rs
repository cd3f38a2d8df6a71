use crate::clock::{days_before, Clock};
use crate::error::Result;
use crate::report::Reporter;
use crate::rewind::snapshot::Snapshot;
use crate::storage::{LinkFilter, LinkStore};
use crate::types::{reasons, Link};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const COMPONENT: &str = "rewind";

/// A blacklisted link as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlacklistEntry {
    pub url: String,
    pub url_hash: String,
    pub domain: String,
    pub blacklisted_date: NaiveDate,
    pub reason: String,
    pub seen_count: u64,
    pub days_ago: i64,
}

impl BlacklistEntry {
    /// `None` for links that are not blacklisted.
    pub fn from_link(link: &Link, today: NaiveDate) -> Option<Self> {
        let mark = link.blacklist.as_ref()?;
        let reason = if mark.reason.is_empty() {
            reasons::NOT_SPECIFIED.to_string()
        } else {
            mark.reason.clone()
        };
        Some(Self {
            url: link.url.clone(),
            url_hash: link.url_hash.clone(),
            domain: link.domain.clone(),
            blacklisted_date: mark.date,
            reason,
            seen_count: link.seen_count,
            days_ago: (today - mark.date).num_days(),
        })
    }
}

/// Newest first, ties by URL.
pub(crate) fn entries_newest_first(links: &[Link], today: NaiveDate) -> Vec<BlacklistEntry> {
    let mut entries: Vec<BlacklistEntry> = links
        .iter()
        .filter_map(|l| BlacklistEntry::from_link(l, today))
        .collect();
    entries.sort_by(|a, b| {
        b.blacklisted_date
            .cmp(&a.blacklisted_date)
            .then_with(|| a.url.cmp(&b.url))
    });
    entries
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewindPreview {
    pub cutoff_date: NaiveDate,
    pub days_back: u32,
    pub restore_count: usize,
    pub candidates: Vec<BlacklistEntry>,
    pub reason_breakdown: BTreeMap<String, usize>,
    pub domain_breakdown: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewindOutcome {
    pub cutoff_date: NaiveDate,
    pub days_rewound: u32,
    pub restored_count: usize,
    pub restored: Vec<BlacklistEntry>,
    pub backup_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub backup_file: PathBuf,
    pub backup_date: String,
    pub total_in_backup: usize,
    pub restored_count: usize,
    /// Hashes in the snapshot with no matching link.
    pub skipped: Vec<String>,
}

/// Time-windowed undo of blacklist decisions, with snapshot backup and
/// restore.
///
/// Preview and rewind evaluate the same predicate but in separate
/// transactions. A blacklist written between the two is included in the
/// rewind even though the preview did not show it.
pub struct RewindEngine<S: LinkStore> {
    store: Arc<S>,
    backup_dir: PathBuf,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
}

impl<S: LinkStore> RewindEngine<S> {
    pub fn new(
        store: Arc<S>,
        backup_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            store,
            backup_dir: backup_dir.into(),
            clock,
            reporter,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// What `rewind(days, ..)` would restore right now. Read-only.
    pub fn preview(&self, days: u32) -> Result<RewindPreview> {
        let today = self.clock.today();
        let cutoff_date = days_before(today, days);

        let links = self
            .store
            .list_links(LinkFilter::new().blacklisted_since(cutoff_date))?;
        let candidates = entries_newest_first(&links, today);

        let mut reason_breakdown = BTreeMap::new();
        let mut domain_breakdown = BTreeMap::new();
        for candidate in &candidates {
            *reason_breakdown.entry(candidate.reason.clone()).or_insert(0) += 1;
            *domain_breakdown.entry(candidate.domain.clone()).or_insert(0) += 1;
        }

        Ok(RewindPreview {
            cutoff_date,
            days_back: days,
            restore_count: candidates.len(),
            candidates,
            reason_breakdown,
            domain_breakdown,
        })
    }

    /// Clear every blacklist dated within the last `days` days, optionally
    /// writing a full snapshot first.
    pub fn rewind(&self, days: u32, with_backup: bool) -> Result<RewindOutcome> {
        let backup_file = if with_backup {
            Some(self.backup()?)
        } else {
            None
        };

        let today = self.clock.today();
        let cutoff_date = days_before(today, days);
        let cleared = self.store.clear_blacklisted_since(cutoff_date)?;
        let restored = entries_newest_first(&cleared, today);

        self.reporter.info(
            COMPONENT,
            &format!(
                "rewind complete: {} links restored to available status",
                restored.len()
            ),
        );

        Ok(RewindOutcome {
            cutoff_date,
            days_rewound: days,
            restored_count: restored.len(),
            restored,
            backup_file,
        })
    }

    /// Snapshot every currently blacklisted link into the backup directory.
    pub fn backup(&self) -> Result<PathBuf> {
        let links = self.store.list_links(LinkFilter::new().blacklisted())?;
        let now = self.clock.now();
        let snapshot = Snapshot::capture(&links, self.store.identifier(), now);
        let path = snapshot.write_new(&self.backup_dir, now)?;

        self.reporter.info(
            COMPONENT,
            &format!(
                "backup created: {} ({} links)",
                path.display(),
                snapshot.total_blacklisted
            ),
        );
        Ok(path)
    }

    /// Re-apply a snapshot by hash. The file is fully validated before
    /// anything is written; unknown hashes are skipped and reported.
    pub fn restore(&self, backup_file: &Path) -> Result<RestoreOutcome> {
        let snapshot = Snapshot::load(backup_file)?;
        let outcome = self.store.apply_blacklist_marks(&snapshot.marks())?;

        if !outcome.skipped.is_empty() {
            self.reporter.warn(
                COMPONENT,
                &format!(
                    "{} snapshot entries did not match any link and were skipped",
                    outcome.skipped.len()
                ),
            );
        }
        self.reporter.info(
            COMPONENT,
            &format!(
                "restored {} blacklisted links from {}",
                outcome.applied,
                backup_file.display()
            ),
        );

        Ok(RestoreOutcome {
            backup_file: backup_file.to_path_buf(),
            backup_date: snapshot.backup_date,
            total_in_backup: snapshot.total_blacklisted,
            restored_count: outcome.applied,
            skipped: outcome.skipped,
        })
    }
}
