//! Read-only reporting over the ledger: statistics, recent blacklists and
//! full export.

use crate::clock::{days_before, Clock};
use crate::error::Result;
use crate::rewind::{entries_newest_first, BlacklistEntry};
use crate::storage::{LinkFilter, LinkStore, RunFilter};
use crate::types::Link;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const TOP_DOMAINS: usize = 10;
const ACTIVITY_DAYS: u32 = 7;
const BLACKLIST_HISTORY_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub new_links: u64,
    pub opened_links: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_links: u64,
    pub blacklisted_links: u64,
    pub active_links: u64,
    pub total_runs: u64,
    /// Percent, one decimal.
    pub blacklist_ratio: f64,
    pub top_domains: Vec<DomainCount>,
    /// Keyed by run date.
    pub recent_activity: BTreeMap<NaiveDate, DailyActivity>,
    pub db_size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlacklistStats {
    pub total_blacklisted: u64,
    /// Blacklists per date over the last 30 days.
    pub by_date: BTreeMap<NaiveDate, u64>,
    /// Most common first.
    pub reasons: Vec<ReasonCount>,
}

/// A link flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedLink {
    pub id: u64,
    pub url: String,
    pub url_hash: String,
    pub domain: String,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
    pub seen_count: u64,
    pub is_blacklisted: bool,
    pub blacklisted_date: Option<NaiveDate>,
    pub blacklist_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Link> for ExportedLink {
    fn from(link: &Link) -> Self {
        Self {
            id: link.id,
            url: link.url.clone(),
            url_hash: link.url_hash.clone(),
            domain: link.domain.clone(),
            first_seen: link.first_seen,
            last_seen: link.last_seen,
            seen_count: link.seen_count,
            is_blacklisted: link.is_blacklisted(),
            blacklisted_date: link.blacklisted_date(),
            blacklist_reason: link.blacklist_reason().map(str::to_string),
            created_at: link.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub export_date: DateTime<Utc>,
    pub total_links: usize,
    pub links: Vec<ExportedLink>,
}

pub struct Insights<S: LinkStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: LinkStore> Insights<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn ledger_stats(&self) -> Result<LedgerStats> {
        let stats = self.store.stats()?;

        let blacklist_ratio = if stats.link_count == 0 {
            0.0
        } else {
            let pct = stats.blacklisted_count as f64 / stats.link_count as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        };

        let mut top_domains: Vec<DomainCount> = stats
            .links_by_domain
            .into_iter()
            .map(|(domain, count)| DomainCount { domain, count })
            .collect();
        top_domains.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.domain.cmp(&b.domain)));
        top_domains.truncate(TOP_DOMAINS);

        let since = days_before(self.clock.today(), ACTIVITY_DAYS);
        let mut recent_activity: BTreeMap<NaiveDate, DailyActivity> = BTreeMap::new();
        for run in self.store.list_runs(RunFilter::new().since(since))? {
            let day = recent_activity.entry(run.run_date).or_default();
            day.new_links += u64::from(run.new_links);
            day.opened_links += u64::from(run.opened_links);
        }

        Ok(LedgerStats {
            total_links: stats.link_count,
            blacklisted_links: stats.blacklisted_count,
            active_links: stats.link_count.saturating_sub(stats.blacklisted_count),
            total_runs: stats.run_count,
            blacklist_ratio,
            top_domains,
            recent_activity,
            db_size_bytes: stats.db_size_bytes,
        })
    }

    pub fn blacklist_stats(&self) -> Result<BlacklistStats> {
        let blacklisted = self.store.list_links(LinkFilter::new().blacklisted())?;
        let since = days_before(self.clock.today(), BLACKLIST_HISTORY_DAYS);

        let mut by_date = BTreeMap::new();
        let mut by_reason: BTreeMap<String, u64> = BTreeMap::new();
        for link in &blacklisted {
            let Some(mark) = &link.blacklist else { continue };
            if mark.date >= since {
                *by_date.entry(mark.date).or_insert(0) += 1;
            }
            *by_reason.entry(mark.reason.clone()).or_insert(0) += 1;
        }

        let mut reasons: Vec<ReasonCount> = by_reason
            .into_iter()
            .map(|(reason, count)| ReasonCount { reason, count })
            .collect();
        // Stable sort keeps ties in name order
        reasons.sort_by(|a, b| b.count.cmp(&a.count));

        Ok(BlacklistStats {
            total_blacklisted: blacklisted.len() as u64,
            by_date,
            reasons,
        })
    }

    /// Blacklists dated within the last `days` days, newest first.
    pub fn recent_blacklists(&self, days: u32) -> Result<Vec<BlacklistEntry>> {
        let today = self.clock.today();
        let links = self
            .store
            .list_links(LinkFilter::new().blacklisted_since(days_before(today, days)))?;
        Ok(entries_newest_first(&links, today))
    }

    pub fn export(&self) -> Result<ExportDocument> {
        let links: Vec<ExportedLink> = self
            .store
            .list_links(LinkFilter::new())?
            .iter()
            .map(ExportedLink::from)
            .collect();

        Ok(ExportDocument {
            export_date: self.clock.now(),
            total_links: links.len(),
            links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::identity::normalize;
    use crate::storage::MemoryLinkStore;
    use crate::types::{BlacklistMark, NewRun, RunEntry};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn entry(url: &str, position: u32) -> RunEntry {
        RunEntry {
            url: url.to_string(),
            identity: normalize(url),
            position,
        }
    }

    fn seeded() -> Insights<MemoryLinkStore> {
        let store = Arc::new(MemoryLinkStore::new());
        store
            .record_run(
                &NewRun::new(days_before(today(), 1), 3),
                &[
                    entry("https://a.example/1", 1),
                    entry("https://a.example/2", 2),
                    entry("https://b.example/1", 3),
                ],
            )
            .unwrap();
        store
            .record_run(&NewRun::new(today(), 1), &[entry("https://a.example/1", 1)])
            .unwrap();

        let marks = [
            ("https://a.example/1", 0, "read"),
            ("https://a.example/2", 2, "not_interested"),
            ("https://b.example/1", 45, "read"),
        ];
        for (url, days_ago, reason) in marks {
            store
                .set_blacklist(
                    &normalize(url).url_hash,
                    Some(BlacklistMark::new(days_before(today(), days_ago), reason)),
                )
                .unwrap();
        }
        Insights::new(store, Arc::new(FixedClock::on(today())))
    }

    #[test]
    fn test_ledger_stats() {
        let stats = seeded().ledger_stats().unwrap();
        assert_eq!(stats.total_links, 3);
        assert_eq!(stats.blacklisted_links, 3);
        assert_eq!(stats.active_links, 0);
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.blacklist_ratio, 100.0);
        assert_eq!(stats.top_domains[0].domain, "a.example");
        assert_eq!(stats.top_domains[0].count, 2);

        let yesterday = &stats.recent_activity[&days_before(today(), 1)];
        assert_eq!(yesterday.new_links, 3);
        assert_eq!(stats.recent_activity[&today()].new_links, 0);
        assert_eq!(stats.recent_activity[&today()].opened_links, 1);
    }

    #[test]
    fn test_ratio_rounds_to_one_decimal() {
        let store = Arc::new(MemoryLinkStore::new());
        let entries: Vec<RunEntry> = (1..=3)
            .map(|i| entry(&format!("https://c.example/{}", i), i))
            .collect();
        store.record_run(&NewRun::new(today(), 3), &entries).unwrap();
        store
            .set_blacklist(
                &normalize("https://c.example/1").url_hash,
                Some(BlacklistMark::new(today(), "read")),
            )
            .unwrap();

        let insights = Insights::new(store, Arc::new(FixedClock::on(today())));
        assert_eq!(insights.ledger_stats().unwrap().blacklist_ratio, 33.3);
    }

    #[test]
    fn test_blacklist_stats() {
        let stats = seeded().blacklist_stats().unwrap();
        assert_eq!(stats.total_blacklisted, 3);
        // The 45-day-old mark falls outside the daily history
        assert_eq!(stats.by_date.values().sum::<u64>(), 2);
        assert_eq!(stats.reasons[0].reason, "read");
        assert_eq!(stats.reasons[0].count, 2);
    }

    #[test]
    fn test_recent_blacklists_newest_first() {
        let recent = seeded().recent_blacklists(7).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].days_ago, 0);
        assert_eq!(recent[1].days_ago, 2);
    }

    #[test]
    fn test_export_includes_every_link() {
        let doc = seeded().export().unwrap();
        assert_eq!(doc.total_links, 3);
        assert!(doc.links.iter().all(|l| l.is_blacklisted));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["links"].as_array().unwrap().len(), 3);
        assert!(json["export_date"].is_string());
    }
}
