//! Read-only admission decisions for a batch of candidate URLs.

use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::{ItemFailure, Result};
use crate::identity::{normalize, UrlIdentity};
use crate::report::Reporter;
use crate::rules::BlacklistRules;
use crate::storage::LinkStore;
use crate::types::{reasons, Link};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

const COMPONENT: &str = "admission";

/// A URL that passed every check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// 1-based position in the input.
    pub position: usize,
    pub url: String,
    pub url_hash: String,
    pub domain: String,
    /// Set for links already in the store.
    pub last_seen: Option<NaiveDate>,
    pub seen_count: u64,
}

/// Why a URL was held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Domain or pattern rule. No store lookup was made.
    Rule,
    /// Permanently excluded in the store.
    Blacklisted,
    /// Opened too recently. Expires on its own.
    Throttled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockedUrl {
    pub position: usize,
    pub url: String,
    pub url_hash: String,
    pub domain: String,
    pub kind: BlockKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    pub total: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub new: usize,
    pub existing: usize,
    pub blocked: usize,
    pub throttled: usize,
    pub admitted: usize,
    pub failed: usize,
}

/// Classification of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analysis {
    pub new: Vec<Candidate>,
    pub existing: Vec<Candidate>,
    pub blocked: Vec<BlockedUrl>,
    /// `new` and `existing` merged back into input order.
    pub admitted: Vec<Candidate>,
    pub failed: Vec<ItemFailure>,
    pub stats: AnalysisStats,
}

impl Analysis {
    pub fn admitted_urls(&self) -> Vec<String> {
        self.admitted.iter().map(|c| c.url.clone()).collect()
    }
}

enum Verdict {
    New,
    Existing(Link),
    Blocked {
        kind: BlockKind,
        reason: String,
    },
}

/// Decides which URLs may be surfaced. Never writes to the store.
pub struct AdmissionAnalyzer<S: LinkStore> {
    store: Arc<S>,
    rules: BlacklistRules,
    recent_link_days: u32,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
}

impl<S: LinkStore> AdmissionAnalyzer<S> {
    pub fn new(
        store: Arc<S>,
        config: &LedgerConfig,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            rules: BlacklistRules::from_config(config)?,
            recent_link_days: config.recent_link_days,
            clock,
            reporter,
        })
    }

    pub fn analyze<I, T>(&self, urls: I) -> Result<Analysis>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let today = self.clock.today();
        let mut analysis = Analysis::default();
        let mut seen = HashSet::new();

        for (index, raw) in urls.into_iter().enumerate() {
            let raw = raw.as_ref();
            let position = index + 1;
            analysis.stats.total += 1;

            let identity = normalize(raw);
            if let Err(error) = identity.validate(raw) {
                self.reporter
                    .warn(COMPONENT, &format!("skipping #{}: {}", position, error));
                analysis.failed.push(ItemFailure {
                    position,
                    url: raw.to_string(),
                    error,
                });
                continue;
            }

            if !seen.insert(identity.url_hash.clone()) {
                analysis.stats.duplicates += 1;
                continue;
            }

            let url = raw.trim().to_string();
            match self.classify(&url, &identity, today)? {
                Verdict::New => {
                    let candidate = Candidate {
                        position,
                        url,
                        url_hash: identity.url_hash,
                        domain: identity.domain,
                        last_seen: None,
                        seen_count: 0,
                    };
                    analysis.new.push(candidate.clone());
                    analysis.admitted.push(candidate);
                }
                Verdict::Existing(link) => {
                    let candidate = Candidate {
                        position,
                        url,
                        url_hash: identity.url_hash,
                        domain: identity.domain,
                        last_seen: Some(link.last_seen),
                        seen_count: link.seen_count,
                    };
                    analysis.existing.push(candidate.clone());
                    analysis.admitted.push(candidate);
                }
                Verdict::Blocked { kind, reason } => {
                    self.reporter.debug(
                        COMPONENT,
                        &format!("blocked {} ({})", url, reason),
                    );
                    analysis.blocked.push(BlockedUrl {
                        position,
                        url,
                        url_hash: identity.url_hash,
                        domain: identity.domain,
                        kind,
                        reason,
                    });
                }
            }
        }

        let stats = &mut analysis.stats;
        stats.unique = stats.total - stats.duplicates - analysis.failed.len();
        stats.failed = analysis.failed.len();
        stats.new = analysis.new.len();
        stats.existing = analysis.existing.len();
        stats.blocked = analysis.blocked.len();
        stats.throttled = analysis
            .blocked
            .iter()
            .filter(|b| b.kind == BlockKind::Throttled)
            .count();
        stats.admitted = analysis.admitted.len();

        self.reporter.info(
            COMPONENT,
            &format!(
                "analyzed {} URLs: {} new, {} existing, {} blocked, {} to open",
                stats.total, stats.new, stats.existing, stats.blocked, stats.admitted
            ),
        );

        Ok(analysis)
    }

    fn classify(&self, url: &str, identity: &UrlIdentity, today: NaiveDate) -> Result<Verdict> {
        if let Some(hit) = self.rules.evaluate(url, identity) {
            return Ok(Verdict::Blocked {
                kind: BlockKind::Rule,
                reason: hit.reason(),
            });
        }

        let Some(link) = self.store.find_by_hash(&identity.url_hash)? else {
            return Ok(Verdict::New);
        };

        if let Some(reason) = link.blacklist_reason() {
            return Ok(Verdict::Blocked {
                kind: BlockKind::Blacklisted,
                reason: reason.to_string(),
            });
        }

        let days_since = (today - link.last_seen).num_days();
        if days_since <= i64::from(self.recent_link_days) {
            return Ok(Verdict::Blocked {
                kind: BlockKind::Throttled,
                reason: reasons::RECENTLY_OPENED.to_string(),
            });
        }

        Ok(Verdict::Existing(link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::report::MemoryReporter;
    use crate::storage::MemoryLinkStore;
    use crate::types::{BlacklistMark, LinkUpsert};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn seed(store: &MemoryLinkStore, url: &str, last_seen: NaiveDate) -> Link {
        store
            .upsert_link(&LinkUpsert::new(url, normalize(url), last_seen))
            .unwrap()
            .link
    }

    fn analyzer(store: Arc<MemoryLinkStore>, config: LedgerConfig) -> AdmissionAnalyzer<MemoryLinkStore> {
        AdmissionAnalyzer::new(
            store,
            &config,
            Arc::new(FixedClock::on(today())),
            MemoryReporter::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_and_existing_admitted_in_order() {
        let store = Arc::new(MemoryLinkStore::new());
        seed(&store, "https://example.com/old", today() - Duration::days(10));

        let analysis = analyzer(store, LedgerConfig::default())
            .analyze(["https://example.com/new", "https://example.com/old"])
            .unwrap();

        assert_eq!(analysis.stats.new, 1);
        assert_eq!(analysis.stats.existing, 1);
        assert_eq!(
            analysis.admitted_urls(),
            vec!["https://example.com/new", "https://example.com/old"]
        );
        assert_eq!(analysis.existing[0].seen_count, 1);
    }

    #[test]
    fn test_blacklisted_link_blocked_with_stored_reason() {
        let store = Arc::new(MemoryLinkStore::new());
        let link = seed(&store, "https://example.com/a", today() - Duration::days(40));
        store
            .set_blacklist(&link.url_hash, Some(BlacklistMark::new(today(), "not_interested")))
            .unwrap();

        let analysis = analyzer(store, LedgerConfig::default())
            .analyze(["https://example.com/a"])
            .unwrap();
        assert_eq!(analysis.blocked.len(), 1);
        assert_eq!(analysis.blocked[0].kind, BlockKind::Blacklisted);
        assert_eq!(analysis.blocked[0].reason, "not_interested");
        assert!(analysis.admitted.is_empty());
    }

    #[test]
    fn test_throttle_boundary() {
        let store = Arc::new(MemoryLinkStore::new());
        seed(&store, "https://example.com/today", today());
        seed(&store, "https://example.com/yesterday", today() - Duration::days(1));
        seed(&store, "https://example.com/two", today() - Duration::days(2));

        let config = LedgerConfig::default().with_recent_link_days(1);
        let analysis = analyzer(store, config)
            .analyze([
                "https://example.com/today",
                "https://example.com/yesterday",
                "https://example.com/two",
            ])
            .unwrap();

        assert_eq!(analysis.stats.throttled, 2);
        assert!(analysis
            .blocked
            .iter()
            .all(|b| b.reason == reasons::RECENTLY_OPENED));
        assert_eq!(analysis.admitted_urls(), vec!["https://example.com/two"]);
    }

    #[test]
    fn test_rules_short_circuit_store() {
        let store = Arc::new(MemoryLinkStore::new());
        let config = LedgerConfig::default()
            .with_domain_blacklist(["ads.example"])
            .with_url_patterns(["*/sponsored/*"]);

        let analysis = analyzer(store, config)
            .analyze([
                "https://ads.example/x",
                "https://news.example/sponsored/1",
                "https://news.example/story",
            ])
            .unwrap();

        let reasons: Vec<&str> = analysis.blocked.iter().map(|b| b.reason.as_str()).collect();
        assert_eq!(reasons, vec!["domain_blacklisted", "pattern_match:*/sponsored/*"]);
        assert!(analysis.blocked.iter().all(|b| b.kind == BlockKind::Rule));
        assert_eq!(analysis.stats.new, 1);
    }

    #[test]
    fn test_duplicates_first_occurrence_wins() {
        let store = Arc::new(MemoryLinkStore::new());
        let analysis = analyzer(store, LedgerConfig::default())
            .analyze([
                "https://example.com/a#one",
                "https://EXAMPLE.com/a",
                "https://example.com/b",
            ])
            .unwrap();

        assert_eq!(analysis.stats.total, 3);
        assert_eq!(analysis.stats.duplicates, 1);
        assert_eq!(analysis.stats.unique, 2);
        assert_eq!(analysis.new[0].url, "https://example.com/a#one");
        assert_eq!(analysis.new[0].position, 1);
        assert_eq!(analysis.new[1].position, 3);
    }

    #[test]
    fn test_malformed_reported_not_fatal() {
        let store = Arc::new(MemoryLinkStore::new());
        let reporter = MemoryReporter::new();
        let analyzer = AdmissionAnalyzer::new(
            store,
            &LedgerConfig::default(),
            Arc::new(FixedClock::on(today())),
            reporter.clone(),
        )
        .unwrap();

        let analysis = analyzer
            .analyze(["https://example.com/a", "not a url", ""])
            .unwrap();
        assert_eq!(analysis.stats.failed, 2);
        assert_eq!(analysis.failed[0].position, 2);
        assert_eq!(analysis.stats.admitted, 1);
        assert!(reporter.contains("skipping #2"));
    }

    #[test]
    fn test_analyze_does_not_write() {
        let store = Arc::new(MemoryLinkStore::new());
        let before = store.stats().unwrap();
        analyzer(store.clone(), LedgerConfig::default())
            .analyze(["https://example.com/a", "https://example.com/b"])
            .unwrap();
        let after = store.stats().unwrap();
        assert_eq!(before.link_count, after.link_count);
        assert_eq!(after.link_count, 0);
        assert_eq!(after.run_count, 0);
    }
}
