use crate::clock::{days_before, Clock};
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::identity::normalize;
use crate::report::Reporter;
use crate::storage::LinkStore;
use crate::types::{reasons, BlacklistMark, Link};
use std::sync::Arc;

const COMPONENT: &str = "blacklist";

/// Manual blacklist edits and the age sweep.
pub struct BlacklistManager<S: LinkStore> {
    store: Arc<S>,
    auto_blacklist_enabled: bool,
    auto_blacklist_days: u32,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
}

impl<S: LinkStore> BlacklistManager<S> {
    pub fn new(
        store: Arc<S>,
        config: &LedgerConfig,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            store,
            auto_blacklist_enabled: config.auto_blacklist_enabled,
            auto_blacklist_days: config.auto_blacklist_days,
            clock,
            reporter,
        }
    }

    /// Blacklist a known URL, dated today. Returns false when the URL has
    /// never been recorded.
    pub fn blacklist(&self, url: &str, reason: &str) -> Result<bool> {
        let identity = normalize(url);
        let mark = BlacklistMark::new(self.clock.today(), reason);

        match self.store.set_blacklist(&identity.url_hash, Some(mark))? {
            Some(_) => {
                self.reporter.info(
                    COMPONENT,
                    &format!("blacklisted {} (reason: {})", url, reason),
                );
                Ok(true)
            }
            None => {
                self.reporter
                    .warn(COMPONENT, &format!("URL not found for blacklisting: {}", url));
                Ok(false)
            }
        }
    }

    /// Clear the blacklist state of a known URL. Returns false when unknown.
    pub fn unblacklist(&self, url: &str) -> Result<bool> {
        let identity = normalize(url);

        match self.store.set_blacklist(&identity.url_hash, None)? {
            Some(_) => {
                self.reporter
                    .info(COMPONENT, &format!("removed from blacklist: {}", url));
                Ok(true)
            }
            None => {
                self.reporter.warn(
                    COMPONENT,
                    &format!("URL not found for un-blacklisting: {}", url),
                );
                Ok(false)
            }
        }
    }

    /// Blacklist every active link not seen for more than
    /// `auto_blacklist_days`. Idempotent within a day.
    pub fn sweep_aged(&self) -> Result<Vec<Link>> {
        let today = self.clock.today();
        let cutoff = days_before(today, self.auto_blacklist_days);
        let mark = BlacklistMark::new(today, reasons::AUTO_AGED);

        let aged = self.store.blacklist_stale(cutoff, &mark)?;
        if !aged.is_empty() {
            self.reporter.info(
                COMPONENT,
                &format!(
                    "auto-blacklisted {} links older than {} days",
                    aged.len(),
                    self.auto_blacklist_days
                ),
            );
        }
        Ok(aged)
    }

    /// Run the sweep only when auto-blacklisting is enabled.
    pub fn sweep_if_enabled(&self) -> Result<usize> {
        if !self.auto_blacklist_enabled {
            return Ok(0);
        }
        Ok(self.sweep_aged()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::report::{Level, MemoryReporter};
    use crate::storage::{LinkFilter, MemoryLinkStore};
    use crate::types::LinkUpsert;
    use chrono::{Duration, NaiveDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn setup(config: LedgerConfig) -> (Arc<MemoryLinkStore>, BlacklistManager<MemoryLinkStore>, Arc<MemoryReporter>) {
        let store = Arc::new(MemoryLinkStore::new());
        let reporter = MemoryReporter::new();
        let manager = BlacklistManager::new(
            store.clone(),
            &config,
            Arc::new(FixedClock::on(today())),
            reporter.clone(),
        );
        (store, manager, reporter)
    }

    fn seed(store: &MemoryLinkStore, url: &str, last_seen: NaiveDate) {
        store
            .upsert_link(&LinkUpsert::new(url, normalize(url), last_seen))
            .unwrap();
    }

    #[test]
    fn test_blacklist_and_unblacklist_known_url() {
        let (store, manager, _) = setup(LedgerConfig::default());
        seed(&store, "https://example.com/a", today());

        assert!(manager.blacklist("https://EXAMPLE.com/a#x", "read").unwrap());
        let link = store
            .find_by_hash(&normalize("https://example.com/a").url_hash)
            .unwrap()
            .unwrap();
        assert_eq!(link.blacklisted_date(), Some(today()));
        assert_eq!(link.blacklist_reason(), Some("read"));

        assert!(manager.unblacklist("https://example.com/a").unwrap());
        assert_eq!(store.count_links(LinkFilter::new().blacklisted()).unwrap(), 0);
    }

    #[test]
    fn test_unknown_url_is_false_with_warning() {
        let (_, manager, reporter) = setup(LedgerConfig::default());
        assert!(!manager.blacklist("https://nowhere.example/", "read").unwrap());
        assert!(!manager.unblacklist("https://nowhere.example/").unwrap());
        assert_eq!(reporter.at_level(Level::Warn).len(), 2);
    }

    #[test]
    fn test_sweep_aged_marks_only_stale_active_links() {
        let (store, manager, _) = setup(LedgerConfig::default().with_auto_blacklist(true, 30));
        seed(&store, "https://example.com/fresh", today() - Duration::days(30));
        seed(&store, "https://example.com/stale", today() - Duration::days(31));

        let aged = manager.sweep_aged().unwrap();
        assert_eq!(aged.len(), 1);
        assert_eq!(aged[0].url, "https://example.com/stale");
        assert_eq!(aged[0].blacklist_reason(), Some(reasons::AUTO_AGED));

        // Second pass finds nothing new
        assert!(manager.sweep_aged().unwrap().is_empty());
    }

    #[test]
    fn test_sweep_keeps_existing_reason() {
        let (store, manager, _) = setup(LedgerConfig::default().with_auto_blacklist(true, 30));
        seed(&store, "https://example.com/old", today() - Duration::days(90));
        manager.blacklist("https://example.com/old", "not_interested").unwrap();

        manager.sweep_aged().unwrap();
        let link = store
            .find_by_hash(&normalize("https://example.com/old").url_hash)
            .unwrap()
            .unwrap();
        assert_eq!(link.blacklist_reason(), Some("not_interested"));
    }

    #[test]
    fn test_sweep_if_enabled_respects_flag() {
        let (store, manager, _) = setup(LedgerConfig::default());
        seed(&store, "https://example.com/stale", today() - Duration::days(100));
        assert_eq!(manager.sweep_if_enabled().unwrap(), 0);
        assert_eq!(store.count_links(LinkFilter::new().blacklisted()).unwrap(), 0);
    }
}
