use crate::clock::{days_before, Clock};
use crate::error::{LedgerError, Result};
use crate::report::Reporter;
use crate::storage::LinkStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

const COMPONENT: &str = "retention";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepOutcome {
    pub cutoff_date: NaiveDate,
    pub runs_deleted: u64,
}

/// Drops old run history. Links are never deleted; only runs and the
/// appearances that point at them.
pub struct RetentionEngine<S: LinkStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
}

impl<S: LinkStore> RetentionEngine<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            store,
            clock,
            reporter,
        }
    }

    /// Delete runs dated before `today - days_to_keep`.
    pub fn sweep(&self, days_to_keep: u32) -> Result<SweepOutcome> {
        if days_to_keep == 0 {
            return Err(LedgerError::Validation(
                "days_to_keep must be at least 1".into(),
            ));
        }

        let cutoff_date = days_before(self.clock.today(), days_to_keep);
        let runs_deleted = self.store.delete_runs_before(cutoff_date)?;

        self.reporter.info(
            COMPONENT,
            &format!(
                "cleaned up {} runs older than {} days",
                runs_deleted, days_to_keep
            ),
        );

        Ok(SweepOutcome {
            cutoff_date,
            runs_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::identity::normalize;
    use crate::report::MemoryReporter;
    use crate::storage::{LinkFilter, MemoryLinkStore, RunFilter};
    use crate::types::{NewRun, RunEntry};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn record_on(store: &MemoryLinkStore, date: NaiveDate, url: &str) {
        let entry = RunEntry {
            url: url.to_string(),
            identity: normalize(url),
            position: 1,
        };
        store.record_run(&NewRun::new(date, 1), &[entry]).unwrap();
    }

    #[test]
    fn test_sweep_deletes_only_old_runs() {
        let store = Arc::new(MemoryLinkStore::new());
        record_on(&store, days_before(today(), 120), "https://example.com/old");
        record_on(&store, days_before(today(), 90), "https://example.com/edge");
        record_on(&store, days_before(today(), 1), "https://example.com/new");

        let engine = RetentionEngine::new(
            store.clone(),
            Arc::new(FixedClock::on(today())),
            MemoryReporter::new(),
        );
        let outcome = engine.sweep(90).unwrap();
        assert_eq!(outcome.runs_deleted, 1);
        assert_eq!(outcome.cutoff_date, days_before(today(), 90));

        assert_eq!(store.list_runs(RunFilter::new()).unwrap().len(), 2);
        // Links survive their runs
        assert_eq!(store.count_links(LinkFilter::new()).unwrap(), 3);
        let old = store
            .find_by_hash(&normalize("https://example.com/old").url_hash)
            .unwrap()
            .unwrap();
        assert!(store.appearances_for_link(old.id).unwrap().is_empty());
    }

    #[test]
    fn test_zero_days_rejected() {
        let store = Arc::new(MemoryLinkStore::new());
        let engine = RetentionEngine::new(
            store,
            Arc::new(FixedClock::on(today())),
            MemoryReporter::new(),
        );
        assert!(matches!(engine.sweep(0), Err(LedgerError::Validation(_))));
    }
}
