//! Persists confirmed opens. The only component that creates links and runs.

use crate::blacklist::BlacklistManager;
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::{ItemFailure, Result};
use crate::identity::normalize;
use crate::report::Reporter;
use crate::storage::{LinkStore, RunFilter};
use crate::types::{NewRun, Run, RunEntry};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

const COMPONENT: &str = "recorder";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordReport {
    /// Links written, counting each distinct URL once.
    pub recorded_count: usize,
    pub new_links: usize,
    pub existing_links: usize,
    /// Repeats of a URL already recorded in this batch.
    pub duplicates: usize,
    pub failed: Vec<ItemFailure>,
    /// Links blacklisted by the age sweep before recording.
    pub auto_blacklisted_aged: usize,
    /// `None` when there was nothing to record.
    pub run: Option<Run>,
}

pub struct RunRecorder<S: LinkStore> {
    store: Arc<S>,
    ager: BlacklistManager<S>,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
}

impl<S: LinkStore> RunRecorder<S> {
    pub fn new(
        store: Arc<S>,
        config: &LedgerConfig,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let ager = BlacklistManager::new(store.clone(), config, clock.clone(), reporter.clone());
        Self {
            store,
            ager,
            clock,
            reporter,
        }
    }

    /// Record URLs the executor confirmed as opened.
    ///
    /// Malformed entries, and entries whose stored row is unusable, are
    /// reported and skipped. The rest are written in a single transaction
    /// together with the run row.
    pub fn record<I, T>(&self, opened: I, content_fingerprint: Option<&str>) -> Result<RecordReport>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let urls: Vec<String> = opened.into_iter().map(|u| u.as_ref().to_string()).collect();
        let mut report = RecordReport::default();

        if urls.is_empty() {
            self.reporter.info(COMPONENT, "no links to record as opened");
            return Ok(report);
        }

        report.auto_blacklisted_aged = self.ager.sweep_if_enabled()?;

        let mut entries = Vec::with_capacity(urls.len());
        let mut seen = HashSet::new();
        for (index, url) in urls.iter().enumerate() {
            let position = index + 1;
            let identity = normalize(url);
            if let Err(error) = identity.validate(url) {
                self.reporter.error(
                    COMPONENT,
                    &format!("error recording opened link #{} {:?}: {}", position, url, error),
                );
                report.failed.push(ItemFailure {
                    position,
                    url: url.clone(),
                    error,
                });
                continue;
            }
            if !seen.insert(identity.url_hash.clone()) {
                report.duplicates += 1;
                continue;
            }
            entries.push(RunEntry {
                url: url.trim().to_string(),
                identity,
                position: position as u32,
            });
        }

        let notes = if report.failed.is_empty() {
            None
        } else {
            Some(format!("{} URLs skipped as malformed", report.failed.len()))
        };
        let mut run = NewRun::new(self.clock.today(), urls.len() as u32)
            .with_fingerprint(content_fingerprint.map(str::to_string))
            .with_notes(notes);
        run.run_time = self.clock.now();

        let receipt = self.store.record_run(&run, &entries)?;
        for failure in &receipt.failed {
            self.reporter.error(
                COMPONENT,
                &format!(
                    "error recording opened link #{} {:?}: {}",
                    failure.position, failure.url, failure.error
                ),
            );
        }
        report.failed.extend(receipt.failed);
        report.failed.sort_by_key(|f| f.position);

        report.recorded_count = receipt.links.len();
        report.new_links = receipt.links.iter().filter(|o| o.created).count();
        report.existing_links = report.recorded_count - report.new_links;
        report.run = Some(receipt.run);

        self.reporter.info(
            COMPONENT,
            &format!(
                "recorded {} successfully opened links ({} new, {} existing)",
                report.recorded_count, report.new_links, report.existing_links
            ),
        );
        if report.auto_blacklisted_aged > 0 {
            self.reporter.info(
                COMPONENT,
                &format!(
                    "auto-blacklisted {} old links during cleanup",
                    report.auto_blacklisted_aged
                ),
            );
        }

        Ok(report)
    }

    /// False when a run recorded today already carries this fingerprint.
    pub fn content_changed(&self, content_fingerprint: &str) -> Result<bool> {
        let runs = self.store.list_runs(
            RunFilter::new()
                .on_date(self.clock.today())
                .with_fingerprint(content_fingerprint)
                .with_limit(1),
        )?;
        Ok(runs.is_empty())
    }
}
