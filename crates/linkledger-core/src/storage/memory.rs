use crate::error::{LedgerError, Result};
use crate::storage::filters::{ApplyOutcome, LinkFilter, RunFilter, StoreStats};
use crate::storage::traits::LinkStore;
use crate::types::{
    Appearance, BlacklistChange, BlacklistMark, Link, LinkId, LinkUpsert, NewRun, Run, RunEntry,
    RunId, RunReceipt, UpsertOutcome,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Default)]
struct State {
    links: BTreeMap<LinkId, Link>,
    by_hash: HashMap<String, LinkId>,
    runs: BTreeMap<RunId, Run>,
    appearances: BTreeMap<(LinkId, RunId), Option<u32>>,
    next_link_id: u64,
    next_run_id: u64,
}

impl State {
    fn upsert(&mut self, upsert: &LinkUpsert) -> Result<UpsertOutcome> {
        let existing = self.by_hash.get(&upsert.identity.url_hash).copied();
        let (mut link, created) = match existing.and_then(|id| self.links.get(&id)) {
            Some(old) => {
                let mut link = old.clone();
                link.touch(upsert.seen_on);
                (link, false)
            }
            None => (
                Link::new(0, upsert.url.trim(), &upsert.identity, upsert.seen_on),
                true,
            ),
        };

        match &upsert.blacklist {
            BlacklistChange::Keep => {}
            BlacklistChange::Set(mark) => link.blacklist = Some(mark.clone()),
            BlacklistChange::Clear => link.blacklist = None,
        }
        link.validate().map_err(LedgerError::Validation)?;

        if created {
            self.next_link_id += 1;
            link.id = self.next_link_id;
        }
        self.by_hash.insert(link.url_hash.clone(), link.id);
        self.links.insert(link.id, link.clone());
        Ok(UpsertOutcome { link, created })
    }

    fn mark(&mut self, url_hash: &str, mark: Option<BlacklistMark>) -> Option<Link> {
        let id = *self.by_hash.get(url_hash)?;
        let link = self.links.get_mut(&id)?;
        link.blacklist = mark;
        Some(link.clone())
    }

    fn add_appearance(&mut self, appearance: &Appearance) -> bool {
        let key = (appearance.link_id, appearance.run_id);
        if self.appearances.contains_key(&key) {
            return false;
        }
        self.appearances.insert(key, appearance.position);
        true
    }
}

/// In-memory store with the same contract as the redb store. Multi-row
/// writes are staged on a copy and swapped in, so they stay atomic.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    state: RwLock<State>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| Self::poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| Self::poisoned())
    }

    fn poisoned() -> LedgerError {
        LedgerError::StorageUnavailable {
            path: PathBuf::from(":memory:"),
            reason: "state lock poisoned".into(),
        }
    }
}

impl LinkStore for MemoryLinkStore {
    fn find_by_hash(&self, url_hash: &str) -> Result<Option<Link>> {
        let state = self.read()?;
        Ok(state
            .by_hash
            .get(url_hash)
            .and_then(|id| state.links.get(id))
            .cloned())
    }

    fn get_link(&self, id: LinkId) -> Result<Option<Link>> {
        Ok(self.read()?.links.get(&id).cloned())
    }

    fn list_links(&self, filter: LinkFilter) -> Result<Vec<Link>> {
        let state = self.read()?;
        let links = state
            .links
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        Ok(filter.paginate(links))
    }

    fn count_links(&self, filter: LinkFilter) -> Result<u64> {
        let state = self.read()?;
        Ok(state.links.values().filter(|l| filter.matches(l)).count() as u64)
    }

    fn upsert_link(&self, upsert: &LinkUpsert) -> Result<UpsertOutcome> {
        let mut state = self.write()?;
        let mut staged = state.clone();
        let outcome = staged.upsert(upsert)?;
        *state = staged;
        Ok(outcome)
    }

    fn set_blacklist(&self, url_hash: &str, mark: Option<BlacklistMark>) -> Result<Option<Link>> {
        Ok(self.write()?.mark(url_hash, mark))
    }

    fn apply_blacklist_marks(&self, marks: &[(String, BlacklistMark)]) -> Result<ApplyOutcome> {
        let mut state = self.write()?;
        let mut outcome = ApplyOutcome::default();
        for (url_hash, mark) in marks {
            match state.mark(url_hash, Some(mark.clone())) {
                Some(_) => outcome.applied += 1,
                None => outcome.skipped.push(url_hash.clone()),
            }
        }
        Ok(outcome)
    }

    fn blacklist_stale(&self, before: NaiveDate, mark: &BlacklistMark) -> Result<Vec<Link>> {
        let mut state = self.write()?;
        let mut marked = Vec::new();
        for link in state.links.values_mut() {
            if !link.is_blacklisted() && link.last_seen < before {
                link.blacklist = Some(mark.clone());
                marked.push(link.clone());
            }
        }
        Ok(marked)
    }

    fn clear_blacklisted_since(&self, cutoff: NaiveDate) -> Result<Vec<Link>> {
        let mut state = self.write()?;
        let mut cleared = Vec::new();
        for link in state.links.values_mut() {
            if matches!(link.blacklisted_date(), Some(date) if date >= cutoff) {
                cleared.push(link.clone());
                link.blacklist = None;
            }
        }
        cleared.sort_by(|a, b| {
            b.blacklisted_date()
                .cmp(&a.blacklisted_date())
                .then(a.id.cmp(&b.id))
        });
        Ok(cleared)
    }

    fn record_run(&self, new_run: &NewRun, entries: &[RunEntry]) -> Result<RunReceipt> {
        let mut state = self.write()?;
        let mut staged = state.clone();

        staged.next_run_id += 1;
        let id = staged.next_run_id;
        let mut run = Run {
            id,
            run_date: new_run.run_date,
            run_time: new_run.run_time,
            content_fingerprint: new_run.content_fingerprint.clone(),
            links_found: new_run.links_found,
            new_links: 0,
            existing_links: 0,
            blacklisted_links: 0,
            opened_links: 0,
            success: new_run.success,
            notes: new_run.notes.clone(),
        };

        let mut links = Vec::with_capacity(entries.len());
        let mut appearances_inserted = 0;
        let mut failed = Vec::new();
        for entry in entries {
            let upsert = LinkUpsert::new(&entry.url, entry.identity.clone(), new_run.run_date);
            let outcome = match staged.upsert(&upsert) {
                Ok(outcome) => outcome,
                Err(e) if e.is_row_fault() => {
                    failed.push(entry.failure(e));
                    continue;
                }
                Err(e) => return Err(e),
            };
            if outcome.created {
                run.new_links += 1;
            } else {
                run.existing_links += 1;
            }
            if outcome.link.is_blacklisted() {
                run.blacklisted_links += 1;
            }
            if staged.add_appearance(&Appearance {
                link_id: outcome.link.id,
                run_id: id,
                position: Some(entry.position),
            }) {
                appearances_inserted += 1;
            }
            links.push(outcome);
        }
        run.opened_links = links.len() as u32;
        staged.runs.insert(id, run.clone());

        *state = staged;
        Ok(RunReceipt {
            run,
            links,
            appearances_inserted,
            failed,
        })
    }

    fn get_run(&self, id: RunId) -> Result<Option<Run>> {
        Ok(self.read()?.runs.get(&id).cloned())
    }

    fn list_runs(&self, filter: RunFilter) -> Result<Vec<Run>> {
        let state = self.read()?;
        let mut runs: Vec<Run> = state
            .runs
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.run_date.cmp(&a.run_date).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            runs.truncate(limit);
        }
        Ok(runs)
    }

    fn delete_runs_before(&self, date: NaiveDate) -> Result<u64> {
        let mut state = self.write()?;
        let doomed: Vec<RunId> = state
            .runs
            .values()
            .filter(|r| r.run_date < date)
            .map(|r| r.id)
            .collect();
        for id in &doomed {
            state.runs.remove(id);
        }
        state
            .appearances
            .retain(|(_, run_id), _| !doomed.contains(run_id));
        Ok(doomed.len() as u64)
    }

    fn insert_appearance(&self, appearance: &Appearance) -> Result<bool> {
        let mut state = self.write()?;
        if !state.links.contains_key(&appearance.link_id) {
            return Err(LedgerError::Validation(format!(
                "appearance references missing link {}",
                appearance.link_id
            )));
        }
        if !state.runs.contains_key(&appearance.run_id) {
            return Err(LedgerError::Validation(format!(
                "appearance references missing run {}",
                appearance.run_id
            )));
        }
        Ok(state.add_appearance(appearance))
    }

    fn appearances_for_link(&self, link_id: LinkId) -> Result<Vec<Appearance>> {
        let state = self.read()?;
        Ok(state
            .appearances
            .range((link_id, 0)..=(link_id, u64::MAX))
            .map(|(&(link_id, run_id), &position)| Appearance {
                link_id,
                run_id,
                position,
            })
            .collect())
    }

    fn appearances_for_run(&self, run_id: RunId) -> Result<Vec<Appearance>> {
        let state = self.read()?;
        let mut result: Vec<Appearance> = state
            .appearances
            .iter()
            .filter(|((_, r), _)| *r == run_id)
            .map(|(&(link_id, run_id), &position)| Appearance {
                link_id,
                run_id,
                position,
            })
            .collect();
        result.sort_by_key(|a| (a.position, a.link_id));
        Ok(result)
    }

    fn stats(&self) -> Result<StoreStats> {
        let state = self.read()?;
        let mut links_by_domain = HashMap::new();
        for link in state.links.values() {
            *links_by_domain.entry(link.domain.clone()).or_insert(0) += 1;
        }
        Ok(StoreStats {
            link_count: state.links.len() as u64,
            blacklisted_count: state.links.values().filter(|l| l.is_blacklisted()).count() as u64,
            run_count: state.runs.len() as u64,
            appearance_count: state.appearances.len() as u64,
            links_by_domain,
            db_size_bytes: 0,
        })
    }

    fn identifier(&self) -> String {
        ":memory:".to_string()
    }
}

#[cfg(test)]
impl MemoryLinkStore {
    /// Write an inconsistent row directly, bypassing validation.
    pub(crate) fn overwrite_first_seen(&self, url_hash: &str, date: NaiveDate) -> Result<()> {
        let mut state = self.write()?;
        if let Some(id) = state.by_hash.get(url_hash).copied() {
            if let Some(link) = state.links.get_mut(&id) {
                link.first_seen = date;
            }
        }
        Ok(())
    }
}
