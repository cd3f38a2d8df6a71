use crate::error::Result;
use crate::storage::filters::{ApplyOutcome, LinkFilter, RunFilter, StoreStats};
use crate::types::{
    Appearance, BlacklistMark, Link, LinkId, LinkUpsert, NewRun, Run, RunEntry, RunId,
    RunReceipt, UpsertOutcome,
};
use chrono::NaiveDate;

/// Persistent repository of links, runs and appearances.
///
/// Every method runs in a single transaction; a failed call leaves no
/// partial write behind.
pub trait LinkStore: Send + Sync {
    // === Link Operations ===

    /// Look a link up by its identity hash
    fn find_by_hash(&self, url_hash: &str) -> Result<Option<Link>>;

    /// Retrieve a link by ID
    fn get_link(&self, id: LinkId) -> Result<Option<Link>>;

    /// List links matching the filter, ordered by id
    fn list_links(&self, filter: LinkFilter) -> Result<Vec<Link>>;

    /// Count links matching the filter
    fn count_links(&self, filter: LinkFilter) -> Result<u64>;

    /// Insert with `seen_count = 1`, or increment `seen_count` and move
    /// `last_seen` forward on an existing hash.
    fn upsert_link(&self, upsert: &LinkUpsert) -> Result<UpsertOutcome>;

    // === Blacklist Operations ===

    /// Set or clear the blacklist state of one link.
    /// Returns `None` when the hash is unknown.
    fn set_blacklist(&self, url_hash: &str, mark: Option<BlacklistMark>) -> Result<Option<Link>>;

    /// Apply many marks at once. Unknown hashes are reported, not fatal.
    fn apply_blacklist_marks(&self, marks: &[(String, BlacklistMark)]) -> Result<ApplyOutcome>;

    /// Blacklist every active link with `last_seen < before`.
    /// Returns the newly blacklisted links.
    fn blacklist_stale(&self, before: NaiveDate, mark: &BlacklistMark) -> Result<Vec<Link>>;

    /// Clear every blacklist dated on or after `cutoff`.
    /// Returns the links as they were before clearing.
    fn clear_blacklisted_since(&self, cutoff: NaiveDate) -> Result<Vec<Link>>;

    // === Run Operations ===

    /// Insert the run, then upsert each entry's link and its appearance.
    fn record_run(&self, run: &NewRun, entries: &[RunEntry]) -> Result<RunReceipt>;

    /// Retrieve a run by ID
    fn get_run(&self, id: RunId) -> Result<Option<Run>>;

    /// List runs matching the filter, newest first
    fn list_runs(&self, filter: RunFilter) -> Result<Vec<Run>>;

    /// Hard-delete runs dated before `date` and their appearances.
    /// Returns the number of runs removed.
    fn delete_runs_before(&self, date: NaiveDate) -> Result<u64>;

    // === Appearance Operations ===

    /// Returns false when the pair already exists.
    fn insert_appearance(&self, appearance: &Appearance) -> Result<bool>;

    fn appearances_for_link(&self, link_id: LinkId) -> Result<Vec<Appearance>>;

    fn appearances_for_run(&self, run_id: RunId) -> Result<Vec<Appearance>>;

    // === Maintenance ===

    fn stats(&self) -> Result<StoreStats>;

    /// Human-readable identifier of the backing store, recorded in snapshots.
    fn identifier(&self) -> String;
}
