use crate::error::{LedgerError, Result};
use crate::storage::filters::{ApplyOutcome, LinkFilter, RunFilter, StoreStats};
use crate::storage::traits::LinkStore;
use crate::types::{
    Appearance, BlacklistChange, BlacklistMark, Link, LinkId, LinkUpsert, NewRun, Run, RunEntry,
    RunId, RunReceipt, UpsertOutcome,
};
use chrono::NaiveDate;
use redb::{
    Database, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition,
    WriteTransaction,
};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Table definitions
const LINKS: TableDefinition<u64, &[u8]> = TableDefinition::new("links");
const RUNS: TableDefinition<u64, &[u8]> = TableDefinition::new("runs");
/// Keyed by `(link_id, run_id)`; the value is the encoded position.
const APPEARANCES: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("appearances");

// Secondary indexes
const LINKS_BY_HASH: TableDefinition<&str, u64> = TableDefinition::new("links_by_hash");
const LINKS_BY_DOMAIN: MultimapTableDefinition<&str, u64> =
    MultimapTableDefinition::new("links_by_domain");
/// ISO date of the blacklist mark → link id. A link is blacklisted iff it
/// appears here.
const BLACKLISTED_BY_DATE: MultimapTableDefinition<&str, u64> =
    MultimapTableDefinition::new("blacklisted_by_date");
const RUNS_BY_DATE: MultimapTableDefinition<&str, u64> =
    MultimapTableDefinition::new("runs_by_date");
const APPEARANCES_BY_RUN: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("appearances_by_run");

// Metadata table
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_VERSION_KEY: &str = "schema_version";
const NEXT_LINK_ID_KEY: &str = "seq:link";
const NEXT_RUN_ID_KEY: &str = "seq:run";

/// Redb-based link store
#[derive(Debug)]
pub struct RedbLinkStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbLinkStore {
    /// Open or create a store at the given path.
    ///
    /// Fails with a retryable [`LedgerError::StorageUnavailable`] when another
    /// handle already holds the file lock.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LedgerError::StorageUnavailable {
                    path: path.clone(),
                    reason: format!("failed to create directory: {}", e),
                })?;
            }
        }

        let is_new = !path.exists();
        let db = Database::create(&path).map_err(|e| match LedgerError::from(e) {
            LedgerError::StorageUnavailable { reason, .. } => LedgerError::StorageUnavailable {
                path: path.clone(),
                reason,
            },
            other => other,
        })?;

        if !is_new {
            Self::check_schema_version(&db)?;
        }

        // Ensure tables exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LINKS)?;
            let _ = write_txn.open_table(RUNS)?;
            let _ = write_txn.open_table(APPEARANCES)?;
            let _ = write_txn.open_table(LINKS_BY_HASH)?;
            let _ = write_txn.open_multimap_table(LINKS_BY_DOMAIN)?;
            let _ = write_txn.open_multimap_table(BLACKLISTED_BY_DATE)?;
            let _ = write_txn.open_multimap_table(RUNS_BY_DATE)?;
            let _ = write_txn.open_multimap_table(APPEARANCES_BY_RUN)?;
            let mut meta = write_txn.open_table(META)?;
            if is_new {
                meta.insert(SCHEMA_VERSION_KEY, CURRENT_SCHEMA_VERSION.to_string().as_bytes())?;
            }
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Check schema version. Returns error if migration is needed.
    fn check_schema_version(db: &Database) -> Result<()> {
        let read_txn = db.begin_read()?;
        let version = {
            let table = read_txn.open_table(META).ok();
            table
                .and_then(|t| {
                    t.get(SCHEMA_VERSION_KEY).ok().flatten().and_then(|v| {
                        std::str::from_utf8(v.value())
                            .ok()
                            .and_then(|s| s.parse::<u32>().ok())
                    })
                })
                .unwrap_or(CURRENT_SCHEMA_VERSION)
        };

        match version.cmp(&CURRENT_SCHEMA_VERSION) {
            std::cmp::Ordering::Equal => Ok(()),
            std::cmp::Ordering::Less => Err(LedgerError::Validation(format!(
                "Store schema v{} is older than current v{}. Export and re-import the ledger.",
                version, CURRENT_SCHEMA_VERSION
            ))),
            std::cmp::Ordering::Greater => Err(LedgerError::Validation(format!(
                "Store schema v{} is newer than this binary v{}. Upgrade linkledger.",
                version, CURRENT_SCHEMA_VERSION
            ))),
        }
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_u64(bytes: &[u8]) -> u64 {
        <[u8; 8]>::try_from(bytes)
            .map(u64::from_le_bytes)
            .unwrap_or(0)
    }

    fn next_id(txn: &WriteTransaction, key: &str) -> Result<u64> {
        let mut meta = txn.open_table(META)?;
        let current = meta
            .get(key)?
            .map(|v| Self::decode_u64(v.value()))
            .unwrap_or(0);
        let next = current + 1;
        meta.insert(key, next.to_le_bytes().as_slice())?;
        Ok(next)
    }

    fn date_key(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    fn read_link<T>(table: &T, id: LinkId) -> Result<Option<Link>>
    where
        T: ReadableTable<u64, &'static [u8]>,
    {
        match table.get(id)? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn read_run<T>(table: &T, id: RunId) -> Result<Option<Run>>
    where
        T: ReadableTable<u64, &'static [u8]>,
    {
        match table.get(id)? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn lookup_hash<T>(table: &T, url_hash: &str) -> Result<Option<LinkId>>
    where
        T: ReadableTable<&'static str, u64>,
    {
        Ok(table.get(url_hash)?.map(|g| g.value()))
    }

    fn load_by_hash(txn: &WriteTransaction, url_hash: &str) -> Result<Option<Link>> {
        let id = {
            let index = txn.open_table(LINKS_BY_HASH)?;
            let id = Self::lookup_hash(&index, url_hash)?;
            id
        };
        let Some(id) = id else {
            return Ok(None);
        };

        let links = txn.open_table(LINKS)?;
        let link = Self::read_link(&links, id)?;
        link.map(Some).ok_or_else(|| {
            LedgerError::Validation(format!("hash index points at missing link {}", id))
        })
    }

    /// Write a link row and keep every index in step with it.
    fn write_link(txn: &WriteTransaction, link: &Link, old: Option<&Link>) -> Result<()> {
        link.validate().map_err(LedgerError::Validation)?;

        let bytes = bincode::serialize(link)?;
        {
            let mut links = txn.open_table(LINKS)?;
            links.insert(link.id, bytes.as_slice())?;
        }

        if old.is_none() {
            {
                let mut by_hash = txn.open_table(LINKS_BY_HASH)?;
                by_hash.insert(link.url_hash.as_str(), link.id)?;
            }
            {
                let mut by_domain = txn.open_multimap_table(LINKS_BY_DOMAIN)?;
                by_domain.insert(link.domain.as_str(), link.id)?;
            }
        }

        let old_date = old.and_then(|o| o.blacklisted_date());
        let new_date = link.blacklisted_date();
        if old_date != new_date {
            let mut by_date = txn.open_multimap_table(BLACKLISTED_BY_DATE)?;
            if let Some(date) = old_date {
                by_date.remove(Self::date_key(date).as_str(), link.id)?;
            }
            if let Some(date) = new_date {
                by_date.insert(Self::date_key(date).as_str(), link.id)?;
            }
        }

        Ok(())
    }

    fn apply_change(link: &mut Link, change: &BlacklistChange) {
        match change {
            BlacklistChange::Keep => {}
            BlacklistChange::Set(mark) => link.blacklist = Some(mark.clone()),
            BlacklistChange::Clear => link.blacklist = None,
        }
    }

    /// Read and update the row in memory. Writes nothing, so a failure here
    /// leaves the transaction clean.
    fn prepare_upsert(
        txn: &WriteTransaction,
        upsert: &LinkUpsert,
    ) -> Result<(Link, Option<Link>)> {
        let old = Self::load_by_hash(txn, &upsert.identity.url_hash)?;
        let mut link = match &old {
            Some(old) => {
                let mut link = old.clone();
                link.touch(upsert.seen_on);
                link
            }
            // Id assigned on write
            None => Link::new(0, upsert.url.trim(), &upsert.identity, upsert.seen_on),
        };
        Self::apply_change(&mut link, &upsert.blacklist);
        link.validate().map_err(LedgerError::Validation)?;
        Ok((link, old))
    }

    fn commit_upsert(
        txn: &WriteTransaction,
        mut link: Link,
        old: Option<Link>,
    ) -> Result<UpsertOutcome> {
        let created = old.is_none();
        if created {
            link.id = Self::next_id(txn, NEXT_LINK_ID_KEY)?;
        }
        Self::write_link(txn, &link, old.as_ref())?;
        Ok(UpsertOutcome { link, created })
    }

    fn upsert_in(txn: &WriteTransaction, upsert: &LinkUpsert) -> Result<UpsertOutcome> {
        let (link, old) = Self::prepare_upsert(txn, upsert)?;
        Self::commit_upsert(txn, link, old)
    }

    fn insert_appearance_in(txn: &WriteTransaction, appearance: &Appearance) -> Result<bool> {
        let key = (appearance.link_id, appearance.run_id);
        {
            let table = txn.open_table(APPEARANCES)?;
            let exists = table.get(key)?.is_some();
            if exists {
                return Ok(false);
            }
        }

        let bytes = bincode::serialize(&appearance.position)?;
        {
            let mut table = txn.open_table(APPEARANCES)?;
            table.insert(key, bytes.as_slice())?;
        }
        {
            let mut by_run = txn.open_multimap_table(APPEARANCES_BY_RUN)?;
            by_run.insert(appearance.run_id, appearance.link_id)?;
        }
        Ok(true)
    }

    fn write_run(txn: &WriteTransaction, run: &Run, is_new: bool) -> Result<()> {
        let bytes = bincode::serialize(run)?;
        {
            let mut runs = txn.open_table(RUNS)?;
            runs.insert(run.id, bytes.as_slice())?;
        }
        if is_new {
            let mut by_date = txn.open_multimap_table(RUNS_BY_DATE)?;
            by_date.insert(Self::date_key(run.run_date).as_str(), run.id)?;
        }
        Ok(())
    }

    fn decode_position(bytes: &[u8]) -> Result<Option<u32>> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl LinkStore for RedbLinkStore {
    fn find_by_hash(&self, url_hash: &str) -> Result<Option<Link>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(LINKS_BY_HASH)?;
        let Some(id) = Self::lookup_hash(&index, url_hash)? else {
            return Ok(None);
        };
        let links = read_txn.open_table(LINKS)?;
        Self::read_link(&links, id)
    }

    fn get_link(&self, id: LinkId) -> Result<Option<Link>> {
        let read_txn = self.db.begin_read()?;
        let links = read_txn.open_table(LINKS)?;
        Self::read_link(&links, id)
    }

    fn list_links(&self, filter: LinkFilter) -> Result<Vec<Link>> {
        let read_txn = self.db.begin_read()?;
        let links_table = read_txn.open_table(LINKS)?;

        let mut links = Vec::new();

        // Narrow through an index where one applies
        let candidate_ids: Option<BTreeSet<LinkId>> = if filter.blacklisted_since.is_some()
            || filter.blacklisted == Some(true)
        {
            let by_date = read_txn.open_multimap_table(BLACKLISTED_BY_DATE)?;
            let since_key = filter.blacklisted_since.map(Self::date_key);
            let entries = match since_key {
                Some(ref key) => by_date.range(key.as_str()..)?,
                None => by_date.iter()?,
            };

            let mut ids = BTreeSet::new();
            for item in entries {
                let (_, values) = item?;
                for value in values {
                    ids.insert(value?.value());
                }
            }
            Some(ids)
        } else if let Some(ref domain) = filter.domain {
            let by_domain = read_txn.open_multimap_table(LINKS_BY_DOMAIN)?;
            let ids = by_domain
                .get(domain.as_str())?
                .map(|r| r.map(|g| g.value()))
                .collect::<std::result::Result<BTreeSet<_>, _>>()?;
            Some(ids)
        } else {
            None
        };

        match candidate_ids {
            Some(ids) => {
                for id in ids {
                    if let Some(link) = Self::read_link(&links_table, id)? {
                        if filter.matches(&link) {
                            links.push(link);
                        }
                    }
                }
            }
            None => {
                // Full table scan, already in id order
                for item in links_table.iter()? {
                    let (_, value) = item?;
                    let link: Link = bincode::deserialize(value.value())?;
                    if filter.matches(&link) {
                        links.push(link);
                    }
                }
            }
        }

        Ok(filter.paginate(links))
    }

    fn count_links(&self, filter: LinkFilter) -> Result<u64> {
        let filter = LinkFilter {
            limit: None,
            offset: None,
            ..filter
        };
        Ok(self.list_links(filter)?.len() as u64)
    }

    fn upsert_link(&self, upsert: &LinkUpsert) -> Result<UpsertOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = Self::upsert_in(&write_txn, upsert)?;
        write_txn.commit()?;
        Ok(outcome)
    }

    fn set_blacklist(&self, url_hash: &str, mark: Option<BlacklistMark>) -> Result<Option<Link>> {
        let write_txn = self.db.begin_write()?;
        let Some(old) = Self::load_by_hash(&write_txn, url_hash)? else {
            write_txn.abort()?;
            return Ok(None);
        };

        let mut link = old.clone();
        link.blacklist = mark;
        Self::write_link(&write_txn, &link, Some(&old))?;
        write_txn.commit()?;
        Ok(Some(link))
    }

    fn apply_blacklist_marks(&self, marks: &[(String, BlacklistMark)]) -> Result<ApplyOutcome> {
        let write_txn = self.db.begin_write()?;
        let mut outcome = ApplyOutcome::default();

        for (url_hash, mark) in marks {
            match Self::load_by_hash(&write_txn, url_hash)? {
                Some(old) => {
                    let mut link = old.clone();
                    link.blacklist = Some(mark.clone());
                    Self::write_link(&write_txn, &link, Some(&old))?;
                    outcome.applied += 1;
                }
                None => outcome.skipped.push(url_hash.clone()),
            }
        }

        write_txn.commit()?;
        Ok(outcome)
    }

    fn blacklist_stale(&self, before: NaiveDate, mark: &BlacklistMark) -> Result<Vec<Link>> {
        let write_txn = self.db.begin_write()?;

        let stale: Vec<Link> = {
            let links = write_txn.open_table(LINKS)?;
            let mut stale = Vec::new();
            for item in links.iter()? {
                let (_, value) = item?;
                let link: Link = bincode::deserialize(value.value())?;
                if !link.is_blacklisted() && link.last_seen < before {
                    stale.push(link);
                }
            }
            stale
        };

        let mut marked = Vec::with_capacity(stale.len());
        for old in stale {
            let mut link = old.clone();
            link.blacklist = Some(mark.clone());
            Self::write_link(&write_txn, &link, Some(&old))?;
            marked.push(link);
        }

        write_txn.commit()?;
        Ok(marked)
    }

    fn clear_blacklisted_since(&self, cutoff: NaiveDate) -> Result<Vec<Link>> {
        let write_txn = self.db.begin_write()?;

        let ids: Vec<LinkId> = {
            let by_date = write_txn.open_multimap_table(BLACKLISTED_BY_DATE)?;
            let key = Self::date_key(cutoff);
            let mut ids = Vec::new();
            for item in by_date.range(key.as_str()..)? {
                let (_, values) = item?;
                for value in values {
                    ids.push(value?.value());
                }
            }
            ids
        };

        let mut cleared = Vec::with_capacity(ids.len());
        for id in ids {
            let old = {
                let links = write_txn.open_table(LINKS)?;
                let old = Self::read_link(&links, id)?;
                old
            };
            let Some(old) = old else { continue };
            let mut link = old.clone();
            link.blacklist = None;
            Self::write_link(&write_txn, &link, Some(&old))?;
            cleared.push(old);
        }

        write_txn.commit()?;

        cleared.sort_by(|a, b| {
            b.blacklisted_date()
                .cmp(&a.blacklisted_date())
                .then(a.id.cmp(&b.id))
        });
        Ok(cleared)
    }

    fn record_run(&self, new_run: &NewRun, entries: &[RunEntry]) -> Result<RunReceipt> {
        let write_txn = self.db.begin_write()?;

        let id = Self::next_id(&write_txn, NEXT_RUN_ID_KEY)?;
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
        Self::write_run(&write_txn, &run, true)?;

        let mut links = Vec::with_capacity(entries.len());
        let mut appearances_inserted = 0;
        let mut failed = Vec::new();
        for entry in entries {
            let upsert = LinkUpsert::new(&entry.url, entry.identity.clone(), new_run.run_date);
            let (link, old) = match Self::prepare_upsert(&write_txn, &upsert) {
                Ok(prepared) => prepared,
                Err(e) if e.is_row_fault() => {
                    failed.push(entry.failure(e));
                    continue;
                }
                Err(e) => return Err(e),
            };
            let outcome = Self::commit_upsert(&write_txn, link, old)?;

            if outcome.created {
                run.new_links += 1;
            } else {
                run.existing_links += 1;
            }
            if outcome.link.is_blacklisted() {
                run.blacklisted_links += 1;
            }

            let appearance = Appearance {
                link_id: outcome.link.id,
                run_id: id,
                position: Some(entry.position),
            };
            if Self::insert_appearance_in(&write_txn, &appearance)? {
                appearances_inserted += 1;
            }
            links.push(outcome);
        }
        run.opened_links = links.len() as u32;

        Self::write_run(&write_txn, &run, false)?;
        write_txn.commit()?;

        Ok(RunReceipt {
            run,
            links,
            appearances_inserted,
            failed,
        })
    }

    fn get_run(&self, id: RunId) -> Result<Option<Run>> {
        let read_txn = self.db.begin_read()?;
        let runs = read_txn.open_table(RUNS)?;
        Self::read_run(&runs, id)
    }

    fn list_runs(&self, filter: RunFilter) -> Result<Vec<Run>> {
        let read_txn = self.db.begin_read()?;
        let runs_table = read_txn.open_table(RUNS)?;

        let mut runs = Vec::new();
        if let Some(date) = filter.on_date {
            let by_date = read_txn.open_multimap_table(RUNS_BY_DATE)?;
            for value in by_date.get(Self::date_key(date).as_str())? {
                if let Some(run) = Self::read_run(&runs_table, value?.value())? {
                    if filter.matches(&run) {
                        runs.push(run);
                    }
                }
            }
        } else {
            for item in runs_table.iter()? {
                let (_, value) = item?;
                let run: Run = bincode::deserialize(value.value())?;
                if filter.matches(&run) {
                    runs.push(run);
                }
            }
        }

        runs.sort_by(|a, b| b.run_date.cmp(&a.run_date).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            runs.truncate(limit);
        }
        Ok(runs)
    }

    fn delete_runs_before(&self, date: NaiveDate) -> Result<u64> {
        let write_txn = self.db.begin_write()?;

        let doomed: Vec<(String, RunId)> = {
            let by_date = write_txn.open_multimap_table(RUNS_BY_DATE)?;
            let key = Self::date_key(date);
            let mut doomed = Vec::new();
            for item in by_date.range(..key.as_str())? {
                let (day, values) = item?;
                let day = day.value().to_string();
                for value in values {
                    doomed.push((day.clone(), value?.value()));
                }
            }
            doomed
        };

        for (day, run_id) in &doomed {
            let link_ids: Vec<LinkId> = {
                let mut by_run = write_txn.open_multimap_table(APPEARANCES_BY_RUN)?;
                let removed = by_run
                    .remove_all(*run_id)?
                    .map(|r| r.map(|g| g.value()))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                removed
            };
            {
                let mut appearances = write_txn.open_table(APPEARANCES)?;
                for link_id in link_ids {
                    appearances.remove((link_id, *run_id))?;
                }
            }
            {
                let mut runs = write_txn.open_table(RUNS)?;
                runs.remove(*run_id)?;
            }
            {
                let mut by_date = write_txn.open_multimap_table(RUNS_BY_DATE)?;
                by_date.remove(day.as_str(), *run_id)?;
            }
        }

        write_txn.commit()?;
        Ok(doomed.len() as u64)
    }

    fn insert_appearance(&self, appearance: &Appearance) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        {
            let links = write_txn.open_table(LINKS)?;
            if links.get(appearance.link_id)?.is_none() {
                return Err(LedgerError::Validation(format!(
                    "appearance references missing link {}",
                    appearance.link_id
                )));
            }
            let runs = write_txn.open_table(RUNS)?;
            if runs.get(appearance.run_id)?.is_none() {
                return Err(LedgerError::Validation(format!(
                    "appearance references missing run {}",
                    appearance.run_id
                )));
            }
        }
        let inserted = Self::insert_appearance_in(&write_txn, appearance)?;
        write_txn.commit()?;
        Ok(inserted)
    }

    fn appearances_for_link(&self, link_id: LinkId) -> Result<Vec<Appearance>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(APPEARANCES)?;

        let mut result = Vec::new();
        for item in table.range((link_id, 0)..=(link_id, u64::MAX))? {
            let (key, value) = item?;
            let (link_id, run_id) = key.value();
            result.push(Appearance {
                link_id,
                run_id,
                position: Self::decode_position(value.value())?,
            });
        }
        Ok(result)
    }

    fn appearances_for_run(&self, run_id: RunId) -> Result<Vec<Appearance>> {
        let read_txn = self.db.begin_read()?;
        let by_run = read_txn.open_multimap_table(APPEARANCES_BY_RUN)?;
        let table = read_txn.open_table(APPEARANCES)?;

        let mut result = Vec::new();
        for value in by_run.get(run_id)? {
            let link_id = value?.value();
            if let Some(bytes) = table.get((link_id, run_id))? {
                result.push(Appearance {
                    link_id,
                    run_id,
                    position: Self::decode_position(bytes.value())?,
                });
            }
        }
        result.sort_by_key(|a| (a.position, a.link_id));
        Ok(result)
    }

    fn stats(&self) -> Result<StoreStats> {
        let read_txn = self.db.begin_read()?;

        let link_count = read_txn.open_table(LINKS)?.iter()?.count() as u64;
        let run_count = read_txn.open_table(RUNS)?.iter()?.count() as u64;
        let appearance_count = read_txn.open_table(APPEARANCES)?.iter()?.count() as u64;

        let mut blacklisted_count = 0u64;
        for item in read_txn.open_multimap_table(BLACKLISTED_BY_DATE)?.iter()? {
            let (_, values) = item?;
            blacklisted_count += values.count() as u64;
        }

        let mut links_by_domain = HashMap::new();
        for item in read_txn.open_multimap_table(LINKS_BY_DOMAIN)?.iter()? {
            let (domain, values) = item?;
            links_by_domain.insert(domain.value().to_string(), values.count() as u64);
        }

        let db_size_bytes = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StoreStats {
            link_count,
            blacklisted_count,
            run_count,
            appearance_count,
            links_by_domain,
            db_size_bytes,
        })
    }

    fn identifier(&self) -> String {
        self.path.display().to_string()
    }
}
