use crate::error::{ItemError, ItemFailure, LedgerError};
use crate::identity::UrlIdentity;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Type alias for link identifiers
pub type LinkId = u64;

/// Type alias for run identifiers
pub type RunId = u64;

/// Well-known blacklist reasons.
pub mod reasons {
    /// Set by the age sweep.
    pub const AUTO_AGED: &str = "auto_aged";
    /// Host is in the configured domain blacklist.
    pub const DOMAIN_BLACKLISTED: &str = "domain_blacklisted";
    /// Opened inside the throttle window. Never stored.
    pub const RECENTLY_OPENED: &str = "recently opened";
    /// Default manual reason.
    pub const READ: &str = "read";
    /// Stand-in for a snapshot entry that carries no reason.
    pub const NOT_SPECIFIED: &str = "not specified";

    pub fn pattern_match(pattern: &str) -> String {
        format!("pattern_match:{}", pattern)
    }
}

/// Blacklist state of a link. Present iff the link is blacklisted, so a date
/// and a reason can never exist without each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlacklistMark {
    pub date: NaiveDate,
    pub reason: String,
}

impl BlacklistMark {
    pub fn new(date: NaiveDate, reason: impl Into<String>) -> Self {
        Self {
            date,
            reason: reason.into(),
        }
    }
}

/// One row per distinct normalized URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub id: LinkId,

    /// The URL as first recorded. Informational only.
    pub url: String,

    /// Identity key, unique across links.
    pub url_hash: String,

    pub domain: String,

    pub first_seen: NaiveDate,

    pub last_seen: NaiveDate,

    /// Number of recorded opens. Starts at 1, never decreases.
    pub seen_count: u64,

    pub blacklist: Option<BlacklistMark>,

    pub created_at: DateTime<Utc>,
}

impl Link {
    pub fn new(id: LinkId, url: impl Into<String>, identity: &UrlIdentity, seen_on: NaiveDate) -> Self {
        Self {
            id,
            url: url.into(),
            url_hash: identity.url_hash.clone(),
            domain: identity.domain.clone(),
            first_seen: seen_on,
            last_seen: seen_on,
            seen_count: 1,
            blacklist: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_blacklisted(&self) -> bool {
        self.blacklist.is_some()
    }

    pub fn blacklisted_date(&self) -> Option<NaiveDate> {
        self.blacklist.as_ref().map(|m| m.date)
    }

    pub fn blacklist_reason(&self) -> Option<&str> {
        self.blacklist.as_ref().map(|m| m.reason.as_str())
    }

    /// Record one more open on `date`. `last_seen` never moves backwards.
    pub fn touch(&mut self, date: NaiveDate) {
        self.seen_count += 1;
        if date > self.last_seen {
            self.last_seen = date;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("url must not be empty".into());
        }
        if self.url_hash.is_empty() {
            return Err("url_hash must not be empty".into());
        }
        if self.seen_count == 0 {
            return Err("seen_count must be at least 1".into());
        }
        if self.last_seen < self.first_seen {
            return Err(format!(
                "last_seen {} precedes first_seen {}",
                self.last_seen, self.first_seen
            ));
        }
        Ok(())
    }
}

/// One row per ingestion cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Run {
    pub id: RunId,
    pub run_date: NaiveDate,
    pub run_time: DateTime<Utc>,
    /// Opaque hash of the source content, stored for audit and change detection.
    pub content_fingerprint: Option<String>,
    pub links_found: u32,
    pub new_links: u32,
    pub existing_links: u32,
    pub blacklisted_links: u32,
    pub opened_links: u32,
    pub success: bool,
    pub notes: Option<String>,
}

/// A run before the store assigns its id. Counters are filled in by the
/// store from what it actually wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub run_date: NaiveDate,
    pub run_time: DateTime<Utc>,
    pub content_fingerprint: Option<String>,
    pub links_found: u32,
    pub success: bool,
    pub notes: Option<String>,
}

impl NewRun {
    pub fn new(run_date: NaiveDate, links_found: u32) -> Self {
        Self {
            run_date,
            run_time: Utc::now(),
            content_fingerprint: None,
            links_found,
            success: true,
            notes: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.content_fingerprint = fingerprint;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Join row between a link and a run. Unique per `(link_id, run_id)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appearance {
    pub link_id: LinkId,
    pub run_id: RunId,
    /// 1-based position within the run's input.
    pub position: Option<u32>,
}

/// What an upsert does to the blacklist fields of the target link.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BlacklistChange {
    #[default]
    Keep,
    Set(BlacklistMark),
    Clear,
}

/// Insert-or-update request keyed by `url_hash`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkUpsert {
    pub url: String,
    pub identity: UrlIdentity,
    pub seen_on: NaiveDate,
    pub blacklist: BlacklistChange,
}

impl LinkUpsert {
    pub fn new(url: impl Into<String>, identity: UrlIdentity, seen_on: NaiveDate) -> Self {
        Self {
            url: url.into(),
            identity,
            seen_on,
            blacklist: BlacklistChange::Keep,
        }
    }

    pub fn with_blacklist(mut self, change: BlacklistChange) -> Self {
        self.blacklist = change;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub link: Link,
    pub created: bool,
}

/// One confirmed-open URL inside a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEntry {
    pub url: String,
    pub identity: UrlIdentity,
    pub position: u32,
}

impl RunEntry {
    pub(crate) fn failure(&self, error: LedgerError) -> ItemFailure {
        ItemFailure {
            position: self.position as usize,
            url: self.url.clone(),
            error: ItemError::Rejected(error.to_string()),
        }
    }
}

/// What `record_run` wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReceipt {
    pub run: Run,
    /// Links touched, in entry order, one per recorded entry.
    pub links: Vec<UpsertOutcome>,
    pub appearances_inserted: usize,
    /// Entries whose stored row was unusable. The rest of the run is kept.
    pub failed: Vec<ItemFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::normalize;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_touch_is_monotonic() {
        let id = normalize("https://example.com/a");
        let mut link = Link::new(1, "https://example.com/a", &id, day(10));
        link.touch(day(12));
        link.touch(day(11));
        assert_eq!(link.seen_count, 3);
        assert_eq!(link.last_seen, day(12));
        assert_eq!(link.first_seen, day(10));
    }

    #[test]
    fn test_blacklist_accessors() {
        let id = normalize("https://example.com/a");
        let mut link = Link::new(1, "https://example.com/a", &id, day(10));
        assert!(!link.is_blacklisted());
        assert_eq!(link.blacklisted_date(), None);

        link.blacklist = Some(BlacklistMark::new(day(11), reasons::READ));
        assert!(link.is_blacklisted());
        assert_eq!(link.blacklisted_date(), Some(day(11)));
        assert_eq!(link.blacklist_reason(), Some("read"));
    }

    #[test]
    fn test_validate() {
        let id = normalize("https://example.com/a");
        let mut link = Link::new(1, "https://example.com/a", &id, day(10));
        assert!(link.validate().is_ok());

        link.seen_count = 0;
        assert!(link.validate().is_err());

        link.seen_count = 1;
        link.last_seen = day(9);
        assert!(link.validate().is_err());
    }

    #[test]
    fn test_pattern_reason_format() {
        assert_eq!(reasons::pattern_match("*/ads/*"), "pattern_match:*/ads/*");
    }
}
