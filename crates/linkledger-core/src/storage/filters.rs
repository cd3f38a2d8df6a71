use crate::types::{Link, Run};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Filter criteria for querying links
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    pub blacklisted: Option<bool>,
    /// Only blacklisted links dated on or after this day. Implies `blacklisted`.
    pub blacklisted_since: Option<NaiveDate>,
    pub domain: Option<String>,
    /// Only links with `last_seen` strictly before this day.
    pub last_seen_before: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl LinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blacklisted(mut self) -> Self {
        self.blacklisted = Some(true);
        self
    }

    pub fn active(mut self) -> Self {
        self.blacklisted = Some(false);
        self
    }

    pub fn blacklisted_since(mut self, date: NaiveDate) -> Self {
        self.blacklisted = Some(true);
        self.blacklisted_since = Some(date);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn last_seen_before(mut self, date: NaiveDate) -> Self {
        self.last_seen_before = Some(date);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn matches(&self, link: &Link) -> bool {
        if let Some(wanted) = self.blacklisted {
            if link.is_blacklisted() != wanted {
                return false;
            }
        }

        if let Some(since) = self.blacklisted_since {
            match link.blacklisted_date() {
                Some(date) if date >= since => {}
                _ => return false,
            }
        }

        if let Some(ref domain) = self.domain {
            if link.domain != *domain {
                return false;
            }
        }

        if let Some(before) = self.last_seen_before {
            if link.last_seen >= before {
                return false;
            }
        }

        true
    }

    /// Apply offset and limit to an already ordered result.
    pub(crate) fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        let start = self.offset.unwrap_or(0);
        let take = self.limit.unwrap_or(usize::MAX);
        items.into_iter().skip(start).take(take).collect()
    }
}

/// Filter criteria for querying runs
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub on_date: Option<NaiveDate>,
    /// Runs dated on or after this day.
    pub since: Option<NaiveDate>,
    /// Runs dated strictly before this day.
    pub before: Option<NaiveDate>,
    pub fingerprint: Option<String>,
    pub limit: Option<usize>,
}

impl RunFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.on_date = Some(date);
        self
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.since = Some(date);
        self
    }

    pub fn before(mut self, date: NaiveDate) -> Self {
        self.before = Some(date);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, run: &Run) -> bool {
        if let Some(date) = self.on_date {
            if run.run_date != date {
                return false;
            }
        }
        if let Some(since) = self.since {
            if run.run_date < since {
                return false;
            }
        }
        if let Some(before) = self.before {
            if run.run_date >= before {
                return false;
            }
        }
        if let Some(ref fp) = self.fingerprint {
            if run.content_fingerprint.as_deref() != Some(fp.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Outcome of a bulk blacklist apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Hashes found and marked.
    pub applied: usize,
    /// Hashes with no matching link.
    pub skipped: Vec<String>,
}

/// Store statistics
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub link_count: u64,
    pub blacklisted_count: u64,
    pub run_count: u64,
    pub appearance_count: u64,
    pub links_by_domain: HashMap<String, u64>,
    pub db_size_bytes: u64,
}
