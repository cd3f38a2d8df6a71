//! On-disk blacklist snapshots.
//!
//! A snapshot is a pretty-printed JSON document written once with
//! `create_new` and never touched again. Each file gets a `.sha256` sidecar in
//! `sha256sum` format; restore refuses a file whose sidecar disagrees.

use crate::error::{LedgerError, Result};
use crate::types::{reasons, BlacklistMark, Link};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;
const SIDECAR_EXTENSION: &str = "sha256";
const MAX_NAME_ATTEMPTS: u32 = 1000;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// One blacklisted link as captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub url: String,
    pub url_hash: String,
    pub blacklisted_date: NaiveDate,
    /// Older snapshots may carry no reason.
    #[serde(default)]
    pub blacklist_reason: Option<String>,
    pub domain: String,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
    pub seen_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    /// RFC 3339 creation timestamp.
    pub backup_date: String,
    #[serde(alias = "database_path")]
    pub source_identifier: String,
    pub total_blacklisted: usize,
    pub blacklisted_links: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Capture the given blacklisted links. Active links are ignored.
    pub fn capture(links: &[Link], source_identifier: impl Into<String>, at: DateTime<Utc>) -> Self {
        let blacklisted_links: Vec<SnapshotEntry> = links
            .iter()
            .filter_map(|link| {
                let mark = link.blacklist.as_ref()?;
                Some(SnapshotEntry {
                    url: link.url.clone(),
                    url_hash: link.url_hash.clone(),
                    blacklisted_date: mark.date,
                    blacklist_reason: Some(mark.reason.clone()),
                    domain: link.domain.clone(),
                    first_seen: link.first_seen,
                    last_seen: link.last_seen,
                    seen_count: link.seen_count,
                })
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            backup_date: at.to_rfc3339(),
            source_identifier: source_identifier.into(),
            total_blacklisted: blacklisted_links.len(),
            blacklisted_links,
        }
    }

    /// The marks this snapshot re-applies, keyed by hash.
    pub fn marks(&self) -> Vec<(String, BlacklistMark)> {
        self.blacklisted_links
            .iter()
            .map(|entry| {
                let reason = entry
                    .blacklist_reason
                    .clone()
                    .unwrap_or_else(|| reasons::NOT_SPECIFIED.to_string());
                (
                    entry.url_hash.clone(),
                    BlacklistMark::new(entry.blacklisted_date, reason),
                )
            })
            .collect()
    }

    /// Write into `dir` as `blacklist_backup_YYYYmmdd_HHMMSS.json`, adding a
    /// numeric suffix instead of overwriting an existing file.
    pub fn write_new(&self, dir: &Path, at: DateTime<Utc>) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let stamp = at.with_timezone(&Local).format("%Y%m%d_%H%M%S").to_string();
        let body = serde_json::to_vec_pretty(self)?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("blacklist_backup_{}.json", stamp)
            } else {
                format!("blacklist_backup_{}_{}.json", stamp, attempt)
            };
            let path = dir.join(&name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(&body)?;
            file.sync_all()?;

            let sidecar = format!("{}  {}\n", digest(&body), name);
            std::fs::write(sidecar_path(&path), sidecar)?;
            return Ok(path);
        }

        Err(LedgerError::Validation(format!(
            "could not find a free snapshot name in {}",
            dir.display()
        )))
    }

    /// Read and validate a snapshot. Nothing is applied here.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LedgerError::SnapshotNotFound(path.to_path_buf()));
        }

        let body = std::fs::read(path)?;

        let sidecar = sidecar_path(path);
        if sidecar.exists() {
            let recorded = std::fs::read_to_string(&sidecar)?;
            let expected = recorded.split_whitespace().next().unwrap_or_default();
            if !expected.eq_ignore_ascii_case(&digest(&body)) {
                return Err(LedgerError::snapshot_invalid(path, "checksum mismatch"));
            }
        }

        let snapshot: Snapshot = serde_json::from_slice(&body)
            .map_err(|e| LedgerError::snapshot_invalid(path, e.to_string()))?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(LedgerError::snapshot_invalid(
                path,
                format!("unsupported snapshot version {}", snapshot.version),
            ));
        }
        if snapshot.total_blacklisted != snapshot.blacklisted_links.len() {
            return Err(LedgerError::snapshot_invalid(
                path,
                format!(
                    "header says {} links but {} are present",
                    snapshot.total_blacklisted,
                    snapshot.blacklisted_links.len()
                ),
            ));
        }
        if let Some(pos) = snapshot
            .blacklisted_links
            .iter()
            .position(|e| e.url_hash.trim().is_empty())
        {
            return Err(LedgerError::snapshot_invalid(
                path,
                format!("entry {} has no url_hash", pos + 1),
            ));
        }

        Ok(snapshot)
    }
}

/// `<file>.sha256`
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
