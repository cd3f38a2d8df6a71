use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("Database error: {0}")]
    Database(redb::DatabaseError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage operation error: {0}")]
    StorageOperation(#[from] redb::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file could not be opened or locked (another process holds it).
    #[error("Store unavailable at {path}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(PathBuf),

    #[error("Invalid snapshot {path}: {reason}")]
    SnapshotInvalid { path: PathBuf, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl LedgerError {
    /// Lock-acquisition failures may succeed if the caller tries again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::StorageUnavailable { .. })
    }

    /// Faults confined to one row (undecodable or inconsistent), as opposed
    /// to the store itself failing.
    pub(crate) fn is_row_fault(&self) -> bool {
        matches!(
            self,
            LedgerError::Serialization(_) | LedgerError::Validation(_)
        )
    }

    pub(crate) fn snapshot_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        LedgerError::SnapshotInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<redb::DatabaseError> for LedgerError {
    fn from(e: redb::DatabaseError) -> Self {
        match e {
            redb::DatabaseError::DatabaseAlreadyOpen => LedgerError::StorageUnavailable {
                path: PathBuf::new(),
                reason: "database is locked by another handle or process".into(),
            },
            other => LedgerError::Database(other),
        }
    }
}

/// Why a single URL inside a batch was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ItemError {
    #[error("empty URL")]
    Empty,

    #[error("malformed URL: {0}")]
    Malformed(String),

    /// The stored row for this URL could not be read or updated.
    #[error("rejected by store: {0}")]
    Rejected(String),
}

/// A per-item failure inside a batch operation. Collected, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// 1-based position of the URL in the input sequence.
    pub position: usize,
    pub url: String,
    pub error: ItemError,
}
