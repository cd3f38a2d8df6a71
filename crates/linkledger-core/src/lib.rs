pub mod types;
pub mod storage;
pub mod error;
pub mod identity;
pub mod clock;
pub mod config;
pub mod report;
pub mod rules;
pub mod admission;
pub mod recorder;
pub mod blacklist;
pub mod rewind;
pub mod retention;
pub mod insights;
pub mod api;

pub use error::{ItemError, ItemFailure, LedgerError, Result};
pub use types::*;
pub use identity::{extract_domain, hash_url, normalize, UrlIdentity, UNKNOWN_DOMAIN};
pub use storage::{
    ApplyOutcome, LinkFilter, LinkStore, MemoryLinkStore, RedbLinkStore, RunFilter, StoreStats,
    CURRENT_SCHEMA_VERSION,
};
pub use clock::{days_before, Clock, FixedClock, SystemClock};
pub use config::LedgerConfig;
pub use report::{default_reporter, Level, LogReporter, MemoryReporter, Reporter};
pub use rules::{BlacklistRules, RuleHit};
pub use admission::{
    AdmissionAnalyzer, Analysis, AnalysisStats, BlockKind, BlockedUrl, Candidate,
};
pub use recorder::{RecordReport, RunRecorder};
pub use blacklist::BlacklistManager;
pub use rewind::{
    BlacklistEntry, RestoreOutcome, RewindEngine, RewindOutcome, RewindPreview, Snapshot,
    SnapshotEntry,
};
pub use retention::{RetentionEngine, SweepOutcome};
pub use insights::{
    BlacklistStats, DailyActivity, DomainCount, ExportDocument, ExportedLink, Insights,
    LedgerStats, ReasonCount,
};
pub use api::Ledger;
