mod engine;
mod snapshot;

pub use engine::{BlacklistEntry, RestoreOutcome, RewindEngine, RewindOutcome, RewindPreview};
pub(crate) use engine::entries_newest_first;
pub use snapshot::{sidecar_path, Snapshot, SnapshotEntry, SNAPSHOT_VERSION};
