mod filters;
mod memory;
mod redb_store;
mod traits;

pub use filters::{ApplyOutcome, LinkFilter, RunFilter, StoreStats};
pub use memory::MemoryLinkStore;
pub use redb_store::{RedbLinkStore, CURRENT_SCHEMA_VERSION};
pub use traits::LinkStore;
