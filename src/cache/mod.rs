//! Build cache: per-file metadata that survives process restarts.
//!
//! - `entry` - `FileEntry` (hash, views, imports, outside source, error, added)
//! - `failure` - ordered pending compile errors
//! - `persist` - snapshot format, disk IO and write throttling
//! - `store` - `BuildCache`, the shared table the orchestrator writes

mod entry;
mod error;
mod failure;
mod persist;
mod store;

/// Cache directory name (inside project root)
pub(crate) const CACHE_DIR: &str = ".hotview/cache";

pub use entry::{FileEntry, ViewSpan};
pub use error::CacheError;
pub use failure::{ErrorRecord, PendingErrors};
pub use persist::{SNAPSHOT_FILE, Snapshot, Throttle};
pub use store::{BuildCache, SERIALIZE_INTERVAL};
