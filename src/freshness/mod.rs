//! Freshness detection: content hash (blake3) for sources, mtime for the
//! output/cache staleness check.

mod hash;
pub mod mtime;
mod stale;

pub use hash::{ContentHash, compute_file_hash, hash_str};
pub use mtime::{get_mtime, millis_since_epoch, now_millis};
pub use stale::{StaleReason, Staleness, check};
