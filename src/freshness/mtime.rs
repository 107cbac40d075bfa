//! Modification-time helpers.
//!
//! Timestamps are compared as milliseconds since the Unix epoch so that a
//! persisted cache entry (`added`) and a live file mtime use one scale.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Modification time of a file, `None` if it cannot be stat'd.
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

pub fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn now_millis() -> u64 {
    millis_since_epoch(SystemTime::now())
}
