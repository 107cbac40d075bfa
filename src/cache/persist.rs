//! Snapshot format and disk IO.
//!
//! The whole table is written as one JSON document
//! (`.hotview/cache/build.json`). Writes go through a temp file and a
//! rename so a crash mid-write never leaves a torn snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::CACHE_DIR;
use super::entry::FileEntry;
use super::error::CacheError;

pub const SNAPSHOT_FILE: &str = "build.json";

/// Bumped when the snapshot layout changes; older snapshots are ignored.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Relative source path -> entry (sorted for stable output)
    pub files: BTreeMap<String, FileEntry>,
    /// Imports registered outside any single file
    #[serde(default)]
    pub imports: Vec<String>,
}

impl Snapshot {
    pub fn new(files: BTreeMap<String, FileEntry>, imports: Vec<String>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            files,
            imports,
        }
    }

    fn is_compatible(&self) -> bool {
        self.version == SNAPSHOT_VERSION
    }
}

pub(super) fn snapshot_path(root: &Path) -> PathBuf {
    root.join(CACHE_DIR).join(SNAPSHOT_FILE)
}

pub(super) fn write_snapshot(root: &Path, snapshot: &Snapshot) -> Result<(), CacheError> {
    let path = snapshot_path(root);
    let dir = root.join(CACHE_DIR);
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| CacheError::Io { path, source }
    };

    fs::create_dir_all(&dir).map_err(io_err(&dir))?;
    let json = serde_json::to_string(snapshot).map_err(CacheError::Serialize)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err(&tmp))?;
    fs::rename(&tmp, &path).map_err(io_err(&path))?;
    Ok(())
}

/// Read the snapshot. `Ok(None)` if none exists or it has an old layout.
pub(super) fn read_snapshot(root: &Path) -> Result<Option<Snapshot>, CacheError> {
    let path = snapshot_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path).map_err(|source| CacheError::Io {
        path: path.clone(),
        source,
    })?;
    let snapshot: Snapshot =
        serde_json::from_str(&json).map_err(|source| CacheError::Parse { path, source })?;

    Ok(snapshot.is_compatible().then_some(snapshot))
}

/// Bounds write amplification: at most one write per `interval`.
///
/// A request inside the window marks the throttle dirty; `due()` reports
/// when a deferred write may run.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
    dirty: bool,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            dirty: false,
        }
    }

    /// Request a write. Returns true if it may happen now.
    pub fn request(&mut self) -> bool {
        if self.window_open() {
            self.mark_written();
            true
        } else {
            self.dirty = true;
            false
        }
    }

    /// A deferred write is pending and the window has reopened.
    pub fn due(&self) -> bool {
        self.dirty && self.window_open()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_written(&mut self) {
        self.last = Some(Instant::now());
        self.dirty = false;
    }

    fn window_open(&self) -> bool {
        self.last.is_none_or(|t| t.elapsed() >= self.interval)
    }
}
