//! Artifact writes.
//!
//! Files are processed concurrently and may finish out of order. Every
//! pipeline run takes a start stamp; a write goes through only if no run
//! that started later has already written the same path.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::error::CompileError;

/// Monotonic run stamp, ordered by pipeline start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunStamp(u64);

#[derive(Default)]
pub struct WriteGuard {
    next: AtomicU64,
    /// Output path -> stamp of the run that last wrote it
    last_saved: DashMap<PathBuf, RunStamp>,
}

impl WriteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp for a run starting now.
    pub fn begin(&self) -> RunStamp {
        RunStamp(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Claim `path` for a run. False if a later run already wrote it.
    pub fn claim(&self, path: &Path, stamp: RunStamp) -> bool {
        let mut entry = self.last_saved.entry(path.to_path_buf()).or_insert(stamp);
        if *entry > stamp {
            return false;
        }
        *entry = stamp;
        true
    }

    pub fn forget(&self, path: &Path) {
        self.last_saved.remove(path);
    }
}

/// Write an artifact, creating parent directories.
pub fn write_artifact(path: &Path, code: &str) -> Result<(), CompileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
    }
    fs::write(path, code).map_err(|e| CompileError::io(path, e))
}

/// Remove an artifact; a missing file is not an error.
pub fn remove_artifact(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_late_finisher_of_older_run_is_dropped() {
        let guard = WriteGuard::new();
        let path = Path::new("/out/main.js");
        let older = guard.begin();
        let newer = guard.begin();

        assert!(guard.claim(path, newer));
        assert!(!guard.claim(path, older));
        assert!(guard.claim(path, newer));
    }

    #[test]
    fn test_in_order_runs_both_write() {
        let guard = WriteGuard::new();
        let path = Path::new("/out/main.js");
        let first = guard.begin();
        assert!(guard.claim(path, first));
        let second = guard.begin();
        assert!(guard.claim(path, second));
    }

    #[test]
    fn test_paths_independent() {
        let guard = WriteGuard::new();
        let older = guard.begin();
        let newer = guard.begin();
        assert!(guard.claim(Path::new("/out/a.js"), newer));
        assert!(guard.claim(Path::new("/out/b.js"), older));
    }

    #[test]
    fn test_write_and_remove_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/main.js");
        write_artifact(&path, "View.define()").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "View.define()");
        assert!(remove_artifact(&path).unwrap());
        assert!(!remove_artifact(&path).unwrap());
    }
}
