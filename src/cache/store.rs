//! `BuildCache` - the process-wide file metadata table.
//!
//! One writer role (the orchestrator); concurrent pipeline workers only
//! ever touch their own path's key, which `DashMap` shards per key.
//! Alongside the live table the cache keeps the snapshot restored at
//! startup ("previous"), used by the initial staleness check.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use super::entry::{FileEntry, ViewSpan};
use super::error::CacheError;
use super::failure::{ErrorRecord, PendingErrors};
use super::persist::{Snapshot, Throttle, read_snapshot, write_snapshot};
use crate::freshness::{self, ContentHash, Staleness, now_millis};
use crate::utils::path::rel_key;

/// Minimum time between two snapshot writes.
pub const SERIALIZE_INTERVAL: Duration = Duration::from_millis(200);

pub struct BuildCache {
    /// Project root; keys are paths relative to it
    root: PathBuf,
    files: DashMap<String, FileEntry>,
    previous: RwLock<FxHashMap<String, FileEntry>>,
    imports: Mutex<Vec<String>>,
    errors: Mutex<PendingErrors>,
    throttle: Mutex<Throttle>,
    /// Last snapshot write failed; every file counts as stale until one succeeds
    io_failed: AtomicBool,
}

impl BuildCache {
    /// Empty cache with no previous snapshot.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            files: DashMap::new(),
            previous: RwLock::new(FxHashMap::default()),
            imports: Mutex::new(Vec::new()),
            errors: Mutex::new(PendingErrors::new()),
            throttle: Mutex::new(Throttle::new(SERIALIZE_INTERVAL)),
            io_failed: AtomicBool::new(false),
        }
    }

    /// Open the cache for `root`, restoring the previous snapshot if any.
    ///
    /// A missing or unreadable snapshot yields an empty previous table
    /// (everything rebuilds); the read error is logged, not returned.
    pub fn open(root: &Path) -> Self {
        let cache = Self::new(root);
        match read_snapshot(root) {
            Ok(Some(snapshot)) => {
                crate::debug!("cache"; "restored {} entries", snapshot.files.len());
                cache.load_previous(snapshot);
            }
            Ok(None) => crate::debug!("cache"; "no previous snapshot"),
            Err(e) => crate::log!("cache"; "restore failed, rebuilding everything: {}", e),
        }
        cache
    }

    /// Build a cache whose previous table is `snapshot`.
    pub fn restore(root: &Path, snapshot: Snapshot) -> Self {
        let cache = Self::new(root);
        cache.load_previous(snapshot);
        cache
    }

    fn load_previous(&self, snapshot: Snapshot) {
        *self.imports.lock() = snapshot.imports;
        *self.previous.write() = snapshot.files.into_iter().collect();
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache key for a path: relative to the root, `/`-separated.
    pub fn key(&self, path: &Path) -> String {
        rel_key(&self.root, path)
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Ensure a live entry exists for `path`.
    pub fn add(&self, path: &Path) {
        self.files.entry(self.key(path)).or_default();
    }

    pub fn get(&self, path: &Path) -> Option<FileEntry> {
        self.files.get(&self.key(path)).map(|e| e.value().clone())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(&self.key(path))
    }

    /// Entry restored from disk at startup.
    pub fn get_previous(&self, path: &Path) -> Option<FileEntry> {
        self.previous.read().get(&self.key(path)).cloned()
    }

    /// Live entry if present, else the restored one.
    fn lookup_added(&self, key: &str) -> Option<u64> {
        if let Some(entry) = self.files.get(key) {
            return Some(entry.added);
        }
        self.previous.read().get(key).map(|e| e.added)
    }

    pub fn remove(&self, path: &Path) {
        let key = self.key(path);
        self.files.remove(&key);
        self.errors.lock().clear_for(&key);
        crate::debug!("cache"; "remove {}", key);
    }

    /// Copy the restored entry into the live table (fresh files skip the
    /// pipeline but must still be part of the next snapshot).
    pub fn restore_previous(&self, path: &Path) {
        let key = self.key(path);
        let Some(prev) = self.previous.read().get(&key).cloned() else {
            return;
        };
        self.files.entry(key).or_insert(prev);
    }

    pub fn paths(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.files.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    fn with_entry(&self, path: &Path, f: impl FnOnce(&mut FileEntry)) {
        let mut entry = self.files.entry(self.key(path)).or_default();
        f(entry.value_mut());
    }

    /// Record the hash and mtime seen at the start of a pipeline run.
    pub fn set_source(&self, path: &Path, hash: ContentHash, modified: u64) {
        self.with_entry(path, |e| {
            e.hash = Some(hash);
            e.modified = modified;
        });
    }

    pub fn set_views(&self, path: &Path, views: &[ViewSpan]) {
        self.with_entry(path, |e| e.views = views.to_vec());
    }

    pub fn set_internal(&self, path: &Path, internal: bool) {
        self.with_entry(path, |e| e.internal = internal);
    }

    /// Store the outside-view source; returns whether it differs from the
    /// previous one (a first snapshot counts as changed).
    pub fn set_outside_src(&self, path: &Path, outside: String) -> bool {
        let mut changed = true;
        self.with_entry(path, |e| {
            changed = e.outside_src.as_deref() != Some(outside.as_str());
            e.outside_src = Some(outside);
        });
        changed
    }

    // =========================================================================
    // Imports
    // =========================================================================

    /// Imports registered for the whole app (not owned by one file).
    pub fn set_imports(&self, imports: Vec<String>) {
        crate::debug!("cache"; "set imports {:?}", imports);
        *self.imports.lock() = imports;
    }

    pub fn set_file_imports(&self, path: &Path, imports: Vec<String>) {
        self.with_entry(path, |e| e.imports = imports);
    }

    /// Imports of one file, or with `None` the de-duplicated union of the
    /// global list and every file's list (global first, then by path).
    pub fn get_imports(&self, path: Option<&Path>) -> Vec<String> {
        if let Some(path) = path {
            return self
                .files
                .get(&self.key(path))
                .map(|e| e.imports.clone())
                .unwrap_or_default();
        }

        let mut seen = FxHashSet::default();
        let mut all = Vec::new();
        let mut push = |name: &String| {
            if seen.insert(name.clone()) {
                all.push(name.clone());
            }
        };

        self.imports.lock().iter().for_each(&mut push);
        for key in self.paths() {
            if let Some(entry) = self.files.get(&key) {
                entry.imports.iter().for_each(&mut push);
            }
        }
        all
    }

    // =========================================================================
    // Errors
    // =========================================================================

    pub fn add_error(&self, path: &Path, error: ErrorRecord) {
        self.with_entry(path, |e| e.error = Some(error.clone()));
        self.errors.lock().push(error);
    }

    /// First error still pending in any file.
    pub fn get_last_error(&self) -> Option<ErrorRecord> {
        self.errors.lock().first().cloned()
    }

    /// Drop the file's error ahead of a new run. Other state is kept.
    pub fn clear_error(&self, path: &Path) {
        let key = self.key(path);
        self.errors.lock().clear_for(&key);
        if let Some(mut entry) = self.files.get_mut(&key) {
            entry.error = None;
        }
    }

    /// Mark a successful build: clear the error, stamp `added`.
    pub fn update(&self, path: &Path) {
        self.clear_error(path);
        self.with_entry(path, |e| e.added = now_millis());
    }

    // =========================================================================
    // Staleness
    // =========================================================================

    /// Staleness of `source` given its output artifact.
    pub fn staleness(&self, source: &Path, output: &Path) -> Staleness {
        let added = if self.io_failed.load(Ordering::SeqCst) {
            None
        } else {
            self.lookup_added(&self.key(source))
        };
        freshness::check(source, output, added)
    }

    pub fn is_healthy(&self) -> bool {
        !self.io_failed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn snapshot(&self) -> Snapshot {
        let files: BTreeMap<_, _> = self
            .files
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        Snapshot::new(files, self.imports.lock().clone())
    }

    /// Write the snapshot now.
    pub fn persist(&self) -> Result<(), CacheError> {
        let result = write_snapshot(&self.root, &self.snapshot());
        self.io_failed.store(result.is_err(), Ordering::SeqCst);
        if result.is_ok() {
            self.throttle.lock().mark_written();
        }
        result
    }

    /// Throttled write: at most once per `SERIALIZE_INTERVAL`. Requests
    /// inside the window are deferred to `flush`.
    pub fn serialize(&self) {
        if !self.throttle.lock().request() {
            return;
        }
        self.persist_logged();
    }

    /// Run a deferred write if its window has reopened.
    pub fn flush(&self) {
        if self.throttle.lock().due() {
            self.persist_logged();
        }
    }

    /// Write any deferred snapshot regardless of the window (shutdown).
    pub fn flush_now(&self) {
        if self.throttle.lock().is_dirty() {
            self.persist_logged();
        }
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            crate::log!("cache"; "{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::persist::snapshot_path;
    use crate::freshness::StaleReason;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, BuildCache) {
        let dir = TempDir::new().unwrap();
        let cache = BuildCache::new(dir.path());
        (dir, cache)
    }

    fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_key_is_root_relative() {
        let (dir, cache) = setup();
        let path = dir.path().join("app").join("main.view");
        assert_eq!(cache.key(&path), "app/main.view");
    }

    #[test]
    fn test_add_get_remove() {
        let (dir, cache) = setup();
        let path = dir.path().join("app/main.view");
        assert!(cache.get(&path).is_none());

        cache.add(&path);
        cache.set_views(&path, &[ViewSpan::new("Main", 1, 3)]);
        assert_eq!(cache.get(&path).unwrap().view_names(), vec!["Main"]);

        cache.remove(&path);
        assert!(cache.get(&path).is_none());
    }

    #[test]
    fn test_imports_aggregate() {
        let (dir, cache) = setup();
        let a = dir.path().join("app/a.view");
        let b = dir.path().join("app/b.view");
        cache.set_imports(vec!["react".into()]);
        cache.set_file_imports(&a, vec!["lodash".into(), "react".into()]);
        cache.set_file_imports(&b, vec!["./util".into()]);

        assert_eq!(cache.get_imports(Some(&b)), vec!["./util"]);
        assert_eq!(cache.get_imports(None), vec!["react", "lodash", "./util"]);
    }

    #[test]
    fn test_errors_ordered_and_cleared_by_update() {
        let (dir, cache) = setup();
        let a = dir.path().join("app/a.view");
        let b = dir.path().join("app/b.view");
        cache.add_error(&a, ErrorRecord::new("app/a.view", "unclosed view", 1));
        cache.add_error(&b, ErrorRecord::new("app/b.view", "bad import", 2));

        assert_eq!(cache.get_last_error().unwrap().file, "app/a.view");
        assert!(cache.get(&a).unwrap().has_error());

        cache.update(&a);
        assert!(!cache.get(&a).unwrap().has_error());
        assert!(cache.get(&a).unwrap().added > 0);
        assert_eq!(cache.get_last_error().unwrap().file, "app/b.view");

        cache.update(&b);
        assert!(cache.get_last_error().is_none());
    }

    #[test]
    fn test_clear_error_keeps_entry_state() {
        let (dir, cache) = setup();
        let a = dir.path().join("app/a.view");
        cache.set_file_imports(&a, vec!["lib".into()]);
        cache.add_error(&a, ErrorRecord::new("app/a.view", "unclosed view", 1));

        cache.clear_error(&a);
        let entry = cache.get(&a).unwrap();
        assert!(!entry.has_error());
        assert_eq!(entry.imports, vec!["lib"]);
        assert_eq!(entry.added, 0);
        assert!(cache.get_last_error().is_none());

        // No entry is created for an unknown file
        let b = dir.path().join("app/b.view");
        cache.clear_error(&b);
        assert!(cache.get(&b).is_none());
    }

    #[test]
    fn test_outside_src_change_detection() {
        let (dir, cache) = setup();
        let path = dir.path().join("app/main.view");
        assert!(cache.set_outside_src(&path, "const a = 1".into()));
        assert!(!cache.set_outside_src(&path, "const a = 1".into()));
        assert!(cache.set_outside_src(&path, "const a = 2".into()));
    }

    #[test]
    fn test_unchanged_file_is_fresh_after_success() {
        let (dir, cache) = setup();
        let src = write(&dir, "app/main.view", "view Main {}");
        std::thread::sleep(Duration::from_millis(5));
        let out = write(&dir, ".hotview/out/app/main.js", "View.define()");

        cache.add(&src);
        cache.update(&src);

        assert_eq!(cache.staleness(&src, &out), Staleness::Fresh);
        assert_eq!(cache.staleness(&src, &out), Staleness::Fresh);
    }

    #[test]
    fn test_added_entry_without_success_is_stale() {
        let (dir, cache) = setup();
        let src = write(&dir, "app/main.view", "view Main {}");
        let out = write(&dir, ".hotview/out/app/main.js", "View.define()");

        cache.add(&src);
        assert_eq!(
            cache.staleness(&src, &out),
            Staleness::Stale(StaleReason::CacheOlder)
        );
    }

    #[test]
    fn test_round_trip_preserves_staleness() {
        let (dir, cache) = setup();
        let fresh = write(&dir, "app/fresh.view", "view A {}");
        let broken = write(&dir, "app/broken.view", "view B {");
        let unbuilt = write(&dir, "app/unbuilt.view", "view C {}");
        std::thread::sleep(Duration::from_millis(5));
        let fresh_out = write(&dir, "out/fresh.js", "");
        let broken_out = write(&dir, "out/broken.js", "");
        let unbuilt_out = dir.path().join("out/unbuilt.js");

        cache.add(&fresh);
        cache.update(&fresh);
        cache.add_error(&broken, ErrorRecord::new("app/broken.view", "unclosed", 1));
        cache.add(&unbuilt);

        let pairs = [
            (&fresh, &fresh_out),
            (&broken, &broken_out),
            (&unbuilt, &unbuilt_out),
        ];
        let before: Vec<_> = pairs.iter().map(|(s, o)| cache.staleness(s, o)).collect();

        cache.persist().unwrap();
        let restored = BuildCache::open(dir.path());
        let after: Vec<_> = pairs.iter().map(|(s, o)| restored.staleness(s, o)).collect();

        assert_eq!(before, after);
        assert_eq!(before[0], Staleness::Fresh);
    }

    #[test]
    fn test_restore_previous_copies_into_live() {
        let (dir, cache) = setup();
        let path = write(&dir, "app/main.view", "view Main {}");
        cache.set_views(&path, &[ViewSpan::new("Main", 1, 1)]);
        cache.update(&path);

        let restored = BuildCache::restore(dir.path(), cache.snapshot());
        assert!(restored.get(&path).is_none());
        assert!(restored.get_previous(&path).is_some());

        restored.restore_previous(&path);
        assert_eq!(restored.get(&path), cache.get(&path));
    }

    #[test]
    fn test_io_failure_forces_stale() {
        let (dir, cache) = setup();
        let src = write(&dir, "app/main.view", "view Main {}");
        std::thread::sleep(Duration::from_millis(5));
        let out = write(&dir, "out/main.js", "");
        cache.update(&src);
        assert!(cache.staleness(&src, &out).is_fresh());

        // Block the cache dir with a regular file so the write fails
        write(&dir, ".hotview", "not a directory");
        assert!(cache.persist().is_err());
        assert!(!cache.is_healthy());
        assert!(!cache.staleness(&src, &out).is_fresh());

        fs::remove_file(dir.path().join(".hotview")).unwrap();
        cache.persist().unwrap();
        assert!(cache.is_healthy());
        assert!(snapshot_path(dir.path()).exists());
    }

    #[test]
    fn test_serialize_is_throttled() {
        let (dir, cache) = setup();
        let path = dir.path().join("app/main.view");
        cache.add(&path);

        cache.serialize();
        let snapshot = snapshot_path(dir.path());
        assert!(snapshot.exists());
        fs::remove_file(&snapshot).unwrap();

        // Inside the window: deferred
        cache.serialize();
        assert!(!snapshot.exists());

        cache.flush_now();
        assert!(snapshot.exists());
    }
}
