use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::types::{ChangeKind, DebouncedEvents};
use crate::cache::BuildCache;
use crate::config::HotviewConfig;
use crate::utils::path::normalize_path;

/// Turns raw debounced changes into actionable ones.
///
/// correct_by_existence → recover_from_dir_events → filter_actionable
pub(super) struct EventClassifier;

impl EventClassifier {
    pub(super) fn classify(
        raw: FxHashMap<PathBuf, ChangeKind>,
        config: &HotviewConfig,
        cache: &BuildCache,
    ) -> Option<DebouncedEvents> {
        let mut changes = raw;

        Self::correct_by_existence(&mut changes);
        Self::recover_from_dir_events(&mut changes, config, cache);
        Self::filter_actionable(&mut changes, config, cache);

        if changes.is_empty() {
            return None;
        }
        Some(DebouncedEvents(changes.into_iter().collect()))
    }

    /// Atomic saves report `Removed` for files that exist again, and
    /// slow watchers report `Created` for files already gone.
    pub(super) fn correct_by_existence(changes: &mut FxHashMap<PathBuf, ChangeKind>) {
        changes.retain(|path, kind| {
            let exists = path.exists();
            match *kind {
                ChangeKind::Created if !exists => false,
                ChangeKind::Modified if !exists => {
                    *kind = ChangeKind::Removed;
                    true
                }
                ChangeKind::Removed if exists => {
                    *kind = ChangeKind::Modified;
                    true
                }
                _ => true,
            }
        });
    }

    /// Some backends only report the parent directory after a file is
    /// replaced. Diff such directories against the cache.
    fn recover_from_dir_events(
        changes: &mut FxHashMap<PathBuf, ChangeKind>,
        config: &HotviewConfig,
        cache: &BuildCache,
    ) {
        let dirs: Vec<PathBuf> = changes
            .iter()
            .filter(|(p, k)| **k == ChangeKind::Modified && p.is_dir())
            .map(|(p, _)| p.clone())
            .collect();
        if dirs.is_empty() {
            return;
        }

        let tracked: Vec<PathBuf> = cache.paths().iter().map(|key| config.root.join(key)).collect();
        for dir in &dirs {
            for source in tracked.iter().filter(|s| s.parent() == Some(dir.as_path())) {
                if !source.exists() && !changes.contains_key(source) {
                    crate::debug!("watch"; "dir-scan found missing: {}", source.display());
                    changes.insert(source.clone(), ChangeKind::Removed);
                }
            }
            Self::detect_appeared(dir, config, cache, changes);
        }
    }

    fn detect_appeared(
        dir: &Path,
        config: &HotviewConfig,
        cache: &BuildCache,
        changes: &mut FxHashMap<PathBuf, ChangeKind>,
    ) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = normalize_path(&entry.path());
            if path.is_file()
                && config.is_source(&path)
                && !cache.contains(&path)
                && !changes.contains_key(&path)
            {
                crate::debug!("watch"; "dir-scan found untracked: {}", path.display());
                changes.insert(path, ChangeKind::Created);
            }
        }
    }

    /// Keep view sources and the config file. A removal only counts for
    /// a source the cache still tracks.
    pub(super) fn filter_actionable(
        changes: &mut FxHashMap<PathBuf, ChangeKind>,
        config: &HotviewConfig,
        cache: &BuildCache,
    ) {
        let config_file = normalize_path(&config.config_path);
        changes.retain(|path, kind| {
            if *path == config_file {
                return *kind != ChangeKind::Removed;
            }
            if !config.is_source(path) {
                return false;
            }
            match kind {
                ChangeKind::Created | ChangeKind::Modified => path.is_file(),
                ChangeKind::Removed => {
                    let tracked = cache.contains(path);
                    if !tracked {
                        crate::debug!("watch"; "filter removed (not tracked): {}", path.display());
                    }
                    tracked
                }
            }
        });
    }
}
