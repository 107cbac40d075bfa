use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

/// Directories (and the config file) the watcher should cover.
///
/// A root that does not exist yet, or that was deleted and recreated,
/// is attached on the next `maintain` call.
pub(super) struct WatchRoots {
    roots: Vec<(PathBuf, bool)>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            roots: paths.into_iter().map(|p| (p, false)).collect(),
        }
    }

    pub(super) fn attach_existing(&mut self, watcher: &mut RecommendedWatcher) -> notify::Result<()> {
        for (path, attached) in &mut self.roots {
            if path.exists() {
                watcher.watch(path, RecursiveMode::Recursive)?;
                *attached = true;
            }
        }
        Ok(())
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        for (path, attached) in &mut self.roots {
            if !path.exists() {
                *attached = false;
                continue;
            }
            if !*attached && watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                *attached = true;
                crate::debug!("watch"; "re-attached watch: {}", path.display());
            }
        }
    }

    pub(super) fn attached(&self) -> usize {
        self.roots.iter().filter(|(_, a)| *a).count()
    }
}
