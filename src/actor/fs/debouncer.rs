use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::ChangeKind;
use crate::utils::path::normalize_path;

pub(super) const DEBOUNCE_MS: u64 = 150;
pub(super) const REBUILD_COOLDOWN_MS: u64 = 300;

/// Collects raw notify events until the tree has been quiet for
/// `DEBOUNCE_MS`, and keeps successive batches `REBUILD_COOLDOWN_MS` apart.
pub(super) struct Debouncer {
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<Instant>,
    pub(super) last_batch: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_batch: None,
        }
    }

    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;
        use notify::event::ModifyKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            // chmod / touch noise
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        for path in event.paths.iter().filter(|p| !is_editor_artifact(p)) {
            self.record(normalize_path(path), kind);
        }
    }

    fn record(&mut self, path: PathBuf, kind: ChangeKind) {
        let merged = match self.changes.get(&path) {
            Some(&existing) => existing.merge(kind),
            None => Some(kind),
        };
        match merged {
            Some(kind) => {
                crate::debug!("watch"; "{}: {}", kind.label(), path.display());
                self.changes.insert(path, kind);
            }
            None => {
                crate::debug!("watch"; "discard created+removed: {}", path.display());
                self.changes.remove(&path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    /// Hand out the collected changes once the window has closed.
    pub(super) fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.window_closed() {
            return None;
        }
        self.last_event = None;
        if self.changes.is_empty() {
            return None;
        }
        self.last_batch = Some(Instant::now());
        Some(std::mem::take(&mut self.changes))
    }

    pub(super) fn is_ready(&self) -> bool {
        !self.changes.is_empty() && self.window_closed()
    }

    fn window_closed(&self) -> bool {
        let quiet = self
            .last_event
            .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS));
        let cooled = self
            .last_batch
            .is_none_or(|t| t.elapsed() >= Duration::from_millis(REBUILD_COOLDOWN_MS));
        quiet && cooled
    }

    /// Time until the window can close; a day when nothing is pending.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce = Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());
        let cooldown = self.last_batch.map_or(Duration::ZERO, |t| {
            Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed())
        });

        debounce.max(cooldown).max(Duration::from_millis(1))
    }
}

/// Swap files, backups and dotfiles written by editors.
fn is_editor_artifact(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "swp" | "swo" | "swx" | "bak" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with("#")
}
