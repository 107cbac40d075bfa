use std::path::PathBuf;

/// What happened to a path within one debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }

    /// Fold a later event for the same path into this one.
    ///
    /// `None` means the two cancel out.
    pub(super) fn merge(self, later: Self) -> Option<Self> {
        match (self, later) {
            (Self::Removed, Self::Created | Self::Modified) => Some(later),
            (Self::Created, Self::Removed) => None,
            (Self::Modified, Self::Removed) => Some(Self::Removed),
            _ => Some(self),
        }
    }
}

/// Actionable changes of one window.
pub(super) struct DebouncedEvents(pub(super) Vec<(PathBuf, ChangeKind)>);

impl DebouncedEvents {
    /// `(changed, removed)`, each sorted. Created and modified sources
    /// both go through the pipeline, so they are not told apart.
    pub(super) fn split(self) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let (removed, changed): (Vec<_>, Vec<_>) = self
            .0
            .into_iter()
            .partition(|(_, kind)| *kind == ChangeKind::Removed);
        let paths = |events: Vec<(PathBuf, ChangeKind)>| {
            let mut paths: Vec<PathBuf> = events.into_iter().map(|(p, _)| p).collect();
            paths.sort();
            paths
        };
        (paths(changed), paths(removed))
    }
}
