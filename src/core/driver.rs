//! Build mode.

/// How the orchestrator treats the files it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// One artifact per source; fresh files are skipped on startup and
    /// results are hot-swapped into the running engine.
    Watch,
    /// Every file is rebuilt and concatenated into one bundle.
    Package,
}

impl BuildMode {
    #[inline]
    pub const fn is_watch(self) -> bool {
        matches!(self, Self::Watch)
    }

    /// Staleness skipping only applies to incremental builds.
    #[inline]
    pub const fn allows_skip(self) -> bool {
        self.is_watch()
    }
}
