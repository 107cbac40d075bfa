//! Staleness check for the initial build.
//!
//! A file is fresh only when both hold:
//! - its output artifact is at least as new as the source
//! - a cache entry exists whose `added` stamp is at least as new as the source
//!
//! The first guards against reusing stale output, the second against
//! trusting a cache entry written before the last edit.

use std::path::Path;

use super::mtime::{get_mtime, millis_since_epoch};

/// Why a file has to be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    OutputMissing,
    OutputOlder,
    NotCached,
    CacheOlder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Output and cache are current: skip the pipeline.
    Fresh,
    Stale(StaleReason),
    /// The source cannot be stat'd: treat as deleted, skip silently.
    Removed,
}

impl Staleness {
    pub fn is_fresh(self) -> bool {
        self == Self::Fresh
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Removed => "src file removed",
            Self::Stale(StaleReason::OutputMissing) => "out file removed",
            Self::Stale(StaleReason::OutputOlder) => "out older than src",
            Self::Stale(StaleReason::NotCached) => "no cache entry",
            Self::Stale(StaleReason::CacheOlder) => "cache older than src",
        }
    }
}

/// Decide whether `source` needs rebuilding.
///
/// `cached_added` is the `added` stamp (ms since epoch) of the cache entry
/// for this source, if any. Pure: no state is touched, so repeated calls
/// with no intervening change return the same answer.
pub fn check(source: &Path, output: &Path, cached_added: Option<u64>) -> Staleness {
    let Some(src_mtime) = get_mtime(source).map(millis_since_epoch) else {
        return Staleness::Removed;
    };

    let Some(out_mtime) = get_mtime(output).map(millis_since_epoch) else {
        return Staleness::Stale(StaleReason::OutputMissing);
    };

    if out_mtime < src_mtime {
        return Staleness::Stale(StaleReason::OutputOlder);
    }

    match cached_added {
        None => Staleness::Stale(StaleReason::NotCached),
        Some(added) if added < src_mtime => Staleness::Stale(StaleReason::CacheOlder),
        Some(_) => Staleness::Fresh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::now_millis;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("main.view");
        let out = dir.path().join("main.js");
        fs::write(&src, "view Main {}").unwrap();
        fs::write(&out, "View.define()").unwrap();
        (dir, src, out)
    }

    #[test]
    fn test_fresh_when_output_and_cache_current() {
        let (_dir, src, out) = fixture();
        let added = now_millis() + 10;
        assert_eq!(check(&src, &out, Some(added)), Staleness::Fresh);
        // Idempotent
        assert_eq!(check(&src, &out, Some(added)), Staleness::Fresh);
    }

    #[test]
    fn test_missing_source_is_removed() {
        let (dir, _src, out) = fixture();
        let gone = dir.path().join("gone.view");
        assert_eq!(check(&gone, &out, Some(now_millis())), Staleness::Removed);
    }

    #[test]
    fn test_missing_output_forces_rebuild() {
        let (dir, src, _out) = fixture();
        let missing = dir.path().join("missing.js");
        assert_eq!(
            check(&src, &missing, Some(now_millis())),
            Staleness::Stale(StaleReason::OutputMissing)
        );
    }

    #[test]
    fn test_uncached_is_stale() {
        let (_dir, src, out) = fixture();
        assert_eq!(check(&src, &out, None), Staleness::Stale(StaleReason::NotCached));
    }

    #[test]
    fn test_cache_written_before_edit_is_stale() {
        let (_dir, src, out) = fixture();
        assert_eq!(
            check(&src, &out, Some(0)),
            Staleness::Stale(StaleReason::CacheOlder)
        );
    }
}
