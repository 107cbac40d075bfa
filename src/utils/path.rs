//! Path helpers.
//!
//! - `normalize_path` - absolute form (canonicalize + fallback)
//! - `rel_key` - root-relative `/`-separated key used by the cache and the bridge
//! - `with_ext` - swap a source extension for an artifact extension

use std::path::{Path, PathBuf};

/// Normalize a path to absolute form.
///
/// Tries `canonicalize()` first; falls back to the path itself when
/// absolute, or joined with the current directory when relative.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// `root/app/main.view` -> `app/main.view`
pub fn rel_key(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Map `from/<rel>.<any>` to `to/<rel>.<ext>`.
///
/// Returns `None` when `path` is not under `from`.
pub fn with_ext(path: &Path, from: &Path, to: &Path, ext: &str) -> Option<PathBuf> {
    let rel = path.strip_prefix(from).ok()?;
    Some(to.join(rel).with_extension(ext))
}

/// Whether `path` has one of `extensions` (without the dot).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}
