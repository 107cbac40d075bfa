//! Build side: source transform, per-file pipeline, packaged output.
//!
//! ```text
//! compiler/
//! ├── syntax.rs     # View body grammar
//! ├── transform.rs  # view blocks -> View.define(..), imports, exports
//! ├── outside.rs    # Source text outside view bodies
//! ├── hooks.rs      # Pre/post transform filters
//! ├── write.rs      # Artifact writes, out-of-order guard
//! ├── gate.rs       # Initial build latch
//! ├── pipeline.rs   # Ordered per-file stages
//! ├── startup.rs    # Orphan cleanup, initial plan
//! └── bundle.rs     # Packaged build (oxc)
//! ```

pub mod bundle;
pub mod error;
pub mod gate;
pub mod hooks;
pub mod outside;
pub mod pipeline;
pub mod startup;
pub mod syntax;
pub mod transform;
pub mod write;

use jwalk::WalkDir;
use std::path::{Path, PathBuf};

pub use error::CompileError;
pub use gate::InitialBuild;
pub use pipeline::{Built, FileOutcome, Pipeline};

const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Collect all files from a directory recursively
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(|e| e.path())
        .collect()
}
