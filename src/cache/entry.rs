//! Per-file cache entry.

use serde::{Deserialize, Serialize};

use super::failure::ErrorRecord;
use crate::freshness::ContentHash;

/// A view defined in a source file, with its 1-based inclusive line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSpan {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl ViewSpan {
    pub fn new(name: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            name: name.into(),
            start_line,
            end_line,
        }
    }
}

/// Metadata for one source file.
///
/// The live table and the persisted snapshot use the same shape, so a
/// restored entry answers staleness questions exactly like the original.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Content hash of the source at the last pipeline run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ContentHash>,
    /// Source mtime (ms) observed at the last pipeline run
    #[serde(default)]
    pub modified: u64,
    /// Views defined by the file, in definition order
    #[serde(default)]
    pub views: Vec<ViewSpan>,
    /// Imports found in the file (internal and external)
    #[serde(default)]
    pub imports: Vec<String>,
    /// File text with every view's line range removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outside_src: Option<String>,
    /// Error from the last pipeline run, cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    /// File exports symbols and is written to the internal tree
    #[serde(default)]
    pub internal: bool,
    /// Time (ms) of the last successful build of this file; 0 = never
    #[serde(default)]
    pub added: u64,
}

impl FileEntry {
    pub fn view_names(&self) -> Vec<String> {
        self.views.iter().map(|v| v.name.clone()).collect()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_entry_deserializes() {
        let entry: FileEntry = serde_json::from_str(r#"{"added": 12}"#).unwrap();
        assert_eq!(entry.added, 12);
        assert!(entry.views.is_empty());
        assert!(entry.hash.is_none());
        assert!(!entry.internal);
    }

    #[test]
    fn test_view_names_keep_order() {
        let entry = FileEntry {
            views: vec![ViewSpan::new("Main", 1, 4), ViewSpan::new("Header", 6, 9)],
            ..FileEntry::default()
        };
        assert_eq!(entry.view_names(), vec!["Main", "Header"]);
    }
}
