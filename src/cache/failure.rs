//! Pending compile errors, kept in the order they were reported.

use serde::{Deserialize, Serialize};

/// A compile error as stored in the cache and sent over the bridge.
///
/// Carries file identity and a message only; stack traces never leave
/// the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Source path relative to the project root
    pub file: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Time (ms) the error was recorded
    pub timestamp: u64,
}

impl ErrorRecord {
    pub fn new(file: impl Into<String>, message: impl Into<String>, timestamp: u64) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
            line: None,
            timestamp,
        }
    }

    pub fn with_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }
}

/// Ordered set of pending errors, at most one per file.
#[derive(Debug, Default, Clone)]
pub struct PendingErrors {
    errors: Vec<ErrorRecord>,
}

impl PendingErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error, replacing an existing error for the same file.
    pub fn push(&mut self, error: ErrorRecord) {
        self.errors.retain(|e| e.file != error.file);
        self.errors.push(error);
    }

    /// Remove the error for `file`. Returns true if one was pending.
    pub fn clear_for(&mut self, file: &str) -> bool {
        let before = self.errors.len();
        self.errors.retain(|e| e.file != file);
        self.errors.len() < before
    }

    pub fn first(&self) -> Option<&ErrorRecord> {
        self.errors.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}
