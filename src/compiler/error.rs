//! Per-file compile errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::cache::ErrorRecord;

/// One file's pipeline failed. Recoverable: the file's write is skipped
/// and its previous artifact stays in place.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{message}")]
    Syntax { line: usize, message: String },

    #[error("{phase} hook failed: {message}")]
    Hook { phase: &'static str, message: String },

    #[error("IO error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Record for the cache and the bridge: file identity and the
    /// top-level message only.
    pub fn to_record(&self, file: &str, timestamp: u64) -> ErrorRecord {
        ErrorRecord::new(file, self.to_string(), timestamp).with_line(self.line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_has_no_source_chain() {
        let err = CompileError::io(
            "/p/app/main.view",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "secret detail"),
        );
        let record = err.to_record("app/main.view", 1);
        assert_eq!(record.message, "IO error on `/p/app/main.view`");
        assert!(record.line.is_none());
    }

    #[test]
    fn test_syntax_record_keeps_line() {
        let record = CompileError::syntax(4, "unclosed view `Main`").to_record("app/main.view", 1);
        assert_eq!(record.line, Some(4));
        assert_eq!(record.message, "unclosed view `Main`");
    }
}
