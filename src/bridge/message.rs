//! Bridge wire format.
//!
//! Every message is one JSON object:
//!
//! ```json
//! {"kind": "error", "payload": {"file": "app/main.view", "message": "..."}, "severity": "error"}
//! ```
//!
//! `severity` is omitted for plain notifications.

use serde::Serialize;

use crate::cache::{ErrorRecord, ViewSpan};

/// Distinguishes recoverable warnings from user-facing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum Payload {
    /// A file compiled, or (with `file: None`) the engine rendered cleanly.
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    Error(ErrorRecord),
    /// Views and imports discovered in a file.
    Metadata {
        file: String,
        views: Vec<ViewSpan>,
        imports: Vec<String>,
    },
    /// Code outside the views of a file changed.
    OutsideChange { file: String },
    /// A compiled artifact is ready to be loaded as a script.
    ScriptAdd { file: String, path: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeMessage {
    #[serde(flatten)]
    pub payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl BridgeMessage {
    fn new(payload: Payload) -> Self {
        Self {
            payload,
            severity: None,
        }
    }

    pub fn compiled(file: impl Into<String>) -> Self {
        Self::new(Payload::Success {
            file: Some(file.into()),
        })
    }

    pub fn rendered() -> Self {
        Self::new(Payload::Success { file: None })
    }

    pub fn error(record: ErrorRecord) -> Self {
        Self {
            payload: Payload::Error(record),
            severity: Some(Severity::Error),
        }
    }

    pub fn warning(record: ErrorRecord) -> Self {
        Self {
            payload: Payload::Error(record),
            severity: Some(Severity::Warning),
        }
    }

    pub fn metadata(file: impl Into<String>, views: Vec<ViewSpan>, imports: Vec<String>) -> Self {
        Self::new(Payload::Metadata {
            file: file.into(),
            views,
            imports,
        })
    }

    pub fn outside_change(file: impl Into<String>) -> Self {
        Self::new(Payload::OutsideChange { file: file.into() })
    }

    pub fn script_add(file: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Payload::ScriptAdd {
            file: file.into(),
            path: path.into(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self.payload {
            Payload::Success { .. } => "success",
            Payload::Error(_) => "error",
            Payload::Metadata { .. } => "metadata",
            Payload::OutsideChange { .. } => "outside-change",
            Payload::ScriptAdd { .. } => "script-add",
        }
    }

    /// File this message is about, if any.
    pub fn file(&self) -> Option<&str> {
        match &self.payload {
            Payload::Success { file } => file.as_deref(),
            Payload::Error(record) => Some(&record.file),
            Payload::Metadata { file, .. }
            | Payload::OutsideChange { file }
            | Payload::ScriptAdd { file, .. } => Some(file),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Some(Severity::Error)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_shape() {
        let record = ErrorRecord::new("app/main.view", "unclosed view `Main`", 7).with_line(Some(3));
        let value = serde_json::to_value(BridgeMessage::error(record)).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": "error",
                "payload": {"file": "app/main.view", "message": "unclosed view `Main`", "line": 3, "timestamp": 7},
                "severity": "error",
            })
        );
    }

    #[test]
    fn test_notification_has_no_severity() {
        let value = serde_json::to_value(BridgeMessage::outside_change("app/a.view")).unwrap();
        assert_eq!(
            value,
            json!({"kind": "outside-change", "payload": {"file": "app/a.view"}})
        );
    }

    #[test]
    fn test_rendered_success_omits_file() {
        let msg = BridgeMessage::rendered();
        assert_eq!(msg.kind(), "success");
        assert!(msg.file().is_none());
        assert_eq!(msg.to_json(), r#"{"kind":"success","payload":{}}"#);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(BridgeMessage::script_add("a", "b").kind(), "script-add");
        assert_eq!(BridgeMessage::metadata("a", vec![], vec![]).kind(), "metadata");
        assert_eq!(BridgeMessage::compiled("a").file(), Some("a"));
    }
}
