//! Call Output
//!
//! The value a call hands back to its caller. Failures inside a call body end
//! up here as data rather than as errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of invoking a call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallOutput {
    /// Unset until the registry resolves it
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub success: Option<bool>,
    /// Payload produced by the call
    #[serde(rename = "val", default)]
    pub value: Value,
    /// Error message if success is false
    #[serde(rename = "error", default)]
    pub error: Option<String>,
}

impl CallOutput {
    /// Wrap a value, leaving success unset
    pub fn from_value(value: impl Into<Value>) -> Self {
        Self {
            success: None,
            value: value.into(),
            error: None,
        }
    }

    pub fn success(value: impl Into<Value>) -> Self {
        Self {
            success: Some(true),
            value: value.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            value: Value::Null,
            error: Some(error.into()),
        }
    }

    /// Treat an unset success flag as success
    pub fn resolved(mut self) -> Self {
        self.success.get_or_insert(true);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolved_keeps_explicit_failure() {
        assert!(CallOutput::from_value(json!(1)).resolved().is_success());
        assert!(!CallOutput::failure("boom").resolved().is_success());
    }

    #[test]
    fn test_wire_names() {
        let doc = serde_json::to_value(CallOutput::failure("boom")).unwrap();
        assert_eq!(doc["success"], json!(false));
        assert_eq!(doc["error"], json!("boom"));
        assert!(doc.get("val").is_some());

        let unset = serde_json::to_value(CallOutput::from_value("hi")).unwrap();
        assert!(unset.get("success").is_none());
    }
}
