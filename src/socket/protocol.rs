use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire request: one JSON object per connection, spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Maximum accepted request size: 64 KiB (spec.md §6).
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

impl Request {
    pub fn argument_str(&self, key: &str) -> Option<&str> {
        self.arguments.as_ref()?.get(key)?.as_str()
    }

    pub fn argument_bool(&self, key: &str) -> Option<bool> {
        self.arguments.as_ref()?.get(key)?.as_bool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_json() {
        let request = Request {
            command: "scheduleAction".to_owned(),
            arguments: Some(serde_json::json!({"name": "AI Memos"})),
        };
        let raw = serde_json::to_string(&request).expect("serialize");
        let parsed: Request = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(parsed.command, "scheduleAction");
        assert_eq!(parsed.argument_str("name"), Some("AI Memos"));
    }

    #[test]
    fn request_without_arguments_defaults_to_none() {
        let parsed: Request = serde_json::from_str(r#"{"command":"status"}"#).expect("deserialize");
        assert!(parsed.arguments.is_none());
    }
}
