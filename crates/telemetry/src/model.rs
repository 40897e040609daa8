use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uxlab_core_types::{SessionId, SpanId, Theme, Variant};

/// Flat key-value payload attached to an event by its caller.
pub type Extra = BTreeMap<String, serde_json::Value>;

/// Builds an `Extra` from literal pairs.
pub fn extra<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> Extra {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
    Error,
    TaskStart,
    TaskEnd,
    Mark,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::Error => "error",
            EventKind::TaskStart => "task_start",
            EventKind::TaskEnd => "task_end",
            EventKind::Mark => "mark",
        }
    }
}

/// The atomic persisted unit. Context fields are copied in at creation time,
/// so the same session can carry events with different themes. Optional
/// fields are omitted, not nulled, when absent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub session: SessionId,
    pub variant: Variant,
    pub theme: Theme,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
    pub viewport: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SpanId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Extra::is_empty")]
    pub extra: Extra,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

/// Options accepted when closing a task span. Replaces the boolean-or-object
/// second parameter of the source API with one tagged type.
#[derive(Clone, Debug, Default)]
pub struct EndOpts {
    pub success: Option<bool>,
    pub extra: Extra,
}

impl EndOpts {
    pub fn succeeded(success: bool) -> Self {
        Self {
            success: Some(success),
            extra: Extra::new(),
        }
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extra = extra;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uxlab_core_types::{SessionId, Theme, Variant};

    fn sample(kind: EventKind) -> Event {
        Event {
            timestamp: 1_700_000_000_000,
            kind,
            session: SessionId("s-1".into()),
            variant: Variant::Bootstrap,
            theme: Theme::Light,
            user_agent: "uxlab-sim/0.1".into(),
            viewport: "1280x720".into(),
            id: None,
            name: None,
            code: None,
            extra: Extra::new(),
            duration_ms: None,
            success: None,
        }
    }

    #[test]
    fn absent_optionals_are_omitted_from_json() {
        let raw = serde_json::to_value(sample(EventKind::Click)).unwrap();
        let obj = raw.as_object().unwrap();
        assert_eq!(obj.get("type"), Some(&json!("click")));
        assert!(!obj.contains_key("duration_ms"));
        assert!(!obj.contains_key("success"));
        assert!(!obj.contains_key("extra"));
        assert!(!obj.contains_key("id"));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let raw = serde_json::to_value(sample(EventKind::TaskEnd)).unwrap();
        assert_eq!(raw["type"], json!("task_end"));
    }

    #[test]
    fn extra_helper_builds_sorted_payloads() {
        let payload = extra([("b", json!(2)), ("a", json!("x"))]);
        let keys: Vec<&str> = payload.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
