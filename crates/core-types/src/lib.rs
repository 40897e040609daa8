use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shared error type stub for the harness crates.
#[derive(Debug, Error, Clone)]
pub enum StudyError {
    #[error("{message}")]
    Message { message: String },
}

impl StudyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identity of one page load; every telemetry event carries the session that
/// produced it.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one open task span, unique per start call.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SpanId(pub String);

impl SpanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anonymous participant identifier in the `P0000`..`P9999` range.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn generate() -> Self {
        let n = Uuid::new_v4().as_u128() % 10_000;
        Self(format!("P{:04}", n))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// UI variant under study, detected from rendered page structure.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Bootstrap,
    Bulma,
    Unknown,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Bootstrap => "bootstrap",
            Variant::Bulma => "bulma",
            Variant::Unknown => "unknown",
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Unknown
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color scheme reflected by the page root's `data-theme` attribute.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Parses an attribute value, falling back to light for anything else.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_ids_stay_in_range() {
        for _ in 0..64 {
            let id = ParticipantId::generate();
            assert_eq!(id.0.len(), 5);
            assert!(id.0.starts_with('P'));
            assert!(id.0[1..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn theme_attr_defaults_to_light() {
        assert_eq!(Theme::from_attr(None), Theme::Light);
        assert_eq!(Theme::from_attr(Some("dark")), Theme::Dark);
        assert_eq!(Theme::from_attr(Some("solarized")), Theme::Light);
    }
}
