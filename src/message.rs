//! The normalized internal log record that flows through the whole system.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Severity ladder used internally (0 = Trace, 5 = Fatal).
///
/// `Trace` is reserved for internal use; syslog severities never map to it
/// (see [`crate::parser::syslog_to_priority`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Priority {
    /// Parse a level name case-insensitively. Unknown names fall back to
    /// `Trace`, the permissive default called for by the query endpoint.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "DEBUG" => Priority::Debug,
            "INFO" => Priority::Info,
            "WARN" | "WARNING" => Priority::Warn,
            "ERROR" => Priority::Error,
            "FATAL" | "CRIT" | "CRITICAL" => Priority::Fatal,
            _ => Priority::Trace,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Priority::Trace,
            1 => Priority::Debug,
            2 => Priority::Info,
            3 => Priority::Warn,
            4 => Priority::Error,
            5 => Priority::Fatal,
            _ => return Err(()),
        })
    }
}

/// The unit of data throughout the system.
///
/// Invariants (enforced by [`Message::normalize`], called by every producer
/// before handing a message to the fan-out engine): non-empty `r#type`,
/// non-zero `utime`, `priority` in `0..=5`, no empty elements in `tag`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Wall-clock timestamp. Defaults to the moment of deserialization since
    /// collectors stamp this themselves; only callers of the archive export
    /// format are expected to supply it.
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,

    /// Nanosecond-precision timestamp used as the archive sort key. Defaults
    /// alongside `time` for the same reason.
    #[serde(default = "default_utime")]
    pub utime: i64,

    /// Origin identifier, typically a hostname.
    #[serde(default)]
    pub id: String,

    /// Ordered set of labels, e.g. `["nginx", "access"]`.
    #[serde(default, deserialize_with = "deserialize_tag")]
    pub tag: Vec<String>,

    /// Partition name; determines the archive bucket.
    #[serde(rename = "type", default)]
    pub r#type: String,

    /// Internal severity, 0..5.
    #[serde(default)]
    pub priority: u8,

    /// Human-readable message text.
    #[serde(default, rename = "message")]
    pub content: String,

    /// Original wire bytes, retained for forwarders that must replay syslog
    /// verbatim. Serialized as base64 since it need not be valid UTF-8.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_raw",
        deserialize_with = "deserialize_raw"
    )]
    pub raw: Option<Vec<u8>>,
}

impl Message {
    /// Drop empty tag elements and ensure `type` falls back to `default_type`
    /// when absent. Call this on every message before it reaches the fan-out
    /// engine, regardless of origin (HTTP, syslog, programmatic).
    pub fn normalize(&mut self, default_type: &str) {
        self.tag.retain(|t| !t.is_empty());
        if self.r#type.is_empty() {
            self.r#type = default_type.to_string();
        }
        if self.priority > 5 {
            self.priority = 5;
        }
    }
}

fn default_utime() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

// Legacy on-disk records stored `tag` as a single string rather than an
// ordered set. Accept both shapes, silently upgrading the former to a
// one-element vector.
fn deserialize_tag<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagShape {
        Single(String),
        Many(Vec<String>),
    }

    match Option::<TagShape>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(TagShape::Single(s)) if s.is_empty() => Ok(Vec::new()),
        Some(TagShape::Single(s)) => Ok(vec![s]),
        Some(TagShape::Many(v)) => Ok(v),
    }
}

fn serialize_raw<S>(raw: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match raw {
        Some(bytes) => serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

fn deserialize_raw<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(s) => base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_single_string_tag_upgrades_to_one_element_vec() {
        let json = r#"{"time":"2024-01-01T00:00:00Z","utime":1,"id":"h","tag":"nginx","type":"app","priority":2,"message":"hi"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.tag, vec!["nginx".to_string()]);
    }

    #[test]
    fn normalize_drops_empty_tags_and_fills_default_type() {
        let mut msg = Message {
            time: Utc::now(),
            utime: 1,
            id: "h".into(),
            tag: vec!["".into(), "web".into()],
            r#type: "".into(),
            priority: 9,
            content: "x".into(),
            raw: None,
        };
        msg.normalize("app");
        assert_eq!(msg.tag, vec!["web".to_string()]);
        assert_eq!(msg.r#type, "app");
        assert_eq!(msg.priority, 5);
    }

    #[test]
    fn raw_bytes_round_trip_through_base64() {
        let msg = Message {
            time: Utc::now(),
            utime: 1,
            id: "h".into(),
            tag: vec![],
            r#type: "app".into(),
            priority: 1,
            content: "x".into(),
            raw: Some(vec![0, 159, 146, 150]),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.raw, msg.raw);
    }
}
