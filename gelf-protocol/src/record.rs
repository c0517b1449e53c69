//! GELF record model and message splitting.

use crate::error::ProtocolError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Syslog severity levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    #[default]
    Informational = 6,
    Debug = 7,
}

impl Level {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        Ok(match value {
            0 => Level::Emergency,
            1 => Level::Alert,
            2 => Level::Critical,
            3 => Level::Error,
            4 => Level::Warning,
            5 => Level::Notice,
            6 => Level::Informational,
            7 => Level::Debug,
            other => return Err(ProtocolError::InvalidLevel(other.to_string())),
        })
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Emergency => "emerg",
            Level::Alert => "alert",
            Level::Critical => "crit",
            Level::Error => "err",
            Level::Warning => "warning",
            Level::Notice => "notice",
            Level::Informational => "info",
            Level::Debug => "debug",
        };
        f.write_str(name)
    }
}

impl FromStr for Level {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return Level::from_u8(n);
        }
        match s.to_lowercase().as_str() {
            "emerg" | "emergency" | "panic" => Ok(Level::Emergency),
            "alert" => Ok(Level::Alert),
            "crit" | "critical" => Ok(Level::Critical),
            "err" | "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warning),
            "notice" => Ok(Level::Notice),
            "info" | "informational" => Ok(Level::Informational),
            "debug" => Ok(Level::Debug),
            _ => Err(ProtocolError::InvalidLevel(s.to_string())),
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Level::from_u8(value).map_err(serde::de::Error::custom)
    }
}

/// A single GELF log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub version: String,
    pub host: String,
    #[serde(rename = "short_message")]
    pub short: String,
    /// Complete input, only set when the input spans more than one line.
    #[serde(
        rename = "full_message",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub full: String,
    /// Seconds since the Unix epoch, microsecond resolution.
    pub timestamp: f64,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    pub file: String,
    pub line: u32,
    /// User-supplied fields, keys prefixed with `_`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LogRecord {
    /// Builds a record from a raw message, capturing the current time.
    pub fn build(
        raw: &[u8],
        host: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        level: Level,
        extra: BTreeMap<String, Value>,
    ) -> Self {
        let (short, full) = split_message(raw);
        Self {
            version: crate::GELF_VERSION.to_string(),
            host: host.into(),
            short,
            full,
            timestamp: unix_timestamp(Utc::now()),
            level,
            facility: None,
            file: file.into(),
            line,
            extra,
        }
    }

    /// Checks that every extra field can be represented on the wire.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        for (key, value) in &self.extra {
            validate_field(key, value)?;
        }
        Ok(())
    }
}

/// Splits raw input into the short (first line) and full message.
///
/// A single trailing newline is not treated as a line break. `full` holds the
/// untouched input only when another newline remains.
pub fn split_message(raw: &[u8]) -> (String, String) {
    let trimmed = raw.strip_suffix(b"\n").unwrap_or(raw);
    match trimmed.iter().position(|&b| b == b'\n') {
        Some(i) => (
            String::from_utf8_lossy(&trimmed[..i]).into_owned(),
            String::from_utf8_lossy(raw).into_owned(),
        ),
        None => (String::from_utf8_lossy(trimmed).into_owned(), String::new()),
    }
}

/// Adds the `_` prefix that marks user-supplied fields.
pub fn normalize_key(key: &str) -> String {
    if key.starts_with('_') {
        key.to_string()
    } else {
        format!("_{}", key)
    }
}

fn validate_field(key: &str, value: &Value) -> Result<(), ProtocolError> {
    if !key.starts_with('_') || key.len() < 2 {
        return Err(ProtocolError::InvalidField {
            key: key.to_string(),
            reason: "key must be '_' followed by a name",
        });
    }
    if key == "_id" {
        return Err(ProtocolError::InvalidField {
            key: key.to_string(),
            reason: "reserved by receivers",
        });
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ProtocolError::InvalidField {
            key: key.to_string(),
            reason: "key contains unsupported characters",
        });
    }
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(()),
        _ => Err(ProtocolError::InvalidField {
            key: key.to_string(),
            reason: "value must be a string, number or bool",
        }),
    }
}

fn unix_timestamp(now: DateTime<Utc>) -> f64 {
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Fluent builder holding the per-writer defaults applied to each record.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    host: String,
    file: Option<String>,
    line: u32,
    level: Level,
    facility: Option<String>,
    extra: BTreeMap<String, Value>,
}

impl RecordBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn caller(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn facility(mut self, facility: impl Into<String>) -> Self {
        self.facility = Some(facility.into());
        self
    }

    /// Adds an extra field; the `_` prefix is added when missing.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(normalize_key(key), value.into());
        self
    }

    pub fn fields<K, V, I>(mut self, fields: I) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in fields {
            self.extra.insert(normalize_key(key.as_ref()), value.into());
        }
        self
    }

    pub fn build(&self, raw: &[u8]) -> LogRecord {
        let mut record = LogRecord::build(
            raw,
            self.host.clone(),
            self.file.clone().unwrap_or_else(|| "???".to_string()),
            self.line,
            self.level,
            self.extra.clone(),
        );
        record.facility = self.facility.clone();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_multi_line() {
        let (short, full) = split_message(b"awesomesauce\nbananas");
        assert_eq!(short, "awesomesauce");
        assert_eq!(full, "awesomesauce\nbananas");
    }

    #[test]
    fn test_split_single_line_trailing_newline() {
        let (short, full) = split_message(b"some awesome thing\n");
        assert_eq!(short, "some awesome thing");
        assert_eq!(full, "");
    }

    #[test]
    fn test_split_keeps_full_input_verbatim() {
        let (short, full) = split_message(b"first\nsecond\n");
        assert_eq!(short, "first");
        assert_eq!(full, "first\nsecond\n");

        let (short, full) = split_message(b"a\n\n");
        assert_eq!(short, "a");
        assert_eq!(full, "a\n\n");
    }

    #[test]
    fn test_split_empty() {
        assert_eq!(split_message(b""), (String::new(), String::new()));
        assert_eq!(split_message(b"\n"), (String::new(), String::new()));
    }

    #[test]
    fn test_split_leading_newline() {
        let (short, full) = split_message(b"\nbody");
        assert_eq!(short, "");
        assert_eq!(full, "\nbody");
    }

    proptest! {
        #[test]
        fn prop_single_line(text in "[^\n]*", trailing in any::<bool>()) {
            let mut raw = text.clone().into_bytes();
            if trailing {
                raw.push(b'\n');
            }
            let (short, full) = split_message(&raw);
            prop_assert_eq!(short, text);
            prop_assert_eq!(full, "");
        }

        #[test]
        fn prop_multi_line(head in "[^\n]*", tail in "[^\n]+") {
            let raw = format!("{}\n{}", head, tail);
            let (short, full) = split_message(raw.as_bytes());
            prop_assert!(!short.ends_with('\n'));
            prop_assert_eq!(short, head);
            prop_assert_eq!(full, raw);
        }
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("info".parse::<Level>().unwrap(), Level::Informational);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("3".parse::<Level>().unwrap(), Level::Error);
        assert!("8".parse::<Level>().is_err());
        assert!("loud".parse::<Level>().is_err());
        assert_eq!(Level::default().as_u8(), 6);
    }

    #[test]
    fn test_level_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Level::Critical).unwrap(), "2");
        let level: Level = serde_json::from_str("7").unwrap();
        assert_eq!(level, Level::Debug);
        assert!(serde_json::from_str::<Level>("9").is_err());
    }

    #[test]
    fn test_builder_prefixes_keys() {
        let record = RecordBuilder::new("web-1")
            .caller("/src/main.rs", 42)
            .level(Level::Error)
            .facility("api")
            .field("request_id", "abc")
            .field("_attempt", 3)
            .build(b"boom");

        assert_eq!(record.host, "web-1");
        assert_eq!(record.file, "/src/main.rs");
        assert_eq!(record.line, 42);
        assert_eq!(record.level, Level::Error);
        assert_eq!(record.facility.as_deref(), Some("api"));
        assert_eq!(record.extra["_request_id"], Value::from("abc"));
        assert_eq!(record.extra["_attempt"], Value::from(3));
        assert_eq!(record.version, "1.1");
        assert!(record.timestamp > 0.0);
    }

    #[test]
    fn test_builder_without_caller_uses_sentinel() {
        let record = RecordBuilder::new("h").build(b"x");
        assert_eq!(record.file, "???");
        assert_eq!(record.line, 0);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut record = RecordBuilder::new("h").build(b"x");
        record
            .extra
            .insert("_nested".to_string(), serde_json::json!({"a": 1}));
        assert!(matches!(
            record.validate(),
            Err(ProtocolError::InvalidField { .. })
        ));

        let record = RecordBuilder::new("h").field("id", 1).build(b"x");
        assert!(record.validate().is_err());

        let record = RecordBuilder::new("h").field("bad key", 1).build(b"x");
        assert!(record.validate().is_err());

        let record = RecordBuilder::new("h").field("ok.key-1", true).build(b"x");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_json_field_names() {
        let record = RecordBuilder::new("h")
            .caller("f.rs", 1)
            .field("user", "bob")
            .build(b"one\ntwo");
        let json: Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["short_message"], "one");
        assert_eq!(json["full_message"], "one\ntwo");
        assert_eq!(json["level"], 6);
        assert_eq!(json["_user"], "bob");
        assert!(json.get("facility").is_none());
    }

    #[test]
    fn test_empty_full_message_omitted() {
        let record = RecordBuilder::new("h").build(b"single");
        let json: Value = serde_json::to_value(&record).unwrap();
        assert!(json.get("full_message").is_none());

        let parsed: LogRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.full, "");
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("a"), "_a");
        assert_eq!(normalize_key("_a"), "_a");
    }
}
