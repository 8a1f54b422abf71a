//! # Records
//!
//! A record is one row of domain data keyed by field name. Values are plain
//! JSON values; relational fields arrive as `[id, "display name"]` pairs.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Stable identity of a record, taken from its `id` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Field value; `None` when the field is absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value with absent fields and explicit nulls folded together.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn id(&self) -> Option<RecordId> {
        match self.0.get("id")? {
            Value::Number(n) => n.as_i64().map(RecordId::Int),
            Value::String(s) => Some(RecordId::Str(s.clone())),
            _ => None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

pub(crate) fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Text used for substring search. Relational pairs search their display name.
pub(crate) fn searchable_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => match items.as_slice() {
            [_, Value::String(name)] => Some(name.clone()),
            _ => None,
        },
        Value::Object(_) => None,
    }
}

pub(crate) fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a date or datetime string into a millisecond timestamp (UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.len() < 10 {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

pub(crate) fn value_timestamp(v: &Value) -> Option<i64> {
    match v {
        Value::String(s) => parse_timestamp(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_kinds() {
        let r = Record::new().with("id", 7);
        assert_eq!(r.id(), Some(RecordId::Int(7)));
        let r = Record::new().with("id", "abc");
        assert_eq!(r.id(), Some(RecordId::Str("abc".into())));
        assert_eq!(Record::new().id(), None);
    }

    #[test]
    fn test_null_and_missing_fold() {
        let r = Record::new().with("a", Value::Null);
        assert!(r.get("a").is_some());
        assert!(r.value("a").is_none());
        assert!(r.value("b").is_none());
    }

    #[test]
    fn test_searchable_relational_pair() {
        assert_eq!(
            searchable_text(&json!([3, "Acme Corp"])),
            Some("Acme Corp".to_string())
        );
        assert_eq!(searchable_text(&json!(false)), Some("false".to_string()));
        assert_eq!(searchable_text(&Value::Null), None);
    }

    #[test]
    fn test_timestamp_formats() {
        let day = parse_timestamp("2024-03-01").unwrap();
        let odoo = parse_timestamp("2024-03-01 00:00:00").unwrap();
        let rfc = parse_timestamp("2024-03-01T00:00:00Z").unwrap();
        assert_eq!(day, odoo);
        assert_eq!(day, rfc);
        assert!(parse_timestamp("march").is_none());
        assert!(parse_timestamp("2024").is_none());
    }
}
