use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Per-line mapping from key to typed value. First-seen key order is kept.
pub type FieldMap = IndexMap<String, FieldValue>;

/// A typed scalar produced by the tokenizer (or a string header field)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// True only for a string value equal to ""
    pub fn is_empty_str(&self) -> bool {
        matches!(self, FieldValue::Str(s) if s.is_empty())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Int(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            // JSON has no inf/NaN; write the text rather than null
            FieldValue::Float(f) => serializer.collect_str(f),
            FieldValue::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(n) => write!(f, "{}", n),
            FieldValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A parsed line, ready for the sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: DateTime<Utc>,
    pub data: FieldMap,
}

impl Event {
    pub fn new(timestamp: DateTime<Utc>, data: FieldMap) -> Self {
        Self { timestamp, data }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.data.get(key)
    }

    /// Render as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn serialize_rfc3339<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_empty_str() {
        assert!(FieldValue::from("").is_empty_str());
        assert!(!FieldValue::from(" ").is_empty_str());
        assert!(!FieldValue::Int(0).is_empty_str());
        assert!(!FieldValue::Bool(false).is_empty_str());
    }

    #[test]
    fn test_event_json_line() {
        let mut data = FieldMap::new();
        data.insert("status".to_string(), FieldValue::Int(200));
        data.insert("method".to_string(), FieldValue::from("GET"));
        data.insert("duration".to_string(), FieldValue::Float(1.5));
        data.insert("cached".to_string(), FieldValue::Bool(true));

        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let event = Event::new(ts, data);

        assert_eq!(
            event.to_json_line().unwrap(),
            r#"{"timestamp":"2024-01-02T03:04:05Z","data":{"status":200,"method":"GET","duration":1.5,"cached":true}}"#
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(FieldValue::Float(1.5).as_float(), Some(1.5));
        assert_eq!(FieldValue::Int(1).as_float(), None);
        assert_eq!(FieldValue::Bool(false).as_bool(), Some(false));
        assert_eq!(FieldValue::from("true").as_bool(), None);
        assert_eq!(FieldValue::from("x").as_str(), Some("x"));

        let names: Vec<&str> = [
            FieldValue::Bool(true),
            FieldValue::Int(1),
            FieldValue::Float(1.5),
            FieldValue::from("x"),
        ]
        .iter()
        .map(FieldValue::type_name)
        .collect();
        assert_eq!(names, vec!["bool", "int", "float", "string"]);
    }

    #[test]
    fn test_non_finite_float_is_never_null() {
        let mut data = FieldMap::new();
        data.insert("up".to_string(), FieldValue::Float(f64::INFINITY));
        data.insert("down".to_string(), FieldValue::Float(f64::NEG_INFINITY));
        data.insert("nan".to_string(), FieldValue::Float(f64::NAN));

        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let line = Event::new(ts, data).to_json_line().unwrap();

        assert_eq!(
            line,
            r#"{"timestamp":"2024-01-02T03:04:05Z","data":{"up":"inf","down":"-inf","nan":"NaN"}}"#
        );
        assert!(!line.contains("null"));
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Float(2.5).to_string(), "2.5");
        assert_eq!(FieldValue::Int(-3).to_string(), "-3");
        assert_eq!(FieldValue::from("x y").to_string(), "x y");
    }
}
