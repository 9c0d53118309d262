//! Typed records and primary-key values.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A primary-key value.
///
/// Keys are caller-supplied and immutable once a record is created; only
/// integer and text fields may act as keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyValue {
    /// Integer key.
    Int(i64),
    /// Text key.
    Text(String),
}

impl KeyValue {
    /// Derive a key from a field value, if the value is key-shaped.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(KeyValue::Int(*i)),
            Value::Text(s) => Some(KeyValue::Text(s.clone())),
            _ => None,
        }
    }

    /// The key as a field value.
    pub fn to_value(&self) -> Value {
        match self {
            KeyValue::Int(i) => Value::Int(*i),
            KeyValue::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(i) => write!(f, "{}", i),
            KeyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(i: i64) -> Self {
        KeyValue::Int(i)
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        KeyValue::Text(s)
    }
}

/// A candidate or committed record: named values in declaration order.
///
/// At most one value per field name; `with`/`set` replace in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing any existing value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Check if a field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = Record::new()
            .with("id", 1i64)
            .with("name", "Alice")
            .with("active", true);

        assert_eq!(record.len(), 3);
        assert_eq!(record.get("name"), Some(&Value::Text("Alice".into())));
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn test_record_set_replaces() {
        let record = Record::new().with("name", "Alice").with("name", "Alicia");

        assert_eq!(record.len(), 1);
        assert_eq!(record.get("name"), Some(&Value::Text("Alicia".into())));
    }

    #[test]
    fn test_key_from_value() {
        assert_eq!(
            KeyValue::from_value(&Value::Int(7)),
            Some(KeyValue::Int(7))
        );
        assert_eq!(
            KeyValue::from_value(&Value::Text("S001".into())),
            Some(KeyValue::Text("S001".into()))
        );
        assert!(KeyValue::from_value(&Value::Bool(true)).is_none());
        assert!(KeyValue::from_value(&Value::Null).is_none());
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let record = Record::new().with("id", 1i64).with("name", "Alice");
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
