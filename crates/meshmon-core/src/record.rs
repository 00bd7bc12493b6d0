use crate::error::DecodeError;
use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use std::collections::BTreeSet;
use std::fmt;

pub const TYPE_KEY: &str = "type";
pub const SENDER_KEY: &str = "sender";
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Field names dropped from display.
pub type IgnoreSet = BTreeSet<String>;

/// Payload value as received, without committing to a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            FieldValue::Map(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(flag) => FieldValue::Bool(flag),
            Value::Number(number) => FieldValue::Number(number),
            Value::String(text) => FieldValue::Text(text),
            Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(key, value)| (key, FieldValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(flag) => write!(f, "{flag}"),
            FieldValue::Number(number) => write!(f, "{number}"),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            FieldValue::Map(fields) => {
                f.write_str("{")?;
                for (idx, (key, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Ordered field map; keeps the key order of the inbound message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, FieldValue)>,
}

impl Fields {
    pub fn push(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut fields = Fields::default();
        for (key, value) in iter {
            fields.push(key, value);
        }
        fields
    }
}

/// One decoded message, scoped to a (sender, type) key.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: String,
    pub sender: String,
    /// `sender` exactly as the payload carried it; `None` when absent.
    pub reported_sender: Option<String>,
    pub arrival_time: DateTime<Utc>,
    pub fields: Fields,
}

impl Record {
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

pub fn decode(
    raw: &[u8],
    ignore: &IgnoreSet,
    arrival_time: DateTime<Utc>,
) -> Result<Record, DecodeError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|err| DecodeError::Malformed(err.to_string()))?;
    decode_value(value, ignore, arrival_time)
}

pub fn decode_value(
    value: Value,
    ignore: &IgnoreSet,
    arrival_time: DateTime<Utc>,
) -> Result<Record, DecodeError> {
    let object = match value {
        Value::Object(map) => map,
        other => {
            return Err(DecodeError::NotAnObject {
                found: json_kind(&other),
            })
        }
    };

    let mut kind = None;
    let mut reported_sender = None;
    let mut fields = Fields::default();
    for (key, value) in object {
        match key.as_str() {
            TYPE_KEY => kind = identity_text(value),
            SENDER_KEY => reported_sender = identity_text(value),
            _ if ignore.contains(&key) => {}
            _ => fields.push(key, FieldValue::from(value)),
        }
    }

    let sender = reported_sender
        .clone()
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());
    Ok(Record {
        kind: kind.unwrap_or_else(|| UNKNOWN_IDENTITY.to_string()),
        sender,
        reported_sender,
        arrival_time,
        fields,
    })
}

fn identity_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
