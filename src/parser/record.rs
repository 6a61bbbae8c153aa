//! Parsed record tree.
//!
//! A [`Record`] holds only what was observed in the device output, in
//! first-seen order. Absence is reported by the accessors: `None` for scalars,
//! `-1` from [`Record::int_or_sentinel`], `false` from [`Record::flag`].

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

use super::first_token;
use crate::stage::{needs_quotes, quote, unquote};

/// Key of one entry in a repeated block
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// Name or composite key
    Name(String),
    /// Numeric index
    Index(i64),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Name(name) => f.write_str(name),
            RecordKey::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for RecordKey {
    fn from(name: &str) -> Self {
        RecordKey::Name(name.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(name: String) -> Self {
        RecordKey::Name(name)
    }
}

impl From<i64> for RecordKey {
    fn from(index: i64) -> Self {
        RecordKey::Index(index)
    }
}

/// A text value and how it was written.
///
/// Accessors see the unquoted value. A value that arrived as one quoted token
/// is quoted again on render; anything else, such as `10.0.0.1 prefer`, is
/// written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    value: String,
    quoted: bool,
}

impl Text {
    /// Text built in code, quoted only if it would not survive as one token
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let quoted = needs_quotes(&value);
        Self { value, quoted }
    }

    /// Text from the remainder of a statement
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        match first_token(raw) {
            (token, "") if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') => {
                Self {
                    value: unquote(token),
                    quoted: true,
                }
            }
            _ => Self {
                value: raw.to_string(),
                quoted: false,
            },
        }
    }

    /// Unquoted value
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns true if render writes the value in quotes
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// The value as it appears in a `set` line
    pub fn token(&self) -> String {
        if self.quoted {
            quote(&self.value)
        } else if self.value.ends_with(';') {
            // statements lose one trailing `;` when parsed
            format!("{};", self.value)
        } else {
            self.value.clone()
        }
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Text::new(value)
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Text::new(value)
    }
}

/// Value of one observed field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text
    Text(Text),
    /// Integer
    Integer(i64),
    /// Boolean
    Boolean(bool),
    /// Presence
    Flag,
    /// Values in order of appearance
    List(Vec<Text>),
    /// Nested container
    Block(Record),
    /// Keyed entries in first-seen order
    Repeated(IndexMap<RecordKey, Record>),
}

/// One level of the parsed tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing was observed
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of observed fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Observed fields in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Raw value of a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns true if the field was observed
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Set a scalar; a later line for the same field wins
    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Text field
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(Value::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Integer field
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(Value::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// Integer field, `-1` when absent
    pub fn int_or_sentinel(&self, key: &str) -> i64 {
        self.int(key).unwrap_or(-1)
    }

    /// Boolean field
    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.fields.get(key) {
            Some(Value::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Presence flag; also true for a boolean set to `true`
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.fields.get(key),
            Some(Value::Flag) | Some(Value::Boolean(true))
        )
    }

    /// List field, empty when absent
    pub fn list(&self, key: &str) -> Vec<&str> {
        match self.fields.get(key) {
            Some(Value::List(items)) => items.iter().map(Text::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Nested block
    pub fn block(&self, key: &str) -> Option<&Record> {
        match self.fields.get(key) {
            Some(Value::Block(record)) => Some(record),
            _ => None,
        }
    }

    /// Repeated collection
    pub fn repeated(&self, key: &str) -> Option<&IndexMap<RecordKey, Record>> {
        match self.fields.get(key) {
            Some(Value::Repeated(entries)) => Some(entries),
            _ => None,
        }
    }

    /// One entry of a repeated collection
    pub fn entry(&self, key: &str, entry: impl Into<RecordKey>) -> Option<&Record> {
        self.repeated(key)?.get(&entry.into())
    }

    pub(crate) fn push_list(&mut self, key: &str, item: Text) {
        match self.fields.get_mut(key) {
            Some(Value::List(items)) => items.push(item),
            _ => {
                self.fields.insert(key.to_string(), Value::List(vec![item]));
            }
        }
    }

    pub(crate) fn block_mut(&mut self, key: &str) -> &mut Record {
        if !matches!(self.fields.get(key), Some(Value::Block(_))) {
            self.fields
                .insert(key.to_string(), Value::Block(Record::new()));
        }
        match self.fields.get_mut(key) {
            Some(Value::Block(record)) => record,
            _ => unreachable!("block inserted above"),
        }
    }

    pub(crate) fn entry_mut(&mut self, key: &str, entry: RecordKey) -> &mut Record {
        if !matches!(self.fields.get(key), Some(Value::Repeated(_))) {
            self.fields
                .insert(key.to_string(), Value::Repeated(IndexMap::new()));
        }
        match self.fields.get_mut(key) {
            Some(Value::Repeated(entries)) => entries.entry(entry).or_default(),
            _ => unreachable!("collection inserted above"),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(text) => serializer.serialize_str(text.as_str()),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Flag => serializer.serialize_bool(true),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item.as_str())?;
                }
                seq.end()
            }
            Value::Block(record) => record.serialize(serializer),
            Value::Repeated(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, record) in entries {
                    map.serialize_entry(&key.to_string(), record)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accessor_defaults() {
        let record = Record::new();
        assert_eq!(record.int("priority"), None);
        assert_eq!(record.int_or_sentinel("priority"), -1);
        assert!(!record.flag("preempt"));
        assert!(record.list("name_server").is_empty());
        assert!(record.block("services_ssh").is_none());
    }

    #[test]
    fn test_entry_mut_reuses_existing() {
        let mut record = Record::new();
        record
            .entry_mut("redundancy_group", RecordKey::Index(0))
            .set("preempt", Value::Flag);
        record
            .entry_mut("redundancy_group", RecordKey::Index(0))
            .set("gratuitous_arp_count", Value::Integer(4));

        let groups = record.repeated("redundancy_group").unwrap();
        assert_eq!(groups.len(), 1);
        let group = record.entry("redundancy_group", 0i64).unwrap();
        assert!(group.flag("preempt"));
        assert_eq!(group.int("gratuitous_arp_count"), Some(4));
    }

    #[test]
    fn test_serialize_nested() {
        let mut record = Record::new();
        record.block_mut("system").set("host_name", Value::Text("R1".into()));
        record.block_mut("system").push_list("name_server", "192.0.2.53".into());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"system": {"host_name": "R1", "name_server": ["192.0.2.53"]}})
        );
    }

    #[test]
    fn test_text_keeps_input_quoting() {
        let quoted = Text::from_raw("\"authorized use only\"");
        assert_eq!(quoted.as_str(), "authorized use only");
        assert_eq!(quoted.token(), "\"authorized use only\"");

        let single = Text::from_raw("\"R1\"");
        assert!(single.is_quoted());
        assert_eq!(single.token(), "\"R1\"");

        let options = Text::from_raw("10.0.0.1 prefer");
        assert!(!options.is_quoted());
        assert_eq!(options.as_str(), "10.0.0.1 prefer");
        assert_eq!(options.token(), "10.0.0.1 prefer");

        assert_eq!(Text::new("two words").token(), "\"two words\"");
        assert_eq!(Text::new("R1").token(), "R1");
    }
}
