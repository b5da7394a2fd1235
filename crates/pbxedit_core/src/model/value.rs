//! Value tree shared by every record in a project document.
//!
//! # Responsibility
//! - Represent the four value shapes of the manifest dialect.
//! - Keep dictionary key order exactly as parsed or inserted.
//!
//! # Invariants
//! - Strings are stored unquoted; quoting is a writer concern.
//! - A reference value always carries its display comment next to the id.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{Display, Formatter};

/// Number of characters in a generated object identity.
pub const OBJECT_ID_LEN: usize = 24;

/// Identity of one record in the `objects` table.
///
/// Parsed documents may contain identities of any shape, so the newtype
/// does not enforce the generated format; see [`ObjectId::is_well_formed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether this id has the shape produced by the allocator:
    /// 24 upper-case hexadecimal characters.
    pub fn is_well_formed(&self) -> bool {
        is_well_formed_id(&self.0)
    }
}

pub(crate) fn is_well_formed_id(value: &str) -> bool {
    value.len() == OBJECT_ID_LEN
        && value
            .bytes()
            .all(|byte| byte.is_ascii_digit() || (b'A'..=b'F').contains(&byte))
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An id paired with the display comment rendered as `ID /* comment */`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub comment: String,
}

impl ObjectRef {
    pub fn new(id: impl Into<ObjectId>, comment: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            comment: comment.into(),
        }
    }
}

/// One value in the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Ref(ObjectRef),
    Array(Vec<Value>),
    Dict(Dict),
}

impl Value {
    /// Returns the scalar text of a string or the id of a reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Ref(reference) => Some(reference.id.as_str()),
            _ => None,
        }
    }

    pub fn as_ref_value(&self) -> Option<&ObjectRef> {
        match self {
            Self::Ref(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn comment(&self) -> Option<&str> {
        self.as_ref_value().map(|reference| reference.comment.as_str())
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Returns whether this value is the string `expected`, ignoring one
    /// pair of surrounding double quotes on either side.
    pub fn is_str(&self, expected: &str) -> bool {
        self.as_str()
            .map(|value| unquote(value) == unquote(expected))
            .unwrap_or(false)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::String(value.to_string())
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Ref(value)
    }
}

impl From<Dict> for Value {
    fn from(value: Dict) -> Self {
        Self::Dict(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

/// Strips one pair of surrounding double quotes when present.
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

/// Insertion-ordered dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict {
    entries: Vec<(String, Value)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used when assembling new records.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.entries
            .iter_mut()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let index = self.position(key)?;
        Some(&mut self.entries[index].1)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }

    pub fn get_array_mut(&mut self, key: &str) -> Option<&mut Vec<Value>> {
        self.get_mut(key).and_then(Value::as_array_mut)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dict> {
        self.get(key).and_then(Value::as_dict)
    }

    pub fn get_dict_mut(&mut self, key: &str) -> Option<&mut Dict> {
        self.get_mut(key).and_then(Value::as_dict_mut)
    }

    /// Inserts or replaces `key`. A replaced entry keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns the dictionary stored at `key`, replacing any non-dictionary
    /// value with an empty one.
    pub fn entry_dict(&mut self, key: &str) -> &mut Dict {
        if !matches!(self.get(key), Some(Value::Dict(_))) {
            self.insert(key, Dict::new());
        }
        let index = self.position(key).unwrap_or(self.entries.len() - 1);
        match &mut self.entries[index].1 {
            Value::Dict(dict) => dict,
            _ => unreachable!("entry was just set to a dictionary"),
        }
    }

    /// Returns the array stored at `key`, replacing any non-array value with
    /// an empty one.
    pub fn entry_array(&mut self, key: &str) -> &mut Vec<Value> {
        if !matches!(self.get(key), Some(Value::Array(_))) {
            self.insert(key, Vec::new());
        }
        let index = self.position(key).unwrap_or(self.entries.len() - 1);
        match &mut self.entries[index].1 {
            Value::Array(items) => items,
            _ => unreachable!("entry was just set to an array"),
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(existing, _)| existing == key)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Dict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}
