//! Caller-supplied payload values.
//!
//! # Design
//! `Body` is a tagged tree (scalar, list, ordered map, or file leaf) so the
//! request builder can walk it without guessing what a value is. Files are
//! opaque leaves: encoders never look inside them. Maps keep insertion order
//! so form fields and query pairs come out in the order the caller wrote them.

use serde_json::{Map, Number, Value};

/// A file attached to a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A structured request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<Body>),
    /// Ordered key/value entries. Duplicate keys are kept as given.
    Map(Vec<(String, Body)>),
    File(FilePart),
}

impl Body {
    /// Empty map, the usual starting point for [`Body::insert`].
    pub fn map() -> Self {
        Body::Map(Vec::new())
    }

    /// Append an entry when `self` is a map. Other variants are left as is.
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Body>) -> Self {
        if let Body::Map(entries) = &mut self {
            entries.push((key.into(), value.into()));
        }
        self
    }

    /// First value stored under `key` when `self` is a map.
    pub fn get(&self, key: &str) -> Option<&Body> {
        match self {
            Body::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Body::File(_))
    }

    /// JSON view of the tree. A file becomes an empty object, matching how a
    /// browser `File` stringifies.
    pub fn to_json(&self) -> Value {
        match self {
            Body::Null => Value::Null,
            Body::Bool(b) => Value::Bool(*b),
            Body::Number(n) => Value::Number(n.clone()),
            Body::Text(t) => Value::String(t.clone()),
            Body::List(items) => Value::Array(items.iter().map(Body::to_json).collect()),
            Body::Map(entries) => {
                let mut object = Map::new();
                for (key, value) in entries {
                    object.insert(key.clone(), value.to_json());
                }
                Value::Object(object)
            }
            Body::File(_) => Value::Object(Map::new()),
        }
    }

    /// Text used when this value is a single form or query field.
    pub fn form_text(&self) -> String {
        match self {
            Body::Null => "null".to_string(),
            Body::Bool(b) => b.to_string(),
            Body::Number(n) => n.to_string(),
            Body::Text(t) => t.clone(),
            Body::List(_) | Body::Map(_) => self.to_json().to_string(),
            Body::File(file) => file.file_name.clone(),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Body::Null,
            Value::Bool(b) => Body::Bool(b),
            Value::Number(n) => Body::Number(n),
            Value::String(s) => Body::Text(s),
            Value::Array(items) => Body::List(items.into_iter().map(Body::from).collect()),
            Value::Object(object) => {
                Body::Map(object.into_iter().map(|(k, v)| (k, Body::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::Text(value.to_string())
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::Text(value)
    }
}

impl From<bool> for Body {
    fn from(value: bool) -> Self {
        Body::Bool(value)
    }
}

impl From<i64> for Body {
    fn from(value: i64) -> Self {
        Body::Number(value.into())
    }
}

impl From<i32> for Body {
    fn from(value: i32) -> Self {
        Body::Number(i64::from(value).into())
    }
}

impl From<u64> for Body {
    fn from(value: u64) -> Self {
        Body::Number(value.into())
    }
}

impl From<f64> for Body {
    /// NaN and infinities have no JSON form and become `Null`.
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Body::Null, Body::Number)
    }
}

impl From<FilePart> for Body {
    fn from(value: FilePart) -> Self {
        Body::File(value)
    }
}

impl<T: Into<Body>> From<Vec<T>> for Body {
    fn from(value: Vec<T>) -> Self {
        Body::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Body>> From<Option<T>> for Body {
    fn from(value: Option<T>) -> Self {
        value.map_or(Body::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Body>> FromIterator<(K, V)> for Body {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Body::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
