use std::fmt;
use std::str::FromStr;

use serde_json::Value as JsonValue;

/// Semantic type carried alongside every value flowing through a resource tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Boolean,
    Integer,
    Float,
    Text,
    Json,
    Xml,
    Html,
    Array,
    Image,
    File,
}

impl TypeTag {
    pub const ALL: [TypeTag; 10] = [
        TypeTag::Boolean,
        TypeTag::Integer,
        TypeTag::Float,
        TypeTag::Text,
        TypeTag::Json,
        TypeTag::Xml,
        TypeTag::Html,
        TypeTag::Array,
        TypeTag::Image,
        TypeTag::File,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Boolean => "boolean",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Text => "text",
            TypeTag::Json => "json",
            TypeTag::Xml => "xml",
            TypeTag::Html => "html",
            TypeTag::Array => "array",
            TypeTag::Image => "image",
            TypeTag::File => "file",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type: {0}")]
pub struct UnknownTypeTag(pub String);

impl FromStr for TypeTag {
    type Err = UnknownTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(TypeTag::Boolean),
            "integer" | "int" => Ok(TypeTag::Integer),
            "float" | "double" => Ok(TypeTag::Float),
            "text" | "string" => Ok(TypeTag::Text),
            "json" => Ok(TypeTag::Json),
            "xml" => Ok(TypeTag::Xml),
            "html" => Ok(TypeTag::Html),
            "array" => Ok(TypeTag::Array),
            "image" => Ok(TypeTag::Image),
            "file" => Ok(TypeTag::File),
            _ => Err(UnknownTypeTag(s.to_string())),
        }
    }
}

/// A value plus its semantic type.
///
/// Each variant fixes the shape of its payload, so a value can never disagree
/// with its own tag. Conversions consume a value and produce a new one.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Json(JsonValue),
    Xml(String),
    Html(String),
    Array(Vec<JsonValue>),
    /// Image URL, data URI, or base64 payload.
    Image(String),
    /// Path or name of an uploaded file.
    File(String),
}

impl TaggedValue {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            TaggedValue::Boolean(_) => TypeTag::Boolean,
            TaggedValue::Integer(_) => TypeTag::Integer,
            TaggedValue::Float(_) => TypeTag::Float,
            TaggedValue::Text(_) => TypeTag::Text,
            TaggedValue::Json(_) => TypeTag::Json,
            TaggedValue::Xml(_) => TypeTag::Xml,
            TaggedValue::Html(_) => TypeTag::Html,
            TaggedValue::Array(_) => TypeTag::Array,
            TaggedValue::Image(_) => TypeTag::Image,
            TaggedValue::File(_) => TypeTag::File,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        TaggedValue::Text(s.into())
    }

    /// Interpret a literal from a resource document.
    pub fn from_literal(value: &JsonValue) -> Self {
        match value {
            JsonValue::Bool(b) => TaggedValue::Boolean(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => TaggedValue::Integer(i),
                None => TaggedValue::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => TaggedValue::Text(s.clone()),
            JsonValue::Array(items) => TaggedValue::Array(items.clone()),
            JsonValue::Null | JsonValue::Object(_) => TaggedValue::Json(value.clone()),
        }
    }

    /// Structural JSON view of the payload. Markup and media payloads become strings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            TaggedValue::Boolean(b) => JsonValue::Bool(*b),
            TaggedValue::Integer(i) => JsonValue::from(*i),
            TaggedValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            TaggedValue::Text(s)
            | TaggedValue::Xml(s)
            | TaggedValue::Html(s)
            | TaggedValue::Image(s)
            | TaggedValue::File(s) => JsonValue::String(s.clone()),
            TaggedValue::Json(v) => v.clone(),
            TaggedValue::Array(items) => JsonValue::Array(items.clone()),
        }
    }

    /// Plain string form used by text-oriented operations.
    pub fn to_plain_string(&self) -> String {
        match self {
            TaggedValue::Boolean(b) => b.to_string(),
            TaggedValue::Integer(i) => i.to_string(),
            TaggedValue::Float(f) => f.to_string(),
            TaggedValue::Text(s)
            | TaggedValue::Xml(s)
            | TaggedValue::Html(s)
            | TaggedValue::Image(s)
            | TaggedValue::File(s) => s.clone(),
            TaggedValue::Json(JsonValue::String(s)) => s.clone(),
            TaggedValue::Json(v) => v.to_string(),
            TaggedValue::Array(items) => JsonValue::Array(items.clone()).to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TaggedValue::Boolean(_) | TaggedValue::Integer(_) | TaggedValue::Float(_) => false,
            TaggedValue::Text(s)
            | TaggedValue::Xml(s)
            | TaggedValue::Html(s)
            | TaggedValue::Image(s)
            | TaggedValue::File(s) => s.is_empty(),
            TaggedValue::Json(v) => match v {
                JsonValue::Null => true,
                JsonValue::String(s) => s.is_empty(),
                JsonValue::Array(a) => a.is_empty(),
                JsonValue::Object(o) => o.is_empty(),
                _ => false,
            },
            TaggedValue::Array(items) => items.is_empty(),
        }
    }
}

impl From<bool> for TaggedValue {
    fn from(v: bool) -> Self {
        TaggedValue::Boolean(v)
    }
}

impl From<i64> for TaggedValue {
    fn from(v: i64) -> Self {
        TaggedValue::Integer(v)
    }
}

impl From<f64> for TaggedValue {
    fn from(v: f64) -> Self {
        TaggedValue::Float(v)
    }
}

impl From<&str> for TaggedValue {
    fn from(v: &str) -> Self {
        TaggedValue::Text(v.to_string())
    }
}

impl From<String> for TaggedValue {
    fn from(v: String) -> Self {
        TaggedValue::Text(v)
    }
}
