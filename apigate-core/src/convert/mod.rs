mod markup;

use serde_json::Value as JsonValue;

use crate::error::ConversionError;
use crate::types::{TaggedValue, TypeTag};

pub use markup::*;

pub const DEFAULT_XML_WRAPPER: &str = "apigateWrapper";
pub const DEFAULT_HTML_TITLE: &str = "HTML generated by apigate";

/// Fixed names introduced when scalars and JSON are wrapped as markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupOptions {
    pub xml_wrapper: String,
    pub html_title: String,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            xml_wrapper: DEFAULT_XML_WRAPPER.to_string(),
            html_title: DEFAULT_HTML_TITLE.to_string(),
        }
    }
}

/// Convert `value` into `to` using the default markup wrapper names.
pub fn convert(value: TaggedValue, to: TypeTag) -> Result<TaggedValue, ConversionError> {
    convert_with(value, to, &MarkupOptions::default())
}

pub fn convert_with(
    value: TaggedValue,
    to: TypeTag,
    opts: &MarkupOptions,
) -> Result<TaggedValue, ConversionError> {
    let from = value.type_tag();
    if from == to {
        return Ok(value);
    }
    let converted = match to {
        TypeTag::Boolean => to_boolean(&value).map(TaggedValue::Boolean),
        TypeTag::Integer => to_integer(&value).map(TaggedValue::Integer),
        TypeTag::Float => to_float(&value).map(TaggedValue::Float),
        TypeTag::Text => Some(TaggedValue::Text(value.to_plain_string())),
        TypeTag::Json => to_json(value).map(TaggedValue::Json),
        TypeTag::Xml => to_xml(value, opts).map(TaggedValue::Xml),
        TypeTag::Html => to_html(value, opts).map(TaggedValue::Html),
        TypeTag::Array => to_array(value).map(TaggedValue::Array),
        TypeTag::Image => match value {
            TaggedValue::Text(s) if !s.trim().is_empty() => Some(TaggedValue::Image(s.trim().to_string())),
            _ => None,
        },
        TypeTag::File => None,
    };
    converted.ok_or(ConversionError::new(from, to))
}

/// Boolean reading of free text. Unrecognised non-empty text is true.
pub fn text_truthiness(s: &str) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "off" | "0" => false,
        _ => true,
    }
}

fn json_truthiness(v: &JsonValue) -> bool {
    match v {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => text_truthiness(s),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

fn to_boolean(value: &TaggedValue) -> Option<bool> {
    match value {
        TaggedValue::Integer(i) => Some(*i != 0),
        TaggedValue::Float(f) => Some(*f != 0.0),
        TaggedValue::Text(s) => Some(text_truthiness(s)),
        TaggedValue::Json(v) => Some(json_truthiness(v)),
        _ => None,
    }
}

fn float_to_integer(f: f64) -> Option<i64> {
    let t = f.trunc();
    (t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64).then_some(t as i64)
}

fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(float_to_integer))
}

fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn to_integer(value: &TaggedValue) -> Option<i64> {
    match value {
        TaggedValue::Boolean(b) => Some(i64::from(*b)),
        TaggedValue::Float(f) => float_to_integer(*f),
        TaggedValue::Text(s) => parse_integer(s),
        TaggedValue::Json(JsonValue::Bool(b)) => Some(i64::from(*b)),
        TaggedValue::Json(JsonValue::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_integer)),
        TaggedValue::Json(JsonValue::String(s)) => parse_integer(s),
        _ => None,
    }
}

fn to_float(value: &TaggedValue) -> Option<f64> {
    match value {
        TaggedValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        TaggedValue::Integer(i) => Some(*i as f64),
        TaggedValue::Text(s) => parse_float(s),
        TaggedValue::Json(JsonValue::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        TaggedValue::Json(JsonValue::Number(n)) => n.as_f64(),
        TaggedValue::Json(JsonValue::String(s)) => parse_float(s),
        _ => None,
    }
}

fn to_json(value: TaggedValue) -> Option<JsonValue> {
    match value {
        TaggedValue::Boolean(b) => Some(JsonValue::Bool(b)),
        TaggedValue::Integer(i) => Some(JsonValue::from(i)),
        TaggedValue::Float(f) => serde_json::Number::from_f64(f).map(JsonValue::Number),
        TaggedValue::Text(s) if s.trim().is_empty() => Some(JsonValue::String(s)),
        TaggedValue::Text(s) => Some(serde_json::from_str(&s).unwrap_or(JsonValue::String(s))),
        TaggedValue::Xml(s) => markup_to_json(&s, false).ok(),
        TaggedValue::Html(s) => markup_to_json(&s, true).ok(),
        TaggedValue::Array(items) => Some(JsonValue::Array(items)),
        TaggedValue::Image(s) | TaggedValue::File(s) => Some(JsonValue::String(s)),
        TaggedValue::Json(v) => Some(v),
    }
}

fn to_xml(value: TaggedValue, opts: &MarkupOptions) -> Option<String> {
    let wrapper = opts.xml_wrapper.as_str();
    match value {
        TaggedValue::Boolean(_) | TaggedValue::Integer(_) | TaggedValue::Float(_) | TaggedValue::Text(_) => {
            Some(wrap_scalar(wrapper, &value.to_plain_string()))
        }
        TaggedValue::Json(v) => Some(json_to_xml(wrapper, &v)),
        TaggedValue::Array(items) => Some(json_to_xml(wrapper, &JsonValue::Array(items))),
        TaggedValue::Html(s) => Some(s),
        TaggedValue::Xml(_) | TaggedValue::Image(_) | TaggedValue::File(_) => None,
    }
}

fn to_html(value: TaggedValue, opts: &MarkupOptions) -> Option<String> {
    let title = opts.html_title.as_str();
    let body = match value {
        TaggedValue::Boolean(_) | TaggedValue::Integer(_) | TaggedValue::Float(_) | TaggedValue::Text(_) => {
            quick_xml::escape::escape(value.to_plain_string().as_str()).into_owned()
        }
        TaggedValue::Json(v) => json_fragment(&opts.xml_wrapper, &v),
        TaggedValue::Array(items) => json_fragment(&opts.xml_wrapper, &JsonValue::Array(items)),
        TaggedValue::Xml(s) => strip_declaration(&s).to_string(),
        TaggedValue::Html(_) | TaggedValue::Image(_) | TaggedValue::File(_) => return None,
    };
    Some(html_document(title, &body))
}

fn to_array(value: TaggedValue) -> Option<Vec<JsonValue>> {
    match value {
        TaggedValue::Boolean(_) | TaggedValue::Integer(_) | TaggedValue::Float(_) | TaggedValue::Text(_) => {
            Some(vec![value.to_json()])
        }
        TaggedValue::Json(JsonValue::Array(items)) => Some(items),
        TaggedValue::Json(v) => Some(vec![v]),
        TaggedValue::Xml(s) => markup_to_json(&s, false).ok().map(|tree| vec![tree]),
        TaggedValue::Html(s) => markup_to_json(&s, true).ok().map(|tree| vec![tree]),
        TaggedValue::Array(items) => Some(items),
        TaggedValue::Image(_) | TaggedValue::File(_) => None,
    }
}
