mod decode;

use std::fmt;
use std::str::FromStr;

use apigate_core::{convert_with, MarkupOptions, TaggedValue, TypeTag};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::config::GatewayConfig;
use crate::error::{ErrorKind, ExecutionError};
use crate::status::status_for;

pub use decode::{decode_body, DecodedBody};

/// Wire formats a result can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Xml,
    Html,
    #[serde(alias = "plain")]
    Text,
    Image,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
            OutputFormat::Html => "html",
            OutputFormat::Text => "text",
            OutputFormat::Image => "image",
        }
    }

    /// Tagged type a value must convert to before serialization.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            OutputFormat::Json => TypeTag::Json,
            OutputFormat::Xml => TypeTag::Xml,
            OutputFormat::Html => TypeTag::Html,
            OutputFormat::Text => TypeTag::Text,
            OutputFormat::Image => TypeTag::Image,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Xml => "application/xml",
            OutputFormat::Html => "text/html",
            OutputFormat::Text => "text/plain",
            OutputFormat::Image => "application/octet-stream",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "xml" => Ok(OutputFormat::Xml),
            "html" => Ok(OutputFormat::Html),
            "text" | "plain" => Ok(OutputFormat::Text),
            "image" => Ok(OutputFormat::Image),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Pick the first supported media range of an `Accept` header.
pub fn negotiate(accept: Option<&str>, default: OutputFormat) -> OutputFormat {
    let Some(accept) = accept else {
        return default;
    };
    for range in accept.split(',') {
        let media = range.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        let format = match media.as_str() {
            "*/*" | "" => return default,
            "application/json" | "text/json" => OutputFormat::Json,
            "application/xml" | "text/xml" => OutputFormat::Xml,
            "text/html" | "application/xhtml+xml" => OutputFormat::Html,
            "text/plain" => OutputFormat::Text,
            m if m.starts_with("image/") => OutputFormat::Image,
            m if m.ends_with("+json") => OutputFormat::Json,
            m if m.ends_with("+xml") => OutputFormat::Xml,
            _ => continue,
        };
        return format;
    }
    default
}

/// A serialized body and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl Rendered {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Renders tagged values, and errors, into wire bodies.
#[derive(Debug, Clone)]
pub struct Formatter {
    markup: MarkupOptions,
    wrap_json: bool,
    default_format: OutputFormat,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(&GatewayConfig::default())
    }
}

impl Formatter {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            markup: config.markup(),
            wrap_json: config.output.wrap_json,
            default_format: config.output.default_format,
        }
    }

    pub fn default_format(&self) -> OutputFormat {
        self.default_format
    }

    /// Convert `value` to the format's type and serialize it, with no envelope.
    pub fn render(&self, value: TaggedValue, format: OutputFormat) -> Result<Rendered, ExecutionError> {
        let converted = convert_with(value, format.type_tag(), &self.markup)
            .map_err(|e| ExecutionError::new(ErrorKind::UnrenderableFormat, e.to_string()))?;
        match converted {
            TaggedValue::Json(v) => Ok(Rendered {
                body: serde_json::to_vec(&v)
                    .map_err(|e| ExecutionError::new(ErrorKind::UnrenderableFormat, e.to_string()))?,
                content_type: format.content_type().to_string(),
            }),
            TaggedValue::Image(src) => render_image(&src),
            other => Ok(Rendered {
                body: other.to_plain_string().into_bytes(),
                content_type: format.content_type().to_string(),
            }),
        }
    }

    /// Render a successful result, wrapping JSON bodies in `{result: "ok", data}` when configured.
    pub fn render_success(&self, value: TaggedValue, format: OutputFormat) -> Result<Rendered, ExecutionError> {
        if format != OutputFormat::Json || !self.wrap_json {
            return self.render(value, format);
        }
        let data = match convert_with(value, TypeTag::Json, &self.markup) {
            Ok(TaggedValue::Json(v)) => v,
            Ok(other) => other.to_json(),
            Err(e) => return Err(ExecutionError::new(ErrorKind::UnrenderableFormat, e.to_string())),
        };
        self.render(TaggedValue::Json(json!({"result": "ok", "data": data})), format)
    }

    /// Error envelope `{result: "error", data: {code, id, message}}` in the
    /// requested format, or in the default format when that one cannot carry it.
    pub fn render_error(&self, err: &ExecutionError, format: OutputFormat) -> Rendered {
        let envelope = error_envelope(err);
        for candidate in [format, self.default_format] {
            if let Ok(rendered) = self.render(TaggedValue::Json(envelope.clone()), candidate) {
                return rendered;
            }
        }
        Rendered {
            body: envelope.to_string().into_bytes(),
            content_type: OutputFormat::Json.content_type().to_string(),
        }
    }
}

pub fn error_envelope(err: &ExecutionError) -> JsonValue {
    json!({
        "result": "error",
        "data": {
            "code": status_for(err.kind).code,
            "id": err.node_id,
            "message": err.message,
        }
    })
}

/// Image payloads: a data URI or raw base64 is decoded, a URL is passed on as text.
fn render_image(src: &str) -> Result<Rendered, ExecutionError> {
    let unrenderable = |msg: String| ExecutionError::new(ErrorKind::UnrenderableFormat, msg);
    let src = src.trim();
    if src.starts_with("http://") || src.starts_with("https://") {
        return Ok(Rendered {
            body: src.as_bytes().to_vec(),
            content_type: "text/uri-list".to_string(),
        });
    }
    let (media, payload) = match src.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((meta, payload)) => {
            let media = meta.split(';').next().filter(|m| !m.is_empty());
            (media.unwrap_or("application/octet-stream").to_string(), payload)
        }
        None => (OutputFormat::Image.content_type().to_string(), src),
    };
    let body = STANDARD
        .decode(payload)
        .map_err(|e| unrenderable(format!("invalid image payload: {e}")))?;
    Ok(Rendered {
        body,
        content_type: media,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_picks_first_supported_range() {
        let d = OutputFormat::Json;
        assert_eq!(negotiate(None, d), d);
        assert_eq!(negotiate(Some("text/html,application/xml;q=0.9"), d), OutputFormat::Html);
        assert_eq!(negotiate(Some("application/foo, text/xml"), d), OutputFormat::Xml);
        assert_eq!(negotiate(Some("*/*"), OutputFormat::Text), OutputFormat::Text);
        assert_eq!(negotiate(Some("application/foo"), d), d);
    }

    #[test]
    fn format_names_parse_with_alias() {
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn images_decode_from_data_uri() {
        let r = render_image("data:image/png;base64,AQID").unwrap();
        assert_eq!(r.body, vec![1, 2, 3]);
        assert_eq!(r.content_type, "image/png");
        let r = render_image("https://example.com/a.png").unwrap();
        assert_eq!(r.content_type, "text/uri-list");
        assert!(render_image("data:image/png;base64,@@").is_err());
    }
}
