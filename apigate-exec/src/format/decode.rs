use std::collections::BTreeMap;

use apigate_core::TaggedValue;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value as JsonValue;

use crate::context::IncomingRequest;
use crate::error::{ErrorKind, ExecutionError};

/// A request body split into named parameters and, for non-form bodies, the whole value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBody {
    pub params: BTreeMap<String, String>,
    pub payload: Option<TaggedValue>,
}

impl DecodedBody {
    /// Merge into `request`; body parameters shadow query parameters on lookup.
    pub fn apply(self, request: &mut IncomingRequest) {
        request.body.extend(self.params);
        if self.payload.is_some() {
            request.payload = self.payload;
        }
    }
}

/// Decode a request body according to its content type.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedBody, ExecutionError> {
    if bytes.is_empty() {
        return Ok(DecodedBody::default());
    }
    let media = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if media == "application/x-www-form-urlencoded" {
        let params = url::form_urlencoded::parse(bytes).into_owned().collect();
        return Ok(DecodedBody { params, payload: None });
    }
    if media.starts_with("image/") {
        let payload = TaggedValue::Image(format!("data:{media};base64,{}", STANDARD.encode(bytes)));
        return Ok(DecodedBody {
            params: BTreeMap::new(),
            payload: Some(payload),
        });
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|_| ExecutionError::new(ErrorKind::InvalidInput, "request body is not valid UTF-8"))?;
    let payload = if media == "application/json" || media.ends_with("+json") {
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|e| ExecutionError::new(ErrorKind::InvalidInput, format!("invalid JSON body: {e}")))?;
        return Ok(from_json(value));
    } else if media == "application/xml" || media == "text/xml" || media.ends_with("+xml") {
        TaggedValue::Xml(text.to_string())
    } else if media == "text/html" {
        TaggedValue::Html(text.to_string())
    } else {
        TaggedValue::Text(text.to_string())
    };
    Ok(DecodedBody {
        params: BTreeMap::new(),
        payload: Some(payload),
    })
}

fn from_json(value: JsonValue) -> DecodedBody {
    let params = match &value {
        JsonValue::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect(),
        _ => BTreeMap::new(),
    };
    DecodedBody {
        params,
        payload: Some(TaggedValue::Json(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apigate_core::Method;

    #[test]
    fn form_bodies_become_parameters() {
        let d = decode_body(b"a=1&b=two+words", Some("application/x-www-form-urlencoded")).unwrap();
        assert_eq!(d.params.get("b").map(String::as_str), Some("two words"));
        assert!(d.payload.is_none());

        let mut req = IncomingRequest::new(Method::Post, "x").with_query("a", "q");
        d.apply(&mut req);
        assert_eq!(req.param("a"), Some("1"));
    }

    #[test]
    fn json_members_are_parameters() {
        let d = decode_body(br#"{"name":"x","n":2}"#, Some("application/json; charset=utf-8")).unwrap();
        assert_eq!(d.params.get("name").map(String::as_str), Some("x"));
        assert_eq!(d.params.get("n").map(String::as_str), Some("2"));
        assert!(matches!(d.payload, Some(TaggedValue::Json(_))));
        let err = decode_body(b"{nope", Some("application/json")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn markup_and_text() {
        let d = decode_body(b"<a/>", Some("text/xml")).unwrap();
        assert_eq!(d.payload, Some(TaggedValue::Xml("<a/>".into())));
        let d = decode_body(b"hi", None).unwrap();
        assert_eq!(d.payload, Some(TaggedValue::Text("hi".into())));
    }
}
