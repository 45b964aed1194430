use std::collections::BTreeMap;
use std::time::Duration;

use apigate_core::{Cardinality, Category, InputSpec, OperationContract, TaggedValue, TypeTag};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value as JsonValue};

use crate::context::ExecutionContext;
use crate::error::OperationError;
use crate::http::{send_with_retry, HttpRequestParts, NetworkPolicy, SendOptions};
use crate::operation::{Inputs, Operation};
use crate::retry::RetryConfig;

/// Fetch a remote endpoint and return its body as a tagged value.
pub struct Url;

#[async_trait]
impl Operation for Url {
    fn contract(&self) -> OperationContract {
        OperationContract::new("url", "URL", Category::Endpoint, "Fetch the result of a remote URL.")
            .input(
                "method",
                InputSpec::new("HTTP method.", Cardinality::optional())
                    .types(&[TypeTag::Text])
                    .values(["get", "post", "put", "delete", "patch"].map(|m| json!(m)))
                    .default(json!("get")),
            )
            .input("url", InputSpec::new("Remote URL.", Cardinality::required()).types(&[TypeTag::Text]))
            .input(
                "source_type",
                InputSpec::new("How to read the response body.", Cardinality::optional())
                    .types(&[TypeTag::Text])
                    .values(["json", "xml", "html", "text", "image"].map(|m| json!(m)))
                    .default(json!("json")),
            )
            .input(
                "headers",
                InputSpec::new("Request headers, as fields or `Name: value` text.", Cardinality::at_least(0)),
            )
            .input("body", InputSpec::new("Request body.", Cardinality::optional()))
            .input(
                "report_error",
                InputSpec::new("Fail on a non-2xx response.", Cardinality::optional())
                    .types(&[TypeTag::Boolean])
                    .default(json!(true)),
            )
            .input(
                "timeout_ms",
                InputSpec::new("Per-attempt timeout in milliseconds.", Cardinality::optional())
                    .types(&[TypeTag::Integer]),
            )
    }

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let raw_url = inputs.require("url")?.to_plain_string();
        let url = url::Url::parse(raw_url.trim())
            .map_err(|e| OperationError::invalid_input(format!("invalid url {raw_url}: {e}")))?;
        let method = inputs.text("method").unwrap_or_else(|| "get".to_string());
        let source_type = inputs
            .text("source_type")
            .unwrap_or_else(|| "json".to_string())
            .to_ascii_lowercase();
        let report_error = inputs.boolean("report_error", true)?;
        let timeout = match inputs.integer("timeout_ms")? {
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            _ => ctx.config.http.timeout(),
        };

        let mut headers = BTreeMap::new();
        for h in inputs.many("headers") {
            collect_header(h, &mut headers)?;
        }
        let body = match inputs.one("body") {
            None => Vec::new(),
            Some(TaggedValue::Json(v)) => {
                headers
                    .entry("content-type".to_string())
                    .or_insert_with(|| "application/json".to_string());
                v.to_string().into_bytes()
            }
            Some(v) => v.to_plain_string().into_bytes(),
        };

        let policy = NetworkPolicy::from(&ctx.config.network);
        let retry = RetryConfig::from(&ctx.config.retry);
        let req = HttpRequestParts {
            method: method.to_ascii_uppercase(),
            url: url.clone(),
            headers,
            body,
        };
        let resp = send_with_retry(
            ctx.http.as_ref(),
            req,
            SendOptions {
                policy: &policy,
                retry: &retry,
                timeout,
                max_response_bytes: ctx.config.http.max_response_bytes,
            },
        )
        .await
        .map_err(|e| {
            tracing::warn!(%url, error = %e, "upstream request failed");
            OperationError::upstream(format!("{url}: {e}"))
        })?;

        if report_error && !resp.is_success() {
            tracing::warn!(%url, status = resp.status, "upstream returned an error status");
            return Err(OperationError::upstream(format!("{url} returned status {}", resp.status)));
        }

        let content_type = resp.header("content-type").unwrap_or("").to_string();
        read_body(&source_type, resp.body, &content_type)
    }
}

fn collect_header(value: &TaggedValue, out: &mut BTreeMap<String, String>) -> Result<(), OperationError> {
    match value.to_json() {
        JsonValue::Object(map) => {
            for (k, v) in map {
                let v = match v {
                    JsonValue::String(s) => s,
                    other => other.to_string(),
                };
                out.insert(k.to_ascii_lowercase(), v);
            }
            Ok(())
        }
        JsonValue::Array(items) => {
            for item in items {
                collect_header(&TaggedValue::Json(item), out)?;
            }
            Ok(())
        }
        _ => {
            let text = value.to_plain_string();
            let (k, v) = text
                .split_once(':')
                .ok_or_else(|| OperationError::invalid_input(format!("invalid header: {text}")))?;
            out.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
            Ok(())
        }
    }
}

fn read_body(source_type: &str, body: Vec<u8>, content_type: &str) -> Result<TaggedValue, OperationError> {
    if source_type == "image" {
        let media = match content_type.split(';').next().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => "application/octet-stream".to_string(),
        };
        return Ok(TaggedValue::Image(format!("data:{media};base64,{}", STANDARD.encode(&body))));
    }
    let text = String::from_utf8(body)
        .map_err(|_| OperationError::upstream("response body is not valid UTF-8"))?;
    Ok(match source_type {
        "xml" => TaggedValue::Xml(text),
        "html" => TaggedValue::Html(text),
        "text" => TaggedValue::Text(text),
        _ if text.trim().is_empty() => TaggedValue::Json(JsonValue::String(String::new())),
        _ => TaggedValue::Json(
            serde_json::from_str(&text)
                .map_err(|e| OperationError::upstream(format!("invalid JSON response: {e}")))?,
        ),
    })
}
