use std::collections::BTreeMap;

use apigate_core::{ResourceTree, TaggedValue};

use crate::context::ExecutionContext;
use crate::error::{ErrorKind, ExecutionError};
use crate::format::{Formatter, OutputFormat};
use crate::http::{send_with_retry, HttpRequestParts, NetworkPolicy, SendOptions};
use crate::retry::RetryConfig;

/// Send a successful result to every remote destination declared in `output`.
///
/// Failures are logged. They only fail the request when the output node sets
/// `report_error`.
pub async fn deliver(
    tree: &ResourceTree,
    value: &TaggedValue,
    ctx: &ExecutionContext,
    formatter: &Formatter,
) -> Result<(), ExecutionError> {
    let policy = NetworkPolicy::from(&ctx.config.network);
    let retry = RetryConfig::from(&ctx.config.retry);

    for node in tree.output_nodes() {
        let fail = |message: String| {
            tracing::warn!(output = %node.id, %message, "output delivery failed");
            if node.report_error {
                Err(ExecutionError::new(ErrorKind::UpstreamFailure, message).at(node.id.clone()))
            } else {
                Ok(())
            }
        };

        let format: OutputFormat = match node.format.parse() {
            Ok(f) => f,
            Err(e) => {
                fail(e)?;
                continue;
            }
        };
        let rendered = match formatter.render(value.clone(), format) {
            Ok(r) => r,
            Err(e) => {
                fail(e.message)?;
                continue;
            }
        };

        for destination in &node.destination {
            let url = match url::Url::parse(destination) {
                Ok(u) => u,
                Err(e) => {
                    fail(format!("invalid destination {destination}: {e}"))?;
                    continue;
                }
            };
            let mut headers = BTreeMap::new();
            headers.insert("content-type".to_string(), rendered.content_type.clone());
            let req = HttpRequestParts {
                method: node.method.as_str().to_ascii_uppercase(),
                url,
                headers,
                body: rendered.body.clone(),
            };
            let opts = SendOptions {
                policy: &policy,
                retry: &retry,
                timeout: ctx.config.http.timeout(),
                max_response_bytes: ctx.config.http.max_response_bytes,
            };
            match send_with_retry(ctx.http.as_ref(), req, opts).await {
                Ok(resp) if resp.is_success() => {
                    tracing::debug!(output = %node.id, %destination, status = resp.status, "output delivered");
                }
                Ok(resp) => fail(format!("{destination} returned status {}", resp.status))?,
                Err(e) => fail(format!("{destination}: {e}"))?,
            }
        }
    }
    Ok(())
}
