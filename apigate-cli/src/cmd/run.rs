use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use apigate_core::DocumentFormat;
use apigate_exec::{decode_body, Gateway, IncomingRequest, OutputFormat as WireFormat, ReqwestHttpClient};
use apigate_store::MemoryStore;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::{parse_method, split_header, split_pair};
use crate::{ConfigArgs, OutputArgs, RequestArgs};

use super::config::load_config;

#[derive(Serialize)]
struct RunResult {
    status: u16,
    content_type: String,
    body: String,
}

/// Run a resource document once, in-process, against an empty in-memory store.
pub async fn run_cmd(
    path: &Path,
    request: RequestArgs,
    render: Option<&str>,
    config: ConfigArgs,
    output: OutputArgs,
) -> i32 {
    let fail = |message: String| {
        print_error(output.format, output.quiet, &message);
        exit_codes::RUNTIME_ERROR
    };

    let content = match std::fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) => return fail(format!("failed to read {}: {e}", path.display())),
    };
    let Some(config) = load_config(&config, &output) else {
        return exit_codes::RUNTIME_ERROR;
    };
    let http = match ReqwestHttpClient::new(&config.http.user_agent) {
        Ok(c) => c,
        Err(e) => return fail(format!("failed to build HTTP client: {e}")),
    };
    let gateway = Gateway::new(Arc::new(MemoryStore::new()), Arc::new(http), config);

    let tree = match gateway.author().check(&content, DocumentFormat::Auto) {
        Ok((tree, _)) => tree,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            if let apigate_exec::AuthorError::Invalid(invalid) = &e {
                if output.format == OutputFormat::Text && !output.quiet {
                    for v in &invalid.violations {
                        eprintln!("- {} ({}): {}", v.node_id, v.kind, v.message);
                    }
                }
            }
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let method = match request.method.as_deref().map(parse_method).transpose() {
        Ok(m) => m.unwrap_or(tree.method),
        Err(e) => return fail(e),
    };
    let uri = request.uri.clone().unwrap_or_else(|| tree.normalized_uri());
    let mut incoming = IncomingRequest::new(method, uri);
    for raw in &request.headers {
        match split_header(raw) {
            Ok((name, value)) => incoming = incoming.with_header(&name, value),
            Err(e) => return fail(e),
        }
    }
    if let Some(body_path) = &request.body {
        let bytes = match std::fs::read(body_path) {
            Ok(b) => b,
            Err(e) => return fail(format!("failed to read body {}: {e}", body_path.display())),
        };
        let content_type = request
            .content_type
            .clone()
            .or_else(|| incoming.header("content-type").map(str::to_string));
        match decode_body(&bytes, content_type.as_deref()) {
            Ok(decoded) => decoded.apply(&mut incoming),
            Err(e) => return fail(e.to_string()),
        }
    }
    for raw in &request.params {
        match split_pair(raw) {
            Ok((k, v)) => incoming = incoming.with_query(k, v),
            Err(e) => return fail(e),
        }
    }

    let format = match render.map(str::parse::<WireFormat>).transpose() {
        Ok(Some(f)) => f,
        Ok(None) => gateway.negotiate(&incoming),
        Err(e) => return fail(e),
    };

    let ctx = gateway.context(incoming, request.application_id);
    let cancel = ctx.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, canceling request");
            cancel.cancel();
        }
    });
    tracing::info!(request_id = %ctx.request_id, resource = %tree.name, %format, "running resource");
    let response = gateway.run(&tree, &ctx, format).await;
    interrupt.abort();

    if !output.quiet {
        match output.format {
            OutputFormat::Text => {
                let mut stdout = std::io::stdout().lock();
                let written = stdout.write_all(&response.body).and_then(|_| {
                    if response.content_type.starts_with("text/") || response.content_type.contains("json") {
                        stdout.write_all(b"\n")
                    } else {
                        Ok(())
                    }
                });
                if let Err(e) = written {
                    return fail(format!("failed to write response: {e}"));
                }
            }
            OutputFormat::Json => print_result(
                output.format,
                false,
                &RunResult {
                    status: response.status,
                    content_type: response.content_type.clone(),
                    body: response.text(),
                },
            ),
        }
    }

    if response.status < 400 {
        exit_codes::SUCCESS
    } else {
        exit_codes::EXECUTION_FAILED
    }
}
