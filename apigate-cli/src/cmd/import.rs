use std::path::Path;

use apigate_core::DocumentFormat;
use apigate_exec::AuthorError;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, StoreArgs};

use super::config::store_author;

#[derive(Serialize)]
struct ImportResult {
    id: i64,
    application_id: i64,
    method: String,
    uri: String,
    name: String,
}

pub async fn import_cmd(path: &Path, application_id: i64, store: StoreArgs, output: OutputArgs) -> i32 {
    let content = match std::fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let author = match store_author(&store, &output).await {
        Ok(a) => a,
        Err(code) => return code,
    };

    match author.save(&content, DocumentFormat::Auto, application_id).await {
        Ok(record) => {
            if output.format == OutputFormat::Text && !output.quiet {
                println!(
                    "ok: saved {} {} as resource {} for application {}",
                    record.method, record.uri, record.id, record.application_id
                );
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &ImportResult {
                        id: record.id,
                        application_id: record.application_id,
                        method: record.method,
                        uri: record.uri,
                        name: record.name,
                    },
                );
            }
            exit_codes::SUCCESS
        }
        Err(AuthorError::Invalid(invalid)) => {
            print_error(output.format, output.quiet, &invalid.to_string());
            if !output.quiet {
                for v in &invalid.violations {
                    eprintln!("- {} ({}): {}", v.node_id, v.kind, v.message);
                }
            }
            exit_codes::VALIDATION_FAILED
        }
        Err(e @ AuthorError::Parse(_)) => {
            print_error(output.format, output.quiet, &e.to_string());
            exit_codes::VALIDATION_FAILED
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            exit_codes::RUNTIME_ERROR
        }
    }
}
