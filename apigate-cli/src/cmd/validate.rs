use std::path::Path;

use apigate_core::{parse_resource_str, validate_resource, DocumentFormat, ParseError, Violation};
use apigate_exec::Registry;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    format: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<Violation>,
}

pub async fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
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

    let parsed = match parse_resource_str(&content, DocumentFormat::Auto) {
        Ok(p) => p,
        Err(ParseError::UnknownFormat) => {
            print_error(
                output.format,
                output.quiet,
                "input is neither a valid JSON nor a valid YAML resource",
            );
            return exit_codes::VALIDATION_FAILED;
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let registry = Registry::builtin();
    let format = format!("{:?}", parsed.format);
    match validate_resource(&parsed.resource, &registry) {
        Ok(()) => {
            if output.format == OutputFormat::Text && !output.quiet {
                println!(
                    "ok: valid resource {} {} ({format})",
                    parsed.resource.method,
                    parsed.resource.normalized_uri()
                );
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &ValidateResult {
                        valid: true,
                        format,
                        violations: vec![],
                    },
                );
            }
            exit_codes::SUCCESS
        }
        Err(err) => {
            if output.format == OutputFormat::Text && !output.quiet {
                eprintln!("error: validation failed");
                for v in &err.violations {
                    match &v.input {
                        Some(input) => eprintln!("- {} ({}.{input}): {}", v.node_id, v.kind, v.message),
                        None => eprintln!("- {} ({}): {}", v.node_id, v.kind, v.message),
                    }
                }
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &ValidateResult {
                        valid: false,
                        format,
                        violations: err.violations,
                    },
                );
            }
            exit_codes::VALIDATION_FAILED
        }
    }
}
