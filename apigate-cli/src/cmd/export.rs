use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::{parse_doc_format, parse_method};
use crate::{OutputArgs, ResourceArgs, StoreArgs};

use super::config::store_author;

pub async fn export_cmd(resource: ResourceArgs, doc_format: &str, store: StoreArgs, output: OutputArgs) -> i32 {
    let (method, format) = match (parse_method(&resource.method), parse_doc_format(doc_format)) {
        (Ok(m), Ok(f)) => (m, f),
        (Err(e), _) | (_, Err(e)) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let author = match store_author(&store, &output).await {
        Ok(a) => a,
        Err(code) => return code,
    };

    match author
        .export(resource.application_id, method, &resource.uri, format)
        .await
    {
        Ok(Some(doc)) => {
            if output.format == OutputFormat::Text {
                if !output.quiet {
                    print!("{doc}");
                }
            } else {
                print_result(output.format, output.quiet, &serde_json::json!({ "document": doc }));
            }
            exit_codes::SUCCESS
        }
        Ok(None) => {
            print_error(
                output.format,
                output.quiet,
                &format!("no resource for {method} {} in application {}", resource.uri, resource.application_id),
            );
            exit_codes::EXECUTION_FAILED
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            exit_codes::RUNTIME_ERROR
        }
    }
}
