use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::parse_method;
use crate::{OutputArgs, ResourceArgs, StoreArgs};

use super::config::store_author;

#[derive(Serialize)]
struct DeleteResult {
    deleted: bool,
}

pub async fn delete_cmd(resource: ResourceArgs, store: StoreArgs, output: OutputArgs) -> i32 {
    let method = match parse_method(&resource.method) {
        Ok(m) => m,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let author = match store_author(&store, &output).await {
        Ok(a) => a,
        Err(code) => return code,
    };

    match author.delete(resource.application_id, method, &resource.uri).await {
        Ok(deleted) => {
            if output.format == OutputFormat::Text && !output.quiet {
                if deleted {
                    println!("ok: deleted {method} {}", resource.uri);
                } else {
                    println!("nothing to delete for {method} {}", resource.uri);
                }
            } else {
                print_result(output.format, output.quiet, &DeleteResult { deleted });
            }
            if deleted {
                exit_codes::SUCCESS
            } else {
                exit_codes::EXECUTION_FAILED
            }
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            exit_codes::RUNTIME_ERROR
        }
    }
}
