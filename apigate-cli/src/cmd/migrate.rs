use serde::Serialize;

use apigate_store::run_migrations;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::redact_url_password;
use crate::{OutputArgs, StoreArgs};

use super::config::{connect_store, get_database_url};

#[derive(Serialize)]
struct MigrateResult {
    database: String,
    applied: bool,
}

pub async fn migrate_cmd(store: StoreArgs, output: OutputArgs) -> i32 {
    let Some(pg) = connect_store(&store, &output).await else {
        return exit_codes::RUNTIME_ERROR;
    };
    let database = get_database_url(store.store.clone(), &output)
        .map(|u| redact_url_password(&u))
        .unwrap_or_default();

    if let Err(e) = run_migrations(pg.pool()).await {
        tracing::error!(error = %e, "resource schema migration failed");
        print_error(output.format, output.quiet, &format!("migration failed on {database}: {e}"));
        return exit_codes::RUNTIME_ERROR;
    }
    tracing::info!(%database, "resource schema is current");
    if output.format == OutputFormat::Text {
        if !output.quiet {
            println!("ok: resource schema is current on {database}");
        }
    } else {
        print_result(output.format, output.quiet, &MigrateResult { database, applied: true });
    }
    exit_codes::SUCCESS
}
