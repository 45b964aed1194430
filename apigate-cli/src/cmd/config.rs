use std::path::PathBuf;
use std::sync::Arc;

use apigate_exec::{GatewayConfig, Registry, ResourceAuthor};
use apigate_store::{PostgresStore, ResourceStore};

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::utils::redact_url_password;
use crate::{ConfigArgs, OutputArgs, StoreArgs};

/// Defaults, then the settings file, then individual flags.
pub fn load_config(args: &ConfigArgs, output: &OutputArgs) -> Option<GatewayConfig> {
    let mut config = read_config_file(args, output)?;
    if let Some(ms) = args.timeout_ms {
        config.http.timeout_ms = ms;
    }
    if !args.allow_hosts.is_empty() {
        config.network.hosts = args.allow_hosts.iter().map(|h| h.to_ascii_lowercase()).collect();
    }
    if args.no_cache {
        config.cache.enabled = false;
    }
    Some(config)
}

/// `--config`, then APIGATE_CONFIG, else defaults.
fn read_config_file(args: &ConfigArgs, output: &OutputArgs) -> Option<GatewayConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var("APIGATE_CONFIG").ok().map(PathBuf::from));
    let Some(path) = path else {
        return Some(GatewayConfig::default());
    };
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read config {}: {e}", path.display()),
            );
            return None;
        }
    };
    if let Ok(v) = serde_json::from_str(&content) {
        return Some(v);
    }
    match serde_yaml::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("invalid config {}: {e}", path.display()),
            );
            None
        }
    }
}

pub fn get_database_url(store_arg: Option<String>, output: &OutputArgs) -> Option<String> {
    let url = store_arg
        .or_else(|| std::env::var("APIGATE_DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok());
    if url.is_none() {
        print_error(
            output.format,
            output.quiet,
            "missing database URL. Set --store <url>, APIGATE_DATABASE_URL, or DATABASE_URL environment variable",
        );
    }
    url
}

pub async fn connect_store(store: &StoreArgs, output: &OutputArgs) -> Option<PostgresStore> {
    let url = get_database_url(store.store.clone(), output)?;
    match PostgresStore::connect(&url, store.max_connections).await {
        Ok(s) => Some(s),
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to connect to {}: {e}", redact_url_password(&url)),
            );
            None
        }
    }
}

/// Author bound to the configured store, or the exit code to return.
pub async fn store_author(store: &StoreArgs, output: &OutputArgs) -> Result<ResourceAuthor, i32> {
    let pg = connect_store(store, output)
        .await
        .ok_or(exit_codes::RUNTIME_ERROR)?;
    let store: Arc<dyn ResourceStore> = Arc::new(pg);
    Ok(ResourceAuthor::new(store, Arc::new(Registry::builtin())))
}

pub fn config_cmd(args: ConfigArgs, output: OutputArgs) -> i32 {
    match load_config(&args, &output) {
        Some(config) => {
            print_result(output.format, output.quiet, &config);
            exit_codes::SUCCESS
        }
        None => exit_codes::RUNTIME_ERROR,
    }
}
