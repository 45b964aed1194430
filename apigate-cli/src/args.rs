use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Postgres URL. Falls back to APIGATE_DATABASE_URL, then DATABASE_URL.
    #[arg(long)]
    pub store: Option<String>,
    #[arg(long, default_value_t = 5)]
    pub max_connections: u32,
}

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// Gateway settings file (YAML or JSON). Falls back to APIGATE_CONFIG.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Per-attempt timeout for outbound requests.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Restrict outbound requests to these hosts (`*.example.com` allowed).
    #[arg(long = "allow-host")]
    pub allow_hosts: Vec<String>,
    #[arg(long)]
    pub no_cache: bool,
}

/// Identifies a stored resource.
#[derive(Debug, Args, Clone)]
pub struct ResourceArgs {
    #[arg(long = "app-id", alias = "app", value_name = "ID")]
    pub application_id: i64,
    #[arg(long, default_value = "get")]
    pub method: String,
    #[arg(long)]
    pub uri: String,
}

/// The simulated client request for `run`.
#[derive(Debug, Args, Clone)]
pub struct RequestArgs {
    /// Override the resource's method.
    #[arg(long)]
    pub method: Option<String>,
    /// Request URI; defaults to the resource's own URI.
    #[arg(long)]
    pub uri: Option<String>,
    #[arg(long = "param", alias = "set", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
    #[arg(long = "header", short = 'H', value_name = "NAME: VALUE")]
    pub headers: Vec<String>,
    /// File whose contents become the request body.
    #[arg(long)]
    pub body: Option<PathBuf>,
    #[arg(long)]
    pub content_type: Option<String>,
    #[arg(long = "app-id", alias = "app", value_name = "ID", default_value_t = 1)]
    pub application_id: i64,
}
