use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and validate a resource document.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Execute a resource document against a simulated request.
    Run {
        path: PathBuf,
        #[command(flatten)]
        request: RequestArgs,
        /// Output format (json, xml, html, text, image). Defaults to content negotiation.
        #[arg(long)]
        render: Option<String>,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Validate a resource document and save it to the store.
    Import {
        path: PathBuf,
        #[arg(long = "app-id", alias = "app", value_name = "ID")]
        application_id: i64,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print a stored resource as YAML or JSON.
    Export {
        #[command(flatten)]
        resource: ResourceArgs,
        #[arg(long = "as", default_value = "yaml")]
        doc_format: String,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Remove a stored resource.
    Delete {
        #[command(flatten)]
        resource: ResourceArgs,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List the registered operation kinds and their contracts.
    Operations {
        /// Show a single kind.
        kind: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Apply the store's schema migrations.
    Migrate {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the effective gateway settings.
    Config {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}
