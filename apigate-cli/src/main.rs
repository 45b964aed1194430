use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;
mod utils;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "apigate", version, about = "Declarative API gateway resources")]
struct Cli {
    /// Log filter, e.g. `debug` or `apigate_exec=trace`. RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

/// Logs go to stderr.
fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate { path, output } => cmd::validate::validate_cmd(&path, output).await,
        Command::Run {
            path,
            request,
            render,
            config,
            output,
        } => cmd::run::run_cmd(&path, request, render.as_deref(), config, output).await,
        Command::Import {
            path,
            application_id,
            store,
            output,
        } => cmd::import::import_cmd(&path, application_id, store, output).await,
        Command::Export {
            resource,
            doc_format,
            store,
            output,
        } => cmd::export::export_cmd(resource, &doc_format, store, output).await,
        Command::Delete {
            resource,
            store,
            output,
        } => cmd::delete::delete_cmd(resource, store, output).await,
        Command::Operations { kind, output } => cmd::operations::operations_cmd(kind.as_deref(), output),
        Command::Migrate { store, output } => cmd::migrate::migrate_cmd(store, output).await,
        Command::Config { config, output } => cmd::config::config_cmd(config, output),
    }
}
