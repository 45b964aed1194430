use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Text mode renders structured results as YAML; JSON mode as one compact line.
pub fn print_result<T: Serialize>(format: OutputFormat, quiet: bool, result: &T) {
    if quiet {
        return;
    }
    let rendered = match format {
        OutputFormat::Text => serde_yaml::to_string(result).map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::to_string(result)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
    };
    match rendered {
        Ok(s) => print!("{s}"),
        Err(e) => print_error(format, quiet, &format!("failed to render result: {e}")),
    }
}

pub fn print_error(format: OutputFormat, quiet: bool, message: &str) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Text => eprintln!("error: {message}"),
        OutputFormat::Json => {
            let err = serde_json::json!({"result": "error", "message": message});
            eprintln!("{err}");
        }
    }
}
