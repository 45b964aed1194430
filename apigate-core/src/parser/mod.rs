use serde::de::DeserializeOwned;

use crate::error::ParseError;
use crate::types::ResourceTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedResource {
    pub resource: ResourceTree,
    pub format: DocumentFormat,
}

pub fn parse_resource_str(input: &str, format: DocumentFormat) -> Result<ParsedResource, ParseError> {
    let (resource, format) = parse_str::<ResourceTree>(input, format)?;
    Ok(ParsedResource { resource, format })
}

/// Decode any document type with the same JSON/YAML detection as resources.
pub fn parse_str<T: DeserializeOwned>(
    input: &str,
    format: DocumentFormat,
) -> Result<(T, DocumentFormat), ParseError> {
    match format {
        DocumentFormat::Json => Ok((serde_json::from_str(input)?, format)),
        DocumentFormat::Yaml => Ok((serde_yaml::from_str(input)?, format)),
        DocumentFormat::Auto => parse_auto(input),
    }
}

fn parse_auto<T: DeserializeOwned>(input: &str) -> Result<(T, DocumentFormat), ParseError> {
    // JSON documents always open with `{` or `[`.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<T>(input) {
            Ok(doc) => Ok((doc, DocumentFormat::Json)),
            // Flow-style YAML also starts with a brace.
            Err(e) => serde_yaml::from_str::<T>(input)
                .map(|doc| (doc, DocumentFormat::Yaml))
                .map_err(|_| ParseError::Json(e)),
        };
    }

    match serde_yaml::from_str::<T>(input) {
        Ok(doc) => Ok((doc, DocumentFormat::Yaml)),
        Err(e) => match serde_json::from_str::<T>(input) {
            Ok(doc) => Ok((doc, DocumentFormat::Json)),
            // Text that reads as a bare YAML scalar is neither kind of document.
            Err(_) => match serde_yaml::from_str::<serde_yaml::Value>(input) {
                Ok(serde_yaml::Value::Mapping(_) | serde_yaml::Value::Sequence(_)) | Err(_) => {
                    Err(ParseError::Yaml(e))
                }
                Ok(_) => Err(ParseError::UnknownFormat),
            },
        },
    }
}

/// Serialize a resource back to text. `Auto` renders YAML.
pub fn render_resource_str(resource: &ResourceTree, format: DocumentFormat) -> Result<String, ParseError> {
    match format {
        DocumentFormat::Json => Ok(serde_json::to_string_pretty(resource)?),
        DocumentFormat::Yaml | DocumentFormat::Auto => Ok(serde_yaml::to_string(resource)?),
    }
}
