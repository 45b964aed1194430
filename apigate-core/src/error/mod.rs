use std::fmt;

use thiserror::Error;

use crate::types::TypeTag;

#[derive(Debug, Error)]
pub enum ApigateError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to auto-detect document format (neither valid JSON nor valid YAML)")]
    UnknownFormat,
}

/// A source/target pair the conversion matrix cannot map, or a value of a
/// supported pair whose data cannot be represented in the target type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot cast {from} to {to}")]
pub struct ConversionError {
    pub from: TypeTag,
    pub to: TypeTag,
}

impl ConversionError {
    pub fn new(from: TypeTag, to: TypeTag) -> Self {
        Self { from, to }
    }
}

#[derive(Debug, Error)]
#[error("resource failed validation ({violations_len} violations)")]
pub struct ValidationError {
    pub violations: Vec<Violation>,
    violations_len: usize,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        let violations_len = violations.len();
        Self {
            violations,
            violations_len,
        }
    }

    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    UnknownOperationKind,
    CardinalityViolation,
    UnexpectedInput,
    InvalidFragmentReference,
    LiteralNotAllowed,
    InvalidLiteral,
    DisallowedNestedKind,
    DuplicateNodeId,
    MissingNodeId,
    InvalidResource,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::UnknownOperationKind => "UnknownOperationKind",
            ViolationKind::CardinalityViolation => "CardinalityViolation",
            ViolationKind::UnexpectedInput => "UnexpectedInput",
            ViolationKind::InvalidFragmentReference => "InvalidFragmentReference",
            ViolationKind::LiteralNotAllowed => "LiteralNotAllowed",
            ViolationKind::InvalidLiteral => "InvalidLiteral",
            ViolationKind::DisallowedNestedKind => "DisallowedNestedKind",
            ViolationKind::DuplicateNodeId => "DuplicateNodeId",
            ViolationKind::MissingNodeId => "MissingNodeId",
            ViolationKind::InvalidResource => "InvalidResource",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// Id of the offending node, or a `$.`-style path for resource-level problems.
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(
        node_id: impl Into<String>,
        input: Option<&str>,
        kind: ViolationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            input: input.map(str::to_string),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.input {
            Some(input) => write!(f, "{} [{}.{}]: {}", self.kind, self.node_id, input, self.message),
            None => write!(f, "{} [{}]: {}", self.kind, self.node_id, self.message),
        }
    }
}
