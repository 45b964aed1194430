use std::fmt;

use apigate_core::ConversionError;
use apigate_store::StoreError;

/// Request-time failure categories. Transport status codes live in [`crate::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    InvalidInput,
    UpstreamFailure,
    UnsupportedConversion,
    UnrenderableFormat,
    UnresolvedResource,
    UnknownOperationKind,
    Store,
    Canceled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::UpstreamFailure => "UpstreamFailure",
            ErrorKind::UnsupportedConversion => "UnsupportedConversion",
            ErrorKind::UnrenderableFormat => "UnrenderableFormat",
            ErrorKind::UnresolvedResource => "UnresolvedResource",
            ErrorKind::UnknownOperationKind => "UnknownOperationKind",
            ErrorKind::Store => "Store",
            ErrorKind::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by an operation. The engine attributes it to a node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct OperationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl OperationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn permission_denied() -> Self {
        Self::new(ErrorKind::PermissionDenied, "permission denied")
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamFailure, message)
    }
}

impl From<ConversionError> for OperationError {
    fn from(e: ConversionError) -> Self {
        Self::new(ErrorKind::UnsupportedConversion, e.to_string())
    }
}

impl From<StoreError> for OperationError {
    fn from(e: StoreError) -> Self {
        Self::new(ErrorKind::Store, e.to_string())
    }
}

/// First unrecoverable failure of a request, with the node that raised it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutionError {
    pub kind: ErrorKind,
    pub node_id: Option<String>,
    pub message: String,
}

impl ExecutionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            node_id: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn from_operation(e: OperationError, node_id: &str) -> Self {
        Self::new(e.kind, e.message).at(node_id)
    }

    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "request canceled")
    }
}

impl From<ConversionError> for ExecutionError {
    fn from(e: ConversionError) -> Self {
        Self::new(ErrorKind::UnsupportedConversion, e.to_string())
    }
}

impl From<StoreError> for ExecutionError {
    fn from(e: StoreError) -> Self {
        Self::new(ErrorKind::Store, e.to_string())
    }
}
