#![forbid(unsafe_code)]

//! Request-time side of the gateway: the operation registry and built-in
//! operations, the execution engine with its result cache, output rendering,
//! and resource authoring.

pub mod author;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod format;
pub mod gateway;
pub mod http;
pub mod operation;
pub mod ops;
pub mod output;
pub mod retry;
pub mod status;

pub use crate::author::{AuthorError, ResourceAuthor};
pub use crate::config::GatewayConfig;
pub use crate::context::{ExecutionContext, IncomingRequest};
pub use crate::engine::Engine;
pub use crate::error::{ErrorKind, ExecutionError, OperationError};
pub use crate::format::{decode_body, negotiate, Formatter, OutputFormat, Rendered};
pub use crate::gateway::{Gateway, Response};
pub use crate::http::{HttpClient, ReqwestHttpClient};
pub use crate::operation::{InputValue, Inputs, Operation, OperationFactory, Registry};
pub use crate::status::{status_for, ErrorStatus};
