#![forbid(unsafe_code)]

pub mod convert;
pub mod error;
pub mod parser;
pub mod types;
pub mod validate;

pub use crate::convert::{convert, convert_with, text_truthiness, MarkupOptions};
pub use crate::error::{ApigateError, ConversionError, ParseError, ValidationError, Violation, ViolationKind};
pub use crate::parser::{parse_resource_str, parse_str, render_resource_str, DocumentFormat, ParsedResource};
pub use crate::types::{
    normalize_uri, Cardinality, Category, ContractSource, InputSpec, Method, NodeValue, OperationContract,
    OperationNode, OutputNode, OutputTarget, ResourceTree, TaggedValue, TypeTag,
};
pub use crate::validate::{validate_resource, Validate};
