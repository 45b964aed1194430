mod registry;

use std::collections::BTreeMap;

use apigate_core::{convert, OperationContract, TaggedValue, TypeTag};
use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::OperationError;

pub use registry::{OperationFactory, Registry};

/// Runtime behaviour of one operation kind.
#[async_trait]
pub trait Operation: Send + Sync {
    fn contract(&self) -> OperationContract;

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError>;
}

/// A resolved input: one value, or the ordered results of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    One(TaggedValue),
    Many(Vec<TaggedValue>),
}

impl InputValue {
    pub fn first(&self) -> Option<&TaggedValue> {
        match self {
            InputValue::One(v) => Some(v),
            InputValue::Many(vs) => vs.first(),
        }
    }

    pub fn values(&self) -> Vec<&TaggedValue> {
        match self {
            InputValue::One(v) => vec![v],
            InputValue::Many(vs) => vs.iter().collect(),
        }
    }
}

/// Resolved inputs of a node, keyed by input name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    values: BTreeMap<String, InputValue>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: InputValue) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<TaggedValue>) -> Self {
        self.insert(name, InputValue::One(value.into()));
        self
    }

    pub fn with_many(mut self, name: impl Into<String>, values: Vec<TaggedValue>) -> Self {
        self.insert(name, InputValue::Many(values));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.values.get(name)
    }

    pub fn one(&self, name: &str) -> Option<&TaggedValue> {
        self.values.get(name).and_then(InputValue::first)
    }

    pub fn require(&self, name: &str) -> Result<&TaggedValue, OperationError> {
        self.one(name)
            .ok_or_else(|| OperationError::invalid_input(format!("missing input: {name}")))
    }

    /// Every value supplied to `name`, in order. Absent inputs yield none.
    pub fn many(&self, name: &str) -> Vec<&TaggedValue> {
        self.values.get(name).map(InputValue::values).unwrap_or_default()
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.one(name).map(TaggedValue::to_plain_string)
    }

    pub fn boolean(&self, name: &str, default: bool) -> Result<bool, OperationError> {
        match self.one(name) {
            None => Ok(default),
            Some(v) => match convert(v.clone(), TypeTag::Boolean)? {
                TaggedValue::Boolean(b) => Ok(b),
                _ => Ok(default),
            },
        }
    }

    pub fn integer(&self, name: &str) -> Result<Option<i64>, OperationError> {
        match self.one(name) {
            None => Ok(None),
            Some(v) => match convert(v.clone(), TypeTag::Integer)? {
                TaggedValue::Integer(i) => Ok(Some(i)),
                _ => Ok(None),
            },
        }
    }
}
