use apigate_core::{convert, Cardinality, Category, InputSpec, OperationContract, TaggedValue, TypeTag};
use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};

use crate::context::ExecutionContext;
use crate::error::OperationError;
use crate::operation::{Inputs, Operation};

pub struct VarMixed;

#[async_trait]
impl Operation for VarMixed {
    fn contract(&self) -> OperationContract {
        OperationContract::new("var_mixed", "Var (mixed)", Category::Primitive, "A value of any type.")
            .input("value", InputSpec::new("The value.", Cardinality::required()))
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        Ok(inputs.require("value")?.clone())
    }
}

/// `var_bool`, `var_int`, `var_float` and `var_text`: a value forced to one type.
pub struct TypedVar {
    tag: TypeTag,
}

impl TypedVar {
    pub fn new(tag: TypeTag) -> Self {
        Self { tag }
    }

    fn kind(&self) -> &'static str {
        match self.tag {
            TypeTag::Boolean => "var_bool",
            TypeTag::Integer => "var_int",
            TypeTag::Float => "var_float",
            _ => "var_text",
        }
    }
}

#[async_trait]
impl Operation for TypedVar {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            self.kind(),
            format!("Var ({})", self.tag),
            Category::Primitive,
            format!("A {} value.", self.tag),
        )
        .input("value", InputSpec::new("The value.", Cardinality::required()))
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let value = inputs.require("value")?.clone();
        convert(value, self.tag).map_err(|e| OperationError::invalid_input(e.to_string()))
    }
}

pub struct VarRequest;

#[async_trait]
impl Operation for VarRequest {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "var_request",
            "Var (request)",
            Category::Primitive,
            "A GET or POST variable from the request.",
        )
        .input(
            "key",
            InputSpec::new("Name of the variable.", Cardinality::required()).types(&[TypeTag::Text]),
        )
        .input(
            "nullable",
            InputSpec::new("Continue with an empty value when the variable is absent.", Cardinality::optional())
                .types(&[TypeTag::Boolean, TypeTag::Integer])
                .default(json!(true)),
        )
    }

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let key = inputs.require("key")?.to_plain_string();
        if let Some(v) = ctx.request.param(&key) {
            return Ok(TaggedValue::text(v));
        }
        if inputs.boolean("nullable", true)? {
            return Ok(TaggedValue::text(""));
        }
        Err(OperationError::invalid_input(format!("request var {key} not available")))
    }
}

/// The request body as decoded, keeping its type.
pub struct VarBody;

#[async_trait]
impl Operation for VarBody {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "var_body",
            "Var (body)",
            Category::Primitive,
            "The decoded request body, or one member of it.",
        )
        .input(
            "key",
            InputSpec::new("Member to read. The whole body when unset.", Cardinality::optional())
                .types(&[TypeTag::Text]),
        )
        .input(
            "nullable",
            InputSpec::new("Continue with an empty value when nothing is found.", Cardinality::optional())
                .types(&[TypeTag::Boolean, TypeTag::Integer])
                .default(json!(true)),
        )
    }

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let key = inputs.text("key").filter(|k| !k.is_empty());
        let found = match key.as_deref() {
            None => ctx.request.payload.clone(),
            Some(key) => match &ctx.request.payload {
                Some(TaggedValue::Json(JsonValue::Object(members))) => {
                    members.get(key).map(TaggedValue::from_literal)
                }
                _ => None,
            }
            .or_else(|| ctx.request.body.get(key).map(TaggedValue::text)),
        };
        if let Some(value) = found {
            return Ok(value);
        }
        if inputs.boolean("nullable", true)? {
            return Ok(TaggedValue::text(""));
        }
        Err(OperationError::invalid_input(match key {
            Some(key) => format!("body member {key} not available"),
            None => "request has no body".to_string(),
        }))
    }
}

pub struct VarField;

#[async_trait]
impl Operation for VarField {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "var_field",
            "Var (field)",
            Category::Primitive,
            "A name/value pair, from a key and value or from a single-entry object.",
        )
        .input(
            "key",
            InputSpec::new("Field name.", Cardinality::optional())
                .types(&[TypeTag::Text, TypeTag::Integer])
                .default(json!(0)),
        )
        .input("value", InputSpec::new("Field value.", Cardinality::optional()).default(json!("")))
        .input(
            "array",
            InputSpec::new("Single-entry object to turn into a field.", Cardinality::optional())
                .types(&[TypeTag::Json, TypeTag::Array]),
        )
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        if let Some(array) = inputs.one("array").filter(|v| !v.is_empty()) {
            let (key, value) = single_entry(array.to_json())?;
            return Ok(field(key, value));
        }
        let key = inputs.text("key").unwrap_or_else(|| "0".to_string());
        let value = inputs.one("value").map(TaggedValue::to_json).unwrap_or(JsonValue::Null);
        Ok(field(key, value))
    }
}

fn single_entry(v: JsonValue) -> Result<(String, JsonValue), OperationError> {
    let too_many = || OperationError::invalid_input("Cannot have more than one index in an input array.");
    match v {
        JsonValue::Object(map) if map.len() == 1 => Ok(map.into_iter().next().ok_or_else(too_many)?),
        JsonValue::Array(items) if items.len() == 1 => match items.into_iter().next() {
            Some(JsonValue::Object(map)) if map.len() == 1 => Ok(map.into_iter().next().ok_or_else(too_many)?),
            Some(other) => Ok(("0".to_string(), other)),
            None => Err(too_many()),
        },
        _ => Err(too_many()),
    }
}

fn field(key: String, value: JsonValue) -> TaggedValue {
    let mut map = Map::new();
    map.insert(key, value);
    TaggedValue::Json(JsonValue::Object(map))
}

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERIC: &str = "0123456789";
const SPECIAL: &str = "!@#$%^&*()-_=+[]{};:,.<>?";

pub struct VarRand;

#[async_trait]
impl Operation for VarRand {
    fn contract(&self) -> OperationContract {
        let flag = |desc: &str, default: bool| {
            InputSpec::new(desc, Cardinality::optional())
                .types(&[TypeTag::Boolean])
                .default(json!(default))
        };
        OperationContract::new("var_rand", "Var (random)", Category::Primitive, "A random string.")
            .input(
                "length",
                InputSpec::new("Length of the string.", Cardinality::optional())
                    .types(&[TypeTag::Integer])
                    .default(json!(8)),
            )
            .input("lower", flag("Include lower case letters.", true))
            .input("upper", flag("Include upper case letters.", true))
            .input("numeric", flag("Include digits.", true))
            .input("special", flag("Include punctuation.", false))
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let length = inputs.integer("length")?.unwrap_or(8);
        let length = usize::try_from(length)
            .map_err(|_| OperationError::invalid_input(format!("invalid length: {length}")))?;

        let mut alphabet = String::new();
        for (name, chars, default) in [
            ("lower", LOWER, true),
            ("upper", UPPER, true),
            ("numeric", NUMERIC, true),
            ("special", SPECIAL, false),
        ] {
            if inputs.boolean(name, default)? {
                alphabet.push_str(chars);
            }
        }
        let alphabet: Vec<char> = alphabet.chars().collect();
        if alphabet.is_empty() {
            return Err(OperationError::invalid_input("no character classes selected"));
        }
        let out: String = (0..length)
            .map(|_| alphabet[fastrand::usize(..alphabet.len())])
            .collect();
        Ok(TaggedValue::Text(out))
    }
}

pub struct Collection;

#[async_trait]
impl Operation for Collection {
    fn contract(&self) -> OperationContract {
        OperationContract::new("collection", "Collection", Category::Primitive, "An ordered list of values.")
            .input("values", InputSpec::new("Members of the list.", Cardinality::at_least(0)))
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        Ok(TaggedValue::Array(
            inputs.many("values").into_iter().map(TaggedValue::to_json).collect(),
        ))
    }
}
