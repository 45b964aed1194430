use std::cmp::Ordering;

use apigate_core::{convert_with, Cardinality, Category, InputSpec, OperationContract, TaggedValue, TypeTag};
use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use serde_json_path::JsonPath;

use crate::context::ExecutionContext;
use crate::error::OperationError;
use crate::operation::{Inputs, Operation};

pub struct Concatenate;

#[async_trait]
impl Operation for Concatenate {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "concatenate",
            "Concatenate",
            Category::Operation,
            "Join the text form of two or more values.",
        )
        .input("sources", InputSpec::new("Values to join, in order.", Cardinality::at_least(2)))
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let joined: String = inputs
            .many("sources")
            .into_iter()
            .map(TaggedValue::to_plain_string)
            .collect();
        Ok(TaggedValue::Text(joined))
    }
}

pub struct Merge;

#[async_trait]
impl Operation for Merge {
    fn contract(&self) -> OperationContract {
        OperationContract::new("merge", "Merge", Category::Operation, "Merge two or more lists.")
            .input("sources", InputSpec::new("Lists to merge.", Cardinality::at_least(2)))
            .input(
                "merge_type",
                InputSpec::new("How the lists combine.", Cardinality::optional())
                    .types(&[TypeTag::Text])
                    .values([json!("union"), json!("intersect"), json!("difference")])
                    .default(json!("union")),
            )
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let lists: Vec<Vec<JsonValue>> = inputs.many("sources").into_iter().map(as_list).collect();
        let merge_type = inputs.text("merge_type").unwrap_or_else(|| "union".to_string());
        let mut lists = lists.into_iter();
        let first = lists.next().unwrap_or_default();
        let rest: Vec<Vec<JsonValue>> = lists.collect();

        let merged = match merge_type.to_ascii_lowercase().as_str() {
            "union" => {
                let mut out: Vec<JsonValue> = Vec::new();
                for item in first.into_iter().chain(rest.into_iter().flatten()) {
                    if !out.contains(&item) {
                        out.push(item);
                    }
                }
                out
            }
            "intersect" => first
                .into_iter()
                .filter(|item| rest.iter().all(|other| other.contains(item)))
                .collect(),
            "difference" => first
                .into_iter()
                .filter(|item| rest.iter().all(|other| !other.contains(item)))
                .collect(),
            other => return Err(OperationError::invalid_input(format!("invalid merge_type: {other}"))),
        };
        Ok(TaggedValue::Array(merged))
    }
}

fn as_list(v: &TaggedValue) -> Vec<JsonValue> {
    match v.to_json() {
        JsonValue::Array(items) => items,
        JsonValue::Null => Vec::new(),
        other => vec![other],
    }
}

pub struct Sort;

#[async_trait]
impl Operation for Sort {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "sort",
            "Sort",
            Category::Operation,
            "Sort a list, or the entries of an object by key or value.",
        )
        .input("values", InputSpec::new("The values to sort.", Cardinality::at_least(0)))
        .input(
            "direction",
            InputSpec::new("Ascending or descending.", Cardinality::optional())
                .types(&[TypeTag::Text])
                .values([json!("asc"), json!("desc")])
                .default(json!("asc")),
        )
        .input(
            "sort_by",
            InputSpec::new("Sort on key or value.", Cardinality::optional())
                .values([json!("key"), json!("value")])
                .default(json!("key")),
        )
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let descending = inputs
            .text("direction")
            .is_some_and(|d| d.eq_ignore_ascii_case("desc"));
        let by_value = inputs
            .text("sort_by")
            .is_some_and(|s| s.eq_ignore_ascii_case("value"));

        let values = inputs.many("values");
        let target = match values.as_slice() {
            [] => return Ok(TaggedValue::Array(Vec::new())),
            [single] => single.to_json(),
            many => JsonValue::Array(many.iter().map(|v| v.to_json()).collect()),
        };

        match target {
            JsonValue::Array(mut items) => {
                if by_value {
                    items.sort_by(compare_json);
                    if descending {
                        items.reverse();
                    }
                } else if descending {
                    // Positional keys are already ascending.
                    items.reverse();
                }
                Ok(TaggedValue::Array(items))
            }
            JsonValue::Object(map) => {
                let mut entries: Vec<(String, JsonValue)> = map.into_iter().collect();
                if by_value {
                    entries.sort_by(|a, b| compare_json(&a.1, &b.1));
                } else {
                    entries.sort_by(|a, b| a.0.cmp(&b.0));
                }
                if descending {
                    entries.reverse();
                }
                let items = entries
                    .into_iter()
                    .map(|(k, v)| {
                        let mut m = Map::new();
                        m.insert(k, v);
                        JsonValue::Object(m)
                    })
                    .collect();
                Ok(TaggedValue::Array(items))
            }
            _ => Ok(values[0].clone()),
        }
    }
}

fn rank(v: &JsonValue) -> u8 {
    match v {
        JsonValue::Null => 0,
        JsonValue::Bool(_) => 1,
        JsonValue::Number(_) => 2,
        JsonValue::String(_) => 3,
        JsonValue::Array(_) => 4,
        JsonValue::Object(_) => 5,
    }
}

fn compare_json(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        _ if rank(a) == rank(b) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

pub struct Cast;

#[async_trait]
impl Operation for Cast {
    fn contract(&self) -> OperationContract {
        OperationContract::new("cast", "Cast", Category::Operation, "Convert a value to another type.")
            .input("data", InputSpec::new("The value to convert.", Cardinality::required()))
            .input(
                "data_type",
                InputSpec::new("Target type.", Cardinality::required())
                    .types(&[TypeTag::Text])
                    .values(TypeTag::ALL.iter().map(|t| json!(t.as_str()))),
            )
    }

    async fn execute(&self, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let data = inputs.require("data")?.clone();
        let target = inputs.require("data_type")?.to_plain_string();
        let tag: TypeTag = target
            .parse()
            .map_err(|e: apigate_core::types::UnknownTypeTag| OperationError::invalid_input(e.to_string()))?;
        Ok(convert_with(data, tag, &ctx.config.markup())?)
    }
}

pub struct JsonPathQuery;

#[async_trait]
impl Operation for JsonPathQuery {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "json_path",
            "JSON path",
            Category::Operation,
            "Select part of a JSON value with a JSONPath query.",
        )
        .input("source", InputSpec::new("The JSON value, or text holding JSON.", Cardinality::required()))
        .input(
            "path",
            InputSpec::new("JSONPath query, e.g. `$.items[0].name`.", Cardinality::required())
                .types(&[TypeTag::Text]),
        )
    }

    /// A single match is returned as-is; zero or several matches come back as an array.
    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let source = json_source(inputs.require("source")?);
        let path = inputs.require("path")?.to_plain_string();
        let jsonpath = JsonPath::parse(&path)
            .map_err(|e| OperationError::invalid_input(format!("invalid JSONPath {path}: {e}")))?;
        let mut nodes: Vec<JsonValue> = jsonpath.query(&source).all().into_iter().cloned().collect();
        Ok(match nodes.len() {
            1 => TaggedValue::Json(nodes.remove(0)),
            _ => TaggedValue::Array(nodes),
        })
    }
}

/// JSON form of a source input. Text holding a JSON document is parsed.
pub(super) fn json_source(value: &TaggedValue) -> JsonValue {
    match value {
        TaggedValue::Text(s) => serde_json::from_str(s).unwrap_or_else(|_| JsonValue::String(s.clone())),
        other => other.to_json(),
    }
}
