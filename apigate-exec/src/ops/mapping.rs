use apigate_core::{Cardinality, Category, InputSpec, OperationContract, TaggedValue, TypeTag};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value as JsonValue};
use serde_json_path::JsonPath;

use crate::context::ExecutionContext;
use crate::error::OperationError;
use crate::operation::{Inputs, Operation};

use super::transform::json_source;

/// Builds a new JSON document from parts of a source document.
pub struct Mapper;

#[async_trait]
impl Operation for Mapper {
    fn contract(&self) -> OperationContract {
        OperationContract::new(
            "mapper",
            "Mapper",
            Category::Operation,
            "Copy values selected by JSONPath into a new document.",
        )
        .input("source", InputSpec::new("The JSON value, or text holding JSON.", Cardinality::required()))
        .input(
            "mappings",
            InputSpec::new(
                "Objects of `{get, set}`: a JSONPath query and a slash path such as `a/b`, `items[]` or `a[key]`.",
                Cardinality::at_least(0),
            )
            .types(&[TypeTag::Json]),
        )
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let source = json_source(inputs.require("source")?);
        let mut out = JsonValue::Object(Map::new());
        for mapping in inputs.many("mappings") {
            let mapping = mapping.to_json();
            let get = mapping_part(&mapping, "get")?;
            let set = mapping_part(&mapping, "set")?;

            let query = JsonPath::parse(get)
                .map_err(|e| OperationError::invalid_input(format!("invalid JSONPath {get}: {e}")))?;
            let mut found: Vec<JsonValue> = query.query(&source).all().into_iter().cloned().collect();
            let value = match found.len() {
                0 => continue,
                1 => found.remove(0),
                _ => JsonValue::Array(found),
            };
            assign(&mut out, &parse_set_path(set)?, value)?;
        }
        Ok(TaggedValue::Json(out))
    }
}

fn mapping_part<'m>(mapping: &'m JsonValue, name: &str) -> Result<&'m str, OperationError> {
    mapping
        .get(name)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OperationError::invalid_input(format!("mapping {mapping} has no `{name}` path")))
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Member(String),
    Append,
}

/// `a/b[]/c[key]` becomes `a`, `b`, append, `c`, `key`.
fn parse_set_path(path: &str) -> Result<Vec<Step>, OperationError> {
    let invalid = || OperationError::invalid_input(format!("invalid set path: {path}"));
    let mut steps = Vec::new();
    for segment in path.trim_matches('/').split('/') {
        let (name, mut rest) = match segment.find('[') {
            Some(at) => segment.split_at(at),
            None => (segment, ""),
        };
        if !name.is_empty() {
            steps.push(Step::Member(name.to_string()));
        }
        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(invalid)?;
            let key = &rest[1..close];
            steps.push(if key.is_empty() {
                Step::Append
            } else {
                Step::Member(key.to_string())
            });
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(invalid());
            }
        }
    }
    if steps.is_empty() {
        return Err(invalid());
    }
    Ok(steps)
}

fn assign(target: &mut JsonValue, steps: &[Step], value: JsonValue) -> Result<(), OperationError> {
    let Some((step, rest)) = steps.split_first() else {
        *target = value;
        return Ok(());
    };
    match step {
        Step::Member(key) => {
            if let JsonValue::Array(items) = target {
                if let Some(item) = key.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    return assign(item, rest, value);
                }
            }
            if target.is_null() {
                *target = JsonValue::Object(Map::new());
            }
            match target {
                JsonValue::Object(map) => assign(map.entry(key.clone()).or_insert(JsonValue::Null), rest, value),
                other => Err(OperationError::invalid_input(format!("cannot set `{key}` inside {other}"))),
            }
        }
        Step::Append => {
            if target.is_null() {
                *target = JsonValue::Array(Vec::new());
            }
            match target {
                JsonValue::Array(items) => {
                    items.push(JsonValue::Null);
                    let last = items.len() - 1;
                    assign(&mut items[last], rest, value)
                }
                other => Err(OperationError::invalid_input(format!("cannot append inside {other}"))),
            }
        }
    }
}

/// Removes entries of an object or list by key or by value.
pub struct Filter;

#[async_trait]
impl Operation for Filter {
    fn contract(&self) -> OperationContract {
        let flag = |desc: &str| {
            InputSpec::new(desc, Cardinality::optional())
                .types(&[TypeTag::Boolean, TypeTag::Integer])
                .default(json!(false))
        };
        OperationContract::new(
            "filter",
            "Filter",
            Category::Operation,
            "Remove the entries of an object or list whose key or value matches a filter.",
        )
        .input("values", InputSpec::new("The object or list to filter.", Cardinality::required()))
        .input(
            "filter",
            InputSpec::new("Values or regular expressions to match.", Cardinality::at_least(1))
                .types(&[TypeTag::Text, TypeTag::Integer, TypeTag::Float, TypeTag::Boolean]),
        )
        .input(
            "key_value",
            InputSpec::new("Match entries by key or by value.", Cardinality::optional())
                .types(&[TypeTag::Text])
                .values([json!("key"), json!("value")])
                .default(json!("value")),
        )
        .input("regex", flag("Treat filters as regular expressions."))
        .input("inverse", flag("Keep only the matching entries instead."))
        .input("recursive", flag("Filter nested objects and lists too."))
    }

    async fn execute(&self, inputs: Inputs, _ctx: &ExecutionContext) -> Result<TaggedValue, OperationError> {
        let patterns: Vec<String> = inputs.many("filter").into_iter().map(TaggedValue::to_plain_string).collect();
        let matcher = if inputs.boolean("regex", false)? {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).map_err(|e| OperationError::invalid_input(format!("invalid regex {p}: {e}"))))
                .collect::<Result<Vec<_>, _>>()?;
            Matcher::Regex(compiled)
        } else {
            Matcher::Exact(patterns)
        };
        let rules = FilterRules {
            matcher,
            by_key: inputs.text("key_value").is_some_and(|k| k.eq_ignore_ascii_case("key")),
            inverse: inputs.boolean("inverse", false)?,
            recursive: inputs.boolean("recursive", false)?,
        };
        let values = json_source(inputs.require("values")?);
        if !values.is_object() && !values.is_array() {
            return Err(OperationError::invalid_input("filter needs an object or a list"));
        }
        Ok(TaggedValue::Json(rules.apply(values)))
    }
}

enum Matcher {
    Exact(Vec<String>),
    Regex(Vec<Regex>),
}

impl Matcher {
    fn matches(&self, s: &str) -> bool {
        match self {
            Matcher::Exact(values) => values.iter().any(|v| v == s),
            Matcher::Regex(res) => res.iter().any(|re| re.is_match(s)),
        }
    }
}

struct FilterRules {
    matcher: Matcher,
    by_key: bool,
    inverse: bool,
    recursive: bool,
}

impl FilterRules {
    fn apply(&self, value: JsonValue) -> JsonValue {
        match value {
            JsonValue::Object(map) => JsonValue::Object(
                map.into_iter()
                    .filter(|(k, v)| self.keep(k, v))
                    .map(|(k, v)| (k, self.descend(v)))
                    .collect(),
            ),
            JsonValue::Array(items) => JsonValue::Array(
                items
                    .into_iter()
                    .enumerate()
                    .filter(|(i, v)| self.keep(&i.to_string(), v))
                    .map(|(_, v)| self.descend(v))
                    .collect(),
            ),
            other => other,
        }
    }

    fn descend(&self, value: JsonValue) -> JsonValue {
        if self.recursive {
            self.apply(value)
        } else {
            value
        }
    }

    /// Only scalar values can match by value.
    fn keep(&self, key: &str, value: &JsonValue) -> bool {
        let matched = if self.by_key {
            self.matcher.matches(key)
        } else {
            match value {
                JsonValue::String(s) => self.matcher.matches(s),
                JsonValue::Number(_) | JsonValue::Bool(_) => self.matcher.matches(&value.to_string()),
                _ => false,
            }
        };
        matched == self.inverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_paths_parse_members_and_appends() {
        assert_eq!(
            parse_set_path("a/b[]/c[key]").unwrap(),
            vec![
                Step::Member("a".into()),
                Step::Member("b".into()),
                Step::Append,
                Step::Member("c".into()),
                Step::Member("key".into()),
            ]
        );
        assert!(parse_set_path("a[b").is_err());
        assert!(parse_set_path("/").is_err());
    }

    #[test]
    fn assign_builds_missing_containers() {
        let mut out = JsonValue::Object(Map::new());
        assign(&mut out, &parse_set_path("user/tags[]").unwrap(), json!("x")).unwrap();
        assign(&mut out, &parse_set_path("user/tags[]").unwrap(), json!("y")).unwrap();
        assign(&mut out, &parse_set_path("user/tags[0]").unwrap(), json!("z")).unwrap();
        assert_eq!(out, json!({"user": {"tags": ["z", "y"]}}));

        assert!(assign(&mut out, &parse_set_path("user/tags/x").unwrap(), json!(1)).is_err());
        assert!(assign(&mut json!("flat"), &[Step::Append], json!(1)).is_err());
    }
}
