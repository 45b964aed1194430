use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::types::TaggedValue;

pub(crate) const KIND_KEY: &str = "processor";
pub(crate) const ID_KEY: &str = "id";
pub(crate) const FRAGMENT_KEY: &str = "fragment";

/// One step in a resource's operation tree.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationNode {
    pub kind: String,
    /// Unique within the tree; used to attribute errors.
    pub id: String,
    pub inputs: BTreeMap<String, NodeValue>,
}

impl OperationNode {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            inputs: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, value: NodeValue) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    fn from_map(map: &serde_json::Map<String, JsonValue>) -> Result<Self, String> {
        let kind = match map.get(KIND_KEY) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(other) => return Err(format!("`{KIND_KEY}` must be a string, got {other}")),
            None => return Err(format!("missing `{KIND_KEY}`")),
        };
        let id = match map.get(ID_KEY) {
            None | Some(JsonValue::Null) => String::new(),
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            Some(other) => return Err(format!("`{ID_KEY}` of {kind} must be a string, got {other}")),
        };
        let mut inputs = BTreeMap::new();
        for (k, v) in map {
            if k == KIND_KEY || k == ID_KEY {
                continue;
            }
            inputs.insert(k.clone(), NodeValue::from_json(v)?);
        }
        Ok(Self { kind, id, inputs })
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = serde_json::Map::new();
        map.insert(KIND_KEY.to_string(), JsonValue::String(self.kind.clone()));
        map.insert(ID_KEY.to_string(), JsonValue::String(self.id.clone()));
        for (k, v) in &self.inputs {
            map.insert(k.clone(), v.to_json());
        }
        JsonValue::Object(map)
    }
}

/// A value supplied to an operation input.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Literal(TaggedValue),
    Nested(Box<OperationNode>),
    Collection(Vec<NodeValue>),
    FragmentRef(String),
}

impl NodeValue {
    pub fn literal(value: impl Into<TaggedValue>) -> Self {
        NodeValue::Literal(value.into())
    }

    pub fn node(node: OperationNode) -> Self {
        NodeValue::Nested(Box::new(node))
    }

    /// Decode the document form: a mapping with `processor` is a node, a mapping
    /// whose only key is `fragment` is a fragment reference, a sequence is a
    /// collection, and anything else is a literal.
    pub fn from_json(value: &JsonValue) -> Result<Self, String> {
        match value {
            JsonValue::Object(map) if map.contains_key(KIND_KEY) => {
                Ok(NodeValue::Nested(Box::new(OperationNode::from_map(map)?)))
            }
            JsonValue::Object(map) if map.len() == 1 && map.contains_key(FRAGMENT_KEY) => {
                match map.get(FRAGMENT_KEY) {
                    Some(JsonValue::String(name)) => Ok(NodeValue::FragmentRef(name.clone())),
                    _ => Err("fragment reference must name a fragment".to_string()),
                }
            }
            JsonValue::Array(items) => items
                .iter()
                .map(NodeValue::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(NodeValue::Collection),
            other => Ok(NodeValue::Literal(TaggedValue::from_literal(other))),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            NodeValue::Literal(v) => v.to_json(),
            NodeValue::Nested(node) => node.to_json(),
            NodeValue::Collection(items) => {
                JsonValue::Array(items.iter().map(NodeValue::to_json).collect())
            }
            NodeValue::FragmentRef(name) => {
                serde_json::json!({ FRAGMENT_KEY: name })
            }
        }
    }

    /// Number of values this supplies to an input.
    pub fn cardinality(&self) -> usize {
        match self {
            NodeValue::Collection(items) => items.len(),
            _ => 1,
        }
    }

    pub fn as_node(&self) -> Option<&OperationNode> {
        match self {
            NodeValue::Nested(node) => Some(node),
            _ => None,
        }
    }

    /// Visit every operation node reachable without following fragment references.
    pub fn walk_nodes<'a>(&'a self, f: &mut dyn FnMut(&'a OperationNode)) {
        match self {
            NodeValue::Nested(node) => {
                f(node);
                for v in node.inputs.values() {
                    v.walk_nodes(f);
                }
            }
            NodeValue::Collection(items) => {
                for v in items {
                    v.walk_nodes(f);
                }
            }
            NodeValue::Literal(_) | NodeValue::FragmentRef(_) => {}
        }
    }

    /// Fragment names referenced anywhere below this value.
    pub fn fragment_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_refs(self, &mut out);
        out
    }
}

fn collect_refs<'a>(value: &'a NodeValue, out: &mut Vec<&'a str>) {
    match value {
        NodeValue::FragmentRef(name) => out.push(name),
        NodeValue::Nested(node) => {
            for v in node.inputs.values() {
                collect_refs(v, out);
            }
        }
        NodeValue::Collection(items) => {
            for v in items {
                collect_refs(v, out);
            }
        }
        NodeValue::Literal(_) => {}
    }
}

impl serde::Serialize for NodeValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for NodeValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(deserializer)?;
        NodeValue::from_json(&raw).map_err(serde::de::Error::custom)
    }
}
