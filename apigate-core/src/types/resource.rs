use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::types::NodeValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    #[serde(alias = "GET")]
    Get,
    #[serde(alias = "POST")]
    Post,
    #[serde(alias = "PUT")]
    Put,
    #[serde(alias = "DELETE")]
    Delete,
    #[serde(alias = "PATCH")]
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
            Method::Patch => "patch",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "delete" => Ok(Method::Delete),
            "patch" => Ok(Method::Patch),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

/// A declared resource: request coordinates plus its operation trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTree {
    /// Store-assigned id; absent until the tree has been saved.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<i64>,

    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub uri: String,

    pub method: Method,

    #[serde(rename = "appid", default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<i64>,

    /// Seconds a result may be served from cache. 0 disables caching.
    #[serde(default)]
    pub ttl: u64,

    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub security: Vec<NodeValue>,

    pub process: NodeValue,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fragments: BTreeMap<String, NodeValue>,

    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub output: Vec<OutputTarget>,

    /// Request parameters that make up the cache fingerprint. `None` means all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<Vec<String>>,
}

impl ResourceTree {
    pub fn new(name: impl Into<String>, method: Method, uri: impl Into<String>, process: NodeValue) -> Self {
        Self {
            resource_id: None,
            name: name.into(),
            description: String::new(),
            uri: uri.into(),
            method,
            application_id: None,
            ttl: 0,
            security: Vec::new(),
            process,
            fragments: BTreeMap::new(),
            output: Vec::new(),
            cache_key: None,
        }
    }

    /// URI in its stored form: lower case, no leading slash.
    pub fn normalized_uri(&self) -> String {
        normalize_uri(&self.uri)
    }

    /// Whether the result goes back to the caller (as opposed to only remote destinations).
    pub fn responds_to_client(&self) -> bool {
        self.output.is_empty() || self.output.iter().any(|o| matches!(o, OutputTarget::Response))
    }

    pub fn output_nodes(&self) -> impl Iterator<Item = &OutputNode> {
        self.output.iter().filter_map(|o| match o {
            OutputTarget::Node(node) => Some(node),
            OutputTarget::Response => None,
        })
    }
}

pub fn normalize_uri(uri: &str) -> String {
    uri.trim().trim_start_matches('/').to_ascii_lowercase()
}

/// Where a successful result is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    Response,
    Node(OutputNode),
}

/// Delivery of the rendered result to remote destinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputNode {
    /// Output format name (`json`, `xml`, ...).
    #[serde(rename = "processor")]
    pub format: String,

    #[serde(default)]
    pub id: String,

    #[serde(default, deserialize_with = "one_or_many")]
    pub destination: Vec<String>,

    #[serde(default = "default_output_method")]
    pub method: Method,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub report_error: bool,
}

fn default_output_method() -> Method {
    Method::Post
}

impl Serialize for OutputTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OutputTarget::Response => serializer.serialize_str("response"),
            OutputTarget::Node(node) => node.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for OutputTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match JsonValue::deserialize(deserializer)? {
            JsonValue::String(s) if s.eq_ignore_ascii_case("response") => Ok(OutputTarget::Response),
            raw @ JsonValue::Object(_) => serde_json::from_value::<OutputNode>(raw)
                .map(OutputTarget::Node)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "output entries must be `response` or an output node, got {other}"
            ))),
        }
    }
}

/// Accept either a single item or a sequence of items.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::Array(items) => items
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(D::Error::custom))
            .collect(),
        other => serde_json::from_value(other)
            .map(|v| vec![v])
            .map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_security_node_and_output_list() {
        let tree: ResourceTree = serde_json::from_value(json!({
            "name": "echo",
            "uri": "/Echo/Name",
            "method": "GET",
            "appid": 2,
            "security": {"processor": "token", "id": "s1", "token": {"processor": "bearer_token", "id": "s2"}},
            "process": "hi",
            "output": ["response", {"processor": "xml", "id": "o1", "destination": "http://example.com/hook"}]
        }))
        .unwrap();
        assert_eq!(tree.security.len(), 1);
        assert_eq!(tree.normalized_uri(), "echo/name");
        assert!(tree.responds_to_client());
        let node = tree.output_nodes().next().unwrap();
        assert_eq!(node.destination, vec!["http://example.com/hook"]);
        assert_eq!(node.method, Method::Post);
    }

    #[test]
    fn output_without_response_is_remote_only() {
        let tree: ResourceTree = serde_json::from_value(json!({
            "name": "n", "uri": "u", "method": "post", "process": 1,
            "output": {"processor": "json", "id": "o", "destination": ["http://a"]}
        }))
        .unwrap();
        assert!(!tree.responds_to_client());
    }
}
