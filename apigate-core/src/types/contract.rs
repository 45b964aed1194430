use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::types::TypeTag;

/// Inclusive bounds on how many values an input accepts. `max == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Cardinality {
    pub min: usize,
    pub max: Option<usize>,
}

impl Cardinality {
    pub const fn new(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub const fn optional() -> Self {
        Self::new(0, 1)
    }

    pub const fn required() -> Self {
        Self::new(1, 1)
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "[{}, *]", self.min),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InputSpec {
    pub description: String,
    pub cardinality: Cardinality,
    pub literal_allowed: bool,
    /// Operation kinds that may be nested here. Empty means any kind.
    pub allowed_nested_kinds: Vec<String>,
    /// Literal types accepted. Empty means any type.
    pub allowed_value_types: Vec<TypeTag>,
    /// Exact literal values accepted. Empty means any value.
    pub allowed_literal_values: Vec<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
}

impl InputSpec {
    pub fn new(description: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            description: description.into(),
            cardinality,
            literal_allowed: true,
            allowed_nested_kinds: Vec::new(),
            allowed_value_types: Vec::new(),
            allowed_literal_values: Vec::new(),
            default: None,
        }
    }

    pub fn no_literal(mut self) -> Self {
        self.literal_allowed = false;
        self
    }

    pub fn nested(mut self, kinds: &[&str]) -> Self {
        self.allowed_nested_kinds = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn types(mut self, types: &[TypeTag]) -> Self {
        self.allowed_value_types = types.to_vec();
        self
    }

    pub fn values(mut self, values: impl IntoIterator<Item = JsonValue>) -> Self {
        self.allowed_literal_values = values.into_iter().collect();
        self
    }

    pub fn default(mut self, value: JsonValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Whether a literal of `tag` satisfies the type restriction.
    pub fn accepts_type(&self, tag: TypeTag) -> bool {
        if self.allowed_value_types.is_empty() || self.allowed_value_types.contains(&tag) {
            return true;
        }
        // Integral literals are valid wherever floats are.
        tag == TypeTag::Integer && self.allowed_value_types.contains(&TypeTag::Float)
    }

    pub fn accepts_value(&self, value: &JsonValue) -> bool {
        if self.allowed_literal_values.is_empty() {
            return true;
        }
        self.allowed_literal_values.iter().any(|allowed| match (allowed, value) {
            (JsonValue::String(a), JsonValue::String(b)) => a.eq_ignore_ascii_case(b),
            (a, b) => a == b,
        })
    }

    pub fn accepts_kind(&self, kind: &str) -> bool {
        self.allowed_nested_kinds.is_empty() || self.allowed_nested_kinds.iter().any(|k| k == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Primitive,
    Operation,
    Security,
    Endpoint,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Primitive => "primitive",
            Category::Operation => "operation",
            Category::Security => "security",
            Category::Endpoint => "endpoint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NamedInput {
    pub name: String,
    #[serde(flatten)]
    pub spec: InputSpec,
}

/// Static declaration of what an operation kind accepts on each input.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OperationContract {
    pub kind: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub inputs: Vec<NamedInput>,
}

impl OperationContract {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            description: description.into(),
            category,
            inputs: Vec::new(),
        }
    }

    pub fn input(mut self, name: impl Into<String>, spec: InputSpec) -> Self {
        self.inputs.push(NamedInput {
            name: name.into(),
            spec,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name).map(|i| &i.spec)
    }

    /// Check the declaration is internally consistent.
    pub fn check(&self) -> Result<(), String> {
        for input in &self.inputs {
            let spec = &input.spec;
            if let Some(max) = spec.cardinality.max {
                if spec.cardinality.min > max {
                    return Err(format!(
                        "{}.{}: cardinality min exceeds max {}",
                        self.kind, input.name, spec.cardinality
                    ));
                }
            }
            // An empty nested-kind set means "any kind", so a literal-free input stays reachable.
        }
        let mut seen = std::collections::BTreeSet::new();
        for input in &self.inputs {
            if !seen.insert(input.name.as_str()) {
                return Err(format!("{}: input {} declared twice", self.kind, input.name));
            }
        }
        Ok(())
    }
}

/// Lookup of operation contracts by kind name.
pub trait ContractSource {
    fn contract(&self, kind: &str) -> Option<&OperationContract>;
}

impl ContractSource for BTreeMap<String, OperationContract> {
    fn contract(&self, kind: &str) -> Option<&OperationContract> {
        self.get(kind)
    }
}

impl ContractSource for Vec<OperationContract> {
    fn contract(&self, kind: &str) -> Option<&OperationContract> {
        self.iter().find(|c| c.kind == kind)
    }
}
