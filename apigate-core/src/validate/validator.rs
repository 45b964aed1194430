use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ValidationError, Violation, ViolationKind};
use crate::types::{ContractSource, NodeValue, OperationContract, OperationNode, ResourceTree};

use super::rules;

pub(crate) static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-\.]+$").expect("valid"));
pub(crate) static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\.\-_]+$").expect("valid"));

pub struct Validator<'a> {
    contracts: &'a dyn ContractSource,
    fragments: Option<&'a BTreeMap<String, NodeValue>>,
    node_ids: HashSet<String>,
    violations: Vec<Violation>,
}

impl<'a> Validator<'a> {
    pub fn new(contracts: &'a dyn ContractSource) -> Self {
        Self {
            contracts,
            fragments: None,
            node_ids: HashSet::new(),
            violations: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    pub fn validate_resource(&mut self, tree: &'a ResourceTree) {
        self.fragments = Some(&tree.fragments);
        rules::resource::validate_resource(self, tree);
    }

    pub(crate) fn push(
        &mut self,
        node_id: impl Into<String>,
        input: Option<&str>,
        kind: ViolationKind,
        message: impl Into<String>,
    ) {
        self.violations.push(Violation::new(node_id, input, kind, message));
    }

    pub(crate) fn contract(&self, kind: &str) -> Option<&'a OperationContract> {
        self.contracts.contract(kind)
    }

    pub(crate) fn fragment(&self, name: &str) -> Option<&'a NodeValue> {
        self.fragments.and_then(|f| f.get(name))
    }

    /// Follow fragment references to the value they stand for. `None` when a
    /// name is undeclared or the chain loops.
    pub(crate) fn resolve<'v>(&self, value: &'v NodeValue) -> Option<&'v NodeValue>
    where
        'a: 'v,
    {
        let mut current = value;
        for _ in 0..=self.fragments.map_or(0, BTreeMap::len) {
            match current {
                NodeValue::FragmentRef(name) => current = self.fragment(name)?,
                other => return Some(other),
            }
        }
        None
    }

    /// Ids must be present, well-formed, and unique across the whole resource.
    pub(crate) fn check_node_id(&mut self, node: &OperationNode) {
        if node.id.is_empty() {
            self.push(
                node_label(node),
                None,
                ViolationKind::MissingNodeId,
                format!("{} node has no id", node.kind),
            );
            return;
        }
        if !ID_RE.is_match(&node.id) {
            self.push(
                node.id.clone(),
                None,
                ViolationKind::InvalidResource,
                "id must match regex [A-Za-z0-9_\\-\\.]+",
            );
        }
        if !self.node_ids.insert(node.id.clone()) {
            self.push(
                node.id.clone(),
                None,
                ViolationKind::DuplicateNodeId,
                "id must be unique within the resource",
            );
        }
    }
}

/// Name used to attribute a violation to a node.
pub(crate) fn node_label(node: &OperationNode) -> String {
    if node.id.is_empty() {
        format!("<{}>", node.kind)
    } else {
        node.id.clone()
    }
}
