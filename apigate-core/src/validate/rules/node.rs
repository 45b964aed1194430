use crate::error::ViolationKind;
use crate::types::{InputSpec, NodeValue, OperationNode};
use crate::validate::validator::{node_label, Validator};

pub(crate) fn validate_value(v: &mut Validator, value: &NodeValue) {
    match value {
        NodeValue::Nested(node) => validate_node(v, node),
        NodeValue::Collection(items) => {
            for item in items {
                validate_value(v, item);
            }
        }
        NodeValue::Literal(_) | NodeValue::FragmentRef(_) => {}
    }
}

pub(crate) fn validate_node(v: &mut Validator, node: &OperationNode) {
    v.check_node_id(node);
    let label = node_label(node);

    match v.contract(&node.kind) {
        None => v.push(
            label.clone(),
            None,
            ViolationKind::UnknownOperationKind,
            format!("unknown operation kind: {}", node.kind),
        ),
        Some(contract) => {
            for name in node.inputs.keys() {
                if contract.get(name).is_none() {
                    v.push(
                        label.clone(),
                        Some(name),
                        ViolationKind::UnexpectedInput,
                        format!("{} does not declare input `{name}`", node.kind),
                    );
                }
            }

            for input in &contract.inputs {
                // Fragments are counted and checked as the value they stand for.
                let resolved = match node.inputs.get(&input.name) {
                    None => None,
                    Some(supplied) => match v.resolve(supplied) {
                        Some(value) => Some(value),
                        // Undeclared or cyclic, reported by the fragment rules.
                        None => continue,
                    },
                };
                let count = resolved.map_or(0, NodeValue::cardinality);
                if !input.spec.cardinality.contains(count) {
                    v.push(
                        label.clone(),
                        Some(&input.name),
                        ViolationKind::CardinalityViolation,
                        format!("expects {} values, got {count}", input.spec.cardinality),
                    );
                }
                match resolved {
                    Some(NodeValue::Collection(items)) => {
                        for item in items {
                            check_member(v, &label, &input.name, &input.spec, item);
                        }
                    }
                    Some(other) => check_member(v, &label, &input.name, &input.spec, other),
                    None => {}
                }
            }
        }
    }

    // Children are checked even under an unknown kind so one pass reports everything.
    for value in node.inputs.values() {
        validate_value(v, value);
    }
}

/// Check a single supplied value against what the input permits.
fn check_member(v: &mut Validator, label: &str, input: &str, spec: &InputSpec, value: &NodeValue) {
    match value {
        NodeValue::Literal(literal) => {
            if !spec.literal_allowed {
                v.push(
                    label,
                    Some(input),
                    ViolationKind::LiteralNotAllowed,
                    "literal values are not allowed; supply an operation",
                );
                return;
            }
            let tag = literal.type_tag();
            if !spec.accepts_type(tag) {
                let allowed: Vec<&str> = spec.allowed_value_types.iter().map(|t| t.as_str()).collect();
                v.push(
                    label,
                    Some(input),
                    ViolationKind::InvalidLiteral,
                    format!("{tag} literal not allowed; expected one of: {}", allowed.join(", ")),
                );
            } else if !spec.accepts_value(&literal.to_json()) {
                let allowed: Vec<String> = spec.allowed_literal_values.iter().map(|a| a.to_string()).collect();
                v.push(
                    label,
                    Some(input),
                    ViolationKind::InvalidLiteral,
                    format!(
                        "value {} not allowed; expected one of: {}",
                        literal.to_json(),
                        allowed.join(", ")
                    ),
                );
            }
        }
        NodeValue::Nested(child) => {
            if !spec.accepts_kind(&child.kind) {
                v.push(
                    label,
                    Some(input),
                    ViolationKind::DisallowedNestedKind,
                    format!(
                        "{} not allowed here; expected one of: {}",
                        child.kind,
                        spec.allowed_nested_kinds.join(", ")
                    ),
                );
            }
        }
        NodeValue::Collection(items) => {
            for item in items {
                check_member(v, label, input, spec, item);
            }
        }
        // Checked as the value the reference stands for.
        NodeValue::FragmentRef(_) => {
            if let Some(target) = v.resolve(value) {
                check_member(v, label, input, spec, target);
            }
        }
    }
}
