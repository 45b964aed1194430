use std::collections::HashSet;

use crate::error::ViolationKind;
use crate::types::{Category, NodeValue, ResourceTree};
use crate::validate::rules::{fragments, node};
use crate::validate::validator::{Validator, NAME_RE};

const OUTPUT_FORMATS: [&str; 6] = ["json", "xml", "html", "text", "plain", "image"];

pub(crate) fn validate_resource(v: &mut Validator, tree: &ResourceTree) {
    if tree.name.trim().is_empty() {
        v.push("$.name", None, ViolationKind::InvalidResource, "must not be empty");
    }
    let uri = tree.normalized_uri();
    if uri.is_empty() {
        v.push("$.uri", None, ViolationKind::InvalidResource, "must not be empty");
    } else if uri.split('/').any(|seg| seg.is_empty() || seg.chars().any(char::is_whitespace)) {
        v.push(
            "$.uri",
            None,
            ViolationKind::InvalidResource,
            "must be slash-separated segments without whitespace",
        );
    }

    for (idx, entry) in tree.security.iter().enumerate() {
        match v.resolve(entry) {
            Some(NodeValue::Nested(n)) => {
                if let Some(contract) = v.contract(&n.kind) {
                    if contract.category != Category::Security {
                        v.push(
                            format!("$.security[{idx}]"),
                            None,
                            ViolationKind::DisallowedNestedKind,
                            format!("{} is not a security operation", n.kind),
                        );
                    }
                }
            }
            // Undeclared or cyclic fragment, reported by the fragment rules.
            None => {}
            Some(_) => v.push(
                format!("$.security[{idx}]"),
                None,
                ViolationKind::InvalidResource,
                "security entries must be operation nodes",
            ),
        }
        node::validate_value(v, entry);
    }

    node::validate_value(v, &tree.process);

    for value in tree.fragments.values() {
        node::validate_value(v, value);
    }
    fragments::validate_fragments(v, tree);

    validate_output(v, tree);

    if let Some(keys) = &tree.cache_key {
        let mut seen = HashSet::new();
        for key in keys {
            if !NAME_RE.is_match(key) || !seen.insert(key.as_str()) {
                v.push(
                    "$.cache_key",
                    None,
                    ViolationKind::InvalidResource,
                    format!("`{key}` must be a unique parameter name"),
                );
            }
        }
    }
}

fn validate_output(v: &mut Validator, tree: &ResourceTree) {
    for out in tree.output_nodes() {
        let label = if out.id.is_empty() {
            format!("<{}>", out.format)
        } else {
            out.id.clone()
        };
        if !OUTPUT_FORMATS.contains(&out.format.to_ascii_lowercase().as_str()) {
            v.push(
                label.clone(),
                None,
                ViolationKind::UnknownOperationKind,
                format!("unknown output format: {}", out.format),
            );
        }
        if out.destination.is_empty() {
            v.push(
                label.clone(),
                Some("destination"),
                ViolationKind::CardinalityViolation,
                "expects [1, *] values, got 0",
            );
        }
        for dest in &out.destination {
            if url_scheme(dest).is_none() {
                v.push(
                    label.clone(),
                    Some("destination"),
                    ViolationKind::InvalidLiteral,
                    format!("`{dest}` is not an absolute http(s) URL"),
                );
            }
        }
    }
}

fn url_scheme(s: &str) -> Option<&str> {
    let (scheme, rest) = s.split_once("://")?;
    (matches!(scheme, "http" | "https") && !rest.is_empty()).then_some(scheme)
}
