use std::collections::{BTreeMap, BTreeSet};

use crate::error::ViolationKind;
use crate::types::{NodeValue, ResourceTree};
use crate::validate::validator::{Validator, NAME_RE};

/// Every reference must name a declared fragment, and fragments may not refer
/// back to themselves through any chain of references.
pub(crate) fn validate_fragments(v: &mut Validator, tree: &ResourceTree) {
    for name in tree.fragments.keys() {
        if !NAME_RE.is_match(name) {
            v.push(
                format!("$.fragments.{name}"),
                None,
                ViolationKind::InvalidResource,
                "fragment names must match regex [a-zA-Z0-9\\.\\-_]+",
            );
        }
    }

    let mut roots: Vec<(String, &NodeValue)> = Vec::new();
    for (idx, s) in tree.security.iter().enumerate() {
        roots.push((format!("$.security[{idx}]"), s));
    }
    roots.push(("$.process".to_string(), &tree.process));
    for (name, f) in &tree.fragments {
        roots.push((format!("$.fragments.{name}"), f));
    }
    for (path, value) in roots {
        for target in value.fragment_refs() {
            if !tree.fragments.contains_key(target) {
                v.push(
                    path.clone(),
                    None,
                    ViolationKind::InvalidFragmentReference,
                    format!("fragment `{target}` is not declared"),
                );
            }
        }
    }

    let graph: BTreeMap<&str, Vec<&str>> = tree
        .fragments
        .iter()
        .map(|(name, value)| (name.as_str(), value.fragment_refs()))
        .collect();
    for name in cyclic_fragments(&graph) {
        v.push(
            format!("$.fragments.{name}"),
            None,
            ViolationKind::InvalidFragmentReference,
            "fragment refers to itself through a chain of references",
        );
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Names of all fragments that sit on a reference cycle.
fn cyclic_fragments<'a>(graph: &BTreeMap<&'a str, Vec<&'a str>>) -> BTreeSet<&'a str> {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut on_cycle = BTreeSet::new();
    for &start in graph.keys() {
        let mut path = Vec::new();
        visit(start, graph, &mut marks, &mut path, &mut on_cycle);
    }
    on_cycle
}

fn visit<'a>(
    name: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    marks: &mut BTreeMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    on_cycle: &mut BTreeSet<&'a str>,
) {
    match marks.get(name) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            if let Some(pos) = path.iter().position(|n| *n == name) {
                on_cycle.extend(path[pos..].iter().copied());
            }
            return;
        }
        None => {}
    }
    // Unresolved targets are reported separately.
    let Some(edges) = graph.get(name) else {
        return;
    };
    marks.insert(name, Mark::Visiting);
    path.push(name);
    for &next in edges {
        visit(next, graph, marks, path, on_cycle);
    }
    path.pop();
    marks.insert(name, Mark::Done);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_indirect_cycles_only() {
        let mut graph = BTreeMap::new();
        graph.insert("a", vec!["b"]);
        graph.insert("b", vec!["c"]);
        graph.insert("c", vec!["a"]);
        graph.insert("d", vec!["a"]);
        graph.insert("e", vec!["e"]);
        let cyclic = cyclic_fragments(&graph);
        assert_eq!(cyclic.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c", "e"]);
    }
}
