use std::collections::BTreeMap;

use apigate_core::{
    parse_resource_str, render_resource_str, validate_resource, Cardinality, Category, DocumentFormat,
    InputSpec, OperationContract, ParseError, TypeTag, Validate, ViolationKind,
};
use serde_json::json;

fn contracts() -> BTreeMap<String, OperationContract> {
    let list = vec![
        OperationContract::new("var_text", "Var (Text)", Category::Primitive, "")
            .input("value", InputSpec::new("", Cardinality::required())),
        OperationContract::new("concatenate", "Concatenate", Category::Operation, "")
            .input("sources", InputSpec::new("", Cardinality::at_least(2))),
        OperationContract::new("sort", "Sort", Category::Operation, "")
            .input("values", InputSpec::new("", Cardinality::at_least(0)))
            .input(
                "direction",
                InputSpec::new("", Cardinality::optional())
                    .types(&[TypeTag::Text])
                    .values([json!("asc"), json!("desc")]),
            ),
        OperationContract::new("bearer_token", "Bearer token", Category::Security, ""),
        OperationContract::new("token", "Token", Category::Security, "").input(
            "token",
            InputSpec::new("", Cardinality::required()).no_literal().nested(&["bearer_token"]),
        ),
        OperationContract::new("collection", "Collection", Category::Primitive, "")
            .input("values", InputSpec::new("", Cardinality::at_least(0))),
        OperationContract::new("token_roles", "Token (roles)", Category::Security, "")
            .input(
                "token",
                InputSpec::new("", Cardinality::required()).no_literal().nested(&["bearer_token"]),
            )
            .input(
                "roles",
                InputSpec::new("", Cardinality::required()).no_literal().nested(&["collection"]),
            ),
    ];
    list.into_iter().map(|c| (c.kind.clone(), c)).collect()
}

fn valid_yaml() -> &'static str {
    r#"
name: Greeting
description: Says hello
uri: /hello/world
method: get
appid: 1
ttl: 30
security:
  processor: token
  id: sec1
  token:
    processor: bearer_token
    id: sec2
process:
  processor: concatenate
  id: cat1
  sources:
    - hello
    - fragment: name
fragments:
  name:
    processor: var_text
    id: frag1
    value: world
"#
}

#[test]
fn parse_yaml_and_validate_ok() {
    let parsed = parse_resource_str(valid_yaml(), DocumentFormat::Auto).unwrap();
    assert_eq!(parsed.format, DocumentFormat::Yaml);
    assert_eq!(parsed.resource.application_id, Some(1));
    assert_eq!(parsed.resource.security.len(), 1);
    validate_resource(&parsed.resource, &contracts()).unwrap();
}

#[test]
fn parse_auto_detects_json() {
    let json = r#"{ "name": "n", "uri": "a/b", "method": "POST", "process": {"processor": "var_text", "id": "v", "value": 1} }"#;
    let parsed = parse_resource_str(json, DocumentFormat::Auto).unwrap();
    assert_eq!(parsed.format, DocumentFormat::Json);
    parsed.resource.validate(&contracts()).unwrap();
}

#[test]
fn render_then_parse_keeps_tree() {
    let parsed = parse_resource_str(valid_yaml(), DocumentFormat::Yaml).unwrap();
    let text = render_resource_str(&parsed.resource, DocumentFormat::Json).unwrap();
    let again = parse_resource_str(&text, DocumentFormat::Auto).unwrap();
    assert_eq!(again.resource, parsed.resource);
}

#[test]
fn missing_required_input_is_cardinality_violation() {
    let yaml = r#"
name: n
uri: x
method: get
process:
  processor: var_text
  id: needs_value
"#;
    let parsed = parse_resource_str(yaml, DocumentFormat::Yaml).unwrap();
    let err = validate_resource(&parsed.resource, &contracts()).unwrap_err();
    assert_eq!(err.violations.len(), 1);
    let violation = &err.violations[0];
    assert_eq!(violation.kind, ViolationKind::CardinalityViolation);
    assert_eq!(violation.node_id, "needs_value");
    assert_eq!(violation.input.as_deref(), Some("value"));
}

#[test]
fn violations_are_collected_in_one_pass() {
    let yaml = r#"
name: n
uri: x
method: get
security:
  - processor: concatenate
    id: s1
    sources: [a, b]
process:
  processor: sort
  id: dup
  colour: red
  direction: sideways
  values:
    - processor: nope
      id: dup
    - fragment: missing
"#;
    let parsed = parse_resource_str(yaml, DocumentFormat::Yaml).unwrap();
    let err = validate_resource(&parsed.resource, &contracts()).unwrap_err();
    for kind in [
        ViolationKind::DisallowedNestedKind,
        ViolationKind::UnexpectedInput,
        ViolationKind::InvalidLiteral,
        ViolationKind::UnknownOperationKind,
        ViolationKind::DuplicateNodeId,
        ViolationKind::InvalidFragmentReference,
    ] {
        assert!(err.has_kind(kind), "expected {kind} in {:?}", err.violations);
    }
}

#[test]
fn literal_where_operation_required() {
    let yaml = r#"
name: n
uri: x
method: get
security:
  processor: token
  id: s1
  token: abc
process: ok
"#;
    let parsed = parse_resource_str(yaml, DocumentFormat::Yaml).unwrap();
    let err = validate_resource(&parsed.resource, &contracts()).unwrap_err();
    assert!(err.has_kind(ViolationKind::LiteralNotAllowed));
}

#[test]
fn fragment_cycles_are_rejected() {
    let yaml = r#"
name: n
uri: x
method: get
process:
  fragment: a
fragments:
  a:
    processor: concatenate
    id: a1
    sources: [x, {fragment: b}]
  b:
    processor: concatenate
    id: b1
    sources: [y, {fragment: a}]
"#;
    let parsed = parse_resource_str(yaml, DocumentFormat::Yaml).unwrap();
    let err = validate_resource(&parsed.resource, &contracts()).unwrap_err();
    let cyclic: Vec<_> = err
        .violations
        .iter()
        .filter(|v| v.kind == ViolationKind::InvalidFragmentReference)
        .map(|v| v.node_id.as_str())
        .collect();
    assert_eq!(cyclic, vec!["$.fragments.a", "$.fragments.b"]);
}

#[test]
fn missing_ids_are_reported() {
    let yaml = r#"
name: n
uri: x
method: get
process:
  processor: var_text
  value: v
"#;
    let parsed = parse_resource_str(yaml, DocumentFormat::Yaml).unwrap();
    let err = validate_resource(&parsed.resource, &contracts()).unwrap_err();
    assert!(err.has_kind(ViolationKind::MissingNodeId));
}

#[test]
fn fragment_lists_count_every_item() {
    let yaml = r#"
name: n
uri: x
method: get
process:
  processor: var_text
  id: one_value
  value:
    fragment: three
fragments:
  three: [a, b, c]
"#;
    let parsed = parse_resource_str(yaml, DocumentFormat::Yaml).unwrap();
    let err = validate_resource(&parsed.resource, &contracts()).unwrap_err();
    assert_eq!(err.violations.len(), 1, "{:?}", err.violations);
    let violation = &err.violations[0];
    assert_eq!(violation.kind, ViolationKind::CardinalityViolation);
    assert_eq!(violation.node_id, "one_value");
    assert_eq!(violation.input.as_deref(), Some("value"));
}

#[test]
fn fragment_lists_satisfy_many_inputs() {
    let yaml = r#"
name: n
uri: x
method: get
process:
  processor: concatenate
  id: joined
  sources:
    fragment: outer
fragments:
  outer:
    fragment: pair
  pair:
    - hello
    - processor: var_text
      id: who
      value: world
"#;
    let parsed = parse_resource_str(yaml, DocumentFormat::Yaml).unwrap();
    validate_resource(&parsed.resource, &contracts()).unwrap();
}

#[test]
fn fragment_members_are_checked_like_inline_values() {
    let yaml = r#"
name: n
uri: x
method: get
security:
  processor: token_roles
  id: gate
  token:
    processor: bearer_token
    id: bearer
  roles:
    fragment: wanted
process: ok
fragments:
  wanted: [admin]
"#;
    let parsed = parse_resource_str(yaml, DocumentFormat::Yaml).unwrap();
    let err = validate_resource(&parsed.resource, &contracts()).unwrap_err();
    let literal = err
        .violations
        .iter()
        .find(|v| v.kind == ViolationKind::LiteralNotAllowed)
        .unwrap_or_else(|| panic!("no literal violation in {:?}", err.violations));
    assert_eq!(literal.node_id, "gate");
    assert_eq!(literal.input.as_deref(), Some("roles"));
}

#[test]
fn security_fragments_must_be_security_operations() {
    let yaml = r#"
name: n
uri: x
method: get
security:
  - fragment: gate
  - fragment: words
process: ok
fragments:
  gate:
    processor: concatenate
    id: not_a_gate
    sources: [a, b]
  words: [a, b]
"#;
    let parsed = parse_resource_str(yaml, DocumentFormat::Yaml).unwrap();
    let err = validate_resource(&parsed.resource, &contracts()).unwrap_err();
    let at = |kind: ViolationKind| -> Vec<&str> {
        err.violations
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.node_id.as_str())
            .collect()
    };
    assert_eq!(at(ViolationKind::DisallowedNestedKind), vec!["$.security[0]"]);
    assert_eq!(at(ViolationKind::InvalidResource), vec!["$.security[1]"]);
}

#[test]
fn unrecognised_documents_are_unknown_format() {
    let err = parse_resource_str("just some words", DocumentFormat::Auto).unwrap_err();
    assert!(matches!(err, ParseError::UnknownFormat), "{err:?}");

    let err = parse_resource_str("name: [unclosed", DocumentFormat::Auto).unwrap_err();
    assert!(matches!(err, ParseError::Yaml(_)), "{err:?}");
}
