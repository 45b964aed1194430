mod common;

use std::sync::Arc;

use apigate_core::{Method, TaggedValue};
use apigate_exec::{
    decode_body, ErrorKind, ExecutionError, Formatter, Gateway, GatewayConfig, IncomingRequest, OutputFormat,
};
use apigate_store::MemoryStore;
use common::{context, test_config, tree, MockHttp};
use serde_json::{json, Value as JsonValue};

fn body_json(bytes: &[u8]) -> JsonValue {
    serde_json::from_slice(bytes).unwrap()
}

#[test]
fn success_envelope_wraps_json() {
    let f = Formatter::default();
    let r = f
        .render_success(TaggedValue::Array(vec![json!(1), json!(2)]), OutputFormat::Json)
        .unwrap();
    assert_eq!(r.content_type, "application/json");
    assert_eq!(body_json(&r.body), json!({"result": "ok", "data": [1, 2]}));

    let r = f.render_success(TaggedValue::text("hi"), OutputFormat::Text).unwrap();
    assert_eq!(r.text(), "hi");
    assert_eq!(r.content_type, "text/plain");
}

#[test]
fn unwrapped_json_when_disabled() {
    let mut config = GatewayConfig::default();
    config.output.wrap_json = false;
    let f = Formatter::new(&config);
    let r = f
        .render_success(TaggedValue::Json(json!({"a": 1})), OutputFormat::Json)
        .unwrap();
    assert_eq!(body_json(&r.body), json!({"a": 1}));
}

#[test]
fn xml_render_of_json_object() {
    let f = Formatter::default();
    let r = f
        .render(TaggedValue::Json(json!({"name": "widget"})), OutputFormat::Xml)
        .unwrap();
    assert_eq!(r.content_type, "application/xml");
    let text = r.text();
    assert!(text.contains("<name>widget</name>"), "{text}");
}

#[test]
fn error_envelope_falls_back_to_default_format() {
    let f = Formatter::default();
    let err = ExecutionError::new(ErrorKind::PermissionDenied, "permission denied").at("check_token");

    let r = f.render_error(&err, OutputFormat::Image);
    assert_eq!(r.content_type, "application/json");
    assert_eq!(
        body_json(&r.body),
        json!({"result": "error", "data": {"code": 4, "id": "check_token", "message": "permission denied"}})
    );

    let r = f.render_error(&err, OutputFormat::Xml);
    assert_eq!(r.content_type, "application/xml");
    assert!(r.text().contains("permission denied"));
}

#[tokio::test]
async fn boolean_result_cannot_render_as_image() {
    let store = Arc::new(MemoryStore::new());
    let http = Arc::new(MockHttp::new());
    let gateway = Gateway::new(store.clone(), http.clone(), test_config());
    let t = tree("name: flag\nuri: flag\nmethod: get\nprocess: true\n");
    let ctx = context(store, http, IncomingRequest::new(Method::Get, "flag"));

    let resp = gateway.run(&t, &ctx, OutputFormat::Image).await;
    assert_eq!(resp.status, 400);
    assert!(resp.text().contains("Cannot cast boolean to image"), "{}", resp.text());

    let resp = gateway.run(&t, &ctx, OutputFormat::Json).await;
    assert_eq!(resp.status, 200);
    assert_eq!(body_json(&resp.body), json!({"result": "ok", "data": true}));
}

#[tokio::test]
async fn remote_only_outputs_answer_true() {
    let store = Arc::new(MemoryStore::new());
    let http = Arc::new(MockHttp::new());
    let gateway = Gateway::new(store.clone(), http.clone(), test_config());
    let t = tree(
        r#"
name: forward
uri: forward
method: post
process:
  processor: var_request
  id: payload
  key: name
output:
  - id: hook
    processor: json
    destination: [https://hooks.example.com/in]
"#,
    );
    let ctx = context(
        store,
        http.clone(),
        IncomingRequest::new(Method::Post, "forward").with_body_param("name", "ada"),
    );

    let resp = gateway.run(&t, &ctx, OutputFormat::Json).await;
    assert_eq!(resp.status, 200);
    assert_eq!(body_json(&resp.body), json!({"result": "ok", "data": true}));
    assert_eq!(http.calls(), 1);
    let sent = http.requests.lock().unwrap();
    assert_eq!(sent[0].url.as_str(), "https://hooks.example.com/in");
    assert_eq!(body_json(&sent[0].body), json!("ada"));
}

#[test]
fn request_bodies_decode_by_content_type() {
    let decoded = decode_body(b"a=1&b=two", Some("application/x-www-form-urlencoded")).unwrap();
    assert_eq!(decoded.params.get("b").map(String::as_str), Some("two"));

    let decoded = decode_body(br#"{"name":"ada","age":36}"#, Some("application/json; charset=utf-8")).unwrap();
    assert_eq!(decoded.params.get("name").map(String::as_str), Some("ada"));
    assert_eq!(decoded.payload, Some(TaggedValue::Json(json!({"name": "ada", "age": 36}))));

    let err = decode_body(b"{not json", Some("application/json")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}
