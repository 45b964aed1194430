mod common;

use std::sync::Arc;

use apigate_core::{Method, TaggedValue};
use apigate_exec::http::HttpError;
use apigate_exec::{ErrorKind, ExecutionContext, IncomingRequest, Inputs, Registry};
use apigate_store::{MemoryStore, ResourceStore, RoleRecord, UserRecord};
use common::{context, MockHttp};
use serde_json::json;

async fn run(kind: &str, inputs: Inputs, ctx: &ExecutionContext) -> Result<TaggedValue, apigate_exec::OperationError> {
    let op = Registry::builtin().instantiate(kind).unwrap();
    op.execute(inputs, ctx).await
}

fn ctx_with(request: IncomingRequest) -> (ExecutionContext, Arc<MockHttp>) {
    let http = Arc::new(MockHttp::new());
    (context(Arc::new(MemoryStore::new()), http.clone(), request), http)
}

fn plain_ctx() -> ExecutionContext {
    ctx_with(IncomingRequest::new(Method::Get, "ops")).0
}

#[tokio::test]
async fn var_request_prefers_body_over_query() {
    let req = IncomingRequest::new(Method::Post, "ops")
        .with_query("name", "from-query")
        .with_body_param("name", "from-body")
        .with_query("page", "2");
    let (ctx, _) = ctx_with(req);

    let v = run("var_request", Inputs::new().with("key", "name"), &ctx).await.unwrap();
    assert_eq!(v, TaggedValue::text("from-body"));
    let v = run("var_request", Inputs::new().with("key", "page"), &ctx).await.unwrap();
    assert_eq!(v, TaggedValue::text("2"));

    let err = run(
        "var_request",
        Inputs::new().with("key", "absent").with("nullable", false),
        &ctx,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(err.message, "request var absent not available");
}

#[tokio::test]
async fn var_body_keeps_the_decoded_type() {
    let req = IncomingRequest::new(Method::Post, "ops")
        .with_body_param("name", "ada")
        .with_body_param("age", "36")
        .with_payload(TaggedValue::Json(json!({"name": "ada", "age": 36})));
    let (ctx, _) = ctx_with(req);

    let whole = run("var_body", Inputs::new(), &ctx).await.unwrap();
    assert_eq!(whole, TaggedValue::Json(json!({"name": "ada", "age": 36})));
    let age = run("var_body", Inputs::new().with("key", "age"), &ctx).await.unwrap();
    assert_eq!(age, TaggedValue::Integer(36));

    let form = IncomingRequest::new(Method::Post, "ops").with_body_param("name", "bob");
    let (ctx, _) = ctx_with(form);
    let name = run("var_body", Inputs::new().with("key", "name"), &ctx).await.unwrap();
    assert_eq!(name, TaggedValue::text("bob"));
    let absent = run("var_body", Inputs::new(), &ctx).await.unwrap();
    assert_eq!(absent, TaggedValue::text(""));

    let err = run("var_body", Inputs::new().with("key", "missing").with("nullable", false), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(err.message, "body member missing not available");
}

#[tokio::test]
async fn var_field_builds_single_entry_objects() {
    let ctx = plain_ctx();
    let v = run("var_field", Inputs::new().with("key", "name").with("value", "bob"), &ctx)
        .await
        .unwrap();
    assert_eq!(v, TaggedValue::Json(json!({"name": "bob"})));

    let v = run("var_field", Inputs::new().with("array", TaggedValue::Json(json!({"id": 3}))), &ctx)
        .await
        .unwrap();
    assert_eq!(v, TaggedValue::Json(json!({"id": 3})));

    let err = run(
        "var_field",
        Inputs::new().with("array", TaggedValue::Json(json!({"a": 1, "b": 2}))),
        &ctx,
    )
    .await
    .unwrap_err();
    assert_eq!(err.message, "Cannot have more than one index in an input array.");
}

#[tokio::test]
async fn typed_vars_convert_or_reject() {
    let ctx = plain_ctx();
    assert_eq!(
        run("var_int", Inputs::new().with("value", "42"), &ctx).await.unwrap(),
        TaggedValue::Integer(42)
    );
    assert_eq!(
        run("var_bool", Inputs::new().with("value", "off"), &ctx).await.unwrap(),
        TaggedValue::Boolean(false)
    );
    let err = run("var_int", Inputs::new().with("value", "forty"), &ctx).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn var_rand_honours_length_and_classes() {
    let ctx = plain_ctx();
    let v = run(
        "var_rand",
        Inputs::new()
            .with("length", 16i64)
            .with("lower", false)
            .with("upper", false),
        &ctx,
    )
    .await
    .unwrap();
    let s = v.to_plain_string();
    assert_eq!(s.len(), 16);
    assert!(s.chars().all(|c| c.is_ascii_digit()), "{s}");
}

#[tokio::test]
async fn merge_modes() {
    let ctx = plain_ctx();
    let lists = || {
        vec![
            TaggedValue::Array(vec![json!(1), json!(2), json!(3)]),
            TaggedValue::Array(vec![json!(2), json!(3), json!(4)]),
        ]
    };
    let merge = |mode: &'static str| Inputs::new().with_many("sources", lists()).with("merge_type", mode);

    assert_eq!(
        run("merge", merge("union"), &ctx).await.unwrap(),
        TaggedValue::Array(vec![json!(1), json!(2), json!(3), json!(4)])
    );
    assert_eq!(
        run("merge", merge("intersect"), &ctx).await.unwrap(),
        TaggedValue::Array(vec![json!(2), json!(3)])
    );
    assert_eq!(
        run("merge", merge("difference"), &ctx).await.unwrap(),
        TaggedValue::Array(vec![json!(1)])
    );
    let err = run("merge", merge("zip"), &ctx).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn sort_lists_and_objects() {
    let ctx = plain_ctx();
    let v = run(
        "sort",
        Inputs::new()
            .with_many("values", vec![3i64.into(), 1i64.into(), 2i64.into()])
            .with("sort_by", "value")
            .with("direction", "desc"),
        &ctx,
    )
    .await
    .unwrap();
    assert_eq!(v, TaggedValue::Array(vec![json!(3), json!(2), json!(1)]));

    let v = run(
        "sort",
        Inputs::new().with("values", TaggedValue::Json(json!({"b": 1, "a": 2}))),
        &ctx,
    )
    .await
    .unwrap();
    assert_eq!(v, TaggedValue::Array(vec![json!({"a": 2}), json!({"b": 1})]));
}

#[tokio::test]
async fn cast_reports_unsupported_pairs() {
    let ctx = plain_ctx();
    let v = run("cast", Inputs::new().with("data", "12").with("data_type", "integer"), &ctx)
        .await
        .unwrap();
    assert_eq!(v, TaggedValue::Integer(12));

    let err = run("cast", Inputs::new().with("data", true).with("data_type", "image"), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedConversion);
    assert_eq!(err.message, "Cannot cast boolean to image");
}

#[tokio::test]
async fn json_path_single_and_multiple_matches() {
    let ctx = plain_ctx();
    let doc = r#"{"items":[{"name":"a"},{"name":"b"}]}"#;
    let v = run("json_path", Inputs::new().with("source", doc).with("path", "$.items[0].name"), &ctx)
        .await
        .unwrap();
    assert_eq!(v, TaggedValue::Json(json!("a")));

    let v = run("json_path", Inputs::new().with("source", doc).with("path", "$.items[*].name"), &ctx)
        .await
        .unwrap();
    assert_eq!(v, TaggedValue::Array(vec![json!("a"), json!("b")]));

    let err = run("json_path", Inputs::new().with("source", doc).with("path", "items["), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn url_retries_transient_statuses() {
    let (ctx, http) = ctx_with(IncomingRequest::new(Method::Get, "ops"));
    http.push(503, "");
    http.push(200, r#"{"ok":true}"#);

    let v = run("url", Inputs::new().with("url", "https://api.example.com/status"), &ctx)
        .await
        .unwrap();
    assert_eq!(v, TaggedValue::Json(json!({"ok": true})));
    assert_eq!(http.calls(), 2);
}

#[tokio::test]
async fn url_failures_are_upstream_errors() {
    let (ctx, http) = ctx_with(IncomingRequest::new(Method::Get, "ops"));
    http.push(404, r#"{"error":"missing"}"#);
    let err = run("url", Inputs::new().with("url", "https://api.example.com/missing"), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UpstreamFailure);
    assert_eq!(http.calls(), 1);

    http.push(404, r#"{"error":"missing"}"#);
    let v = run(
        "url",
        Inputs::new()
            .with("url", "https://api.example.com/missing")
            .with("report_error", false),
        &ctx,
    )
    .await
    .unwrap();
    assert_eq!(v, TaggedValue::Json(json!({"error": "missing"})));

    http.push_err(HttpError::Network("connection reset".into()));
    http.push_err(HttpError::Network("connection reset".into()));
    http.push_err(HttpError::Network("connection reset".into()));
    let err = run("url", Inputs::new().with("url", "https://api.example.com/down"), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UpstreamFailure);
}

#[tokio::test]
async fn url_refuses_private_addresses() {
    let (ctx, http) = ctx_with(IncomingRequest::new(Method::Get, "ops"));
    for target in ["http://127.0.0.1/admin", "http://[::1]/", "ftp://example.com/file"] {
        let err = run("url", Inputs::new().with("url", target), &ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamFailure, "{target}");
    }
    assert_eq!(http.calls(), 0);
}

#[tokio::test]
async fn url_sends_headers_and_json_body() {
    let (ctx, http) = ctx_with(IncomingRequest::new(Method::Get, "ops"));
    run(
        "url",
        Inputs::new()
            .with("url", "https://api.example.com/items")
            .with("method", "post")
            .with_many("headers", vec![TaggedValue::text("X-Trace: abc")])
            .with("body", TaggedValue::Json(json!({"name": "widget"}))),
        &ctx,
    )
    .await
    .unwrap();

    let sent = http.requests.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, "POST");
    assert_eq!(sent[0].headers.get("x-trace").map(String::as_str), Some("abc"));
    assert_eq!(
        sent[0].headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
    assert_eq!(sent[0].body, br#"{"name":"widget"}"#.to_vec());
}

#[tokio::test]
async fn mapper_copies_selected_values() {
    let ctx = plain_ctx();
    let source = json!({
        "user": {"name": "ada", "langs": ["en", "fr"]},
        "meta": {"id": 7},
    });
    let v = run(
        "mapper",
        Inputs::new().with("source", TaggedValue::Json(source)).with_many(
            "mappings",
            vec![
                TaggedValue::Json(json!({"get": "$.user.name", "set": "person/name"})),
                TaggedValue::Json(json!({"get": "$.meta.id", "set": "ids[]"})),
                TaggedValue::Json(json!({"get": "$.user.langs[*]", "set": "person[languages]"})),
                TaggedValue::Json(json!({"get": "$.nothing", "set": "skipped"})),
            ],
        ),
        &ctx,
    )
    .await
    .unwrap();
    assert_eq!(
        v,
        TaggedValue::Json(json!({
            "person": {"name": "ada", "languages": ["en", "fr"]},
            "ids": [7],
        }))
    );

    let text_source = run(
        "mapper",
        Inputs::new()
            .with("source", r#"{"a": 1}"#)
            .with("mappings", TaggedValue::Json(json!({"get": "$.a", "set": "b"}))),
        &ctx,
    )
    .await
    .unwrap();
    assert_eq!(text_source, TaggedValue::Json(json!({"b": 1})));
}

#[tokio::test]
async fn mapper_rejects_incomplete_mappings() {
    let ctx = plain_ctx();
    for mapping in [json!({"get": "$.a"}), json!({"set": "a"}), json!({"get": "a[", "set": "a"})] {
        let err = run(
            "mapper",
            Inputs::new()
                .with("source", TaggedValue::Json(json!({"a": 1})))
                .with("mappings", TaggedValue::Json(mapping.clone())),
            &ctx,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput, "{mapping}");
    }
}

fn filter_source() -> TaggedValue {
    TaggedValue::Json(json!({
        "key1": "val1",
        "key2": "val2",
        "key3": "val3",
        "key4": "val4",
        "key5": {"key6": "val6", "key7": "val7"},
    }))
}

async fn filter(key_value: &str, inverse: bool, recursive: bool, pattern: &str) -> serde_json::Value {
    let ctx = plain_ctx();
    let inputs = Inputs::new()
        .with("values", filter_source())
        .with("filter", pattern)
        .with("key_value", key_value)
        .with("regex", true)
        .with("inverse", inverse)
        .with("recursive", recursive);
    run("filter", inputs, &ctx).await.unwrap().to_json()
}

#[tokio::test]
async fn filter_by_key_with_regex() {
    let pattern = "^key[46]$";
    assert_eq!(
        filter("key", false, false, pattern).await,
        json!({"key1": "val1", "key2": "val2", "key3": "val3", "key5": {"key6": "val6", "key7": "val7"}})
    );
    assert_eq!(
        filter("key", false, true, pattern).await,
        json!({"key1": "val1", "key2": "val2", "key3": "val3", "key5": {"key7": "val7"}})
    );
    assert_eq!(filter("key", true, false, pattern).await, json!({"key4": "val4"}));
    assert_eq!(filter("key", true, true, pattern).await, json!({"key4": "val4"}));
}

#[tokio::test]
async fn filter_by_value_with_regex() {
    let pattern = "^val[37]$";
    assert_eq!(
        filter("value", false, false, pattern).await,
        json!({"key1": "val1", "key2": "val2", "key4": "val4", "key5": {"key6": "val6", "key7": "val7"}})
    );
    assert_eq!(
        filter("value", false, true, pattern).await,
        json!({"key1": "val1", "key2": "val2", "key4": "val4", "key5": {"key6": "val6"}})
    );
    assert_eq!(filter("value", true, false, pattern).await, json!({"key3": "val3"}));
}

#[tokio::test]
async fn filter_exact_values_on_lists() {
    let ctx = plain_ctx();
    let v = run(
        "filter",
        Inputs::new()
            .with("values", TaggedValue::Array(vec![json!("a"), json!(2), json!("b"), json!("a")]))
            .with_many("filter", vec![TaggedValue::text("a"), TaggedValue::Integer(2)]),
        &ctx,
    )
    .await
    .unwrap();
    assert_eq!(v, TaggedValue::Json(json!(["b"])));

    let err = run(
        "filter",
        Inputs::new()
            .with("values", filter_source())
            .with("filter", "(")
            .with("regex", true),
        &ctx,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let err = run("filter", Inputs::new().with("values", "flat").with("filter", "x"), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

async fn store_with_accounts() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (id, username, token) in [(1, "dev", "dev-token"), (2, "reader", "reader-token")] {
        store
            .add_user(UserRecord {
                id,
                username: username.into(),
                active: true,
                token: Some(token.into()),
                token_expires_at: None,
            })
            .await;
    }
    store.add_role(RoleRecord { id: 4, name: "Developer".into() }).await;
    store.add_role(RoleRecord { id: 5, name: "Consumer".into() }).await;
    store.grant_role(1, 4, Some(1)).await;
    store.grant_role(2, 5, Some(1)).await;
    store
}

#[tokio::test]
async fn token_user_accepts_listed_users_only() {
    let store = store_with_accounts().await;
    let ctx = context(store, Arc::new(MockHttp::new()), IncomingRequest::new(Method::Get, "ops"));
    let users = || vec![TaggedValue::text("dev"), TaggedValue::text("admin")];

    let v = run("token_user", Inputs::new().with("token", "dev-token").with_many("usernames", users()), &ctx)
        .await
        .unwrap();
    assert_eq!(v, TaggedValue::Boolean(true));

    let listed = TaggedValue::Array(vec![json!("reader")]);
    let v = run("token_user", Inputs::new().with("token", "reader-token").with("usernames", listed), &ctx)
        .await
        .unwrap();
    assert_eq!(v, TaggedValue::Boolean(true));

    for token in ["reader-token", "unknown", ""] {
        let err = run("token_user", Inputs::new().with("token", token).with_many("usernames", users()), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied, "{token}");
    }
}

#[tokio::test]
async fn var_store_update_needs_a_writer_role() {
    let store = store_with_accounts().await;
    let ctx = context(store.clone(), Arc::new(MockHttp::new()), IncomingRequest::new(Method::Get, "ops"));

    let missing = run("var_store", Inputs::new().with("key", "motd"), &ctx).await.unwrap();
    assert_eq!(missing, TaggedValue::text(""));
    let err = run("var_store", Inputs::new().with("key", "motd").with("nullable", false), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let err = run(
        "var_store_update",
        Inputs::new().with("token", "reader-token").with("key", "motd").with("val", "hi"),
        &ctx,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
    assert!(store.get_var(1, "motd").await.unwrap().is_none());

    let saved = run(
        "var_store_update",
        Inputs::new()
            .with("token", "dev-token")
            .with("key", "motd")
            .with("val", TaggedValue::Json(json!({"text": "hello"}))),
        &ctx,
    )
    .await
    .unwrap()
    .to_json();
    assert_eq!(saved["appid"], 1);
    assert_eq!(saved["key"], "motd");
    assert_eq!(saved["val"], json!({"text": "hello"}));

    let read = run("var_store", Inputs::new().with("key", "motd"), &ctx).await.unwrap();
    assert_eq!(read, TaggedValue::Json(json!({"text": "hello"})));
}
