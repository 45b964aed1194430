use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

fn apigate() -> Command {
    let mut cmd = Command::cargo_bin("apigate").unwrap();
    cmd.env_remove("APIGATE_DATABASE_URL")
        .env_remove("DATABASE_URL")
        .env_remove("APIGATE_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

const CONCAT: &str = r#"
name: concat
uri: /joined
method: get
process:
  processor: concatenate
  id: join
  sources:
    - a
    - processor: var_request
      id: suffix
      key: suffix
"#;

#[test]
fn validate_accepts_a_valid_resource() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "concat.yaml", CONCAT);
    let out = apigate().args(["validate", &path]).assert().success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).into_owned();
    assert!(stdout.contains("ok: valid resource get joined"), "{stdout}");
}

#[test]
fn validate_reports_cardinality_violations() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "broken.yaml",
        "name: broken\nuri: broken\nmethod: get\nprocess:\n  processor: cast\n  id: caster\n  data_type: text\n",
    );
    let out = apigate()
        .args(["validate", &path, "--format", "json"])
        .assert()
        .code(2);
    let body: serde_json::Value = serde_json::from_slice(&out.get_output().stdout).unwrap();
    assert_eq!(body["valid"], false);
    assert_eq!(body["violations"][0]["node_id"], "caster");
    assert_eq!(body["violations"][0]["kind"], "cardinality_violation");
}

#[test]
fn validate_rejects_unparseable_input() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad.yaml", "invalid: yaml: content");
    apigate().args(["validate", &path]).assert().code(2);
}

#[test]
fn validate_names_unrecognised_documents() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "notes.txt", "just some words");
    let out = apigate().args(["validate", &path]).assert().code(2);
    let stderr = String::from_utf8_lossy(&out.get_output().stderr).into_owned();
    assert!(stderr.contains("neither a valid JSON nor a valid YAML"), "{stderr}");
}

#[test]
fn run_prints_the_envelope() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "concat.yaml", CONCAT);
    let out = apigate()
        .args(["run", &path, "--param", "suffix=b"])
        .assert()
        .success();
    let body: serde_json::Value = serde_json::from_slice(&out.get_output().stdout).unwrap();
    assert_eq!(body, serde_json::json!({"result": "ok", "data": "ab"}));
}

#[test]
fn run_renders_requested_format() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "concat.yaml", CONCAT);
    let out = apigate()
        .args(["run", &path, "--set", "suffix=c", "--render", "text", "--format", "json"])
        .assert()
        .success();
    let body: serde_json::Value = serde_json::from_slice(&out.get_output().stdout).unwrap();
    assert_eq!(body["status"], 200);
    assert_eq!(body["content_type"], "text/plain");
    assert_eq!(body["body"], "ac");
}

#[test]
fn run_exits_3_on_unrenderable_result() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "flag.yaml", "name: flag\nuri: flag\nmethod: get\nprocess: true\n");
    let out = apigate()
        .args(["run", &path, "--render", "image"])
        .assert()
        .code(3);
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).into_owned();
    assert!(stdout.contains("Cannot cast boolean to image"), "{stdout}");
}

#[test]
fn run_uses_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "concat.yaml", CONCAT);
    let config = write(&dir, "gateway.yaml", "output:\n  wrap_json: false\n");
    let out = apigate()
        .args(["run", &path, "--param", "suffix=z", "--config", &config])
        .assert()
        .success();
    let body: serde_json::Value = serde_json::from_slice(&out.get_output().stdout).unwrap();
    assert_eq!(body, serde_json::json!("az"));
}

#[test]
fn operations_lists_builtin_kinds() {
    let out = apigate().args(["operations", "--format", "json"]).assert().success();
    let body: serde_json::Value = serde_json::from_slice(&out.get_output().stdout).unwrap();
    let kinds: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["kind"].as_str())
        .collect();
    for kind in ["concatenate", "merge", "url", "token_roles", "var_request"] {
        assert!(kinds.contains(&kind), "missing {kind}");
    }

    apigate().args(["operations", "no_such_kind"]).assert().code(2);
}

#[test]
fn config_prints_defaults() {
    let out = apigate().args(["config", "--format", "json"]).assert().success();
    let body: serde_json::Value = serde_json::from_slice(&out.get_output().stdout).unwrap();
    assert_eq!(body["output"]["wrap_json"], true);
    assert_eq!(body["cache"]["enabled"], true);

    let out = apigate()
        .args(["config", "--format", "json", "--no-cache", "--timeout-ms", "250", "--allow-host", "API.example.com"])
        .assert()
        .success();
    let body: serde_json::Value = serde_json::from_slice(&out.get_output().stdout).unwrap();
    assert_eq!(body["cache"]["enabled"], false);
    assert_eq!(body["http"]["timeout_ms"], 250);
    assert_eq!(body["network"]["hosts"], serde_json::json!(["api.example.com"]));
}

#[test]
fn store_commands_need_a_database_url() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "concat.yaml", CONCAT);
    apigate().args(["import", &path, "--app-id", "1"]).assert().code(4);
    apigate()
        .args(["export", "--app-id", "1", "--uri", "joined"])
        .assert()
        .code(4);
    apigate().args(["migrate"]).assert().code(4);
}
