use std::io::Write;
use std::path::PathBuf;

use mcp_gateway::config::{validate_abstract_path, ChildDescriptor, ChildRegistry, Timeouts};
use mcp_gateway::AppError;

const SAMPLE_JSON: &str = r#"{
  "mcpServers": {
    "fs": { "command": "fs-server", "args": ["--root", "/tmp"] },
    "web": { "command": "web-server", "env": { "TOKEN": "abc" } }
  }
}"#;

const SAMPLE_TOML: &str = r#"
[mcp_servers.fs]
command = "fs-server"
args = ["--root", "/tmp"]

[mcp_servers.web]
command = "web-server"

[mcp_servers.web.env]
TOKEN = "abc"
"#;

fn write_temp(dir: &tempfile::TempDir, file: &str, body: &str) -> PathBuf {
    let path = dir.path().join(file);
    let mut handle = std::fs::File::create(&path).expect("create temp file");
    handle.write_all(body.as_bytes()).expect("write temp file");
    path
}

#[test]
fn parses_json_registry() {
    let registry = ChildRegistry::from_json_str(SAMPLE_JSON).expect("json parses");

    assert_eq!(registry.len(), 2);
    let fs = registry.get("fs").expect("fs registered");
    assert_eq!(fs.name, "fs");
    assert_eq!(fs.command, "fs-server");
    assert_eq!(fs.args, vec!["--root", "/tmp"]);
    assert!(fs.env.is_empty());

    let web = registry.get("web").expect("web registered");
    assert!(web.args.is_empty());
    assert_eq!(web.env.get("TOKEN").map(String::as_str), Some("abc"));
}

#[test]
fn toml_and_json_produce_the_same_registry() {
    let json = ChildRegistry::from_json_str(SAMPLE_JSON).expect("json parses");
    let toml = ChildRegistry::from_toml_str(SAMPLE_TOML).expect("toml parses");
    assert_eq!(json, toml);
}

#[test]
fn registry_keeps_declaration_order() {
    let raw = r#"{ "mcpServers": {
        "zeta": { "command": "z" },
        "alpha": { "command": "a" },
        "mid": { "command": "m" }
    } }"#;
    let registry = ChildRegistry::from_json_str(raw).expect("parses");
    let names: Vec<&str> = registry.names().collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn empty_server_table_is_valid() {
    let registry = ChildRegistry::from_json_str(r#"{ "mcpServers": {} }"#).expect("parses");
    assert!(registry.is_empty());
}

#[test]
fn missing_servers_key_is_rejected() {
    let err = ChildRegistry::from_json_str(r#"{ "servers": {} }"#).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert!(err.to_string().contains("mcpServers"));
}

#[test]
fn toml_key_wins_over_json_key() {
    let raw = r#"{
        "mcp_servers": { "a": { "command": "from-toml-key" } },
        "mcpServers": { "b": { "command": "from-json-key" } }
    }"#;
    let registry = ChildRegistry::from_json_str(raw).expect("parses");
    assert!(registry.get("a").is_some());
    assert!(registry.get("b").is_none());
}

#[test]
fn entry_without_command_is_rejected() {
    let err = ChildRegistry::from_json_str(r#"{ "mcpServers": { "x": { "args": [] } } }"#)
        .unwrap_err();
    assert!(err.to_string().contains("invalid entry for child 'x'"));
}

#[test]
fn blank_command_is_rejected() {
    let err = ChildRegistry::from_json_str(r#"{ "mcpServers": { "x": { "command": "  " } } }"#)
        .unwrap_err();
    assert!(err.to_string().contains("empty command"));
}

#[test]
fn duplicate_descriptors_are_rejected() {
    let err = ChildRegistry::from_descriptors(vec![
        ChildDescriptor::new("a", "one", vec![]),
        ChildDescriptor::new("a", "two", vec![]),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("duplicate child name 'a'"));
}

#[test]
fn malformed_json_maps_to_config_error() {
    let err = ChildRegistry::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("invalid json")));
}

#[test]
fn malformed_toml_maps_to_config_error() {
    let err = ChildRegistry::from_toml_str("[mcp_servers.a\ncommand =").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("invalid toml")));
}

#[test]
fn loads_json_file_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_temp(&dir, "children.json", SAMPLE_JSON);

    let registry = ChildRegistry::load_from_path(&path).expect("loads");
    assert_eq!(registry.len(), 2);
}

#[test]
fn loads_toml_file_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_temp(&dir, "children.toml", SAMPLE_TOML);

    let registry = ChildRegistry::load_from_path(&path).expect("loads");
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["fs", "web"]);
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = ChildRegistry::load_from_path(dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("config file not found"));
}

#[test]
fn unsupported_extension_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_temp(&dir, "children.yaml", "mcpServers: {}");

    let err = ChildRegistry::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("must be .json or .toml"));
}

#[test]
fn load_errors_name_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_temp(&dir, "broken.json", "{}");

    let err = ChildRegistry::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn default_timeouts() {
    let timeouts = Timeouts::default();
    assert_eq!(timeouts.handshake.as_secs(), 30);
    assert_eq!(timeouts.call.as_secs(), 60);
}

#[test]
fn abstract_path_must_be_json() {
    assert!(validate_abstract_path(None).expect("none ok").is_none());

    let ok = validate_abstract_path(Some(PathBuf::from("summary.json"))).expect("json ok");
    assert_eq!(ok, Some(PathBuf::from("summary.json")));

    let err = validate_abstract_path(Some(PathBuf::from("summary.md"))).unwrap_err();
    assert!(err.to_string().contains("must specify a .json file"));
}
