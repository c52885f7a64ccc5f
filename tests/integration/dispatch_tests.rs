//! Integration tests for the guarded call path.
//!
//! Covers schema reports (success, soft listing errors, unavailable
//! children) and tool calls (flattening, truncation, error strings,
//! timeouts) through `Dispatcher`.

use std::time::Duration;

use mcp_gateway::client::JsonObject;
use mcp_gateway::models::status::ChildState;
use mcp_gateway::orchestrator::dispatch::Dispatcher;
use serde_json::json;

use super::test_helpers::{test_manager, ChildScript, FakeFactory};

fn args(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// ── get_schema ───────────────────────────────────────────────

#[tokio::test]
async fn schema_lists_tools_and_resources() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let report = dispatcher.get_schema("fs").await;

    assert!(report.is_available());
    assert_eq!(report.status, ChildState::Running);
    let tools = report.tools.expect("tools listed");
    assert_eq!(tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["echo", "slow"]);
    assert_eq!(report.resources.expect("resources listed")[0].uri, "mem://fs/notes");
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn schema_starts_the_child_once() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    dispatcher.get_schema("fs").await;
    dispatcher.get_schema("fs").await;

    assert_eq!(factory.counters.launches("fs"), 1);
}

#[tokio::test]
async fn unsupported_resources_are_a_soft_error() {
    let factory = FakeFactory::new([(
        "fs",
        ChildScript {
            fail_list_resources: true,
            ..ChildScript::default()
        },
    )]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let report = dispatcher.get_schema("fs").await;

    assert!(report.is_available());
    assert_eq!(report.tools.as_ref().map(Vec::len), Some(2));
    assert_eq!(report.resources.as_ref().map(Vec::len), Some(0));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("list_resources failed:"));
}

#[tokio::test]
async fn tool_listing_failure_is_recorded() {
    let factory = FakeFactory::new([(
        "fs",
        ChildScript {
            fail_list_tools: true,
            ..ChildScript::default()
        },
    )]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let report = dispatcher.get_schema("fs").await;

    assert_eq!(report.tools.as_ref().map(Vec::len), Some(0));
    assert!(report.errors[0].starts_with("list_tools failed:"));
}

#[tokio::test]
async fn schema_for_failed_child_carries_the_cause() {
    let factory = FakeFactory::new([(
        "fs",
        ChildScript {
            fail_launches: 1,
            ..ChildScript::default()
        },
    )]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let report = dispatcher.get_schema("fs").await;

    assert!(!report.is_available());
    assert_eq!(report.status, ChildState::FailedStart);
    assert!(report.tools.is_none());
    assert!(report
        .error
        .as_deref()
        .is_some_and(|e| e.contains("scripted launch failure")));
}

#[tokio::test]
async fn schema_for_unknown_child() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let report = dispatcher.get_schema("ghost").await;

    assert_eq!(
        report.error.as_deref(),
        Some("child server 'ghost' not found in config")
    );
    assert_eq!(factory.counters.launches("ghost"), 0);
}

// ── call_tool ────────────────────────────────────────────────

#[tokio::test]
async fn call_returns_child_text() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let out = dispatcher
        .call_tool("fs", "echo", args(json!({ "path": "/tmp" })), None, None)
        .await;

    assert_eq!(out, r#"{"path":"/tmp"}"#);
}

#[tokio::test]
async fn multi_part_output_is_flattened() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let out = dispatcher
        .call_tool("fs", "multi", JsonObject::new(), None, None)
        .await;

    assert_eq!(out, "caption\n[Image Data: image/png]\n[Audio Data: audio/wav]");
}

#[tokio::test]
async fn long_output_is_truncated() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let out = dispatcher
        .call_tool(
            "fs",
            "big",
            args(json!({ "len": 1000 })),
            Some(&json!(10)),
            Some(&json!(10)),
        )
        .await;

    assert_eq!(
        out,
        format!(
            "{}\n...(980 characters omitted)...\n{}",
            "x".repeat(10),
            "x".repeat(10)
        )
    );
}

#[tokio::test]
async fn string_trim_values_are_accepted() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let out = dispatcher
        .call_tool("fs", "big", args(json!({ "len": 50 })), Some(&json!("5")), None)
        .await;

    assert!(out.contains("(40 characters omitted)"));
}

#[tokio::test]
async fn invalid_trim_value_fails_before_launch() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let out = dispatcher
        .call_tool("fs", "echo", JsonObject::new(), Some(&json!(-1)), None)
        .await;

    assert!(out.starts_with("Error executing tool 'echo' on 'fs': "));
    assert!(out.contains("head_chars must be a non-negative integer"));
    assert_eq!(factory.counters.launches("fs"), 0);
}

#[tokio::test]
async fn unknown_child_reports_missing_config() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let out = dispatcher
        .call_tool("ghost", "echo", JsonObject::new(), None, None)
        .await;

    assert_eq!(out, "Error executing tool 'echo' on 'ghost': config not found.");
}

#[tokio::test]
async fn failed_start_reports_status_and_last_error() {
    let factory = FakeFactory::new([(
        "fs",
        ChildScript {
            fail_handshake: true,
            ..ChildScript::default()
        },
    )]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let out = dispatcher
        .call_tool("fs", "echo", JsonObject::new(), None, None)
        .await;

    assert!(out.starts_with(
        "Error executing tool 'echo' on 'fs': child server is not running (status=failed_start)."
    ));
    assert!(out.contains(" Last error: handshake:"));
}

#[tokio::test]
async fn transport_error_is_labeled_and_session_kept() {
    let factory = FakeFactory::healthy(&["fs"]);
    let manager = test_manager(&factory, &["fs"]);
    let dispatcher = Dispatcher::new(std::sync::Arc::clone(&manager));

    let out = dispatcher
        .call_tool("fs", "fail", JsonObject::new(), None, None)
        .await;

    assert_eq!(
        out,
        "Error executing tool 'fail' on 'fs': transport: tools/call failed: broken pipe"
    );
    assert!(manager.is_running("fs").await);
    assert_eq!(manager.status("fs").await.status, ChildState::Running);
}

#[tokio::test]
async fn flagged_result_is_returned_as_text() {
    let factory = FakeFactory::healthy(&["fs"]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let out = dispatcher
        .call_tool("fs", "flagged", JsonObject::new(), None, None)
        .await;

    assert_eq!(out, "bad input");
}

#[tokio::test(start_paused = true)]
async fn call_timeout_releases_the_guard() {
    let factory = FakeFactory::new([(
        "fs",
        ChildScript {
            call_delay: Duration::from_millis(100),
            ..ChildScript::default()
        },
    )]);
    let dispatcher = Dispatcher::new(test_manager(&factory, &["fs"]));

    let out = dispatcher
        .call_tool("fs", "hang", JsonObject::new(), None, None)
        .await;
    assert_eq!(out, "Error executing tool 'hang' on 'fs': Timeout after 10s");

    let next = dispatcher
        .call_tool("fs", "slow", JsonObject::new(), None, None)
        .await;
    assert_eq!(next, "done");
    assert_eq!(factory.counters.launches("fs"), 1);
}
