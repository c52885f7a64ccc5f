//! End-to-end tests of the gateway answering a host over an in-memory pipe.

use mcp_gateway::mcp::handler::GatewayServer;
use rmcp::model::CallToolRequestParam;
use rmcp::service::ServiceExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::test_helpers::{test_app_state, FakeFactory};

fn call(name: &str, arguments: serde_json::Value) -> CallToolRequestParam {
    serde_json::from_value(json!({ "name": name, "arguments": arguments }))
        .expect("valid call request")
}

fn first_text(result: &rmcp::model::CallToolResult) -> String {
    let part = serde_json::to_value(&result.content[0]).expect("content serializes");
    part["text"].as_str().expect("text content").to_owned()
}

#[tokio::test]
async fn host_discovers_and_calls_through_the_gateway() {
    let factory = FakeFactory::healthy(&["fs"]);
    let state = test_app_state(&factory, &["fs"]);
    let (gateway_io, host_io) = tokio::io::duplex(64 * 1024);
    let ct = CancellationToken::new();
    let gateway = tokio::spawn(GatewayServer::new(state).serve_host(gateway_io, ct.clone()));

    let host = ().serve(host_io).await.expect("host initialize");

    let mut names: Vec<String> = host
        .list_all_tools()
        .await
        .expect("tools/list")
        .into_iter()
        .map(|tool| tool.name.to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "close_child_session",
            "execute_child_tool",
            "get_child_status",
            "get_schema",
            "list_registered_children",
        ]
    );

    let echoed = host
        .call_tool(call(
            "execute_child_tool",
            json!({ "child_name": "fs", "tool_name": "echo", "tool_args": { "k": 1 } }),
        ))
        .await
        .expect("tools/call");
    assert_eq!(first_text(&echoed), r#"{"k":1}"#);

    let closed = host
        .call_tool(call("close_child_session", json!({ "child_name": "ghost" })))
        .await
        .expect("tools/call");
    assert_eq!(
        first_text(&closed),
        "Error: child server 'ghost' not found in config."
    );

    ct.cancel();
    assert!(gateway.await.expect("gateway task").is_ok());
    drop(host);
}
