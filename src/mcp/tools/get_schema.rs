//! `get_schema` MCP tool handler.

use rmcp::handler::server::tool::ToolCallContext;
use rmcp::model::CallToolResult;
use serde::Deserialize;

use super::util::{not_found, parse_input, pretty_json, text_result};
use crate::mcp::handler::{AppState, GatewayServer};

#[derive(Debug, Deserialize)]
struct GetSchemaInput {
    child_name: String,
}

/// Schema report for `child_name` as response text.
///
/// # Errors
///
/// Returns `internal_error` if the report cannot be serialized.
pub async fn run(state: &AppState, child_name: &str) -> Result<String, rmcp::ErrorData> {
    if state.manager.registry().get(child_name).is_none() {
        return Ok(not_found(child_name));
    }

    let report = state.dispatcher.get_schema(child_name).await;
    pretty_json("get_schema", &report)
}

/// Handle the `get_schema` tool call.
///
/// # Errors
///
/// Returns `invalid_params` when `child_name` is missing.
pub async fn handle(
    context: ToolCallContext<'_, GatewayServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: GetSchemaInput = parse_input("get_schema", context.arguments)?;
    let body = run(context.service.state(), &input.child_name).await?;
    Ok(text_result(body))
}
