//! `close_child_session` MCP tool handler.
//!
//! Stops the child's session after any in-flight call completes. The next
//! `get_schema` or `execute_child_tool` on the same child starts it again.

use rmcp::handler::server::tool::ToolCallContext;
use rmcp::model::CallToolResult;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};

use super::util::{not_found, parse_input, pretty_json, text_result};
use crate::mcp::handler::{AppState, GatewayServer};
use crate::models::status::ChildState;

#[derive(Debug, Deserialize)]
struct CloseChildInput {
    child_name: String,
}

/// Response body for `close_child_session`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CloseChildResponse {
    /// Child name.
    pub server: String,
    /// Status after the stop.
    pub status: ChildState,
    /// Last recorded failure, kept from before the stop.
    pub error: Option<String>,
}

/// Stop `child_name` and report its resulting status, or `None` when the
/// name is not registered.
pub async fn run(state: &AppState, child_name: &str) -> Option<CloseChildResponse> {
    state.manager.registry().get(child_name)?;

    state.manager.ensure_stopped(child_name).await;
    let status = state.manager.status(child_name).await;
    info!(child = child_name, status = %status.status, "close_child_session completed");

    Some(CloseChildResponse {
        server: child_name.to_owned(),
        status: status.status,
        error: status.error,
    })
}

/// Handle the `close_child_session` tool call.
///
/// # Errors
///
/// Returns `invalid_params` when `child_name` is missing.
pub async fn handle(
    context: ToolCallContext<'_, GatewayServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: CloseChildInput = parse_input("close_child_session", context.arguments)?;
    let span = info_span!("close_child_session", child = %input.child_name);

    let body = match run(context.service.state(), &input.child_name)
        .instrument(span)
        .await
    {
        Some(response) => pretty_json("close_child_session", &response)?,
        None => not_found(&input.child_name),
    };
    Ok(text_result(body))
}
