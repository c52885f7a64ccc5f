//! `list_registered_children` MCP tool handler.

use rmcp::handler::server::tool::ToolCallContext;
use rmcp::model::CallToolResult;

use super::util::text_result;
use crate::mcp::handler::{AppState, GatewayServer};

/// Body returned when the registry is empty.
pub const EMPTY_REGISTRY: &str = "No child servers registered.";

/// Bullet list of registered child names.
#[must_use]
pub fn run(state: &AppState) -> String {
    let names: Vec<String> = state
        .manager
        .registry()
        .names()
        .map(|name| format!("- {name}"))
        .collect();

    if names.is_empty() {
        EMPTY_REGISTRY.to_owned()
    } else {
        names.join("\n")
    }
}

/// Handle the `list_registered_children` tool call.
///
/// # Errors
///
/// Never fails; the signature matches the tool router.
#[allow(clippy::unused_async)]
pub async fn handle(
    context: ToolCallContext<'_, GatewayServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    Ok(text_result(run(context.service.state())))
}
