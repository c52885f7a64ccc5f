//! `get_child_status` MCP tool handler.
//!
//! Reports every registered child in registry order, whether or not it was
//! ever started.

use rmcp::handler::server::tool::ToolCallContext;
use rmcp::model::CallToolResult;
use serde::Serialize;

use super::util::{pretty_json, text_result};
use crate::mcp::handler::{AppState, GatewayServer};
use crate::models::status::ChildState;

/// One row of the status report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChildStatusEntry {
    /// Child name.
    pub name: String,
    /// Lifecycle state.
    pub status: ChildState,
    /// Whether a live session exists right now.
    pub running: bool,
    /// Launch command.
    pub command: String,
    /// Launch arguments.
    pub args: Vec<String>,
    /// ISO-8601 start time of the current or last session.
    pub started_at: Option<String>,
    /// Last recorded failure.
    pub error: Option<String>,
}

/// Collect the status report for all registered children.
pub async fn run(state: &AppState) -> Vec<ChildStatusEntry> {
    let manager = &state.manager;
    let mut entries = Vec::with_capacity(manager.registry().len());

    for (name, status) in manager.statuses().await {
        let Some(descriptor) = manager.registry().get(&name) else {
            continue;
        };
        entries.push(ChildStatusEntry {
            running: manager.is_running(&name).await,
            command: descriptor.command.clone(),
            args: descriptor.args.clone(),
            started_at: status.started_at.map(|at| at.to_rfc3339()),
            error: status.error,
            status: status.status,
            name,
        });
    }

    entries
}

/// Handle the `get_child_status` tool call.
///
/// # Errors
///
/// Returns `internal_error` if the report cannot be serialized.
pub async fn handle(
    context: ToolCallContext<'_, GatewayServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let entries = run(context.service.state()).await;
    Ok(text_result(pretty_json("get_child_status", &entries)?))
}
