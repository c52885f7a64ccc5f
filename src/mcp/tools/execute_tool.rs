//! `execute_child_tool` MCP tool handler.
//!
//! Forwards one tool call to a child. Failures come back as a labeled text
//! result rather than a protocol error, so the caller always sees the cause.

use rmcp::handler::server::tool::ToolCallContext;
use rmcp::model::CallToolResult;
use serde::Deserialize;
use serde_json::Value;

use super::util::{parse_input, text_result};
use crate::client::JsonObject;
use crate::mcp::handler::{AppState, GatewayServer};

/// Input parameters for `execute_child_tool`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteToolInput {
    /// Child to call.
    pub child_name: String,
    /// Tool on the child.
    pub tool_name: String,
    /// Arguments object, or a string holding one.
    #[serde(default)]
    pub tool_args: Option<Value>,
    /// Characters to keep from the start of the output.
    #[serde(default)]
    pub head_chars: Option<Value>,
    /// Characters to keep from the end of the output.
    #[serde(default)]
    pub tail_chars: Option<Value>,
}

/// Normalize `tool_args` into a JSON object.
///
/// # Errors
///
/// Returns `invalid_params` unless the value is absent, `null`, an object,
/// or a string containing a JSON object.
pub fn tool_arguments(value: Option<Value>) -> Result<JsonObject, rmcp::ErrorData> {
    let invalid = |shown: &str| {
        rmcp::ErrorData::invalid_params(format!("tool_args must be an object (got {shown})"), None)
    };

    match value {
        None | Some(Value::Null) => Ok(JsonObject::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(invalid(&raw)),
        },
        Some(other) => Err(invalid(&other.to_string())),
    }
}

/// Run the call described by `input` and return the response text.
///
/// # Errors
///
/// Returns `invalid_params` when `tool_args` is not an object.
pub async fn run(state: &AppState, input: ExecuteToolInput) -> Result<String, rmcp::ErrorData> {
    let args = tool_arguments(input.tool_args)?;
    Ok(state
        .dispatcher
        .call_tool(
            &input.child_name,
            &input.tool_name,
            args,
            input.head_chars.as_ref(),
            input.tail_chars.as_ref(),
        )
        .await)
}

/// Handle the `execute_child_tool` tool call.
///
/// # Errors
///
/// Returns `invalid_params` on missing or malformed arguments.
pub async fn handle(
    context: ToolCallContext<'_, GatewayServer>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: ExecuteToolInput = parse_input("execute_child_tool", context.arguments)?;
    let body = run(context.service.state(), input).await?;
    Ok(text_result(body))
}
