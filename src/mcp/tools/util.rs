//! Shared utilities for MCP tool handlers.

use rmcp::model::{CallToolResult, Content};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::JsonObject;

/// Deserialize tool arguments into the handler's input type.
///
/// # Errors
///
/// Returns `invalid_params` naming the tool when the arguments do not match.
pub fn parse_input<T: DeserializeOwned>(
    tool: &str,
    args: Option<JsonObject>,
) -> Result<T, rmcp::ErrorData> {
    serde_json::from_value(serde_json::Value::Object(args.unwrap_or_default())).map_err(|err| {
        rmcp::ErrorData::invalid_params(format!("invalid {tool} parameters: {err}"), None)
    })
}

/// Pretty-print `value` as the text body of a tool result.
///
/// # Errors
///
/// Returns `internal_error` if serialization fails.
pub fn pretty_json<T: Serialize>(tool: &str, value: &T) -> Result<String, rmcp::ErrorData> {
    serde_json::to_string_pretty(value).map_err(|err| {
        rmcp::ErrorData::internal_error(format!("failed to serialize {tool} response: {err}"), None)
    })
}

/// Response text for a child name missing from the registry.
#[must_use]
pub fn not_found(child_name: &str) -> String {
    format!("Error: child server '{child_name}' not found in config.")
}

/// Wrap plain text as a successful tool result.
#[must_use]
pub fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}
