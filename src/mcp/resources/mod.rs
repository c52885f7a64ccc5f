//! MCP resources describing the gateway and its children.

pub mod children_abstract;

use rmcp::model::{Annotated, ListResourcesResult, RawResource, ReadResourceResult, ResourceContents};

use crate::mcp::handler::AppState;
use crate::{AppError, Result};

/// URI of the static gateway overview.
pub const SERVER_SUMMARY_URI: &str = "mcp://server_summary";

/// URI of the children abstract.
pub const CHILDREN_SERVERS_URI: &str = "mcp://children_servers";

/// Overview returned by [`SERVER_SUMMARY_URI`] and used as server instructions.
pub const SERVER_SUMMARY: &str = "
# Gateway MCP Server Overview
This server manages a set of child MCP servers on demand.
Child servers are started when first needed and their tools are invoked
through this server, so their full schemas never have to be loaded up front.
When a child listed in the resources looks useful, call get_schema to inspect
its tools, then run one with execute_child_tool.
";

fn resource(uri: &str, name: &str, description: &str, mime_type: &str) -> Annotated<RawResource> {
    let mut raw = RawResource::new(uri, name);
    raw.description = Some(description.to_owned());
    raw.mime_type = Some(mime_type.to_owned());
    Annotated::new(raw, None)
}

/// Build the `ListResourcesResult` for the gateway resources.
#[must_use]
pub fn list_resources() -> ListResourcesResult {
    ListResourcesResult::with_all_items(vec![
        resource(
            SERVER_SUMMARY_URI,
            "server_summary",
            "Overview of this gateway server.",
            "text/markdown",
        ),
        resource(
            CHILDREN_SERVERS_URI,
            "children_servers",
            "Summaries of the registered child servers.",
            "application/json",
        ),
    ])
}

/// Handle `resources/read` for the gateway resources.
///
/// # Errors
///
/// Returns `AppError::NotFound` for any URI the gateway does not serve.
pub async fn read_resource(uri: &str, state: &AppState) -> Result<ReadResourceResult> {
    let body = match uri {
        SERVER_SUMMARY_URI => SERVER_SUMMARY.trim().to_owned(),
        CHILDREN_SERVERS_URI => {
            children_abstract::load(state.config.children_abstract.as_deref()).await
        }
        other => return Err(AppError::NotFound(format!("unknown resource '{other}'"))),
    };

    Ok(ReadResourceResult {
        contents: vec![ResourceContents::text(body, uri)],
    })
}
