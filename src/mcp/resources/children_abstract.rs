//! `mcp://children_servers` resource content.
//!
//! Serves the operator-written abstract file verbatim when it exists and
//! holds valid JSON; anything else yields an empty object.

use std::path::Path;

use tracing::{debug, warn};

/// Body served when no usable abstract is available.
pub const EMPTY_ABSTRACT: &str = "{}";

/// Read the abstract at `path`, falling back to [`EMPTY_ABSTRACT`].
pub async fn load(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return EMPTY_ABSTRACT.to_owned();
    };

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) => {
            debug!(path = %path.display(), %err, "children abstract unavailable");
            return EMPTY_ABSTRACT.to_owned();
        }
    };

    if let Err(err) = serde_json::from_str::<serde_json::Value>(&content) {
        warn!(path = %path.display(), %err, "children abstract is not valid json");
        return EMPTY_ABSTRACT.to_owned();
    }

    content
}
