//! Capability descriptors and call results exchanged with child servers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::ChildState;

/// A tool advertised by a child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ToolDescriptor {
    /// Tool name as the child expects it in `tools/call`.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// JSON Schema of the tool arguments.
    pub input_schema: Value,
}

/// A resource advertised by a child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ResourceDescriptor {
    /// Resource URI.
    pub uri: String,
    /// Resource display name.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
}

/// Kind of binary media carried by a content part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Image payload.
    Image,
    /// Audio payload.
    Audio,
}

impl MediaKind {
    fn label(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Audio => "Audio",
        }
    }
}

/// One part of a multi-part tool response.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// Binary media; only the media type is kept.
    Media {
        /// Image or audio.
        kind: MediaKind,
        /// MIME type reported by the child.
        mime_type: String,
    },
    /// Any other part, already rendered to text.
    Other(String),
}

impl ContentPart {
    /// Render this part for the flattened text response.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) | Self::Other(text) => text.clone(),
            Self::Media { kind, mime_type } => format!("[{} Data: {mime_type}]", kind.label()),
        }
    }
}

/// Result of a single tool call on a child.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Response parts in the order the child returned them.
    pub parts: Vec<ContentPart>,
    /// Whether the child flagged the result as a tool-level error.
    pub is_error: bool,
}

impl ToolOutput {
    /// Flatten all parts into one newline-separated string.
    #[must_use]
    pub fn flatten(&self) -> String {
        self.parts
            .iter()
            .map(ContentPart::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcome of a schema fetch, serialized as the `get_schema` payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SchemaReport {
    /// Child name.
    pub server: String,
    /// Child status at the time of the report.
    pub status: ChildState,
    /// Advertised tools; absent when the child is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDescriptor>>,
    /// Advertised resources; absent when the child is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ResourceDescriptor>>,
    /// Soft errors collected while listing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Reason the child is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SchemaReport {
    /// Report for a child whose session could not be obtained.
    #[must_use]
    pub fn unavailable(server: &str, status: ChildState, error: impl Into<String>) -> Self {
        Self {
            server: server.to_owned(),
            status,
            tools: None,
            resources: None,
            errors: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Whether the report carries a listing rather than a failure.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }
}
