//! rmcp-backed protocol client over a child process's stdin/stdout.
//!
//! The factory spawns the child with `kill_on_drop(true)`, the parent
//! environment overlaid by the descriptor's `env`, and stderr routed to the
//! gateway's [`ErrorSink`]. The handshake happens in
//! [`ProtocolClient::initialize`] so launch and handshake failures stay
//! distinguishable.
//!
//! Responses are read from their wire (JSON) form so that content kinds the
//! gateway does not model still reach the caller as text.

use std::sync::Arc;

use rmcp::model::CallToolRequestParam;
use rmcp::service::{RunningService, ServiceExt};
use rmcp::transport::TokioChildProcess;
use rmcp::RoleClient;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::sink::ErrorSink;
use super::{ClientFactory, ClientFuture, JsonObject, ProtocolClient};
use crate::config::ChildDescriptor;
use crate::models::schema::{ContentPart, MediaKind, ResourceDescriptor, ToolDescriptor, ToolOutput};
use crate::AppError;

type RunningClient = RunningService<RoleClient, ()>;

/// Launches children as local processes speaking MCP over stdio.
pub struct RmcpClientFactory {
    sink: Arc<ErrorSink>,
}

impl RmcpClientFactory {
    /// Create a factory that routes child stderr into `sink`.
    #[must_use]
    pub fn new(sink: Arc<ErrorSink>) -> Self {
        Self { sink }
    }
}

impl ClientFactory for RmcpClientFactory {
    fn launch<'a>(
        &'a self,
        descriptor: &'a ChildDescriptor,
    ) -> ClientFuture<'a, Box<dyn ProtocolClient>> {
        Box::pin(async move {
            let mut cmd = Command::new(&descriptor.command);
            cmd.args(&descriptor.args)
                .envs(&descriptor.env)
                .kill_on_drop(true);

            let stderr = self.sink.stdio().map_err(|err| {
                AppError::Launch(format!("failed to prepare stderr for '{}': {err}", descriptor.name))
            })?;

            let (transport, _stderr) = TokioChildProcess::builder(cmd)
                .stderr(stderr)
                .spawn()
                .map_err(|err| {
                    AppError::Launch(format!(
                        "failed to spawn '{}' ({}): {err}",
                        descriptor.name, descriptor.command
                    ))
                })?;

            info!(
                child = %descriptor.name,
                command = %descriptor.command,
                "child process spawned"
            );

            Ok(Box::new(RmcpClient {
                child: descriptor.name.clone(),
                pending: Some(transport),
                service: None,
            }) as Box<dyn ProtocolClient>)
        })
    }
}

/// Client half of one child connection.
struct RmcpClient {
    child: String,
    /// Spawned transport awaiting the handshake.
    pending: Option<TokioChildProcess>,
    service: Option<RunningClient>,
}

impl RmcpClient {
    fn service(&self) -> Result<&RunningClient, AppError> {
        self.service.as_ref().ok_or_else(|| {
            AppError::Transport(format!("session to '{}' is not initialized", self.child))
        })
    }
}

impl ProtocolClient for RmcpClient {
    fn initialize(&mut self) -> ClientFuture<'_, ()> {
        Box::pin(async move {
            let transport = self.pending.take().ok_or_else(|| {
                AppError::Handshake(format!("child '{}' has no pending transport", self.child))
            })?;

            let service = ()
                .serve(transport)
                .await
                .map_err(|err| AppError::Handshake(format!("initialize failed: {err}")))?;

            debug!(child = %self.child, "handshake complete");
            self.service = Some(service);
            Ok(())
        })
    }

    fn list_tools(&self) -> ClientFuture<'_, Vec<ToolDescriptor>> {
        Box::pin(async move {
            let tools = self
                .service()?
                .list_all_tools()
                .await
                .map_err(|err| AppError::Transport(format!("tools/list failed: {err}")))?;

            tools
                .iter()
                .map(|tool| serde_json::to_value(tool).map(|wire| tool_from_wire(&wire)))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| AppError::Transport(format!("unreadable tool descriptor: {err}")))
        })
    }

    fn list_resources(&self) -> ClientFuture<'_, Vec<ResourceDescriptor>> {
        Box::pin(async move {
            let resources = self
                .service()?
                .list_all_resources()
                .await
                .map_err(|err| AppError::Transport(format!("resources/list failed: {err}")))?;

            resources
                .iter()
                .map(|resource| {
                    serde_json::to_value(resource).map(|wire| resource_from_wire(&wire))
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| {
                    AppError::Transport(format!("unreadable resource descriptor: {err}"))
                })
        })
    }

    fn call_tool<'a>(&'a self, tool: &'a str, args: JsonObject) -> ClientFuture<'a, ToolOutput> {
        Box::pin(async move {
            let request: CallToolRequestParam =
                serde_json::from_value(json!({ "name": tool, "arguments": args }))
                    .map_err(|err| AppError::Transport(format!("invalid call request: {err}")))?;

            let result = self
                .service()?
                .call_tool(request)
                .await
                .map_err(|err| AppError::Transport(format!("tools/call failed: {err}")))?;

            let wire = serde_json::to_value(&result)
                .map_err(|err| AppError::Transport(format!("unreadable tool result: {err}")))?;
            Ok(output_from_wire(&wire))
        })
    }

    fn close(self: Box<Self>) -> ClientFuture<'static, ()> {
        Box::pin(async move {
            let Self {
                child,
                pending,
                service,
            } = *self;

            // An un-handshaken transport kills its process on drop.
            drop(pending);

            if let Some(service) = service {
                match service.cancel().await {
                    Ok(reason) => debug!(child = %child, ?reason, "child service closed"),
                    Err(err) => {
                        warn!(child = %child, %err, "child service task failed during close");
                        return Err(AppError::Transport(format!(
                            "failed to close '{child}': {err}"
                        )));
                    }
                }
            }
            Ok(())
        })
    }
}

fn optional_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Read a tool descriptor from its MCP wire form.
#[must_use]
pub fn tool_from_wire(wire: &Value) -> ToolDescriptor {
    ToolDescriptor {
        name: optional_string(wire, "name").unwrap_or_default(),
        description: optional_string(wire, "description"),
        input_schema: wire
            .get("inputSchema")
            .cloned()
            .unwrap_or_else(|| json!({ "type": "object" })),
    }
}

/// Read a resource descriptor from its MCP wire form.
#[must_use]
pub fn resource_from_wire(wire: &Value) -> ResourceDescriptor {
    ResourceDescriptor {
        uri: optional_string(wire, "uri").unwrap_or_default(),
        name: optional_string(wire, "name").unwrap_or_default(),
        description: optional_string(wire, "description"),
    }
}

/// Read a `tools/call` result from its MCP wire form.
#[must_use]
pub fn output_from_wire(wire: &Value) -> ToolOutput {
    let parts = wire
        .get("content")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(part_from_wire).collect())
        .unwrap_or_default();

    ToolOutput {
        parts,
        is_error: wire.get("isError").and_then(Value::as_bool).unwrap_or(false),
    }
}

fn part_from_wire(part: &Value) -> ContentPart {
    let media = |kind| ContentPart::Media {
        kind,
        mime_type: optional_string(part, "mimeType").unwrap_or_else(|| "unknown".to_owned()),
    };

    match part.get("type").and_then(Value::as_str) {
        Some("text") => match part.get("text").and_then(Value::as_str) {
            Some(text) => ContentPart::Text(text.to_owned()),
            None => ContentPart::Other(part.to_string()),
        },
        Some("image") => media(MediaKind::Image),
        Some("audio") => media(MediaKind::Audio),
        _ => ContentPart::Other(part.to_string()),
    }
}
