//! Guarded, time-bounded call path used by the gateway tools.
//!
//! Both operations start the child on demand, hold the session guard for
//! the duration of the child interaction, and turn every failure into data:
//! a [`SchemaReport`] for schema fetches and a labeled string for tool calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::client::JsonObject;
use crate::models::schema::SchemaReport;
use crate::models::status::ChildState;
use crate::orchestrator::session_manager::SessionManager;
use crate::orchestrator::truncate::{normalize_trim_value, truncate_output};
use crate::{AppError, Result};

/// Entry point for schema fetches and tool invocations on children.
#[derive(Clone)]
pub struct Dispatcher {
    manager: Arc<SessionManager>,
}

impl Dispatcher {
    /// Create a dispatcher over `manager`.
    #[must_use]
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// The session manager this dispatcher drives.
    #[must_use]
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Fetch the tools and resources advertised by `name`.
    ///
    /// A failed `list_tools` or `list_resources` is recorded in
    /// `errors` without failing the whole report.
    pub async fn get_schema(&self, name: &str) -> SchemaReport {
        let span = info_span!("get_schema", child = name);
        async move {
            if self.manager.registry().get(name).is_none() {
                let status = self.manager.status(name).await;
                return SchemaReport::unavailable(
                    name,
                    status.status,
                    format!("child server '{name}' not found in config"),
                );
            }

            if !self.manager.ensure_started(name).await {
                let status = self.manager.status(name).await;
                return SchemaReport::unavailable(
                    name,
                    status.status,
                    status.error.unwrap_or_else(|| "session not available".into()),
                );
            }

            let Some(session) = self.manager.session(name).await else {
                let status = self.manager.status(name).await;
                return SchemaReport::unavailable(name, status.status, "session not available");
            };

            let guard = session.acquire().await;
            let client = match guard.client() {
                Ok(client) => client,
                Err(err) => {
                    let status = self.manager.status(name).await;
                    return SchemaReport::unavailable(name, status.status, err.to_string());
                }
            };

            debug!("fetching schema using persistent session");
            let bound = self.manager.timeouts().call;
            let mut errors = Vec::new();

            let tools = match bounded(bound, client.list_tools()).await {
                Ok(tools) => tools,
                Err(err) => {
                    error!(%err, "list_tools failed");
                    errors.push(format!("list_tools failed: {err}"));
                    Vec::new()
                }
            };

            let resources = match bounded(bound, client.list_resources()).await {
                Ok(resources) => resources,
                Err(err) => {
                    debug!(%err, "list_resources failed or unsupported");
                    errors.push(format!("list_resources failed: {err}"));
                    Vec::new()
                }
            };
            drop(guard);

            SchemaReport {
                server: name.to_owned(),
                status: ChildState::Running,
                tools: Some(tools),
                resources: Some(resources),
                errors,
                error: None,
            }
        }
        .instrument(span)
        .await
    }

    /// Invoke `tool` on `name` and return its flattened, truncated output.
    ///
    /// `head_chars` / `tail_chars` are validated before any child is
    /// touched. Every failure comes back as a string of the form
    /// `Error executing tool '<tool>' on '<child>': <cause>`.
    pub async fn call_tool(
        &self,
        name: &str,
        tool: &str,
        args: JsonObject,
        head_chars: Option<&Value>,
        tail_chars: Option<&Value>,
    ) -> String {
        let span = info_span!("call_tool", child = name, tool);
        async move {
            let failure = |detail: &str| format!("Error executing tool '{tool}' on '{name}': {detail}");

            if self.manager.registry().get(name).is_none() {
                return failure("config not found.");
            }

            let (head, tail) = match trim_bounds(head_chars, tail_chars) {
                Ok(bounds) => bounds,
                Err(err) => {
                    warn!(?head_chars, ?tail_chars, %err, "invalid trim parameters");
                    return failure(&err.to_string());
                }
            };

            let session = if self.manager.ensure_started(name).await {
                self.manager.session(name).await
            } else {
                None
            };
            let Some(session) = session else {
                error!("child server is not running (session not initialized)");
                let status = self.manager.status(name).await;
                let mut msg = failure(&format!(
                    "child server is not running (status={}).",
                    status.status
                ));
                if let Some(detail) = status.error {
                    msg.push_str(&format!(" Last error: {detail}"));
                }
                return msg;
            };

            let guard = session.acquire().await;
            let client = match guard.client() {
                Ok(client) => client,
                Err(err) => return failure(&err.to_string()),
            };

            debug!("executing tool using persistent session with lock");
            let bound = self.manager.timeouts().call;
            let output = match bounded(bound, client.call_tool(tool, args)).await {
                Ok(output) => output,
                Err(AppError::Timeout(_)) => {
                    error!(?bound, "tool call timed out");
                    return failure(&format!("Timeout after {bound:?}"));
                }
                Err(err) => {
                    error!(%err, "tool call failed");
                    return failure(&err.to_string());
                }
            };
            drop(guard);

            if output.is_error {
                warn!("child reported a tool-level error");
            }

            truncate_output(&output.flatten(), head, tail)
        }
        .instrument(span)
        .await
    }
}

fn trim_bounds(
    head_chars: Option<&Value>,
    tail_chars: Option<&Value>,
) -> Result<(Option<usize>, Option<usize>)> {
    let head = normalize_trim_value(head_chars, "head_chars")?;
    let tail = normalize_trim_value(tail_chars, "tail_chars")?;
    Ok((head, tail))
}

/// Await `call`, converting an elapsed bound into `AppError::Timeout`.
async fn bounded<T>(bound: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(bound, call)
        .await
        .map_err(|_| AppError::Timeout(format!("no response within {bound:?}")))?
}
