//! MCP server handler, shared application state, and tool router.

use std::future::Future;
use std::sync::Arc;

use rmcp::handler::server::{
    tool::{ToolCallContext, ToolRoute, ToolRouter},
    ServerHandler,
};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
    PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer, ServiceExt};
use rmcp::transport::IntoTransport;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span};

use crate::config::GatewayConfig;
use crate::mcp::{resources, tools};
use crate::orchestrator::dispatch::Dispatcher;
use crate::orchestrator::session_manager::SessionManager;
use crate::AppError;

/// Shared application state accessible by all MCP tool handlers.
pub struct AppState {
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
    /// Child session lifecycle manager.
    pub manager: Arc<SessionManager>,
    /// Guarded call path into children.
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Assemble state around an existing session manager.
    #[must_use]
    pub fn new(config: Arc<GatewayConfig>, manager: Arc<SessionManager>) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&manager));
        Self {
            config,
            manager,
            dispatcher,
        }
    }
}

/// MCP server exposing the gateway's discovery and invocation tools.
pub struct GatewayServer {
    state: Arc<AppState>,
}

impl GatewayServer {
    /// Create a new MCP server bound to shared application state.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Access the shared application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    fn tool_router() -> ToolRouter<Self> {
        let mut router = ToolRouter::new();
        router.add_route(ToolRoute::new_dyn(Self::list_children_tool(), |context| {
            Box::pin(tools::list_children::handle(context))
        }));
        router.add_route(ToolRoute::new_dyn(Self::child_status_tool(), |context| {
            Box::pin(tools::child_status::handle(context))
        }));
        router.add_route(ToolRoute::new_dyn(Self::close_child_tool(), |context| {
            Box::pin(tools::close_child::handle(context))
        }));
        router.add_route(ToolRoute::new_dyn(Self::get_schema_tool(), |context| {
            Box::pin(tools::get_schema::handle(context))
        }));
        router.add_route(ToolRoute::new_dyn(Self::execute_tool(), |context| {
            Box::pin(tools::execute_tool::handle(context))
        }));
        router
    }

    /// Convert a `serde_json::Value::Object` into the `Arc<Map>` expected by `Tool`.
    fn schema(value: serde_json::Value) -> Arc<serde_json::Map<String, serde_json::Value>> {
        match value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::default()),
        }
    }

    /// Every tool the gateway advertises.
    #[must_use]
    pub fn all_tools() -> Vec<Tool> {
        vec![
            Self::list_children_tool(),
            Self::child_status_tool(),
            Self::close_child_tool(),
            Self::get_schema_tool(),
            Self::execute_tool(),
        ]
    }

    fn list_children_tool() -> Tool {
        Tool::new(
            "list_registered_children",
            "List the names of all registered child MCP servers.",
            Self::schema(serde_json::json!({
                "type": "object",
                "properties": {}
            })),
        )
    }

    fn child_status_tool() -> Tool {
        Tool::new(
            "get_child_status",
            "Report the state of every registered child server \
             (not_started, starting, running, failed_start, stopped), \
             with its command, start time, and last error.",
            Self::schema(serde_json::json!({
                "type": "object",
                "properties": {}
            })),
        )
    }

    fn close_child_tool() -> Tool {
        Tool::new(
            "close_child_session",
            "Close the session to a child server. Waits for any running \
             tool call on that child to finish first. The child is started \
             again automatically on its next use.",
            Self::schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "child_name": { "type": "string" }
                },
                "required": ["child_name"]
            })),
        )
    }

    fn get_schema_tool() -> Tool {
        Tool::new(
            "get_schema",
            "Fetch the tool and resource definitions of a child server, \
             starting it if needed. Use execute_child_tool to run a tool.",
            Self::schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "child_name": { "type": "string" }
                },
                "required": ["child_name"]
            })),
        )
    }

    fn execute_tool() -> Tool {
        Tool::new(
            "execute_child_tool",
            "Run a tool on a child server. For long results, pass \
             head_chars and/or tail_chars to keep only the beginning and \
             end; giving only one applies the same value to both.",
            Self::schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "child_name": { "type": "string" },
                    "tool_name": { "type": "string" },
                    "tool_args": { "type": "object" },
                    "head_chars": { "type": "integer", "minimum": 0 },
                    "tail_chars": { "type": "integer", "minimum": 0 }
                },
                "required": ["child_name", "tool_name", "tool_args"]
            })),
        )
    }

    /// Answer one MCP host over `transport` until it disconnects or `ct`
    /// fires.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Mcp` if the host's initialize fails or the session
    /// task dies.
    pub async fn serve_host<T, E, A>(self, transport: T, ct: CancellationToken) -> crate::Result<()>
    where
        T: IntoTransport<RoleServer, E, A> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let children = self.state.config.registry.len();
        let service = self
            .serve_with_ct(transport, ct)
            .await
            .map_err(|err| AppError::Mcp(format!("host initialize failed: {err}")))?;

        let host = service
            .peer_info()
            .map(|info| info.client_info.name.clone())
            .unwrap_or_default();
        info!(%host, children, "host connected");

        let reason = service
            .waiting()
            .await
            .map_err(|err| AppError::Mcp(format!("host session task failed: {err}")))?;
        info!(%host, ?reason, "host session ended");
        Ok(())
    }

    /// Tools the router dispatches, in no particular order.
    #[must_use]
    pub fn routed_tools() -> Vec<Tool> {
        Self::tool_router().list_all()
    }
}

impl ServerHandler for GatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            instructions: Some(resources::SERVER_SUMMARY.trim().to_owned()),
            ..ServerInfo::default()
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, rmcp::ErrorData>> + Send + '_ {
        let router = Self::tool_router();
        let _span = info_span!("call_tool", tool = %request.name).entered();

        async move {
            router
                .call(ToolCallContext::new(self, request, context))
                .await
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, rmcp::ErrorData>> + Send + '_ {
        let tools = Self::all_tools();

        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListResourcesResult, rmcp::ErrorData>> + Send + '_ {
        std::future::ready(Ok(resources::list_resources()))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ReadResourceResult, rmcp::ErrorData>> + Send + '_ {
        let state = Arc::clone(&self.state);
        async move {
            resources::read_resource(&request.uri, &state)
                .await
                .map_err(|err| rmcp::ErrorData::resource_not_found(err.to_string(), None))
        }
    }
}
