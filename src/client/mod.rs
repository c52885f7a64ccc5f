//! Protocol client seam between the session core and child servers.
//!
//! The [`ClientFactory`] and [`ProtocolClient`] traits decouple the session
//! manager from the wire protocol. Production code uses the rmcp-backed
//! implementation in [`rmcp_client`]; tests inject scripted fakes.

pub mod rmcp_client;
pub mod sink;

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::config::ChildDescriptor;
use crate::models::schema::{ResourceDescriptor, ToolDescriptor, ToolOutput};
use crate::Result;

/// Boxed future returned by protocol client operations.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// JSON object passed as tool arguments.
pub type JsonObject = Map<String, Value>;

/// One exclusive channel to a launched child.
///
/// Implementations are not expected to tolerate interleaved requests; the
/// session manager serializes every call behind the session guard.
pub trait ProtocolClient: Send + Sync {
    /// Perform the protocol handshake.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Handshake`](crate::AppError::Handshake) if the
    /// exchange fails or the child exits before completing it.
    fn initialize(&mut self) -> ClientFuture<'_, ()>;

    /// List the tools advertised by the child.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) on failure.
    fn list_tools(&self) -> ClientFuture<'_, Vec<ToolDescriptor>>;

    /// List the resources advertised by the child.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) on failure,
    /// including children that do not support resources.
    fn list_resources(&self) -> ClientFuture<'_, Vec<ResourceDescriptor>>;

    /// Invoke a tool on the child.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) on failure.
    fn call_tool<'a>(&'a self, tool: &'a str, args: JsonObject) -> ClientFuture<'a, ToolOutput>;

    /// Release the transport and any process owned by this client.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) if teardown
    /// reports a failure; resources are released regardless.
    fn close(self: Box<Self>) -> ClientFuture<'static, ()>;
}

/// Creates protocol clients from registry descriptors.
pub trait ClientFactory: Send + Sync {
    /// Launch the child described by `descriptor` without handshaking.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Launch`](crate::AppError::Launch) if the process
    /// or transport cannot be created.
    fn launch<'a>(&'a self, descriptor: &'a ChildDescriptor)
        -> ClientFuture<'a, Box<dyn ProtocolClient>>;
}
