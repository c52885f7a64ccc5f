#![forbid(unsafe_code)]

//! `mcp-gateway`: a single MCP endpoint that discovers and invokes tools on
//! lazily started child MCP servers.

pub mod client;
pub mod config;
pub mod errors;
pub mod mcp;
pub mod models;
pub mod orchestrator;

pub use config::GatewayConfig;
pub use errors::{AppError, Result};
