//! MCP tool handlers.

pub mod child_status;
pub mod close_child;
pub mod execute_tool;
pub mod get_schema;
pub mod list_children;
pub mod util;
