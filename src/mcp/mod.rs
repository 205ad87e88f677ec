//! MCP (Model Context Protocol) server surface.
//!
//! Exposes the query and catalog tools to LLM clients over JSON-RPC 2.0.
//!
//! ## Architecture
//!
//! - Transport: WebSocket at `/v1/mcp`
//! - Tools: the four query/catalog operations, registered by name
//! - Every tool outcome is a uniform envelope: a success payload or a
//!   `{"error": {"kind", "message"}}` body with the error flag set

pub mod context;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod tools;

pub use context::ToolContext;
pub use handler::{create_mcp_state, handle_message, mcp_handler, McpState};
pub use protocol::{McpError, McpRequest, McpResponse};
pub use registry::ToolRegistry;
