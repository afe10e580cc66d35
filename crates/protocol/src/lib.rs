//! `wmcp-protocol` — the MCP (Model Context Protocol) server-role surface
//! for the WebMCP discovery broker: JSON-RPC 2.0 envelope types and the
//! handler that routes `initialize`/`tools/list`/`tools/call`/... to the
//! session store, browser pool, and tool executor.
//!
//! The broker answers MCP requests; it never issues them. There is
//! deliberately no client transport here (no stdio/SSE connection to an
//! upstream MCP server) — the HTTP transport in the gateway crate owns the
//! wire, and this crate owns only the envelope shapes and the dispatch
//! logic above them.

pub mod error;
pub mod handler;
pub mod jsonrpc;

pub use error::ProtocolError;
pub use handler::McpHandler;
pub use jsonrpc::{
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ServerCapabilities,
    ServerInfo, SessionCloseParams, SessionCloseResult, SessionOpenParams, SessionOpenResult,
    ToolCallContent, ToolCallParams, ToolCallResult, ToolsListParams, ToolsListResult,
};
