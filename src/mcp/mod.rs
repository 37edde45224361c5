//! MCP (Model Context Protocol) integration for Claude Agent SDK
//!
//! This module provides MCP server configuration types for external servers,
//! plus the in-process tool server router that answers `mcp_message` control
//! requests for SDK-hosted tools (see [`ToolRouter`]).
//!
//! # Configuration types
//!
//! - [`McpStdioServerConfig`] - Spawn MCP server as subprocess
//! - [`McpSseServerConfig`] - Connect via Server-Sent Events
//! - [`McpHttpServerConfig`] - Connect via HTTP
//! - [`SdkMcpServerConfig`] - In-process SDK server

// Re-export configuration types
pub use crate::types::mcp::{
    McpHttpServerConfig, McpServerConfig, McpServers, McpSseServerConfig, McpStdioServerConfig,
    SdkMcpServerConfig,
};

// In-process tool server router — see spec §4.6
mod router;
pub use router::ToolRouter;
