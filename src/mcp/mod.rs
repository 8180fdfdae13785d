//! Model Context Protocol (MCP) server-side implementation.
//!
//! This module translates MCP JSON-RPC methods onto the engine's provider
//! and dispatcher layers. The server communicates over stdio transport
//! using JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌───────────┐   ┌───────────┐   ┌────────────────────┐    │
//! │   │ Transport │──▶│  Server   │──▶│      Handler       │    │
//! │   │  (stdio)  │   │(lifecycle)│   │(method translation)│    │
//! │   └───────────┘   └───────────┘   └────────────────────┘    │
//! │                                       │              │       │
//! │                                       ▼              ▼       │
//! │                               ┌────────────┐  ┌──────────┐  │
//! │                               │ Dispatcher │  │ Provider │  │
//! │                               │  (routes)  │  │ (chain)  │  │
//! │                               └────────────┘  └──────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod handler;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod transport;

pub use handler::{McpHandler, ServerInfo};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, ServerState};
pub use transport::StdioTransport;
