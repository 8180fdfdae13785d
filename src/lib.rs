//! conduit-mcp: composable Model Context Protocol engine
//!
//! This library implements the MCP JSON-RPC contract around a composable
//! capability core: providers hold tools, resources, templates, and
//! prompts; transform chains rename, filter, and version what a provider
//! exposes; a dispatcher runs route handlers behind ordered before/after
//! hooks; and a transport-agnostic client drives the full call lifecycle
//! including the request/response inversion used for sampling and
//! elicitation.
//!
//! # Architecture
//!
//! Server side, a request flows transport → lifecycle → method translation
//! → transform chain (listing/reading) or route table (calling). Client
//! side, [`client::McpClient`] is the mirror image, and can itself become
//! the target of peer-initiated sampling/elicitation requests mid-call.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`provider`] — Capability providers: tools, resources, templates, prompts
//! - [`transform`] — Decorator chains over providers
//! - [`dispatch`] — Route dispatch with hooks and limit middleware
//! - [`mcp`] — MCP protocol translation and stdio server
//! - [`client`] — Client call engine and sampling loop

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mcp;
pub mod provider;
pub mod transform;
