//! # warpcast_mcp
//!
//! Exposes a fixed set of Warpcast operations to AI-assistant clients in two
//! ways: plain REST routes, and a Model Context Protocol (MCP) channel built
//! from a server-sent events stream (`GET /mcp`) plus a JSON-RPC endpoint
//! (`POST /mcp`).
//!
//! ## Main Components
//!
//! - `config`: environment-derived runtime configuration
//! - `client`: the upstream API trait and its `reqwest` implementation
//! - `registry`: the set of open SSE sessions
//! - `transport`: JSON-RPC envelopes and the per-session SSE channel
//! - `server`: JSON-RPC dispatch, the tool table and error mapping
//! - `sse`: origin middleware and the actix-web HTTP surface
//! - `types`: MCP payloads and tool argument shapes

#![warn(missing_docs)]

/// Upstream Warpcast API client
pub mod client;

/// Runtime configuration
pub mod config;

/// Registry of open SSE sessions
pub mod registry;

/// JSON-RPC dispatch, tools and error handling
pub mod server;

/// HTTP server and origin middleware
pub mod sse;
pub use sse::http_server::run_http_server;

/// JSON-RPC envelopes and the SSE session channel
pub mod transport;

/// Common types and structures used throughout the crate
pub mod types;

pub use client::{UpstreamClient, WarpcastClient};
pub use config::Config;
pub use server::McpServer;
