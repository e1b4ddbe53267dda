//! # HTTP Surface
//!
//! The actix-web application: REST routes for each tool, the `GET /mcp`
//! event stream and the `POST /mcp` JSON-RPC endpoint. Both `/mcp` routes sit
//! behind an origin allow-list.

/// Route registration, shared state and server startup
pub mod http_server;
/// Origin allow-list middleware
pub mod middleware;
