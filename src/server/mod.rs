//! # MCP Server
//!
//! Request handling behind `POST /mcp` and the REST routes.
//!
//! ## Submodules
//!
//! * **error**: client-visible failures and their HTTP mapping
//! * **tool**: the static tool table and the upstream invoker
//!
//! [`McpServer`] ties them together with the session registry: it answers
//! `initialize`, `tools/list` and `tools/call`, and delivers each response
//! both to the caller and to every open stream.

mod mcp;
/// Module for error types and error handling
pub mod error;
/// Module for the tool table and tool invocation
pub mod tool;

pub use error::{ErrorCode, ServerError};
pub use mcp::{McpServer, RpcMethod};
