//! # JSON-RPC dispatch
//!
//! [`McpServer`] handles the body of a `POST /mcp` request. It decodes the
//! JSON-RPC envelope, resolves the method, checks that at least one SSE
//! session is open, runs the handler and then delivers the response twice:
//! broadcast to every open session and returned to the caller as the HTTP
//! body. Both copies are the same value.
//!
//! Recognized methods are `initialize`, `tools/list` and `tools/call`. Any
//! other method is rejected with [`ErrorCode::MethodNotFound`] whether or not
//! a session is open.
//!
//! ## Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use warpcast_mcp::client::WarpcastClient;
//! use warpcast_mcp::config::Config;
//! use warpcast_mcp::registry::SessionRegistry;
//! use warpcast_mcp::server::tool::ToolInvoker;
//! use warpcast_mcp::server::McpServer;
//!
//! let config = Config::default();
//! let client = Arc::new(WarpcastClient::new(&config).unwrap());
//! let server = McpServer::new(SessionRegistry::new(), ToolInvoker::new(client, config.has_token()));
//! assert!(server.registry().is_empty());
//! ```

use serde_json::Value;
use tracing::debug;

use crate::registry::SessionRegistry;
use crate::server::error::{ErrorCode, ServerError};
use crate::server::tool::{ToolInvoker, ToolSet};
use crate::transport::{JsonRpcRequest, JsonRpcResponse};
use crate::types::{CallToolRequest, InitializeResponse, ToolsListResponse};

type Result<T> = std::result::Result<T, ServerError>;

/// RPC methods this server answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    /// `initialize`
    Initialize,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
}

impl RpcMethod {
    /// Resolves a method name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "tools/list" => Some(Self::ToolsList),
            "tools/call" => Some(Self::ToolsCall),
            _ => None,
        }
    }
}

/// JSON-RPC dispatcher bound to a session registry and a tool invoker
#[derive(Debug, Clone)]
pub struct McpServer {
    registry: SessionRegistry,
    tools: ToolInvoker,
}

impl McpServer {
    /// Creates a dispatcher
    pub fn new(registry: SessionRegistry, tools: ToolInvoker) -> Self {
        Self { registry, tools }
    }

    /// The registry responses are broadcast to
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The tool invoker used by `tools/call`
    pub fn tools(&self) -> &ToolInvoker {
        &self.tools
    }

    /// Decodes a raw request body and dispatches it
    pub async fn handle_bytes(&self, body: &[u8]) -> Result<JsonRpcResponse> {
        let request = JsonRpcRequest::parse(body)?;
        self.handle_request(request).await
    }

    /// Dispatches a decoded request, broadcasting and returning the response
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let method = RpcMethod::from_name(&request.method).ok_or_else(|| {
            ServerError::new(
                ErrorCode::MethodNotFound,
                format!("Method not found: {}", request.method),
            )
        })?;

        if self.registry.is_empty() {
            return Err(ServerError::stream_not_established());
        }

        debug!(method = %request.method, id = %request.id, "Dispatching request");
        let result = match method {
            RpcMethod::Initialize => to_result(InitializeResponse::handshake())?,
            RpcMethod::ToolsList => to_result(ToolsListResponse {
                tools: ToolSet::list(),
                next_cursor: None,
            })?,
            RpcMethod::ToolsCall => {
                let call = call_params(request.params)?;
                to_result(self.tools.call(call).await?)?
            }
        };

        let response = JsonRpcResponse::new(request.id, result);
        let delivered = self.registry.broadcast(&response);
        debug!(delivered, "Response broadcast");
        Ok(response)
    }
}

fn call_params(params: Option<Value>) -> Result<CallToolRequest> {
    let params = params
        .ok_or_else(|| ServerError::new(ErrorCode::InvalidParams, "Missing params for tools/call"))?;
    serde_json::from_value(params).map_err(|e| {
        ServerError::with_source(
            ErrorCode::InvalidParams,
            format!("Invalid params for tools/call: {}", e),
            e,
        )
    })
}

fn to_result<T: serde::Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| {
        ServerError::with_source(ErrorCode::BadRequest, "Failed to encode result", e)
    })
}
