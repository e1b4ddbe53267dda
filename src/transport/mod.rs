//! # Transport Layer
//!
//! JSON-RPC 2.0 envelopes and the Server-Sent Events channel that carries
//! server-originated messages to subscribed clients.
//!
//! ## Overview
//!
//! Clients open a long-lived `GET /mcp` stream and send requests with separate
//! `POST /mcp` calls. Every open stream is an [`SseSession`] with its own
//! unbounded FIFO queue; the [`SessionStream`] half drains that queue into SSE
//! frames and deregisters the session when the connection goes away.
//!
//! ## Message Types
//!
//! * **Requests**: inbound, must carry a `method`; `id` is echoed back verbatim.
//! * **Responses**: outbound, carry the echoed `id` and a `result`.
//!
//! ## Error Handling
//!
//! Queue and codec failures are reported through [`TransportError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod error;
pub use error::TransportError;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

mod sse_transport;
pub use sse_transport::*;

/// JSON RPC version type
///
/// The default version is "2.0".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct JsonRpcVersion(String);

impl Default for JsonRpcVersion {
    fn default() -> Self {
        JsonRpcVersion("2.0".to_owned())
    }
}

impl JsonRpcVersion {
    /// Returns the string representation of the JSON-RPC version
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A JSON-RPC request message
///
/// `id` may be any JSON value and is `null` when the client omits it.
/// `jsonrpc` defaults to "2.0" so that terse clients sending only
/// `{"method": ..., "id": ...}` are accepted.
pub struct JsonRpcRequest {
    /// The request ID, echoed on the response
    #[serde(default)]
    pub id: Value,

    /// The method name to invoke
    pub method: String,

    /// Optional parameters for the method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// The JSON-RPC version
    #[serde(default)]
    pub jsonrpc: JsonRpcVersion,
}

impl JsonRpcRequest {
    /// Parses a request from a raw HTTP body
    ///
    /// Fails on malformed JSON, on a body that is not a request object, and on
    /// an empty method name.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let request: Self = serde_json::from_slice(body)?;
        if request.method.is_empty() {
            return Err(TransportError::InvalidMessage(
                "method must not be empty".to_string(),
            ));
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A JSON-RPC response message
pub struct JsonRpcResponse {
    /// The request ID this response corresponds to
    pub id: Value,

    /// The result of the request
    pub result: Value,

    /// The JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
}

impl JsonRpcResponse {
    /// Builds a successful response echoing `id`
    pub fn new(id: Value, result: Value) -> Self {
        Self {
            id,
            result,
            jsonrpc: JsonRpcVersion::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_initialize_request() {
        let json = r#"{"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"claude-ai","version":"0.1.0"}},"jsonrpc":"2.0","id":0}"#;

        let req = JsonRpcRequest::parse(json.as_bytes()).unwrap();
        assert_eq!(req.jsonrpc.as_str(), "2.0");
        assert_eq!(req.id, json!(0));
        assert_eq!(req.method, "initialize");

        let params = req.params.expect("params should exist");
        assert_eq!(params["protocolVersion"], "2024-11-05");
        assert_eq!(params["clientInfo"]["name"], "claude-ai");
    }

    #[test]
    fn test_terse_request_defaults() {
        let req = JsonRpcRequest::parse(br#"{"method":"tools/list"}"#).unwrap();
        assert!(req.id.is_null());
        assert_eq!(req.jsonrpc, JsonRpcVersion::default());
        assert!(req.params.is_none());

        let req = JsonRpcRequest::parse(br#"{"method":"initialize","id":"abc"}"#).unwrap();
        assert_eq!(req.id, json!("abc"));
    }

    #[test]
    fn test_parse_rejects_bad_bodies() {
        assert!(matches!(
            JsonRpcRequest::parse(b"{not json"),
            Err(TransportError::Json(_))
        ));
        assert!(matches!(
            JsonRpcRequest::parse(br#"{"id":1}"#),
            Err(TransportError::Json(_))
        ));
        assert!(matches!(
            JsonRpcRequest::parse(br#"{"method":""}"#),
            Err(TransportError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_response_serialization() {
        let response = JsonRpcResponse::new(json!(1), json!({"ok": true}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}}));
    }
}
