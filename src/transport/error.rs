use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

use super::SessionId;

/// Failures inside the SSE session queue and the JSON-RPC codec
///
/// # Examples
///
/// ```
/// use warpcast_mcp::transport::{JsonRpcRequest, TransportError};
///
/// let error = JsonRpcRequest::parse(br#"{"method":""}"#).unwrap_err();
/// assert!(matches!(error, TransportError::InvalidMessage(_)));
/// ```
#[derive(Error, Debug)]
pub enum TransportError {
    /// The session has started teardown and accepts no more messages
    #[error("session {0} is closed")]
    SessionClosed(SessionId),

    /// The receiving half of the session queue is gone
    #[error("session queue disconnected")]
    Disconnected,

    /// The body is not JSON, or not a request object
    #[error("malformed JSON-RPC message: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope decoded but is not a usable request
    #[error("invalid JSON-RPC message: {0}")]
    InvalidMessage(String),
}

impl<T> From<SendError<T>> for TransportError {
    fn from(_: SendError<T>) -> Self {
        Self::Disconnected
    }
}
