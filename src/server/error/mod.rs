//! # Server Error Handling
//!
//! Every failure the server can report to a client is a [`ServerError`] with
//! an [`ErrorCode`]. Handlers return them as plain values; the translation to
//! an HTTP status happens only in the [`ResponseError`] impl, which renders
//! `{"detail": <message>}` with the mapped status.
//!
//! | code | status |
//! |---|---|
//! | `AccessDenied` | 403 |
//! | `BadRequest` | 400 |
//! | `InvalidParams` | 400 |
//! | `MethodNotFound` | 404 |
//! | `StreamNotEstablished` | 400 |
//! | `Misconfigured` | 500 |
//! | `Upstream` | 400 |
//! | `UpstreamUnavailable` | 502 |
//!
//! ## Examples
//!
//! ```rust
//! use warpcast_mcp::server::error::{ErrorCode, ServerError};
//! use actix_web::ResponseError;
//!
//! let error = ServerError::new(ErrorCode::MethodNotFound, "Method not found: ping");
//! assert_eq!(error.status_code().as_u16(), 404);
//! ```

use std::error::Error as StdError;
use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::client::UpstreamError;
use crate::transport::TransportError;

/// Failure categories reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The request origin is not trusted
    AccessDenied,
    /// The body is not a valid JSON-RPC request
    BadRequest,
    /// Tool name or arguments are invalid
    InvalidParams,
    /// The RPC method is not recognized
    MethodNotFound,
    /// The RPC method needs an open SSE session and there is none
    StreamNotEstablished,
    /// The upstream token is not configured
    Misconfigured,
    /// The upstream API reported a failure
    Upstream,
    /// The upstream call failed and propagation mode is on
    UpstreamUnavailable,
}

impl ErrorCode {
    /// The HTTP status this code maps to
    pub fn status(self) -> StatusCode {
        match self {
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::BadRequest
            | Self::InvalidParams
            | Self::StreamNotEstablished
            | Self::Upstream => StatusCode::BAD_REQUEST,
            Self::MethodNotFound => StatusCode::NOT_FOUND,
            Self::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::AccessDenied => write!(f, "Access denied"),
            ErrorCode::BadRequest => write!(f, "Bad request"),
            ErrorCode::InvalidParams => write!(f, "Invalid parameters"),
            ErrorCode::MethodNotFound => write!(f, "Method not found"),
            ErrorCode::StreamNotEstablished => write!(f, "Stream not established"),
            ErrorCode::Misconfigured => write!(f, "Server misconfigured"),
            ErrorCode::Upstream => write!(f, "Upstream error"),
            ErrorCode::UpstreamUnavailable => write!(f, "Upstream unavailable"),
        }
    }
}

/// A client-visible server failure
#[derive(Debug)]
pub struct ServerError {
    code: ErrorCode,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ServerError {
    /// Create a new server error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new server error with source
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Origin check failed
    pub fn access_denied() -> Self {
        Self::new(ErrorCode::AccessDenied, "Origin not allowed")
    }

    /// No SSE session is open
    pub fn stream_not_established() -> Self {
        Self::new(ErrorCode::StreamNotEstablished, "SSE stream not established")
    }

    /// The upstream token is missing
    pub fn misconfigured() -> Self {
        Self::new(ErrorCode::Misconfigured, "WARPCAST_API_TOKEN is not configured")
    }

    /// The error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The client-facing message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl StdError for ServerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<TransportError> for ServerError {
    /// A request that cannot be decoded is a bad request
    fn from(err: TransportError) -> Self {
        Self::with_source(ErrorCode::BadRequest, "Invalid JSON-RPC request", err)
    }
}

impl From<UpstreamError> for ServerError {
    /// Raw upstream failures only reach here in propagation mode
    fn from(err: UpstreamError) -> Self {
        let message = err.to_string();
        Self::with_source(ErrorCode::UpstreamUnavailable, message, err)
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        self.code.status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.message }))
    }
}
