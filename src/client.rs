//! Upstream Warpcast REST client
//!
//! The server core only sees the [`UpstreamClient`] trait: one async method per
//! operation, each returning the upstream JSON payload. [`WarpcastClient`] is
//! the production implementation on top of `reqwest`.
//!
//! Network and HTTP failures are logged and normalized into
//! `{"status": "error", "message": "Could not ..."}` payloads, unless the
//! client was configured to propagate them, in which case they are returned as
//! [`UpstreamError`]s.

use std::fmt;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::config::Config;

/// Upstream operations, one per tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create a cast
    PostCast,
    /// List a user's casts
    UserCasts,
    /// Search casts
    SearchCasts,
    /// List trending casts
    TrendingCasts,
    /// List all channels
    AllChannels,
    /// Fetch one channel
    Channel,
    /// List a channel's casts
    ChannelCasts,
    /// Follow a channel
    FollowChannel,
    /// Unfollow a channel
    UnfollowChannel,
}

impl Operation {
    /// Message used in the normalized error payload
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::PostCast => "Could not post cast",
            Self::UserCasts => "Could not fetch user casts",
            Self::SearchCasts => "Could not search casts",
            Self::TrendingCasts => "Could not fetch trending casts",
            Self::AllChannels => "Could not fetch channels",
            Self::Channel => "Could not fetch channel",
            Self::ChannelCasts => "Could not fetch channel casts",
            Self::FollowChannel => "Could not follow channel",
            Self::UnfollowChannel => "Could not unfollow channel",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.failure_message())
    }
}

/// Failure talking to the upstream API
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The request failed or returned a non-success status
    #[error("{operation}: {source}")]
    Request {
        /// Operation that failed
        operation: Operation,
        /// Underlying HTTP failure
        #[source]
        source: reqwest::Error,
    },

    /// The configured base URL is not usable
    #[error("invalid upstream base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Builds the normalized error payload for a failed operation
pub fn error_payload(operation: Operation) -> Value {
    json!({ "status": "error", "message": operation.failure_message() })
}

/// Returns the message of a normalized `{"status": "error"}` payload
pub fn error_message(payload: &Value) -> Option<&str> {
    if payload.get("status").and_then(Value::as_str) != Some("error") {
        return None;
    }
    Some(
        payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Upstream request failed"),
    )
}

/// The upstream social API, as seen by the server core
#[async_trait]
pub trait UpstreamClient: Send + Sync + 'static {
    /// Create a new cast
    async fn post_cast(&self, text: &str) -> Result<Value, UpstreamError>;

    /// Recent casts from `username`
    async fn user_casts(&self, username: &str, limit: u32) -> Result<Value, UpstreamError>;

    /// Casts matching `query`
    async fn search_casts(&self, query: &str, limit: u32) -> Result<Value, UpstreamError>;

    /// Currently trending casts
    async fn trending_casts(&self, limit: u32) -> Result<Value, UpstreamError>;

    /// All channels
    async fn all_channels(&self) -> Result<Value, UpstreamError>;

    /// One channel
    async fn channel(&self, channel_id: &str) -> Result<Value, UpstreamError>;

    /// Recent casts in a channel
    async fn channel_casts(&self, channel_id: &str, limit: u32) -> Result<Value, UpstreamError>;

    /// Follow a channel
    async fn follow_channel(&self, channel_id: &str) -> Result<Value, UpstreamError>;

    /// Unfollow a channel
    async fn unfollow_channel(&self, channel_id: &str) -> Result<Value, UpstreamError>;
}

/// `reqwest`-backed Warpcast API client
#[derive(Debug, Clone)]
pub struct WarpcastClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    propagate_errors: bool,
}

impl WarpcastClient {
    /// Creates a client from the process configuration
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(UpstreamError::Build)?;
        Ok(Self {
            http,
            base_url: Url::parse(&config.api_base_url)?,
            token: config.api_token.clone(),
            propagate_errors: config.propagate_errors,
        })
    }

    /// Builds an endpoint URL, percent-encoding each path segment
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn get(&self, segments: &[&str]) -> RequestBuilder {
        self.authorize(self.http.get(self.endpoint(segments)))
    }

    fn post(&self, segments: &[&str]) -> RequestBuilder {
        self.authorize(self.http.post(self.endpoint(segments)))
    }

    async fn execute(&self, operation: Operation, request: RequestBuilder) -> Result<Value, UpstreamError> {
        let result = async {
            let response = request.send().await?.error_for_status()?;
            response.json::<Value>().await
        }
        .await;

        match result {
            Ok(payload) => {
                debug!(?operation, "Upstream call succeeded");
                Ok(payload)
            }
            Err(source) => {
                error!(?operation, error = %source, "{}", operation.failure_message());
                if self.propagate_errors {
                    Err(UpstreamError::Request { operation, source })
                } else {
                    Ok(error_payload(operation))
                }
            }
        }
    }
}

#[async_trait]
impl UpstreamClient for WarpcastClient {
    async fn post_cast(&self, text: &str) -> Result<Value, UpstreamError> {
        let request = self.post(&["casts"]).json(&json!({ "text": text }));
        self.execute(Operation::PostCast, request).await
    }

    async fn user_casts(&self, username: &str, limit: u32) -> Result<Value, UpstreamError> {
        let request = self
            .get(&["users", username, "casts"])
            .query(&[("limit", limit)]);
        self.execute(Operation::UserCasts, request).await
    }

    async fn search_casts(&self, query: &str, limit: u32) -> Result<Value, UpstreamError> {
        let limit = limit.to_string();
        let request = self
            .get(&["casts", "search"])
            .query(&[("q", query), ("limit", limit.as_str())]);
        self.execute(Operation::SearchCasts, request).await
    }

    async fn trending_casts(&self, limit: u32) -> Result<Value, UpstreamError> {
        let request = self.get(&["casts", "trending"]).query(&[("limit", limit)]);
        self.execute(Operation::TrendingCasts, request).await
    }

    async fn all_channels(&self) -> Result<Value, UpstreamError> {
        self.execute(Operation::AllChannels, self.get(&["channels"])).await
    }

    async fn channel(&self, channel_id: &str) -> Result<Value, UpstreamError> {
        self.execute(Operation::Channel, self.get(&["channels", channel_id]))
            .await
    }

    async fn channel_casts(&self, channel_id: &str, limit: u32) -> Result<Value, UpstreamError> {
        let request = self
            .get(&["channels", channel_id, "casts"])
            .query(&[("limit", limit)]);
        self.execute(Operation::ChannelCasts, request).await
    }

    async fn follow_channel(&self, channel_id: &str) -> Result<Value, UpstreamError> {
        let request = self.post(&["channels", channel_id, "follow"]);
        self.execute(Operation::FollowChannel, request).await
    }

    async fn unfollow_channel(&self, channel_id: &str) -> Result<Value, UpstreamError> {
        let request = self.post(&["channels", channel_id, "unfollow"]);
        self.execute(Operation::UnfollowChannel, request).await
    }
}
