//! Tool table and invocation
//!
//! The server exposes a fixed set of tools, one per upstream operation. The
//! table never changes at runtime: [`ToolSet::standard`] lists it for
//! `tools/list`, and [`ToolCall::parse`] turns a tool name plus JSON arguments
//! into a typed call.
//!
//! [`ToolInvoker`] runs a call against an [`UpstreamClient`] and applies the
//! contract shared by the REST routes and `tools/call`:
//!
//! - without a configured token the call fails with
//!   [`ErrorCode::Misconfigured`] and the upstream is never contacted;
//! - a `{"status": "error"}` payload becomes [`ErrorCode::Upstream`] carrying
//!   its message;
//! - anything else is returned verbatim.
//!
//! # Examples
//!
//! ```
//! use warpcast_mcp::server::tool::{ToolCall, ToolSet};
//!
//! assert_eq!(ToolSet::standard().len(), 9);
//!
//! let call = ToolCall::parse("get-trending-casts", None).unwrap();
//! assert_eq!(call.name(), "get-trending-casts");
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{error_message, UpstreamClient};
use crate::server::error::{ErrorCode, ServerError};
use crate::types::{
    CallToolRequest, CallToolResponse, CastRequest, ChannelCastsArgs, ChannelRequest, LimitArgs,
    SearchArgs, Tool, UserCastsArgs,
};

/// Longest cast text the upstream accepts, in characters
pub const MAX_CAST_LENGTH: usize = 320;

/// Static description of one tool
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    /// Name clients call the tool by
    pub name: &'static str,
    /// Human-readable summary
    pub description: &'static str,
    input_schema: fn() -> Value,
    decode: fn(Option<Value>) -> serde_json::Result<ToolCall>,
}

impl ToolDescriptor {
    /// JSON schema of the tool arguments
    pub fn input_schema(&self) -> Value {
        (self.input_schema)()
    }

    /// The `tools/list` entry for this tool
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}

fn limit_property() -> Value {
    json!({ "type": "integer", "minimum": 1, "default": 20 })
}

fn channel_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "channel_id": { "type": "string" } },
        "required": ["channel_id"]
    })
}

static TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "post-cast",
        description: "Create a new cast on Warpcast",
        input_schema: || {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "maxLength": MAX_CAST_LENGTH }
                },
                "required": ["text"]
            })
        },
        decode: |args| typed(args).map(ToolCall::PostCast),
    },
    ToolDescriptor {
        name: "get-user-casts",
        description: "Fetch recent casts from a user",
        input_schema: || {
            json!({
                "type": "object",
                "properties": {
                    "username": {
                        "type": "string",
                        "description": "Warpcast username without the @ symbol"
                    },
                    "limit": limit_property()
                },
                "required": ["username"]
            })
        },
        decode: |args| typed(args).map(ToolCall::UserCasts),
    },
    ToolDescriptor {
        name: "search-casts",
        description: "Search casts by keyword or phrase",
        input_schema: || {
            json!({
                "type": "object",
                "properties": {
                    "q": { "type": "string" },
                    "limit": limit_property()
                },
                "required": ["q"]
            })
        },
        decode: |args| typed(args).map(ToolCall::SearchCasts),
    },
    ToolDescriptor {
        name: "get-trending-casts",
        description: "Fetch currently trending casts",
        input_schema: || {
            json!({
                "type": "object",
                "properties": { "limit": limit_property() }
            })
        },
        decode: |args| typed(args).map(ToolCall::TrendingCasts),
    },
    ToolDescriptor {
        name: "get-all-channels",
        description: "List available channels",
        input_schema: || json!({ "type": "object", "properties": {} }),
        decode: |_| Ok(ToolCall::AllChannels),
    },
    ToolDescriptor {
        name: "get-channel",
        description: "Fetch information about a channel",
        input_schema: channel_id_schema,
        decode: |args| typed(args).map(ToolCall::Channel),
    },
    ToolDescriptor {
        name: "get-channel-casts",
        description: "Fetch recent casts from a channel",
        input_schema: || {
            json!({
                "type": "object",
                "properties": {
                    "channel_id": { "type": "string" },
                    "limit": limit_property()
                },
                "required": ["channel_id"]
            })
        },
        decode: |args| typed(args).map(ToolCall::ChannelCasts),
    },
    ToolDescriptor {
        name: "follow-channel",
        description: "Follow a channel",
        input_schema: channel_id_schema,
        decode: |args| typed(args).map(ToolCall::FollowChannel),
    },
    ToolDescriptor {
        name: "unfollow-channel",
        description: "Unfollow a channel",
        input_schema: channel_id_schema,
        decode: |args| typed(args).map(ToolCall::UnfollowChannel),
    },
];

/// The fixed tool table
pub struct ToolSet;

impl ToolSet {
    /// All tools, in listing order
    pub fn standard() -> &'static [ToolDescriptor] {
        TOOLS
    }

    /// Looks a tool up by name
    pub fn find(name: &str) -> Option<&'static ToolDescriptor> {
        TOOLS.iter().find(|tool| tool.name == name)
    }

    /// The `tools/list` payload entries
    pub fn list() -> Vec<Tool> {
        TOOLS.iter().map(ToolDescriptor::to_tool).collect()
    }
}

/// A tool call with decoded arguments
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ToolCall {
    PostCast(CastRequest),
    UserCasts(UserCastsArgs),
    SearchCasts(SearchArgs),
    TrendingCasts(LimitArgs),
    AllChannels,
    Channel(ChannelRequest),
    ChannelCasts(ChannelCastsArgs),
    FollowChannel(ChannelRequest),
    UnfollowChannel(ChannelRequest),
}

/// Decodes tool arguments; missing arguments decode like an empty object
fn typed<T: DeserializeOwned>(arguments: Option<Value>) -> serde_json::Result<T> {
    serde_json::from_value(arguments.unwrap_or_else(|| json!({})))
}

impl ToolCall {
    /// Resolves `name` against the tool table and decodes `arguments`
    pub fn parse(name: &str, arguments: Option<Value>) -> Result<Self, ServerError> {
        let tool = ToolSet::find(name).ok_or_else(|| {
            ServerError::new(ErrorCode::InvalidParams, format!("Unknown tool: {}", name))
        })?;
        let call = (tool.decode)(arguments).map_err(|e| {
            ServerError::with_source(
                ErrorCode::InvalidParams,
                format!("Invalid arguments for {}: {}", name, e),
                e,
            )
        })?;
        Ok(call)
    }

    /// Checks argument constraints serde cannot express
    pub fn validate(&self) -> Result<(), ServerError> {
        match self {
            Self::PostCast(args) if args.text.chars().count() > MAX_CAST_LENGTH => {
                Err(ServerError::new(
                    ErrorCode::InvalidParams,
                    format!("Cast text exceeds {} characters", MAX_CAST_LENGTH),
                ))
            }
            _ => Ok(()),
        }
    }

    /// The tool name this call targets
    pub fn name(&self) -> &'static str {
        match self {
            Self::PostCast(_) => "post-cast",
            Self::UserCasts(_) => "get-user-casts",
            Self::SearchCasts(_) => "search-casts",
            Self::TrendingCasts(_) => "get-trending-casts",
            Self::AllChannels => "get-all-channels",
            Self::Channel(_) => "get-channel",
            Self::ChannelCasts(_) => "get-channel-casts",
            Self::FollowChannel(_) => "follow-channel",
            Self::UnfollowChannel(_) => "unfollow-channel",
        }
    }
}

/// Runs tool calls against the upstream API
#[derive(Clone)]
pub struct ToolInvoker {
    client: Arc<dyn UpstreamClient>,
    has_token: bool,
}

impl ToolInvoker {
    /// Creates an invoker; `has_token` gates every call
    pub fn new(client: Arc<dyn UpstreamClient>, has_token: bool) -> Self {
        Self { client, has_token }
    }

    /// Executes one call and returns the upstream payload
    pub async fn invoke(&self, call: ToolCall) -> Result<Value, ServerError> {
        if !self.has_token {
            return Err(ServerError::misconfigured());
        }
        call.validate()?;
        debug!(tool = call.name(), "Invoking tool");

        let client = self.client.as_ref();
        let payload = match &call {
            ToolCall::PostCast(args) => client.post_cast(&args.text).await,
            ToolCall::UserCasts(args) => client.user_casts(&args.username, args.limit).await,
            ToolCall::SearchCasts(args) => client.search_casts(&args.q, args.limit).await,
            ToolCall::TrendingCasts(args) => client.trending_casts(args.limit).await,
            ToolCall::AllChannels => client.all_channels().await,
            ToolCall::Channel(args) => client.channel(&args.channel_id).await,
            ToolCall::ChannelCasts(args) => {
                client.channel_casts(&args.channel_id, args.limit).await
            }
            ToolCall::FollowChannel(args) => client.follow_channel(&args.channel_id).await,
            ToolCall::UnfollowChannel(args) => client.unfollow_channel(&args.channel_id).await,
        }?;

        if let Some(message) = error_message(&payload) {
            return Err(ServerError::new(ErrorCode::Upstream, message));
        }
        Ok(payload)
    }

    /// Handles an MCP `tools/call` request
    pub async fn call(&self, request: CallToolRequest) -> Result<CallToolResponse, ServerError> {
        let call = ToolCall::parse(&request.name, request.arguments)?;
        let payload = self.invoke(call).await?;
        Ok(CallToolResponse::json(&payload))
    }
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker")
            .field("has_token", &self.has_token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{error_payload, Operation, UpstreamError};
    use crate::types::Content;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call and answers with a fixed payload
    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<String>>,
        reply: Option<Value>,
    }

    impl RecordingClient {
        fn replying(reply: Value) -> Self {
            Self {
                reply: Some(reply),
                ..Self::default()
            }
        }

        fn record(&self, call: String) -> Result<Value, UpstreamError> {
            self.calls.lock().unwrap().push(call);
            Ok(self.reply.clone().unwrap_or_else(|| json!({"ok": true})))
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamClient for RecordingClient {
        async fn post_cast(&self, text: &str) -> Result<Value, UpstreamError> {
            self.record(format!("post_cast:{}", text))
        }
        async fn user_casts(&self, username: &str, limit: u32) -> Result<Value, UpstreamError> {
            self.record(format!("user_casts:{}:{}", username, limit))
        }
        async fn search_casts(&self, query: &str, limit: u32) -> Result<Value, UpstreamError> {
            self.record(format!("search_casts:{}:{}", query, limit))
        }
        async fn trending_casts(&self, limit: u32) -> Result<Value, UpstreamError> {
            self.record(format!("trending_casts:{}", limit))
        }
        async fn all_channels(&self) -> Result<Value, UpstreamError> {
            self.record("all_channels".to_string())
        }
        async fn channel(&self, channel_id: &str) -> Result<Value, UpstreamError> {
            self.record(format!("channel:{}", channel_id))
        }
        async fn channel_casts(&self, channel_id: &str, limit: u32) -> Result<Value, UpstreamError> {
            self.record(format!("channel_casts:{}:{}", channel_id, limit))
        }
        async fn follow_channel(&self, channel_id: &str) -> Result<Value, UpstreamError> {
            self.record(format!("follow:{}", channel_id))
        }
        async fn unfollow_channel(&self, channel_id: &str) -> Result<Value, UpstreamError> {
            self.record(format!("unfollow:{}", channel_id))
        }
    }

    #[test]
    fn test_tool_table() {
        let names: Vec<_> = ToolSet::standard().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            [
                "post-cast",
                "get-user-casts",
                "search-casts",
                "get-trending-casts",
                "get-all-channels",
                "get-channel",
                "get-channel-casts",
                "follow-channel",
                "unfollow-channel",
            ]
        );

        let tools = ToolSet::list();
        assert_eq!(tools.len(), 9);
        assert!(tools.iter().all(|t| t.input_schema["type"] == "object"));
        assert_eq!(
            ToolSet::find("get-channel").unwrap().input_schema()["required"],
            json!(["channel_id"])
        );
        assert!(ToolSet::find("delete-cast").is_none());
    }

    #[test]
    fn test_every_listed_tool_parses() {
        let args = json!({"text": "t", "username": "u", "q": "q", "channel_id": "c"});
        for tool in ToolSet::standard() {
            let call = ToolCall::parse(tool.name, Some(args.clone())).unwrap();
            assert_eq!(call.name(), tool.name);
        }
    }

    #[test]
    fn test_parse_errors() {
        let err = ToolCall::parse("delete-cast", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParams);

        let err = ToolCall::parse("post-cast", Some(json!({"body": "x"}))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParams);

        let err = ToolCall::parse("get-channel", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParams);
    }

    #[tokio::test]
    async fn test_cast_length_is_enforced() {
        let client = Arc::new(RecordingClient::default());
        let invoker = ToolInvoker::new(client.clone(), true);

        let longest = "é".repeat(MAX_CAST_LENGTH);
        invoker
            .invoke(ToolCall::parse("post-cast", Some(json!({"text": longest}))).unwrap())
            .await
            .unwrap();

        let too_long = CastRequest {
            text: "a".repeat(MAX_CAST_LENGTH + 1),
        };
        let err = invoker.invoke(ToolCall::PostCast(too_long)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParams);
        assert_eq!(client.calls().len(), 1);

        let schema = ToolSet::find("post-cast").unwrap().input_schema();
        assert_eq!(schema["properties"]["text"]["maxLength"], MAX_CAST_LENGTH);
    }

    #[tokio::test]
    async fn test_missing_token_never_calls_upstream() {
        let client = Arc::new(RecordingClient::default());
        let invoker = ToolInvoker::new(client.clone(), false);

        for tool in ToolSet::standard() {
            let args = json!({"text": "t", "username": "u", "q": "q", "channel_id": "c"});
            let call = ToolCall::parse(tool.name, Some(args)).unwrap();
            let err = invoker.invoke(call).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::Misconfigured);
        }
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_arguments_reach_upstream() {
        let client = Arc::new(RecordingClient::default());
        let invoker = ToolInvoker::new(client.clone(), true);

        invoker
            .invoke(ToolCall::parse("get-user-casts", Some(json!({"username": "dwr"}))).unwrap())
            .await
            .unwrap();
        invoker
            .invoke(ToolCall::parse("search-casts", Some(json!({"q": "rust", "limit": 5}))).unwrap())
            .await
            .unwrap();
        invoker
            .invoke(ToolCall::parse("unfollow-channel", Some(json!({"channel_id": "memes"}))).unwrap())
            .await
            .unwrap();

        assert_eq!(
            client.calls(),
            ["user_casts:dwr:20", "search_casts:rust:5", "unfollow:memes"]
        );
    }

    #[tokio::test]
    async fn test_upstream_error_payload_becomes_client_error() {
        let client = Arc::new(RecordingClient::replying(error_payload(Operation::PostCast)));
        let invoker = ToolInvoker::new(client, true);

        let err = invoker
            .invoke(ToolCall::PostCast(CastRequest { text: "hi".into() }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Upstream);
        assert_eq!(err.message(), "Could not post cast");
    }

    #[tokio::test]
    async fn test_payload_returned_verbatim() {
        let payload = json!({"result": {"casts": [{"hash": "0xabc"}]}});
        let client = Arc::new(RecordingClient::replying(payload.clone()));
        let invoker = ToolInvoker::new(client, true);

        let result = invoker.invoke(ToolCall::AllChannels).await.unwrap();
        assert_eq!(result, payload);
    }

    #[tokio::test]
    async fn test_call_wraps_payload_as_text() {
        let client = Arc::new(RecordingClient::replying(json!({"channel": {"id": "rust"}})));
        let invoker = ToolInvoker::new(client, true);

        let response = invoker
            .call(CallToolRequest {
                name: "get-channel".into(),
                arguments: Some(json!({"channel_id": "rust"})),
            })
            .await
            .unwrap();

        let Content::Text { text } = &response.content[0];
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed, json!({"channel": {"id": "rust"}}));
        assert_eq!(response.is_error, None);
    }
}
