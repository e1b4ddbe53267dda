use serde::{Deserialize, Serialize};

/// The MCP protocol version this server speaks
pub const LATEST_PROTOCOL_VERSION: &str = "2024-11-05";

/// Default number of casts requested when a caller does not specify a limit
pub const DEFAULT_LIMIT: u32 = 20;

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
/// Information about an MCP implementation
pub struct Implementation {
    /// Name of the implementation
    pub name: String,
    /// Version of the implementation
    pub version: String,
}

impl Implementation {
    /// Identity reported by this server during `initialize`
    pub fn server() -> Self {
        Self {
            name: "warpcast-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
/// Response to an initialization request
pub struct InitializeResponse {
    /// Version of the MCP protocol being used
    pub protocol_version: String,
    /// Capabilities supported by the server
    pub capabilities: ServerCapabilities,
    /// Information about the server implementation
    pub server_info: Implementation,
}

impl InitializeResponse {
    /// The fixed handshake payload returned by this server
    pub fn handshake() -> Self {
        Self {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities {
                    list_changed: Some(false),
                }),
            },
            server_info: Implementation::server(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
/// Capabilities supported by the server
pub struct ServerCapabilities {
    /// Tool-related capabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
/// Capabilities related to tool functionality
pub struct ToolCapabilities {
    /// Whether the tool list can change
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Description of a tool that can be called by the client
pub struct Tool {
    /// Name of the tool
    pub name: String,
    /// What the tool does
    pub description: String,
    /// JSON schema describing the tool's input parameters
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Response to `tools/list`
///
/// `nextCursor` is always serialized, as `null` when there is no further page.
pub struct ToolsListResponse {
    /// List of available tools
    pub tools: Vec<Tool>,
    /// Cursor for the next page
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Request to call a tool
pub struct CallToolRequest {
    /// Name of the tool to call
    pub name: String,
    /// Arguments to pass to the tool
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Response from a tool call
pub struct CallToolResponse {
    /// Content returned by the tool
    pub content: Vec<Content>,
    /// Whether the response represents an error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResponse {
    /// Wraps an upstream payload as a single text content item
    pub fn json(payload: &serde_json::Value) -> Self {
        Self {
            content: vec![Content::Text {
                text: payload.to_string(),
            }],
            is_error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
/// Content that can be returned by a tool
pub enum Content {
    /// Text content
    #[serde(rename = "text")]
    Text {
        /// The text content
        text: String,
    },
}

/// Body of `POST /post-cast` and arguments of `post-cast`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CastRequest {
    /// Cast text
    pub text: String,
}

/// Body of the follow/unfollow routes and arguments of the channel tools
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelRequest {
    /// Channel identifier
    pub channel_id: String,
}

/// Arguments of `get-user-casts`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserCastsArgs {
    /// Username without the leading `@`
    pub username: String,
    /// Maximum number of casts
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Arguments of `search-casts`, also the query string of `GET /search-casts`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchArgs {
    /// Search query
    pub q: String,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// A bare `limit` argument, used by `get-trending-casts` and as a query string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitArgs {
    /// Maximum number of casts
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Arguments of `get-channel-casts`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelCastsArgs {
    /// Channel identifier
    pub channel_id: String,
    /// Maximum number of casts
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_capabilities() {
        let capabilities = ServerCapabilities::default();
        let json = serde_json::to_string(&capabilities).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_handshake_shape() {
        let value = serde_json::to_value(InitializeResponse::handshake()).unwrap();
        assert_eq!(value["protocolVersion"], "2024-11-05");
        assert_eq!(value["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(value["serverInfo"]["name"], "warpcast-mcp");
    }

    #[test]
    fn test_next_cursor_serializes_as_null() {
        let response = ToolsListResponse {
            tools: vec![],
            next_cursor: None,
        };
        let value = serde_json::to_value(response).unwrap();
        assert!(value["nextCursor"].is_null());
        assert!(value.as_object().unwrap().contains_key("nextCursor"));
    }

    #[test]
    fn test_limit_defaults() {
        let args: UserCastsArgs = serde_json::from_str(r#"{"username":"dwr"}"#).unwrap();
        assert_eq!(args.limit, DEFAULT_LIMIT);
        let args: LimitArgs = serde_json::from_str("{}").unwrap();
        assert_eq!(args.limit, 20);
    }
}
