//! HTTP surface
//!
//! Two groups of routes share one [`AppState`]:
//!
//! - REST routes mirroring the tool table (`/post-cast`, `/channels/{id}`, ...)
//!   which call [`ToolInvoker::invoke`] directly;
//! - `GET /mcp` (SSE stream) and `POST /mcp` (JSON-RPC), both wrapped in
//!   [`OriginGate`].

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use actix_web_lab::sse;
use tracing::info;

use crate::client::UpstreamClient;
use crate::config::Config;
use crate::registry::SessionRegistry;
use crate::server::error::ServerError;
use crate::server::tool::{ToolCall, ToolInvoker};
use crate::server::McpServer;
use crate::sse::middleware::{OriginGate, OriginGuard};
use crate::transport::{SseSession, MCP_ENDPOINT};
use crate::types::{CastRequest, ChannelCastsArgs, ChannelRequest, LimitArgs, SearchArgs, UserCastsArgs};

/// Interval between SSE keep-alive comments
///
/// A client that went away is only noticed when a write to it fails, so this
/// also bounds how long a dead session stays in the registry.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(3);

/// Shared state behind every route
#[derive(Debug, Clone)]
pub struct AppState {
    mcp: McpServer,
}

impl AppState {
    /// Builds the state for `config` on top of an upstream client
    pub fn new(config: &Config, client: Arc<dyn UpstreamClient>) -> Self {
        let tools = ToolInvoker::new(client, config.has_token());
        Self {
            mcp: McpServer::new(SessionRegistry::new(), tools),
        }
    }

    /// The JSON-RPC dispatcher
    pub fn mcp(&self) -> &McpServer {
        &self.mcp
    }

    /// The open SSE sessions
    pub fn registry(&self) -> &SessionRegistry {
        self.mcp.registry()
    }

    fn tools(&self) -> &ToolInvoker {
        self.mcp.tools()
    }
}

/// Registers every route; `guard` protects the `/mcp` endpoint
///
/// Expects `web::Data<AppState>` to be registered on the app.
pub fn routes(guard: OriginGuard) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.route("/post-cast", web::post().to(post_cast))
            .route("/user-casts/{username}", web::get().to(user_casts))
            .route("/search-casts", web::get().to(search_casts))
            .route("/trending-casts", web::get().to(trending_casts))
            .route("/channels", web::get().to(all_channels))
            .route("/channels/{channel_id}", web::get().to(channel))
            .route("/channels/{channel_id}/casts", web::get().to(channel_casts))
            .route("/follow-channel", web::post().to(follow_channel))
            .route("/unfollow-channel", web::post().to(unfollow_channel))
            .service(
                web::resource(MCP_ENDPOINT)
                    .route(web::get().to(mcp_stream))
                    .route(web::post().to(mcp_rpc))
                    .wrap(OriginGate::new(guard)),
            );
    }
}

async fn invoke(state: &AppState, call: ToolCall) -> Result<HttpResponse, ServerError> {
    let payload = state.tools().invoke(call).await?;
    Ok(HttpResponse::Ok().json(payload))
}

async fn post_cast(
    state: web::Data<AppState>,
    body: web::Json<CastRequest>,
) -> Result<HttpResponse, ServerError> {
    invoke(&state, ToolCall::PostCast(body.into_inner())).await
}

async fn user_casts(
    state: web::Data<AppState>,
    username: web::Path<String>,
    query: web::Query<LimitArgs>,
) -> Result<HttpResponse, ServerError> {
    let args = UserCastsArgs {
        username: username.into_inner(),
        limit: query.limit,
    };
    invoke(&state, ToolCall::UserCasts(args)).await
}

async fn search_casts(
    state: web::Data<AppState>,
    query: web::Query<SearchArgs>,
) -> Result<HttpResponse, ServerError> {
    invoke(&state, ToolCall::SearchCasts(query.into_inner())).await
}

async fn trending_casts(
    state: web::Data<AppState>,
    query: web::Query<LimitArgs>,
) -> Result<HttpResponse, ServerError> {
    invoke(&state, ToolCall::TrendingCasts(query.into_inner())).await
}

async fn all_channels(state: web::Data<AppState>) -> Result<HttpResponse, ServerError> {
    invoke(&state, ToolCall::AllChannels).await
}

async fn channel(
    state: web::Data<AppState>,
    channel_id: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let args = ChannelRequest {
        channel_id: channel_id.into_inner(),
    };
    invoke(&state, ToolCall::Channel(args)).await
}

async fn channel_casts(
    state: web::Data<AppState>,
    channel_id: web::Path<String>,
    query: web::Query<LimitArgs>,
) -> Result<HttpResponse, ServerError> {
    let args = ChannelCastsArgs {
        channel_id: channel_id.into_inner(),
        limit: query.limit,
    };
    invoke(&state, ToolCall::ChannelCasts(args)).await
}

async fn follow_channel(
    state: web::Data<AppState>,
    body: web::Json<ChannelRequest>,
) -> Result<HttpResponse, ServerError> {
    invoke(&state, ToolCall::FollowChannel(body.into_inner())).await
}

async fn unfollow_channel(
    state: web::Data<AppState>,
    body: web::Json<ChannelRequest>,
) -> Result<HttpResponse, ServerError> {
    invoke(&state, ToolCall::UnfollowChannel(body.into_inner())).await
}

/// `GET /mcp`: opens a session and streams its queue
async fn mcp_stream(state: web::Data<AppState>) -> impl Responder {
    let (_session, stream) = SseSession::open(state.registry());
    sse::Sse::from_stream(stream).with_keep_alive(KEEP_ALIVE_INTERVAL)
}

/// `POST /mcp`: dispatches one JSON-RPC request
async fn mcp_rpc(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ServerError> {
    let response = state.mcp().handle_bytes(&body).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Runs the HTTP server until shutdown
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use warpcast_mcp::client::WarpcastClient;
/// use warpcast_mcp::config::Config;
/// use warpcast_mcp::run_http_server;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_env();
/// let client = Arc::new(WarpcastClient::new(&config)?);
/// run_http_server(config, client).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_http_server(config: Config, client: Arc<dyn UpstreamClient>) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(&config, client));
    let guard = OriginGuard::new(config.allowed_origins.clone());

    info!(
        addr = %config.bind_addr,
        token_configured = config.has_token(),
        origins = ?config.allowed_origins,
        "Starting HTTP server"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes(guard.clone()))
    })
    .bind(config.bind_addr)?
    .run()
    .await
}
