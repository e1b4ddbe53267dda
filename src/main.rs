use std::sync::Arc;

use anyhow::Context;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use warpcast_mcp::{run_http_server, Config, WarpcastClient};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    if !config.has_token() {
        warn!("WARPCAST_API_TOKEN is not set; every tool call will fail");
    }

    let client = WarpcastClient::new(&config).context("failed to build upstream client")?;
    run_http_server(config, Arc::new(client))
        .await
        .context("HTTP server failed")?;
    Ok(())
}
