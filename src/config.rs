//! Process configuration
//!
//! Everything read from the environment is read once, here, into a [`Config`]
//! that is passed down explicitly. Tests build configs with
//! [`Config::from_lookup`] or the `with_*` helpers instead of mutating the
//! process environment.

use std::net::SocketAddr;
use std::time::Duration;

/// Default upstream API root
pub const DEFAULT_API_BASE_URL: &str = "https://api.warpcast.com/v2";

/// Origins trusted when `ALLOWED_ORIGINS` is not set
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://claude.ai",
    "https://app.claude.ai",
    "http://localhost:3000",
];

/// Timeout applied to every upstream request
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bearer token for the upstream API
    pub api_token: Option<String>,
    /// Exact-match origin allow-list
    pub allowed_origins: Vec<String>,
    /// Surface raw upstream failures instead of normalizing them
    pub propagate_errors: bool,
    /// Upstream API root, without trailing slash
    pub api_base_url: String,
    /// Upstream request timeout
    pub upstream_timeout: Duration,
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            propagate_errors: false,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup
    ///
    /// Recognized keys: `WARPCAST_API_TOKEN`, `ALLOWED_ORIGINS`,
    /// `PROPAGATE_EXCEPTIONS` (presence enables it), `WARPCAST_API_BASE_URL`,
    /// `HOST` and `PORT`. Unparseable `HOST`/`PORT` values fall back to the
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_token = lookup("WARPCAST_API_TOKEN").filter(|t| !t.trim().is_empty());
        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| parse_origin_list(&raw))
            .unwrap_or(defaults.allowed_origins);
        let propagate_errors = lookup("PROPAGATE_EXCEPTIONS").is_some();
        let api_base_url = lookup("WARPCAST_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let ip = lookup("HOST")
            .and_then(|h| h.parse().ok())
            .unwrap_or(defaults.bind_addr.ip());
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.bind_addr.port());

        Self {
            api_token,
            allowed_origins,
            propagate_errors,
            api_base_url,
            upstream_timeout: defaults.upstream_timeout,
            bind_addr: SocketAddr::new(ip, port),
        }
    }

    /// Sets the upstream bearer token
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Replaces the origin allow-list
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Enables raw upstream error propagation
    pub fn with_propagate_errors(mut self, propagate: bool) -> Self {
        self.propagate_errors = propagate;
        self
    }

    /// Whether an upstream token is configured
    pub fn has_token(&self) -> bool {
        self.api_token.is_some()
    }
}

/// Splits a comma-separated origin list, trimming entries and dropping blanks
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
