use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::ORIGIN,
    Error, ResponseError,
};
use futures::future::ready;
use futures::future::{LocalBoxFuture, Ready};
use tracing::warn;
use url::Url;

use crate::server::error::ServerError;

/// Origin allow-list check for the streaming and RPC endpoints
///
/// An origin is trusted when it exactly matches a configured entry, or when it
/// parses as a URL with the `file` scheme or a `localhost` / `127.0.0.1` host.
/// A missing or empty origin is never trusted.
///
/// # Examples
///
/// ```
/// use warpcast_mcp::sse::middleware::OriginGuard;
///
/// let guard = OriginGuard::new(["https://claude.ai"]);
/// assert!(guard.allowed(Some("https://claude.ai")));
/// assert!(guard.allowed(Some("http://localhost:5173")));
/// assert!(!guard.allowed(Some("http://evil.com")));
/// assert!(!guard.allowed(None));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OriginGuard {
    allowed_origins: Vec<String>,
}

impl OriginGuard {
    /// Creates a guard over an explicit allow-list
    pub fn new<I, S>(allowed_origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: allowed_origins.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a request carrying `origin` may proceed
    pub fn allowed(&self, origin: Option<&str>) -> bool {
        let origin = match origin {
            Some(origin) if !origin.is_empty() => origin,
            _ => return false,
        };
        if self.allowed_origins.iter().any(|allowed| allowed == origin) {
            return true;
        }
        match Url::parse(origin) {
            Ok(url) => {
                url.scheme() == "file" || matches!(url.host_str(), Some("localhost" | "127.0.0.1"))
            }
            Err(_) => false,
        }
    }
}

/// Middleware rejecting requests whose `Origin` is not trusted
///
/// Rejected requests get a 403 with a `{"detail": ...}` body and never reach
/// the wrapped service.
///
/// # Examples
///
/// ```
/// use actix_web::{App, web};
/// use warpcast_mcp::sse::middleware::{OriginGate, OriginGuard};
///
/// let app = App::new().service(
///     web::scope("/mcp")
///         .wrap(OriginGate::new(OriginGuard::new(["https://claude.ai"])))
///         .route("", web::get().to(|| async { "stream" })),
/// );
/// ```
pub struct OriginGate(Rc<OriginGuard>);

impl OriginGate {
    /// Creates the middleware factory
    pub fn new(guard: OriginGuard) -> Self {
        OriginGate(Rc::new(guard))
    }
}

impl<S, B> Transform<S, ServiceRequest> for OriginGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = OriginGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OriginGateMiddleware {
            service,
            guard: Rc::clone(&self.0),
        }))
    }
}

/// Service produced by [`OriginGate`]
pub struct OriginGateMiddleware<S> {
    service: S,
    guard: Rc<OriginGuard>,
}

impl<S, B> Service<ServiceRequest> for OriginGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let origin = req.headers().get(ORIGIN).and_then(|h| h.to_str().ok());

        if self.guard.allowed(origin) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        warn!(origin = ?origin, path = %req.path(), "Rejected request from untrusted origin");
        let (req, _) = req.into_parts();
        let response = ServerError::access_denied().error_response();
        Box::pin(async move { Ok(ServiceResponse::new(req, response).map_into_right_body()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test as actix_test, web, App, HttpResponse};

    fn guard() -> OriginGuard {
        OriginGuard::new(["https://claude.ai", "https://app.claude.ai"])
    }

    #[test]
    fn test_allow_list_is_exact() {
        let guard = guard();
        assert!(guard.allowed(Some("https://claude.ai")));
        assert!(guard.allowed(Some("https://app.claude.ai")));
        assert!(!guard.allowed(Some("https://claude.ai/")));
        assert!(!guard.allowed(Some("https://CLAUDE.ai")));
        assert!(!guard.allowed(Some("https://evil.claude.ai")));
    }

    #[test]
    fn test_local_origins_always_trusted() {
        let empty = OriginGuard::default();
        assert!(empty.allowed(Some("http://localhost")));
        assert!(empty.allowed(Some("http://localhost:3000")));
        assert!(empty.allowed(Some("http://127.0.0.1")));
        assert!(empty.allowed(Some("https://127.0.0.1:8443")));
        assert!(empty.allowed(Some("file:///Users/me/index.html")));
    }

    #[test]
    fn test_rejections() {
        let guard = guard();
        assert!(!guard.allowed(None));
        assert!(!guard.allowed(Some("")));
        assert!(!guard.allowed(Some("http://evil.com")));
        assert!(!guard.allowed(Some("null")));
        assert!(!guard.allowed(Some("not a url")));
        assert!(!guard.allowed(Some("http://127.0.0.2")));
        assert!(!guard.allowed(Some("http://localhost.evil.com")));
    }

    #[actix_web::test]
    async fn test_gate_blocks_before_handler() {
        let app = actix_test::init_service(
            App::new().service(
                web::scope("/mcp")
                    .wrap(OriginGate::new(guard()))
                    .route("", web::post().to(|| async { HttpResponse::Ok().body("reached") })),
            ),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/mcp")
            .insert_header((ORIGIN, "http://evil.com"))
            .set_payload("{not json")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Origin not allowed");

        let req = actix_test::TestRequest::post().uri("/mcp").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = actix_test::TestRequest::post()
            .uri("/mcp")
            .insert_header((ORIGIN, "https://claude.ai"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, "reached");
    }
}
