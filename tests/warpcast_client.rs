use std::net::SocketAddr;
use std::sync::Mutex;

use actix_web::dev::ServerHandle;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};

use warpcast_mcp::client::{Operation, UpstreamClient, UpstreamError, WarpcastClient};
use warpcast_mcp::config::Config;

#[derive(Debug, Clone, PartialEq)]
struct Seen {
    method: String,
    path: String,
    query: String,
    auth: Option<String>,
    body: String,
}

type Log = web::Data<Mutex<Vec<Seen>>>;

async fn record(req: HttpRequest, body: web::Bytes, log: Log) -> HttpResponse {
    log.lock().unwrap().push(Seen {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        query: req.query_string().to_string(),
        auth: req
            .headers()
            .get(AUTHORIZATION)
            .map(|v| v.to_str().unwrap().to_string()),
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    if req.path().ends_with("/broken") {
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok().json(json!({"result": {"path": req.path()}}))
}

/// Starts a recording upstream on an ephemeral port
fn spawn_upstream() -> (SocketAddr, ServerHandle, Log) {
    let log: Log = web::Data::new(Mutex::new(Vec::new()));
    let app_log = log.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_log.clone())
            .default_service(web::to(record))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    (addr, handle, log)
}

fn config_for(addr: SocketAddr) -> Config {
    Config {
        api_base_url: format!("http://{}/v2", addr),
        ..Config::default()
    }
}

#[actix_web::test]
async fn test_request_shapes() {
    let (addr, handle, log) = spawn_upstream();
    let client = WarpcastClient::new(&config_for(addr).with_api_token("secret")).unwrap();

    let payload = client.post_cast("gm").await.unwrap();
    assert_eq!(payload, json!({"result": {"path": "/v2/casts"}}));
    client.user_casts("dwr", 20).await.unwrap();
    client.search_casts("rust lang", 5).await.unwrap();
    client.trending_casts(3).await.unwrap();
    client.all_channels().await.unwrap();
    client.channel("a b").await.unwrap();
    client.channel_casts("memes", 7).await.unwrap();
    client.follow_channel("memes").await.unwrap();
    client.unfollow_channel("memes").await.unwrap();

    let seen = log.lock().unwrap().clone();
    let shapes: Vec<(&str, &str, &str)> = seen
        .iter()
        .map(|s| (s.method.as_str(), s.path.as_str(), s.query.as_str()))
        .collect();
    assert_eq!(
        shapes,
        [
            ("POST", "/v2/casts", ""),
            ("GET", "/v2/users/dwr/casts", "limit=20"),
            ("GET", "/v2/casts/search", "q=rust+lang&limit=5"),
            ("GET", "/v2/casts/trending", "limit=3"),
            ("GET", "/v2/channels", ""),
            ("GET", "/v2/channels/a%20b", ""),
            ("GET", "/v2/channels/memes/casts", "limit=7"),
            ("POST", "/v2/channels/memes/follow", ""),
            ("POST", "/v2/channels/memes/unfollow", ""),
        ]
    );
    assert!(seen.iter().all(|s| s.auth.as_deref() == Some("Bearer secret")));
    let body: Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body, json!({"text": "gm"}));

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_no_token_sends_no_authorization() {
    let (addr, handle, log) = spawn_upstream();
    let client = WarpcastClient::new(&config_for(addr)).unwrap();

    client.all_channels().await.unwrap();
    assert_eq!(log.lock().unwrap()[0].auth, None);

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_http_failure_is_normalized() {
    let (addr, handle, _log) = spawn_upstream();
    let client = WarpcastClient::new(&config_for(addr)).unwrap();

    let payload = client.channel("broken").await.unwrap();
    assert_eq!(
        payload,
        json!({"status": "error", "message": "Could not fetch channel"})
    );

    let propagating = WarpcastClient::new(&config_for(addr).with_propagate_errors(true)).unwrap();
    let err = propagating.channel("broken").await.unwrap_err();
    assert!(matches!(
        err,
        UpstreamError::Request {
            operation: Operation::Channel,
            ..
        }
    ));

    handle.stop(true).await;
}
