//! Shared test fixtures: a mock upstream and a proxy instance wired to it.

use std::net::SocketAddr;

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use firebase_edge_proxy::{HttpServer, ProxyConfig};

/// Start a mock upstream that answers an echo path and the Firestore
/// WebChannel paths. `?SID=lost` triggers the upstream's unknown-session
/// error shape; `?SID=boom` a plain channel failure with vendor headers.
pub async fn start_mock_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/echo", any(|| async { "Hello from upstream" }))
        .route(
            "/echo-error",
            any(|| async { (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable") }),
        )
        .route(
            // Registered under the full service-prefixed path: a proxy that
            // stripped the prefix would 404 here.
            "/google.firestore.v1.Firestore/Listen/channel",
            any(channel_endpoint),
        )
        .route(
            "/google.firestore.v1.Firestore/Write/channel",
            any(channel_endpoint),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn channel_endpoint(uri: Uri) -> Response {
    let query = uri.query().unwrap_or("");
    if query.contains("SID=lost") {
        (StatusCode::BAD_REQUEST, "Error: Unknown SID: lost").into_response()
    } else if query.contains("SID=boom") {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [
                ("x-http-session-id", "sess123"),
                ("content-type", "application/octet-stream"),
            ],
            "channel-crashed",
        )
            .into_response()
    } else {
        (StatusCode::OK, "channel-ok").into_response()
    }
}

/// Start a proxy whose allow-list and Firestore rewrite both point at the
/// mock upstream. Returns the proxy's address.
pub async fn start_proxy(upstream: SocketAddr) -> SocketAddr {
    let upstream_host = upstream.to_string();

    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.allowed_hosts = vec![upstream_host.clone()];
    config.upstream.firestore_host = upstream_host;
    config.upstream.scheme = "http".to_string();
    config.cors.allowed_origins = vec![
        "http://localhost:8080".to_string(),
        "https://app.example.com".to_string(),
    ];

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config);
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    addr
}
