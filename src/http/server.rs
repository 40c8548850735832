//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Answer CORS preflights and the health endpoint locally
//! - Resolve the upstream host, classify channel calls, track sessions
//! - Bound upstream concurrency before forwarding
//! - Stream upstream responses back, translating failures

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::admission::AdmissionController;
use crate::config::ProxyConfig;
use crate::cors::OriginPolicy;
use crate::http::error;
use crate::http::forward::{self, ForwardDescriptor};
use crate::routing::{HostResolver, ResolveError};
use crate::webchannel::{classify, SessionRegistry};

/// Vendor diagnostic header re-propagated on channel responses.
static SESSION_ID_HEADER: HeaderName = HeaderName::from_static("x-http-session-id");

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub policy: Arc<OriginPolicy>,
    pub resolver: Arc<HostResolver>,
    pub registry: Arc<SessionRegistry>,
    pub admission: Arc<AdmissionController>,
    pub client: reqwest::Client,
}

/// HTTP server for the edge proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// All mutable state (session registry, admission counters) is owned
    /// here, so each instance is fully isolated.
    pub fn new(config: ProxyConfig) -> Self {
        let state = AppState {
            policy: Arc::new(OriginPolicy::new(config.cors.allowed_origins.clone())),
            resolver: Arc::new(HostResolver::new(
                config.upstream.allowed_hosts.clone(),
                config.upstream.firestore_host.clone(),
            )),
            registry: Arc::new(SessionRegistry::new(Duration::from_millis(
                config.session.ttl_ms,
            ))),
            admission: Arc::new(AdmissionController::new(config.upstream.max_concurrent)),
            client: reqwest::Client::new(),
            config: Arc::new(config.clone()),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for in-process testing without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler. Every request flows through here; the router has no
/// other routes.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    // The proxy holds no timers, so the per-request sweep is the only
    // periodic eviction trigger the registry gets.
    state.registry.cleanup_expired();

    let (parts, body) = request.into_parts();
    let origin = parts
        .headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let cors = state.policy.headers_for(origin.as_deref());
    let path = parts.uri.path().to_string();

    if parts.method == Method::OPTIONS {
        return preflight(&cors);
    }
    if parts.method == Method::GET && (path == "/" || path == "/health") {
        return health(&state, origin.as_deref(), &cors);
    }

    let target = match state.resolver.resolve(&path) {
        Ok(t) => t,
        Err(ResolveError::NoTarget) => return error::no_target(&cors),
        Err(ResolveError::UnsupportedHost(host)) => {
            tracing::warn!(host = %host, path = %path, "Rejected unsupported host");
            return error::unsupported_host(&host, &path, state.resolver.allowed_hosts(), &cors);
        }
    };

    let channel = classify(&parts.uri, &parts.headers);
    if channel.is_webchannel {
        if let Some(session_id) = &channel.session_id {
            match state.registry.get(session_id) {
                Some(_) => {
                    tracing::debug!(session_id = %session_id, "Known WebChannel session");
                }
                // Only a SID-bearing request opens a session; gsessionid and
                // RID keys correlate but never create.
                None if channel.sid.is_some() => {
                    state.registry.store(
                        session_id,
                        channel.operation,
                        channel.parameters.clone(),
                    );
                    tracing::info!(
                        session_id = %session_id,
                        operation = channel.operation.as_str(),
                        "Tracking new WebChannel session"
                    );
                }
                None => {}
            }
        }
    }

    let descriptor = ForwardDescriptor {
        host: target.host,
        path: target.path,
        query: parts.uri.query().map(str::to_string),
        timeout: forward::select_timeout(&channel, &state.config.upstream),
        channel,
    };

    // Slot released when the permit drops, on success and every error path.
    let _permit = state.admission.acquire().await;

    let scheme = state.config.upstream.scheme.as_str();
    let target_url = descriptor.target_url(scheme);
    match forward::send(
        &state.client,
        scheme,
        parts.method.clone(),
        &descriptor,
        &parts.headers,
        body,
    )
    .await
    {
        Ok(upstream) => relay_response(&state, upstream, &descriptor, &target_url, &cors).await,
        Err(e) => error::transport_error(&e, &target_url, &descriptor.channel, &cors),
    }
}

/// 204 with CORS headers only; preflights never reach the upstream.
fn preflight(cors: &HeaderMap) -> Response {
    let mut builder = Response::builder().status(StatusCode::NO_CONTENT);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in cors {
            headers.insert(name.clone(), value.clone());
        }
    }
    builder
        .body(Body::empty())
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Status document for `GET /` and `GET /health`.
fn health(state: &AppState, origin: Option<&str>, cors: &HeaderMap) -> Response {
    let body = json!({
        "status": "ok",
        "service": "firebase-edge-proxy",
        "timestamp": error::unix_timestamp_ms(),
        "message": "Edge proxy for Firebase upstreams with WebChannel session tracking",
        "webChannelStats": {
            "activeSessions": state.registry.active_count(),
            "sessionIds": state.registry.session_ids(),
        },
        "connectionStats": {
            "active": state.admission.active(),
            "max": state.admission.max(),
            "pending": state.admission.pending(),
        },
        "corsTest": {
            "requestOrigin": origin,
            "grantedOrigin": state.policy.granted_origin(origin),
            "allowedOrigins": state.policy.allowed_origins(),
            "allowCredentials": true,
        },
    });

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in cors {
            headers.insert(name.clone(), value.clone());
        }
    }
    builder
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Relay an upstream response: merge headers (CORS wins), apply the
/// channel cache overrides, and either stream the body through or buffer
/// it for error translation.
async fn relay_response(
    state: &AppState,
    upstream: reqwest::Response,
    descriptor: &ForwardDescriptor,
    target_url: &str,
    cors: &HeaderMap,
) -> Response {
    let status = upstream.status();
    let channel = &descriptor.channel;

    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if name == header::TRANSFER_ENCODING || name == header::CONNECTION {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    for (name, value) in cors {
        headers.insert(name.clone(), value.clone());
    }

    if channel.is_webchannel {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
        if let Some(value) = upstream.headers().get(&SESSION_ID_HEADER) {
            headers.insert(SESSION_ID_HEADER.clone(), value.clone());
        }
    }

    if channel.is_webchannel && (status.is_client_error() || status.is_server_error()) {
        // Buffered, not streamed: the translator needs to inspect the body.
        // The merged header set (upstream + CORS + cache overrides) rides
        // along so upstream headers survive the error path.
        let body = match upstream.bytes().await {
            Ok(b) => b,
            Err(e) => return error::transport_error(&e, target_url, channel, cors),
        };
        return error::translate_channel_error(status, body, channel, &state.registry, &headers);
    }

    let mut builder = Response::builder().status(status);
    if let Some(h) = builder.headers_mut() {
        *h = headers;
    }
    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
    }
    tracing::info!("Shutdown signal received");
}
