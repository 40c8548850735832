//! Upstream failure translation.
//!
//! # Responsibilities
//! - Detect "session lost" in channel error bodies and purge the registry
//! - Preserve raw upstream framing for other channel errors
//! - Convert transport-level failures into a structured 502 envelope
//!
//! All error responses carry the CORS header set so the browser can read
//! them.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use serde_json::json;

use crate::webchannel::{ChannelInfo, SessionRegistry};

/// Marker the upstream embeds in a 400 body when it no longer recognizes
/// the session identifier.
pub const SESSION_LOST_MARKER: &str = "Unknown SID";

const DOCS_REF: &str = "https://firebase.google.com/docs/firestore/use-rest-api";

/// Milliseconds since the epoch, for response envelopes.
pub fn unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Diagnostic view of a classification, embedded in error envelopes.
pub fn channel_debug(channel: &ChannelInfo) -> serde_json::Value {
    json!({
        "isWebChannel": channel.is_webchannel,
        "operation": channel.operation.as_str(),
        "sessionId": channel.session_id,
        "parameters": channel.parameters,
        "diagnosticHeaders": channel.diagnostic_headers,
    })
}

fn json_response(status: StatusCode, cors: &HeaderMap, body: serde_json::Value) -> Response {
    let mut builder = Response::builder()
        .status(status)
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

/// Translate a buffered channel error response.
///
/// An upstream 400 whose body names an unknown session is a session loss:
/// the registry entry is purged and the client is told to reinitialize
/// rather than retry the same session. Every other status passes through
/// with the raw upstream body, preserving the framing the client-side
/// channel library expects.
///
/// `headers` is the already-merged response header set (upstream headers,
/// CORS winning on conflict, channel cache overrides, re-propagated vendor
/// diagnostics); both branches carry it so upstream headers survive the
/// error path.
pub fn translate_channel_error(
    status: StatusCode,
    body: Bytes,
    channel: &ChannelInfo,
    registry: &SessionRegistry,
    headers: &HeaderMap,
) -> Response {
    let text = String::from_utf8_lossy(&body);

    if status == StatusCode::BAD_REQUEST && text.contains(SESSION_LOST_MARKER) {
        let session_id = channel.session_id.clone().unwrap_or_default();
        if !session_id.is_empty() {
            registry.remove(&session_id);
        }
        tracing::warn!(session_id = %session_id, "Upstream lost WebChannel session");

        let payload = json!({
            "error": "WebChannel_Session_Lost",
            "sessionId": session_id,
            "message": "The upstream no longer recognizes this WebChannel session. \
                Reinitialize the connection instead of retrying.",
            "timestamp": unix_timestamp_ms(),
        });
        let mut response = json_response(StatusCode::BAD_REQUEST, headers, payload);
        // The upstream body was replaced; its length and framing no longer
        // apply.
        response.headers_mut().remove(header::CONTENT_LENGTH);
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        return response;
    }

    tracing::debug!(status = %status, "Passing through channel error body");
    let mut builder = Response::builder().status(status);
    if let Some(response_headers) = builder.headers_mut() {
        *response_headers = headers.clone();
    }
    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Convert a transport-level failure (timeout, DNS, reset) into a 502
/// envelope with enough context to diagnose the attempted call.
pub fn transport_error(
    error: &reqwest::Error,
    target_url: &str,
    channel: &ChannelInfo,
    cors: &HeaderMap,
) -> Response {
    tracing::error!(error = %error, target_url, "Upstream call failed");

    json_response(
        StatusCode::BAD_GATEWAY,
        cors,
        json!({
            "error": "Bad Gateway",
            "message": error.to_string(),
            "targetUrl": target_url,
            "webChannelDebug": channel_debug(channel),
            "timestamp": unix_timestamp_ms(),
            "officialDocsRef": DOCS_REF,
        }),
    )
}

/// 400 for paths whose first segment is not on the allow-list. The body
/// enumerates the configured hosts so a misconfigured client can see what
/// would have been accepted.
pub fn unsupported_host(
    parsed_host: &str,
    original_path: &str,
    allowed_hosts: &[String],
    cors: &HeaderMap,
) -> Response {
    json_response(
        StatusCode::BAD_REQUEST,
        cors,
        json!({
            "error": format!("Unsupported host: {parsed_host}"),
            "supportedHosts": allowed_hosts,
            "originalPath": original_path,
            "parsedHost": parsed_host,
        }),
    )
}

/// 400 for a path with no segments at all.
pub fn no_target(cors: &HeaderMap) -> Response {
    json_response(
        StatusCode::BAD_REQUEST,
        cors,
        json!({
            "error": "No target host specified",
            "usage": "Request paths must look like /{upstream-host}/{path}, \
                e.g. /firestore.googleapis.com/v1/projects/...",
        }),
    )
}
