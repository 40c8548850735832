//! Outbound request construction and upstream dispatch.
//!
//! # Responsibilities
//! - Build the outbound URL from the resolved target
//! - Copy inbound headers, minus hop-by-hop, plus protocol overrides
//! - Apply the differentiated timeout (long-poll vs ordinary calls)
//! - Issue the call and hand the response back for translation/streaming

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method};

use crate::config::UpstreamConfig;
use crate::webchannel::ChannelInfo;

/// Everything needed to issue one upstream call. Request-scoped, never
/// persisted.
#[derive(Debug)]
pub struct ForwardDescriptor {
    pub host: String,
    pub path: String,
    pub query: Option<String>,
    pub timeout: Duration,
    pub channel: ChannelInfo,
}

impl ForwardDescriptor {
    /// Full outbound URL. The query string passes through unmodified.
    pub fn target_url(&self, scheme: &str) -> String {
        match &self.query {
            Some(q) => format!("{scheme}://{}{}?{q}", self.host, self.path),
            None => format!("{scheme}://{}{}", self.host, self.path),
        }
    }
}

/// The outbound timeout for one call. Channel long-polls park on the
/// upstream for most of their budget, so they get the materially longer
/// one; everything else is an ordinary request/response exchange.
pub fn select_timeout(channel: &ChannelInfo, upstream: &UpstreamConfig) -> Duration {
    if channel.is_webchannel {
        Duration::from_millis(upstream.channel_timeout_ms)
    } else {
        Duration::from_millis(upstream.default_timeout_ms)
    }
}

/// Headers that must not be forwarded verbatim. `Host` is set by the
/// client from the URL; the rest are hop-by-hop.
const SKIPPED_HEADERS: [header::HeaderName; 7] = [
    header::HOST,
    header::CONTENT_LENGTH,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::PROXY_AUTHORIZATION,
];

/// Build the outbound header set from the inbound one.
pub fn outbound_headers(inbound: &HeaderMap, channel: &ChannelInfo) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in inbound {
        if SKIPPED_HEADERS.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    // Upgrade handshakes: some header-copy paths silently drop these, so
    // re-assert them from the inbound request a second time.
    let is_upgrade = inbound
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("upgrade"))
        .unwrap_or(false);
    if is_upgrade {
        for name in [
            header::CONNECTION,
            header::SEC_WEBSOCKET_KEY,
            header::SEC_WEBSOCKET_VERSION,
        ] {
            if let Some(value) = inbound.get(&name) {
                headers.insert(name, value.clone());
            }
        }
    }

    if channel.is_webchannel {
        // Compressed long-poll bodies get buffered by intermediaries and
        // stall the channel; identity keeps chunks flowing.
        headers
            .entry(header::ACCEPT_ENCODING)
            .or_insert(HeaderValue::from_static("identity"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    }

    headers
}

/// Issue the upstream call. The timeout covers the whole outbound
/// exchange and aborts only the outbound side on expiry.
pub async fn send(
    client: &reqwest::Client,
    scheme: &str,
    method: Method,
    descriptor: &ForwardDescriptor,
    inbound_headers: &HeaderMap,
    body: Body,
) -> Result<reqwest::Response, reqwest::Error> {
    let url = descriptor.target_url(scheme);
    let headers = outbound_headers(inbound_headers, &descriptor.channel);

    tracing::debug!(
        method = %method,
        url = %url,
        webchannel = descriptor.channel.is_webchannel,
        timeout_ms = descriptor.timeout.as_millis() as u64,
        "Forwarding to upstream"
    );

    client
        .request(method, &url)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .timeout(descriptor.timeout)
        .send()
        .await
}
