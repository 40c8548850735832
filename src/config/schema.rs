//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream host allow-list and forwarding settings.
    pub upstream: UpstreamConfig,

    /// CORS origin allow-list.
    pub cors: CorsConfig,

    /// WebChannel session tracking settings.
    pub session: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Hostnames the proxy is willing to forward to. The first path segment
    /// of an inbound request must match one of these exactly.
    pub allowed_hosts: Vec<String>,

    /// Host that `google.firestore.v1.Firestore/...` paths are rewritten to.
    pub firestore_host: String,

    /// Scheme used for outbound calls ("https" in production; "http" lets
    /// tests point at a local mock upstream).
    pub scheme: String,

    /// Maximum concurrent upstream connections (platform connection ceiling).
    pub max_concurrent: usize,

    /// Timeout for WebChannel long-poll calls in milliseconds.
    pub channel_timeout_ms: u64,

    /// Timeout for all other upstream calls in milliseconds.
    pub default_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: vec![
                "identitytoolkit.googleapis.com".to_string(),
                "securetoken.googleapis.com".to_string(),
                "firestore.googleapis.com".to_string(),
                "firebasestorage.googleapis.com".to_string(),
                "www.googleapis.com".to_string(),
                "generativelanguage.googleapis.com".to_string(),
                "firebase.googleapis.com".to_string(),
                "fcm.googleapis.com".to_string(),
                "storage.googleapis.com".to_string(),
                "cloudfunctions.googleapis.com".to_string(),
            ],
            firestore_host: "firestore.googleapis.com".to_string(),
            scheme: "https".to_string(),
            max_concurrent: 5,
            channel_timeout_ms: 120_000,
            default_timeout_ms: 30_000,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Browser origins allowed to call the proxy. An origin not on this
    /// list is granted the first entry as a convenience default.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:8080".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

/// WebChannel session tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session time-to-live in milliseconds, measured from creation.
    /// The window is fixed; lookups touch `last_used_at` but never renew it.
    pub ttl_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_ms: 30 * 60 * 1000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
