//! CORS origin policy.
//!
//! # Responsibilities
//! - Decide which `Access-Control-Allow-Origin` value a request receives
//! - Emit the fixed CORS grant headers (methods, headers, credentials)
//!
//! # Design Decisions
//! - An origin on the allow-list is echoed back verbatim
//! - Any other origin (or no origin) receives the first allow-list entry;
//!   this is a convenience default, NOT an authorization boundary
//! - Pure: same inputs always produce the same header set

use axum::http::{header, HeaderMap, HeaderValue};

/// Methods granted to browser callers.
const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";

/// Request headers granted to browser callers. Covers the common set plus
/// the vendor headers the Firebase client libraries send.
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Requested-With, \
    X-HTTP-Method-Override, X-Client-Version, X-Client-Data, \
    X-Goog-Api-Key, X-Goog-Api-Client, X-Goog-AuthUser, X-Goog-Request-Params, \
    X-Firebase-AppCheck, X-Firebase-GMPID, X-Firebase-Client, \
    X-Firebase-Client-Log-Type, X-Firebase-Locale, X-Goog-Spatula";

/// Response headers exposed to browser callers.
const EXPOSED_HEADERS: &str = "Content-Encoding, X-HTTP-Session-Id, X-Goog-Trace";

/// Decides CORS response headers from a static origin allow-list.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed_origins: Vec<String>,
}

impl OriginPolicy {
    /// Create a policy. The first origin doubles as the fallback grant.
    ///
    /// Panics on an empty list: there would be no default to grant.
    pub fn new(allowed_origins: Vec<String>) -> Self {
        assert!(
            !allowed_origins.is_empty(),
            "origin allow-list must not be empty"
        );
        Self { allowed_origins }
    }

    /// The origin value granted to a request declaring `origin`.
    pub fn granted_origin<'a>(&'a self, origin: Option<&'a str>) -> &'a str {
        match origin {
            Some(o) if self.allowed_origins.iter().any(|a| a == o) => o,
            _ => &self.allowed_origins[0],
        }
    }

    /// Build the full CORS header set for a request.
    pub fn headers_for(&self, origin: Option<&str>) -> HeaderMap {
        let granted = self.granted_origin(origin);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_str(granted)
                .unwrap_or_else(|_| HeaderValue::from_static("null")),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("3600"),
        );
        headers
    }

    /// Configured origins, for the health endpoint.
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> OriginPolicy {
        OriginPolicy::new(vec![
            "http://localhost:8080".to_string(),
            "https://app.example.com".to_string(),
        ])
    }

    #[test]
    fn allowed_origin_is_echoed() {
        let p = policy();
        assert_eq!(
            p.granted_origin(Some("https://app.example.com")),
            "https://app.example.com"
        );
    }

    #[test]
    fn unknown_origin_gets_default() {
        let p = policy();
        assert_eq!(
            p.granted_origin(Some("https://evil.example")),
            "http://localhost:8080"
        );
        assert_eq!(p.granted_origin(None), "http://localhost:8080");
    }

    #[test]
    fn echoed_origin_can_outlive_the_request_string() {
        // The grant borrows from whichever input lives longer; an echoed
        // origin must compile when the declared origin is short-lived.
        let p = policy();
        let origin = String::from("https://app.example.com");
        let granted = p.granted_origin(Some(origin.as_str()));
        assert_eq!(granted, "https://app.example.com");
    }

    #[test]
    #[should_panic(expected = "origin allow-list must not be empty")]
    fn empty_allow_list_is_rejected_at_construction() {
        OriginPolicy::new(Vec::new());
    }

    #[test]
    fn header_set_is_complete() {
        let headers = policy().headers_for(Some("https://evil.example"));
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:8080"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
        assert!(headers.contains_key(header::ACCESS_CONTROL_MAX_AGE));
    }
}
