//! WebChannel request classification.
//!
//! The Firestore real-time transport multiplexes a bidirectional channel
//! over plain HTTP calls. A channel call is recognized purely from its URL:
//! the path carries a `channel` marker segment under the `Write` or `Listen`
//! sub-operation, and the query string carries the session-correlating
//! parameters.

use std::collections::HashMap;

use axum::http::{HeaderMap, Uri};

/// Path segment marking a channel-protocol call.
const CHANNEL_MARKER: &str = "channel";

/// Query parameters the protocol uses for session correlation and framing.
/// Captured verbatim for diagnostics.
const CHANNEL_PARAMS: [&str; 10] = [
    "SID", "gsessionid", "RID", "AID", "CI", "TYPE", "VER", "t", "OSID", "OAID",
];

/// Channel sub-operation, derived from the URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOperation {
    Write,
    Listen,
    Unknown,
}

impl ChannelOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelOperation::Write => "Write",
            ChannelOperation::Listen => "Listen",
            ChannelOperation::Unknown => "Unknown",
        }
    }
}

/// Classification result for one inbound request. Always produced.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    /// Whether this is a channel-protocol call.
    pub is_webchannel: bool,
    /// Write or Listen stream; Unknown for non-channel requests.
    pub operation: ChannelOperation,
    /// Session key, by priority SID > gsessionid > RID.
    pub session_id: Option<String>,
    /// The raw `SID` parameter; only its presence creates registry entries.
    pub sid: Option<String>,
    /// All protocol query parameters present on the request.
    pub parameters: HashMap<String, String>,
    /// Vendor headers (goog / firebase / spatula), for diagnostics.
    pub diagnostic_headers: HashMap<String, String>,
}

impl ChannelInfo {
    fn none() -> Self {
        Self {
            is_webchannel: false,
            operation: ChannelOperation::Unknown,
            session_id: None,
            sid: None,
            parameters: HashMap::new(),
            diagnostic_headers: HashMap::new(),
        }
    }
}

/// Classify a request. Total: non-channel requests yield an empty tag.
pub fn classify(uri: &Uri, headers: &HeaderMap) -> ChannelInfo {
    let path = uri.path();

    let has_marker = path.split('/').any(|s| s == CHANNEL_MARKER);
    let is_write = path.contains("/Write");
    let is_listen = path.contains("/Listen");

    if !has_marker || !(is_write || is_listen) {
        return ChannelInfo::none();
    }

    let operation = if is_write {
        ChannelOperation::Write
    } else {
        ChannelOperation::Listen
    };

    let mut parameters = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes()) {
        if CHANNEL_PARAMS.contains(&key.as_ref()) {
            parameters.insert(key.into_owned(), value.into_owned());
        }
    }

    // SID wins over gsessionid wins over RID; a request carrying several is
    // keyed by the highest-priority one only, so affinity stays consistent.
    let sid = parameters.get("SID").cloned();
    let session_id = sid
        .clone()
        .or_else(|| parameters.get("gsessionid").cloned())
        .or_else(|| parameters.get("RID").cloned());

    let mut diagnostic_headers = HashMap::new();
    for (name, value) in headers {
        let lower = name.as_str().to_ascii_lowercase();
        if lower.contains("goog") || lower.contains("firebase") || lower.contains("spatula") {
            if let Ok(v) = value.to_str() {
                diagnostic_headers.insert(name.as_str().to_string(), v.to_string());
            }
        }
    }

    ChannelInfo {
        is_webchannel: true,
        operation,
        session_id,
        sid,
        parameters,
        diagnostic_headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn non_channel_request_is_empty() {
        let info = classify(&uri("/v1/projects/p/databases"), &HeaderMap::new());
        assert!(!info.is_webchannel);
        assert_eq!(info.operation, ChannelOperation::Unknown);
        assert!(info.session_id.is_none());
        assert!(info.parameters.is_empty());
    }

    #[test]
    fn channel_marker_alone_is_not_enough() {
        let info = classify(&uri("/foo/channel?SID=abc"), &HeaderMap::new());
        assert!(!info.is_webchannel);
    }

    #[test]
    fn write_channel_detected() {
        let info = classify(
            &uri("/google.firestore.v1.Firestore/Write/channel?SID=s1&RID=5&VER=8"),
            &HeaderMap::new(),
        );
        assert!(info.is_webchannel);
        assert_eq!(info.operation, ChannelOperation::Write);
        assert_eq!(info.session_id.as_deref(), Some("s1"));
        assert_eq!(info.parameters.get("VER").map(String::as_str), Some("8"));
    }

    #[test]
    fn listen_channel_detected() {
        let info = classify(
            &uri("/google.firestore.v1.Firestore/Listen/channel?gsessionid=g1&TYPE=xmlhttp"),
            &HeaderMap::new(),
        );
        assert!(info.is_webchannel);
        assert_eq!(info.operation, ChannelOperation::Listen);
        assert_eq!(info.session_id.as_deref(), Some("g1"));
        assert!(info.sid.is_none());
    }

    #[test]
    fn sid_wins_over_gsessionid_and_rid() {
        let info = classify(
            &uri("/google.firestore.v1.Firestore/Write/channel?RID=r1&gsessionid=g1&SID=s1"),
            &HeaderMap::new(),
        );
        assert_eq!(info.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn rid_is_last_resort() {
        let info = classify(
            &uri("/google.firestore.v1.Firestore/Write/channel?RID=r1"),
            &HeaderMap::new(),
        );
        assert_eq!(info.session_id.as_deref(), Some("r1"));
        assert!(info.sid.is_none());
    }

    #[test]
    fn vendor_headers_collected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_static("k"));
        headers.insert("x-firebase-gmpid", HeaderValue::from_static("app"));
        headers.insert("x-goog-spatula", HeaderValue::from_static("sp"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));

        let info = classify(
            &uri("/google.firestore.v1.Firestore/Listen/channel?SID=s"),
            &headers,
        );
        assert_eq!(info.diagnostic_headers.len(), 3);
        assert!(info.diagnostic_headers.contains_key("x-goog-api-key"));
        assert!(!info.diagnostic_headers.contains_key("content-type"));
    }
}
