//! First-segment host resolution against the upstream allow-list.

/// Service name the Firestore WebChannel transport prefixes its paths with.
pub const FIRESTORE_SERVICE: &str = "google.firestore.v1.Firestore";

/// Resolved upstream target for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    /// Vetted upstream hostname.
    pub host: String,
    /// Path to forward, always starting with `/`.
    pub path: String,
}

/// Why a path could not be resolved.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("no target host specified in path")]
    NoTarget,
    #[error("unsupported host {0:?}")]
    UnsupportedHost(String),
}

/// Maps a request path's first segment to a vetted upstream hostname.
#[derive(Debug, Clone)]
pub struct HostResolver {
    allowed_hosts: Vec<String>,
    firestore_host: String,
}

impl HostResolver {
    pub fn new(allowed_hosts: Vec<String>, firestore_host: impl Into<String>) -> Self {
        Self {
            allowed_hosts,
            firestore_host: firestore_host.into(),
        }
    }

    /// Resolve a request path to an upstream target.
    ///
    /// The first non-empty segment is the candidate host. Firestore's
    /// WebChannel paths are host-prefixed by convention, so that service
    /// name rewrites to the document-sync host while keeping the entire
    /// original path.
    pub fn resolve(&self, path: &str) -> Result<ForwardTarget, ResolveError> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let candidate = segments.next().ok_or(ResolveError::NoTarget)?;

        if candidate == FIRESTORE_SERVICE {
            return Ok(ForwardTarget {
                host: self.firestore_host.clone(),
                path: path.to_string(),
            });
        }

        if !self.allowed_hosts.iter().any(|h| h == candidate) {
            return Err(ResolveError::UnsupportedHost(candidate.to_string()));
        }

        let remainder: Vec<&str> = segments.collect();
        Ok(ForwardTarget {
            host: candidate.to_string(),
            path: format!("/{}", remainder.join("/")),
        })
    }

    /// Configured hosts, for rejection diagnostics and the health endpoint.
    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }
}
