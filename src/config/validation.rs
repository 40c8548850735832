//! Configuration validation.
//!
//! Semantic validation on top of serde's syntactic checks. Returns all
//! validation errors, not just the first, so a bad config can be fixed in
//! one pass.

use crate::config::schema::ProxyConfig;

/// A single validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("upstream.allowed_hosts must not be empty")]
    EmptyAllowedHosts,
    #[error("cors.allowed_origins must not be empty")]
    EmptyAllowedOrigins,
    #[error("upstream.max_concurrent must be greater than zero")]
    ZeroMaxConcurrent,
    #[error("upstream.scheme must be \"http\" or \"https\", got {0:?}")]
    InvalidScheme(String),
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.upstream.allowed_hosts.is_empty() {
        errors.push(ValidationError::EmptyAllowedHosts);
    }
    if config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::EmptyAllowedOrigins);
    }
    if config.upstream.max_concurrent == 0 {
        errors.push(ValidationError::ZeroMaxConcurrent);
    }
    if config.upstream.scheme != "http" && config.upstream.scheme != "https" {
        errors.push(ValidationError::InvalidScheme(config.upstream.scheme.clone()));
    }
    if config.upstream.channel_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream.channel_timeout_ms"));
    }
    if config.upstream.default_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream.default_timeout_ms"));
    }
    if config.session.ttl_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("session.ttl_ms"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.upstream.allowed_hosts.clear();
        config.cors.allowed_origins.clear();
        config.upstream.max_concurrent = 0;
        config.upstream.scheme = "ftp".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn zero_timeouts_rejected() {
        let mut config = ProxyConfig::default();
        config.upstream.channel_timeout_ms = 0;
        config.session.ttl_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
