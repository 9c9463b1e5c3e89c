//! CORS headers attached to every response.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::error::ConfigError;

/// Methods the API answers; sent as CORS `Allow-Methods` and as `Allow` on 405.
pub(crate) const ALLOW_METHODS: &str = "GET,HEAD,OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Cross-origin policy applied by the dispatcher.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
}

impl CorsPolicy {
    pub fn new(allow_origin: &str) -> Result<Self, ConfigError> {
        let allow_origin =
            HeaderValue::from_str(allow_origin).map_err(|e| ConfigError::Invalid {
                name: "CORS_ALLOW_ORIGIN",
                reason: e.to_string(),
            })?;
        Ok(Self { allow_origin })
    }

    /// Adds the headers every response carries.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            self.allow_origin.clone(),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
    }

    /// Adds the common headers plus the preflight cache lifetime.
    pub fn apply_preflight(&self, headers: &mut HeaderMap) {
        self.apply(headers);
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allows_any_origin() {
        let mut headers = HeaderMap::new();
        CorsPolicy::default().apply(&mut headers);

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert!(!headers.contains_key(header::ACCESS_CONTROL_MAX_AGE));
    }

    #[test]
    fn test_preflight_adds_max_age() {
        let mut headers = HeaderMap::new();
        CorsPolicy::new("https://example.edu")
            .unwrap()
            .apply_preflight(&mut headers);

        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://example.edu"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], PREFLIGHT_MAX_AGE);
    }

    #[test]
    fn test_rejects_unencodable_origin() {
        assert!(CorsPolicy::new("bad\norigin").is_err());
    }
}
