//! Inbound request model shared by the Lambda and local-server adapters.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};

use crate::error::ApiError;
use crate::models::ProxyEvent;

/// One HTTP request, independent of how it arrived.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Percent-decoded, non-empty path segments.
    pub fn segments(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match urlencoding::decode(segment) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => segment.to_string(),
            })
            .collect()
    }
}

impl TryFrom<ProxyEvent> for Request {
    type Error = ApiError;

    fn try_from(event: ProxyEvent) -> Result<Self, Self::Error> {
        let method = event
            .method()
            .ok_or_else(|| ApiError::BadRequest("invocation payload has no HTTP method".into()))?;
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ApiError::BadRequest(format!("invalid HTTP method {method:?}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in event.headers.iter().flatten() {
            // malformed headers are dropped rather than failing the request
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }

        Ok(Self {
            method,
            path: event.resource_path(),
            query: event
                .query_string_parameters
                .unwrap_or_default()
                .into_iter()
                .collect(),
            headers,
        })
    }
}
