//! Outbound response model and its two wire renderings.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::ProxyResponse;

pub(crate) const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Status, headers and body of one reply.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Empty-bodied response.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Serializes `body` as JSON.
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => Self::raw_json(status, Bytes::from(bytes)),
            Err(e) => Self::raw_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from(format!(
                    r#"{{"error":"InternalError","detail":"response serialization failed: {}"}}"#,
                    e.to_string().replace('"', "'")
                )),
            ),
        }
    }

    /// Wraps bytes that are already JSON.
    pub fn raw_json(status: StatusCode, body: Bytes) -> Self {
        let mut response = Self::new(status);
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response.body = body;
        response
    }

    /// Header value as text, if present and printable.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Same status and headers, no body (HEAD).
    pub fn without_body(mut self) -> Self {
        self.body = Bytes::new();
        self
    }

    // == Proxy Rendering ==
    /// API Gateway proxy integration envelope.
    pub fn into_proxy(self) -> ProxyResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        ProxyResponse {
            status_code: self.status.as_u16(),
            headers,
            body: String::from_utf8_lossy(&self.body).into_owned(),
            is_base64_encoded: false,
        }
    }

    // == Http Rendering ==
    /// Response for the local axum server.
    pub fn into_http(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(axum::body::Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        self.into_http()
    }
}

/// IMF-fixdate rendering for `Last-Modified`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
