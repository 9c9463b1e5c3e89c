//! Error types for the document API
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use thiserror::Error;

use crate::api::{CorsPolicy, Response};
use crate::models::ErrorBody;

// == Storage Error Enum ==
/// Failure reported by the object store.
///
/// Cloneable so a single refresh result can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The bucket or key does not exist
    #[error("NotFound: {0}")]
    NotFound(String),

    /// The caller lacks read permission
    #[error("AccessDenied: {0}")]
    AccessDenied(String),

    /// Network or service fault, safe to retry
    #[error("TransientError: {0}")]
    Transient(String),

    /// The object is not a valid JSON document
    #[error("Malformed: {0}")]
    Malformed(String),
}

impl StorageError {
    /// Returns true if the operation may succeed when attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

// == Cache Error Enum ==
/// Failure reported by the document cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Nothing cached yet and the refresh failed
    #[error("no cached document and refresh failed: {0}")]
    NoDataAvailable(StorageError),
}

// == Config Error Enum ==
/// Invalid or missing configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is present but unusable
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// == Api Error Enum ==
/// Error surfaced to HTTP callers as a structured JSON body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No logical resource at the requested path
    #[error("{0}")]
    NotFound(String),

    /// Request could not be interpreted
    #[error("{0}")]
    BadRequest(String),

    /// Method not supported on the matched resource
    #[error("method {method} not allowed, expected one of {allow}")]
    MethodNotAllowed { method: String, allow: &'static str },

    /// Cache empty and storage unavailable
    #[error("{0}")]
    NoDataAvailable(StorageError),

    /// Invocation exceeded its budget
    #[error("request exceeded its {}ms budget", .0.as_millis())]
    Timeout(Duration),

    /// Unexpected fault inside request handling
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NoDataAvailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error name.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::MethodNotAllowed { .. } => "MethodNotAllowed",
            ApiError::NoDataAvailable(_) => "NoDataAvailable",
            ApiError::Timeout(_) => "Timeout",
            ApiError::Internal(_) => "InternalError",
        }
    }

    // == Into Response ==
    /// Renders the error as `{error, detail}` with CORS headers attached.
    pub fn into_response(self, cors: &CorsPolicy) -> Response {
        let body = ErrorBody::new(self.code(), self.to_string());
        let mut response = Response::json(self.status(), &body);

        response
            .headers
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        if let ApiError::MethodNotAllowed { allow, .. } = &self {
            response
                .headers
                .insert(header::ALLOW, HeaderValue::from_static(*allow));
        }

        cors.apply(&mut response.headers);
        response
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NoDataAvailable(cause) => ApiError::NoDataAvailable(cause),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for request handling.
pub type Result<T> = std::result::Result<T, ApiError>;
