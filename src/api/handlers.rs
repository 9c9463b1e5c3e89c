//! API Handlers
//!
//! Turns a resolved route into a response, reading through the document
//! cache for everything except preflight and health.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use tracing::{debug, warn};

use super::cors::CorsPolicy;
use super::request::Request;
use super::response::{http_date, Response, X_CACHE};
use super::routes::{resolve, Route};
use crate::cache::{CacheRead, DocumentCache};
use crate::error::{ApiError, Result};
use crate::models::{HealthResponse, QueryResponse};

/// Shared request dispatcher.
///
/// Holds the process-wide document cache; cloning is cheap and every clone
/// reads through the same cache.
#[derive(Clone)]
pub struct Dispatcher {
    cache: Arc<DocumentCache>,
    cors: CorsPolicy,
    stage: String,
    response_max_age: u64,
}

impl Dispatcher {
    pub fn new(
        cache: Arc<DocumentCache>,
        cors: CorsPolicy,
        stage: impl Into<String>,
        response_max_age: u64,
    ) -> Self {
        Self {
            cache,
            cors,
            stage: stage.into(),
            response_max_age,
        }
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    // == Route ==
    /// Answers one request. Never fails: errors become `{error, detail}` bodies.
    pub async fn route(&self, request: &Request) -> Response {
        let response = match self.try_route(request).await {
            Ok(response) => response,
            Err(err) => {
                if err.status().is_server_error() {
                    warn!(path = %request.path, error = %err, "request failed");
                } else {
                    debug!(path = %request.path, error = %err, "request rejected");
                }
                err.into_response(&self.cors)
            }
        };

        if request.method == Method::HEAD {
            response.without_body()
        } else {
            response
        }
    }

    async fn try_route(&self, request: &Request) -> Result<Response> {
        match resolve(request)? {
            Route::Preflight => Ok(self.preflight()),
            Route::Health => Ok(self.health().await),
            Route::Document => {
                let read = self.cache.get_or_refresh().await?;
                let body = read.document().body().clone();
                Ok(self.document_response(&read, body))
            }
            Route::Select { pointer } => {
                let read = self.cache.get_or_refresh().await?;
                let value = read
                    .document()
                    .value()
                    .pointer(&pointer)
                    .ok_or_else(|| not_found(request))?;
                let body = serde_json::to_vec(value)
                    .map_err(|e| ApiError::Internal(format!("encoding sub-document: {e}")))?;
                Ok(self.document_response(&read, Bytes::from(body)))
            }
            Route::Query { pointer, filter } => {
                let read = self.cache.get_or_refresh().await?;
                let collection = read
                    .document()
                    .value()
                    .pointer(&pointer)
                    .ok_or_else(|| not_found(request))?;
                let results = filter.apply(collection).ok_or_else(|| {
                    ApiError::BadRequest(format!(
                        "{} is not a collection and cannot be filtered",
                        request.path
                    ))
                })?;

                let body = QueryResponse {
                    path: request.path.clone(),
                    count: results.len(),
                    results,
                    last_updated: last_updated(&read).map(|at| at.to_rfc3339()),
                };
                let encoded = serde_json::to_vec(&body)
                    .map_err(|e| ApiError::Internal(format!("encoding query result: {e}")))?;
                Ok(self.document_response(&read, Bytes::from(encoded)))
            }
        }
    }

    fn preflight(&self) -> Response {
        let mut response = Response::new(StatusCode::NO_CONTENT);
        self.cors.apply_preflight(&mut response.headers);
        response
    }

    async fn health(&self) -> Response {
        let body = HealthResponse::healthy(self.stage.clone(), self.cache.snapshot().await);
        let mut response = Response::json(StatusCode::OK, &body);
        response
            .headers
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        self.cors.apply(&mut response.headers);
        response
    }

    /// 200 with cache provenance headers.
    fn document_response(&self, read: &CacheRead, body: Bytes) -> Response {
        let mut response = Response::raw_json(StatusCode::OK, body);
        let headers = &mut response.headers;

        let cache_control = if read.status.is_stale() {
            HeaderValue::from_static("no-cache")
        } else {
            HeaderValue::from_str(&format!("public, max-age={}", self.response_max_age))
                .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
        };
        headers.insert(header::CACHE_CONTROL, cache_control);
        headers.insert(X_CACHE, HeaderValue::from_static(read.status.label()));

        if let Some(value) = last_updated(read).and_then(|at| HeaderValue::from_str(&http_date(at)).ok()) {
            headers.insert(header::LAST_MODIFIED, value);
        }
        if read.status.is_stale() {
            headers.insert(
                header::WARNING,
                HeaderValue::from_static("110 - \"Response is Stale\""),
            );
        }

        self.cors.apply(headers);
        response
    }
}

fn last_updated(read: &CacheRead) -> Option<chrono::DateTime<chrono::Utc>> {
    read.document().metadata().last_modified
}

fn not_found(request: &Request) -> ApiError {
    ApiError::NotFound(format!("no resource at {}", request.path))
}
