//! Execution entry point.
//!
//! `Function` is built once per execution environment and reused for every
//! invocation, so the document cache survives across warm requests.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::Method;
use futures_util::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{CorsPolicy, Dispatcher, Request, Response};
use crate::cache::DocumentCache;
use crate::config::Config;
use crate::error::{ApiError, ConfigError};
use crate::models::ProxyEvent;
use crate::storage::{Fetcher, ObjectStore};

/// Raw-event handler with a per-request budget.
#[derive(Clone)]
pub struct Function {
    dispatcher: Dispatcher,
    budget: Duration,
}

impl Function {
    /// Wires fetcher, cache and dispatcher from `config`.
    pub fn new(config: &Config, store: Arc<dyn ObjectStore>) -> Result<Self, ConfigError> {
        let fetcher = Fetcher::new(store, config.location(), config.retry_policy());
        let cache = Arc::new(DocumentCache::new(fetcher, config.cache_max_age));
        let dispatcher = Dispatcher::new(
            cache,
            config.cors()?,
            config.stage.clone(),
            config.response_max_age,
        );

        Ok(Self {
            dispatcher,
            budget: config.function_timeout,
        })
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        self.dispatcher.cache()
    }

    pub fn cors(&self) -> &CorsPolicy {
        self.dispatcher.cors()
    }

    // == Handle ==
    /// Answers a raw proxy event with a raw proxy response.
    pub async fn handle(&self, event: Value) -> Value {
        self.handle_within(event, self.budget).await
    }

    /// Like [`Function::handle`] with an explicit budget.
    pub async fn handle_within(&self, event: Value, budget: Duration) -> Value {
        let request = serde_json::from_value::<ProxyEvent>(event)
            .map_err(|e| ApiError::BadRequest(format!("unrecognized invocation payload: {e}")))
            .and_then(|event| {
                if let Some(id) = event.request_id() {
                    debug!(request_id = id, "proxy event decoded");
                }
                Request::try_from(event)
            });

        let response = match request {
            Ok(request) => self.dispatch_within(request, budget).await,
            Err(err) => {
                warn!(error = %err, "rejecting invocation");
                err.into_response(self.cors())
            }
        };

        match serde_json::to_value(response.into_proxy()) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "failed to encode proxy response");
                json!({
                    "statusCode": 500,
                    "headers": {"content-type": "application/json"},
                    "body": r#"{"error":"InternalError","detail":"failed to encode response"}"#,
                    "isBase64Encoded": false
                })
            }
        }
    }

    // == Dispatch ==
    /// Routes a decoded request under the configured budget.
    pub async fn dispatch(&self, request: Request) -> Response {
        self.dispatch_within(request, self.budget).await
    }

    /// Routes a decoded request, answering 504 once `budget` elapses and 500
    /// if the handler panics.
    #[instrument(name = "request", skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn dispatch_within(&self, request: Request, budget: Duration) -> Response {
        let started = Instant::now();
        let routed = AssertUnwindSafe(self.dispatcher.route(&request)).catch_unwind();

        let response = match tokio::time::timeout(budget, routed).await {
            Ok(Ok(response)) => response,
            Ok(Err(panic)) => {
                let cause = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(cause = %cause, "request handler panicked");
                ApiError::Internal("request handler failed".into())
                    .into_response(self.cors())
            }
            Err(_) => {
                warn!(budget_ms = budget.as_millis() as u64, "request budget exceeded");
                ApiError::Timeout(budget).into_response(self.cors())
            }
        };

        info!(
            status = response.status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request complete"
        );

        if request.method == Method::HEAD {
            response.without_body()
        } else {
            response
        }
    }
}
