//! Response DTOs for the document API
//!
//! Defines the structure of outgoing HTTP response bodies and the proxy
//! response envelope handed back to API Gateway.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Stable error name, e.g. `NoDataAvailable`
    pub error: String,
    /// Human readable cause
    pub detail: String,
}

impl ErrorBody {
    /// Creates a new ErrorBody
    pub fn new(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: detail.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" when the function answers)
    pub status: String,
    pub service: String,
    pub stage: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub cache: CacheSnapshot,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(stage: impl Into<String>, cache: CacheSnapshot) -> Self {
        Self {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            stage: stage.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            cache,
        }
    }
}

/// Point-in-time view of the document cache.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub has_document: bool,
    /// Seconds since the entry was last fetched or revalidated
    pub age_secs: Option<u64>,
    pub document_bytes: Option<u64>,
    pub last_updated: Option<String>,
    /// Share of reads served without a storage round trip
    pub hit_rate: f64,
    pub stats: CacheStats,
}

/// Response body for filtered collection queries
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Request path the collection was resolved from
    pub path: String,
    pub count: usize,
    pub results: Vec<QueryMatch>,
    pub last_updated: Option<String>,
}

/// One member of a queried collection.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMatch {
    /// Object key, or array index rendered as a string
    pub id: String,
    pub value: Value,
}

/// Proxy integration response envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}
