//! Object Fetcher
//!
//! Retrieves the configured object through an `ObjectStore`, retrying
//! transient faults with exponential backoff. Each attempt is time-boxed so
//! a stalled store surfaces as a transient fault.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{ObjectLocation, ObjectMetadata, ObjectStore, RemoteDocument};
use crate::error::StorageError;

// == Retry Policy ==
/// Bounded exponential backoff for transient storage faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Limit on a single store call
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// A policy that attempts exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(2),
        }
    }
}

// == Fetcher ==
/// Reads one fixed object from a store.
#[derive(Clone)]
pub struct Fetcher {
    store: Arc<dyn ObjectStore>,
    location: ObjectLocation,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(store: Arc<dyn ObjectStore>, location: ObjectLocation, retry: RetryPolicy) -> Self {
        Self {
            store,
            location,
            retry,
        }
    }

    pub fn location(&self) -> &ObjectLocation {
        &self.location
    }

    // == Fetch ==
    /// Downloads and parses the object.
    ///
    /// A malformed body is not retried: the same bytes would come back.
    pub async fn fetch(&self) -> Result<RemoteDocument, StorageError> {
        let object = self
            .with_retry("GetObject", || self.store.get_object(&self.location))
            .await?;
        debug!(location = %self.location, bytes = object.body.len(), "object downloaded");
        RemoteDocument::parse(object)
    }

    // == Head Metadata ==
    /// Fetches last-modified, size and ETag without the body.
    pub async fn head_metadata(&self) -> Result<ObjectMetadata, StorageError> {
        self.with_retry("HeadObject", || self.store.head_object(&self.location))
            .await
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome = tokio::time::timeout(self.retry.attempt_timeout, call())
                .await
                .unwrap_or_else(|_| {
                    Err(StorageError::Transient(format!(
                        "{operation} timed out after {}ms",
                        self.retry.attempt_timeout.as_millis()
                    )))
                });

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        location = %self.location,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "{operation} failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
