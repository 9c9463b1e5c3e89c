//! Document Cache Module
//!
//! Read-through cache for the one document the API serves. Holds at most
//! one entry, refreshes it through a single in-flight request, and falls
//! back to the previous copy when a refresh fails. After a failure, reads
//! keep getting that copy for a short back-off window without touching
//! storage.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, CacheRead, CacheStats, CacheStatus};
use crate::error::{CacheError, StorageError};
use crate::models::CacheSnapshot;
use crate::storage::{Fetcher, ObjectLocation};

type Slot = Arc<RwLock<Option<Arc<CacheEntry>>>>;
type RefreshFuture = BoxFuture<'static, Result<Refreshed, StorageError>>;

/// How long a failed refresh suppresses the next one while a copy exists.
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Refreshed {
    entry: Arc<CacheEntry>,
    status: CacheStatus,
}

#[derive(Debug, Clone)]
struct Failure {
    at: Instant,
    error: StorageError,
}

// == Document Cache ==
/// Process-wide cache of the configured object.
///
/// A refresh runs as a shared future. The in-flight slot keeps only a weak
/// handle, so once every waiter has gone (for example after a timeout) the
/// refresh is dropped and the next read starts a new one. The entry is
/// swapped in a single assignment after a successful refresh; a cancelled
/// refresh leaves the previous entry untouched.
pub struct DocumentCache {
    fetcher: Fetcher,
    max_age: Duration,
    entry: Slot,
    in_flight: Mutex<Option<WeakShared<RefreshFuture>>>,
    last_failure: StdMutex<Option<Failure>>,
    stats: Arc<StdMutex<CacheStats>>,
}

impl DocumentCache {
    // == Constructor ==
    /// Creates an empty cache; nothing is fetched until the first read.
    pub fn new(fetcher: Fetcher, max_age: Duration) -> Self {
        Self {
            fetcher,
            max_age,
            entry: Arc::new(RwLock::new(None)),
            in_flight: Mutex::new(None),
            last_failure: StdMutex::new(None),
            stats: Arc::new(StdMutex::new(CacheStats::new())),
        }
    }

    pub fn location(&self) -> &ObjectLocation {
        self.fetcher.location()
    }

    /// The installed entry, if any.
    pub async fn current(&self) -> Option<Arc<CacheEntry>> {
        self.entry.read().await.clone()
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.stats).clone()
    }

    // == Get Or Refresh ==
    /// Reads the document using the configured validity window.
    pub async fn get_or_refresh(&self) -> Result<CacheRead, CacheError> {
        self.get_or_refresh_within(self.max_age).await
    }

    /// Reads the document, refreshing it if older than `max_age`.
    ///
    /// A failed refresh serves the previous entry with `CacheStatus::Stale`;
    /// with no previous entry it fails with `NoDataAvailable`. Within
    /// `FAILURE_BACKOFF` (capped at `max_age`) of a failure, the previous
    /// entry is served stale without another attempt.
    pub async fn get_or_refresh_within(&self, max_age: Duration) -> Result<CacheRead, CacheError> {
        if let Some(read) = self.fresh_read(max_age).await {
            return Ok(read);
        }
        if let Some(read) = self.backoff_read(max_age).await {
            return Ok(read);
        }

        let refresh = {
            let mut slot = self.in_flight.lock().await;

            // another caller may have finished a refresh while we waited
            if let Some(read) = self.fresh_read(max_age).await {
                return Ok(read);
            }

            match slot.as_ref().and_then(WeakShared::upgrade) {
                Some(running) => {
                    record(&self.stats, CacheStats::record_coalesced);
                    debug!(location = %self.location(), "joining in-flight refresh");
                    running
                }
                None => {
                    let refresh = self.start_refresh(self.current().await);
                    *slot = refresh.downgrade();
                    refresh
                }
            }
        };

        match refresh.await {
            Ok(refreshed) => {
                *lock(&self.last_failure) = None;
                Ok(CacheRead::new(refreshed.entry, refreshed.status))
            }
            Err(err) => {
                *lock(&self.last_failure) = Some(Failure {
                    at: Instant::now(),
                    error: err.clone(),
                });
                match self.current().await {
                    Some(entry) => {
                        warn!(
                            location = %self.location(),
                            age_secs = entry.age().as_secs(),
                            error = %err,
                            "refresh failed, serving stale document"
                        );
                        Ok(self.stale_read(entry, &err))
                    }
                    None => {
                        error!(location = %self.location(), error = %err, "no document available");
                        Err(CacheError::NoDataAvailable(err))
                    }
                }
            }
        }
    }

    // == Snapshot ==
    /// Summary for the health endpoint. Never touches storage.
    pub async fn snapshot(&self) -> CacheSnapshot {
        let current = self.current().await;
        let stats = self.stats();
        CacheSnapshot {
            has_document: current.is_some(),
            age_secs: current.as_ref().map(|entry| entry.age().as_secs()),
            document_bytes: current.as_ref().map(|entry| entry.document().size()),
            last_updated: current
                .as_ref()
                .and_then(|entry| entry.document().metadata().last_modified)
                .map(|at| at.to_rfc3339()),
            hit_rate: stats.hit_rate(),
            stats,
        }
    }

    async fn fresh_read(&self, max_age: Duration) -> Option<CacheRead> {
        let entry = self.current().await?;
        if !entry.is_fresh(max_age) {
            return None;
        }

        record(&self.stats, CacheStats::record_hit);
        debug!(age_ms = entry.age().as_millis() as u64, "cache hit");
        Some(CacheRead::new(entry, CacheStatus::Hit))
    }

    async fn backoff_read(&self, max_age: Duration) -> Option<CacheRead> {
        let failure = lock(&self.last_failure).clone()?;
        let window = FAILURE_BACKOFF.min(max_age);
        let elapsed = failure.at.elapsed();
        if elapsed >= window {
            return None;
        }

        let entry = self.current().await?;
        debug!(
            retry_in_ms = (window - elapsed).as_millis() as u64,
            "storage recently failed, serving stale document"
        );
        Some(self.stale_read(entry, &failure.error))
    }

    fn stale_read(&self, entry: Arc<CacheEntry>, cause: &StorageError) -> CacheRead {
        record(&self.stats, CacheStats::record_stale);
        CacheRead::new(
            entry,
            CacheStatus::Stale {
                reason: cause.to_string(),
            },
        )
    }

    fn start_refresh(&self, previous: Option<Arc<CacheEntry>>) -> Shared<RefreshFuture> {
        refresh(
            self.fetcher.clone(),
            Arc::clone(&self.entry),
            Arc::clone(&self.stats),
            previous,
        )
        .boxed()
        .shared()
    }
}

/// Revalidates `previous` with a HEAD when there is one, downloads the
/// object otherwise, and installs the result.
async fn refresh(
    fetcher: Fetcher,
    slot: Slot,
    stats: Arc<StdMutex<CacheStats>>,
    previous: Option<Arc<CacheEntry>>,
) -> Result<Refreshed, StorageError> {
    let refreshed = match load(&fetcher, previous.as_deref()).await {
        Ok(refreshed) => refreshed,
        Err(err) => {
            record(&stats, CacheStats::record_failed_refresh);
            return Err(err);
        }
    };

    *slot.write().await = Some(Arc::clone(&refreshed.entry));

    let document = refreshed.entry.document();
    if refreshed.status == CacheStatus::Revalidated {
        record(&stats, CacheStats::record_revalidation);
        debug!(location = %fetcher.location(), "cached document still current");
    } else {
        record(&stats, CacheStats::record_fetch);
        info!(
            location = %fetcher.location(),
            bytes = document.size(),
            etag = document.metadata().etag.as_deref().unwrap_or("-"),
            "document refreshed from storage"
        );
    }

    Ok(refreshed)
}

async fn load(
    fetcher: &Fetcher,
    previous: Option<&CacheEntry>,
) -> Result<Refreshed, StorageError> {
    if let Some(previous) = previous {
        let remote = fetcher.head_metadata().await?;
        if !remote.supersedes(previous.document().metadata()) {
            return Ok(Refreshed {
                entry: Arc::new(previous.revalidated()),
                status: CacheStatus::Revalidated,
            });
        }
    }

    let document = fetcher.fetch().await?;
    Ok(Refreshed {
        entry: Arc::new(CacheEntry::new(document)),
        status: CacheStatus::Fetched,
    })
}

fn record(stats: &StdMutex<CacheStats>, update: impl FnOnce(&mut CacheStats)) {
    update(&mut *lock(stats));
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
