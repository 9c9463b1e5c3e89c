//! Cache Entry Module
//!
//! Defines the single cached document and the result of a cache read.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::storage::RemoteDocument;

// == Cache Entry ==
/// The cached document with its fetch and validation times.
///
/// Entries are immutable; a refresh or revalidation installs a new one.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    document: Arc<RemoteDocument>,
    fetched_at: Instant,
    validated_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Wraps a freshly downloaded document.
    pub fn new(document: RemoteDocument) -> Self {
        let now = Instant::now();
        Self {
            document: Arc::new(document),
            fetched_at: now,
            validated_at: now,
        }
    }

    // == Revalidated ==
    /// Same document, confirmed current as of now.
    pub fn revalidated(&self) -> Self {
        Self {
            document: Arc::clone(&self.document),
            fetched_at: self.fetched_at,
            validated_at: Instant::now(),
        }
    }

    pub fn document(&self) -> &RemoteDocument {
        &self.document
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// Time since the document was last fetched or revalidated.
    pub fn age(&self) -> Duration {
        self.validated_at.elapsed()
    }

    // == Is Fresh ==
    /// Boundary: an entry whose age equals `max_age` is already stale, so a
    /// zero `max_age` revalidates on every read.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.age() < max_age
    }
}

// == Cache Status ==
/// How a read was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from memory within the validity window
    Hit,
    /// Downloaded from storage
    Fetched,
    /// Storage confirmed the cached copy is current
    Revalidated,
    /// Refresh failed; previous copy served
    Stale { reason: String },
}

impl CacheStatus {
    /// Value for the `X-Cache` response header.
    pub fn label(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Fetched => "MISS",
            CacheStatus::Revalidated => "REVALIDATED",
            CacheStatus::Stale { .. } => "STALE",
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, CacheStatus::Stale { .. })
    }
}

// == Cache Read ==
/// A document handed out by the cache.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub entry: Arc<CacheEntry>,
    pub status: CacheStatus,
}

impl CacheRead {
    pub fn new(entry: Arc<CacheEntry>, status: CacheStatus) -> Self {
        Self { entry, status }
    }

    pub fn document(&self) -> &RemoteDocument {
        self.entry.document()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ObjectMetadata, StoredObject};

    fn document() -> RemoteDocument {
        RemoteDocument::parse(StoredObject {
            body: bytes::Bytes::from_static(b"{\"k\":1}"),
            metadata: ObjectMetadata::default(),
        })
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_fresh_until_max_age() {
        let entry = CacheEntry::new(document());
        assert!(entry.is_fresh(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(entry.is_fresh(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!entry.is_fresh(Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_age_is_never_fresh() {
        let entry = CacheEntry::new(document());
        assert!(!entry.is_fresh(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidated_shares_document_and_resets_age() {
        let entry = CacheEntry::new(document());
        tokio::time::advance(Duration::from_secs(120)).await;

        let renewed = entry.revalidated();
        assert!(Arc::ptr_eq(&entry.document, &renewed.document));
        assert_eq!(renewed.fetched_at(), entry.fetched_at());
        assert_eq!(renewed.age(), Duration::ZERO);
        assert_eq!(entry.age(), Duration::from_secs(120));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(CacheStatus::Hit.label(), "HIT");
        assert_eq!(CacheStatus::Fetched.label(), "MISS");
        assert!(CacheStatus::Stale {
            reason: "down".into()
        }
        .is_stale());
    }
}
