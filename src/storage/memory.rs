//! In-memory object store.
//!
//! Backs local runs (`LOCAL_DATA_FILE`) and the test suites. Failures and
//! latency can be injected, and every call is counted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use super::{ObjectLocation, ObjectMetadata, ObjectStore, StoredObject};
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Faults {
    /// Fails every call while set
    persistent: Option<StorageError>,
    /// Fails the next `n` calls
    queued: Vec<StorageError>,
    latency: Duration,
}

/// Object store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<ObjectLocation, StoredObject>>,
    faults: Mutex<Faults>,
    version: AtomicU64,
    gets: AtomicUsize,
    heads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or replaces) an object, assigning a fresh ETag.
    pub fn put_object(&self, location: &ObjectLocation, body: impl Into<Bytes>) {
        let body = body.into();
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let metadata = ObjectMetadata {
            last_modified: Some(Utc::now()),
            size: body.len() as u64,
            etag: Some(format!("\"v{version}\"")),
        };

        lock(&self.objects).insert(location.clone(), StoredObject { body, metadata });
    }

    pub fn delete_object(&self, location: &ObjectLocation) {
        lock(&self.objects).remove(location);
    }

    /// Makes every call fail with `err` until cleared with `None`.
    pub fn fail_with(&self, err: Option<StorageError>) {
        lock(&self.faults).persistent = err;
    }

    /// Makes the next `count` calls fail with `err`.
    pub fn fail_next(&self, count: usize, err: StorageError) {
        lock(&self.faults).queued = vec![err; count];
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.faults).latency = latency;
    }

    /// Number of GetObject calls served so far.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of HeadObject calls served so far.
    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), StorageError> {
        let latency = lock(&self.faults).latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut faults = lock(&self.faults);
        if let Some(err) = faults.queued.pop() {
            return Err(err);
        }
        match &faults.persistent {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn lookup(&self, location: &ObjectLocation) -> Result<StoredObject, StorageError> {
        lock(&self.objects)
            .get(location)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(location.to_string()))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<StoredObject, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        self.lookup(location)
    }

    async fn head_object(
        &self,
        location: &ObjectLocation,
    ) -> Result<ObjectMetadata, StorageError> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        self.lookup(location).map(|object| object.metadata)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
