//! Storage Module
//!
//! Read-only access to the single JSON object the API serves.
//!
//! `ObjectStore` is the backend seam (S3 in production, memory for tests and
//! local runs); `Fetcher` layers retry and JSON validation on top of it.

mod document;
mod fetcher;
mod memory;
mod s3;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::StorageError;

pub use document::RemoteDocument;
pub use fetcher::{Fetcher, RetryPolicy};
pub use memory::MemoryStore;
pub use s3::S3Store;

// == Object Location ==
/// Bucket and key of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

// == Object Metadata ==
/// Cheap-to-fetch description of a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
    pub etag: Option<String>,
}

impl ObjectMetadata {
    /// Returns true if `self` (remote) describes a newer object than `cached`.
    ///
    /// ETags win when both sides carry one. Otherwise the remote object must
    /// be strictly newer. With nothing to compare, assume it changed.
    pub fn supersedes(&self, cached: &ObjectMetadata) -> bool {
        if let (Some(remote), Some(local)) = (&self.etag, &cached.etag) {
            return remote != local;
        }

        match (self.last_modified, cached.last_modified) {
            (Some(remote), Some(local)) => remote > local,
            _ => true,
        }
    }
}

// == Stored Object ==
/// Raw object body as returned by a GET.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub metadata: ObjectMetadata,
}

// == Object Store Trait ==
/// GetObject/HeadObject semantics against a bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Downloads the object body and its metadata.
    async fn get_object(&self, location: &ObjectLocation) -> Result<StoredObject, StorageError>;

    /// Fetches metadata without transferring the body.
    async fn head_object(&self, location: &ObjectLocation)
        -> Result<ObjectMetadata, StorageError>;
}
