//! Cache Module
//!
//! In-process cache of the served document: one entry, single-flight
//! refresh, serve-stale-on-error.

mod document_cache;
mod entry;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use document_cache::{DocumentCache, FAILURE_BACKOFF};
pub use entry::{CacheEntry, CacheRead, CacheStatus};
pub use stats::CacheStats;
