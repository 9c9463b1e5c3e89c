//! Cache Statistics Module
//!
//! Tracks how reads were satisfied and how refreshes went.

use serde::Serialize;

// == Cache Stats ==
/// Counters for the document cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Reads served from memory within the validity window
    pub hits: u64,
    /// Full downloads from storage
    pub fetches: u64,
    /// Refreshes that only confirmed the cached copy
    pub revalidations: u64,
    /// Reads answered with a stale copy after a failed refresh
    pub stale_served: u64,
    /// Refreshes that ended in an error
    pub failed_refreshes: u64,
    /// Reads that joined a refresh already in flight
    pub coalesced: u64,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Share of reads that needed no storage round trip.
    ///
    /// Returns 0.0 if nothing has been read yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.fetches + self.revalidations + self.coalesced;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_revalidation(&mut self) {
        self.revalidations += 1;
    }

    pub fn record_stale(&mut self) {
        self.stale_served += 1;
    }

    pub fn record_failed_refresh(&mut self) {
        self.failed_refreshes += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_fetch();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_failures_do_not_count_as_reads() {
        let mut stats = CacheStats::new();
        stats.record_failed_refresh();
        stats.record_stale();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.failed_refreshes, 1);
        assert_eq!(stats.stale_served, 1);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(CacheStats::new()).unwrap();
        assert!(json.get("staleServed").is_some());
        assert!(json.get("failedRefreshes").is_some());
    }
}
