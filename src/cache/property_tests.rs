//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check read-through behaviour over arbitrary documents
//! and arbitrary sequences of storage outcomes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use proptest::prelude::*;
use serde_json::Value;

use crate::api::{CorsPolicy, Dispatcher, Filter, Request};
use crate::cache::DocumentCache;
use crate::error::StorageError;
use crate::storage::{Fetcher, MemoryStore, ObjectLocation, RetryPolicy};

// == Test Configuration ==
const MAX_AGE: Duration = Duration::from_secs(60);

fn location() -> ObjectLocation {
    ObjectLocation::new("bucket", "data.json")
}

fn cache_over(store: &Arc<MemoryStore>) -> Arc<DocumentCache> {
    let fetcher = Fetcher::new(store.clone(), location(), RetryPolicy::none());
    Arc::new(DocumentCache::new(fetcher, MAX_AGE))
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

// == Strategies ==
/// Arbitrary JSON without floats, nested a few levels deep
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// One step of a storage timeline
#[derive(Debug, Clone)]
enum Step {
    /// A new document version is published
    Publish(Value),
    /// Storage starts failing transiently
    Outage,
    /// Storage recovers
    Recover,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        json_strategy().prop_map(Step::Publish),
        Just(Step::Outage),
        Just(Step::Recover),
    ]
}

fn record_strategy() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec!["Epicuria", "Bruin Plate", "De Neve", "Rendezvous"]),
        prop::sample::select(vec!["breakfast", "lunch", "dinner"]),
    )
        .prop_map(|(name, meal)| serde_json::json!({"name": name, "meal": meal}))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // The whole-document route returns the stored bytes unchanged,
    // whatever their formatting.
    #[test]
    fn prop_document_round_trips_byte_for_byte(doc in json_strategy(), pretty in any::<bool>()) {
        let bytes = if pretty {
            serde_json::to_vec_pretty(&doc).unwrap()
        } else {
            serde_json::to_vec(&doc).unwrap()
        };
        let store = Arc::new(MemoryStore::new());
        store.put_object(&location(), bytes.clone());
        let dispatcher = Dispatcher::new(cache_over(&store), CorsPolicy::default(), "test", 3600);

        let response = tokio_test::block_on(dispatcher.route(&Request::new(Method::GET, "/")));

        prop_assert_eq!(response.status, StatusCode::OK);
        prop_assert_eq!(response.body.as_ref(), bytes.as_slice());
    }

    // Any number of concurrent cold readers cause exactly one download.
    #[test]
    fn prop_concurrent_cold_reads_fetch_once(readers in 2usize..16) {
        let store = Arc::new(MemoryStore::new());
        store.put_object(&location(), "{\"v\":1}");
        store.set_latency(Duration::from_millis(50));
        let cache = cache_over(&store);

        let reads = paused_runtime().block_on(futures_util::future::join_all(
            (0..readers).map(|_| cache.get_or_refresh()),
        ));

        prop_assert_eq!(store.get_count(), 1);
        for read in &reads {
            let read = read.as_ref().unwrap();
            prop_assert_eq!(read.document().body().as_ref(), b"{\"v\":1}");
        }
        prop_assert_eq!(cache.stats().coalesced, readers as u64 - 1);
    }

    // Once a document has been served, expiry plus any mix of outages never
    // produces an error, and reads always return either the latest published
    // version (storage healthy) or the last one served (storage failing).
    #[test]
    fn prop_stale_is_served_through_outages(
        initial in json_strategy(),
        steps in prop::collection::vec(step_strategy(), 1..12),
    ) {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(&store);

        paused_runtime().block_on(async {
            let mut published = serde_json::to_vec(&initial).unwrap();
            store.put_object(&location(), published.clone());
            let mut served = cache.get_or_refresh().await.unwrap().document().body().to_vec();
            let mut failing = false;

            for step in steps {
                match step {
                    Step::Publish(doc) => {
                        published = serde_json::to_vec(&doc).unwrap();
                        store.put_object(&location(), published.clone());
                    }
                    Step::Outage => {
                        failing = true;
                        store.fail_with(Some(StorageError::Transient("outage".into())));
                    }
                    Step::Recover => {
                        failing = false;
                        store.fail_with(None);
                    }
                }

                tokio::time::advance(MAX_AGE).await;
                let read = cache.get_or_refresh().await;
                prop_assert!(read.is_ok());
                let read = read.unwrap();
                let body = read.document().body().to_vec();

                if failing {
                    prop_assert!(read.status.is_stale());
                    prop_assert_eq!(&body, &served);
                } else {
                    prop_assert!(!read.status.is_stale());
                    prop_assert_eq!(&body, &published);
                }
                served = body;
            }
            Ok(())
        })?;
    }

    // Query results never exceed `limit` and every result satisfies the filter.
    #[test]
    fn prop_query_respects_limit_and_filter(
        records in prop::collection::vec(record_strategy(), 0..24),
        meal in prop::sample::select(vec!["breakfast", "lunch", "dinner"]),
        limit in 0usize..10,
    ) {
        let mut query = BTreeMap::new();
        query.insert("meal".to_string(), meal.to_uppercase());
        query.insert("limit".to_string(), limit.to_string());
        let filter = Filter::from_query(&query).unwrap();

        let results = filter.apply(&Value::Array(records.clone())).unwrap();
        let expected = records.iter().filter(|r| r["meal"] == meal).count().min(limit);

        prop_assert_eq!(results.len(), expected);
        for result in &results {
            prop_assert_eq!(&result.value["meal"], &Value::from(meal));
            let index: usize = result.id.parse().unwrap();
            prop_assert_eq!(&records[index], &result.value);
        }
    }
}
