// Copyright (c) 2025 Moana Bloom Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Integration tests for the Moana Bloom filter.
//!
//! Exercises the public surface end to end against the in-memory store:
//! membership semantics, batch updates, counters, clearing, cross-instance
//! sharing, and the two write-concurrency modes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use moana_bloom::{
    BitArrayStore, MemoryStore, MoanaBloomConfig, MoanaBloomError, MoanaBloomFilter, StoreError,
    Version, WriteMode,
};

fn config() -> MoanaBloomConfig {
    MoanaBloomConfig::new()
        .with_expected_elements(1_000)
        .with_false_positive_rate(0.001)
}

/// Store wrapper that counts round trips, for asserting the one-fetch /
/// one-store batching contract.
struct CountingStore {
    inner: MemoryStore,
    fetches: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fetches: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BitArrayStore for CountingStore {
    async fn fetch(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>, StoreError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.inner.fetch(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.inner.put(key, value).await
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.inner.put_if_absent(key, value).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        value: Vec<u8>,
        version: Version,
    ) -> Result<bool, StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.inner.compare_and_swap(key, value, version).await
    }
}

#[tokio::test]
async fn test_add_then_contains() {
    let filter = MoanaBloomFilter::with_config(MemoryStore::new(), "dilberts", config()).unwrap();

    filter.add(b"rajiv").await.unwrap();

    assert!(filter.contains(b"rajiv").await.unwrap());
    assert!(!filter.contains(b"raj").await.unwrap());
    assert!(!filter.contains(b"dan").await.unwrap());
    assert_eq!(filter.approximate_size().await.unwrap(), 1);
}

#[tokio::test]
async fn test_no_false_negatives() {
    let filter = MoanaBloomFilter::with_config(MemoryStore::new(), "nfn", config()).unwrap();

    let elements: Vec<Vec<u8>> = (0..1_000u32)
        .map(|i| format!("element-{i}").into_bytes())
        .collect();
    filter.update(&elements).await.unwrap();

    for element in &elements {
        assert!(
            filter.contains(element).await.unwrap(),
            "added element must always be found"
        );
    }
}

#[tokio::test]
async fn test_duplicate_adds_count_but_do_not_change_bits() {
    let store = Arc::new(MemoryStore::new());
    let filter = MoanaBloomFilter::with_config(Arc::clone(&store), "dups", config()).unwrap();

    filter.add(b"rajiv").await.unwrap();
    let (after_first, _) = store.fetch("dups").await.unwrap().unwrap();

    filter.add(b"rajiv").await.unwrap();
    let (after_second, _) = store.fetch("dups").await.unwrap().unwrap();

    // Counter prefix differs, bit array bytes do not.
    assert_ne!(after_first[..8], after_second[..8]);
    assert_eq!(after_first[8..], after_second[8..]);
    assert_eq!(filter.approximate_size().await.unwrap(), 2);
}

#[tokio::test]
async fn test_batch_update_matches_sequential_adds() {
    let store = Arc::new(MemoryStore::new());
    let batched =
        MoanaBloomFilter::with_config(Arc::clone(&store), "batched", config()).unwrap();
    let sequential =
        MoanaBloomFilter::with_config(Arc::clone(&store), "sequential", config()).unwrap();

    batched
        .update(["raj".as_bytes(), "dan".as_bytes(), "eric".as_bytes()])
        .await
        .unwrap();
    for element in [b"raj".as_slice(), b"dan", b"eric"] {
        sequential.add(element).await.unwrap();
    }

    let (batched_bytes, _) = store.fetch("batched").await.unwrap().unwrap();
    let (sequential_bytes, _) = store.fetch("sequential").await.unwrap().unwrap();
    assert_eq!(batched_bytes, sequential_bytes);
}

#[tokio::test]
async fn test_batch_update_is_one_round_trip() {
    let store = Arc::new(CountingStore::new());
    let filter = MoanaBloomFilter::with_config(Arc::clone(&store), "batch", config()).unwrap();

    filter
        .update(["raj".as_bytes(), "dan".as_bytes(), "eric".as_bytes()])
        .await
        .unwrap();

    assert_eq!(store.fetches.load(Ordering::Relaxed), 1);
    assert_eq!(store.writes.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_empty_update_is_zero_round_trips() {
    let store = Arc::new(CountingStore::new());
    let filter = MoanaBloomFilter::with_config(Arc::clone(&store), "noop", config()).unwrap();

    filter.update(Vec::<Vec<u8>>::new()).await.unwrap();

    assert_eq!(store.fetches.load(Ordering::Relaxed), 0);
    assert_eq!(store.writes.load(Ordering::Relaxed), 0);
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn test_clear_forgets_everything() {
    let filter = MoanaBloomFilter::with_config(MemoryStore::new(), "wipe", config()).unwrap();

    filter
        .update(["rajiv".as_bytes(), "raj".as_bytes(), "dan".as_bytes()])
        .await
        .unwrap();
    assert_eq!(filter.approximate_size().await.unwrap(), 3);

    filter.clear().await.unwrap();

    assert!(!filter.contains(b"rajiv").await.unwrap());
    assert!(!filter.contains(b"raj").await.unwrap());
    assert!(!filter.contains(b"dan").await.unwrap());
    assert_eq!(filter.approximate_size().await.unwrap(), 0);

    // Idempotent.
    filter.clear().await.unwrap();
    assert_eq!(filter.approximate_size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_instances_sharing_a_key_share_state() {
    let store = Arc::new(MemoryStore::new());
    let writer = MoanaBloomFilter::with_config(Arc::clone(&store), "shared", config()).unwrap();
    let reader = MoanaBloomFilter::with_config(Arc::clone(&store), "shared", config()).unwrap();

    writer.add(b"rajiv").await.unwrap();

    assert!(reader.contains(b"rajiv").await.unwrap());
    assert_eq!(reader.approximate_size().await.unwrap(), 1);
}

#[tokio::test]
async fn test_mismatched_sizing_is_detected_as_corruption() {
    let store = Arc::new(MemoryStore::new());
    let original = MoanaBloomFilter::with_config(Arc::clone(&store), "clash", config()).unwrap();
    original.add(b"rajiv").await.unwrap();

    let smaller = MoanaBloomConfig::new()
        .with_expected_elements(100)
        .with_false_positive_rate(0.01);
    let conflicting =
        MoanaBloomFilter::with_config(Arc::clone(&store), "clash", smaller).unwrap();

    let err = conflicting.contains(b"rajiv").await.unwrap_err();
    assert!(matches!(
        err,
        MoanaBloomError::BackingStore(StoreError::Corrupt { .. })
    ));
}

#[tokio::test]
async fn test_false_positive_rate_stays_near_target() {
    let config = MoanaBloomConfig::new()
        .with_expected_elements(1_000)
        .with_false_positive_rate(0.01);
    let filter = MoanaBloomFilter::with_config(MemoryStore::new(), "fp", config).unwrap();

    let elements: Vec<Vec<u8>> = (0..1_000u32)
        .map(|i| format!("inserted-{i}").into_bytes())
        .collect();
    filter.update(&elements).await.unwrap();

    let mut false_positives = 0u32;
    let probes = 10_000u32;
    for i in 0..probes {
        if filter
            .contains(format!("never-inserted-{i}").as_bytes())
            .await
            .unwrap()
        {
            false_positives += 1;
        }
    }

    let rate = f64::from(false_positives) / f64::from(probes);
    // Allow a factor of 2x for statistical variation.
    assert!(
        rate < 0.02,
        "false positive rate {rate} exceeds twice the 0.01 target"
    );
}

#[tokio::test]
async fn test_estimated_cardinality_tracks_distinct_inserts() {
    let filter = MoanaBloomFilter::with_config(MemoryStore::new(), "card", config()).unwrap();

    let elements: Vec<Vec<u8>> = (0..100u32)
        .map(|i| format!("distinct-{i}").into_bytes())
        .collect();
    filter.update(&elements).await.unwrap();
    // Duplicates inflate the counter but not the fill-based estimate.
    filter.add(b"distinct-0").await.unwrap();
    filter.add(b"distinct-0").await.unwrap();

    let estimate = filter.estimated_cardinality().await.unwrap();
    assert!(
        (80..=120).contains(&estimate),
        "estimate {estimate} too far from 100 distinct inserts"
    );
    assert_eq!(filter.approximate_size().await.unwrap(), 102);
}

#[tokio::test]
async fn test_fill_ratio_grows_with_inserts() {
    let filter = MoanaBloomFilter::with_config(MemoryStore::new(), "fill", config()).unwrap();
    assert_eq!(filter.fill_ratio().await.unwrap(), 0.0);

    let elements: Vec<Vec<u8>> = (0..500u32)
        .map(|i| format!("fill-{i}").into_bytes())
        .collect();
    filter.update(&elements).await.unwrap();

    let ratio = filter.fill_ratio().await.unwrap();
    assert!(ratio > 0.0 && ratio < 1.0);
}

#[tokio::test]
async fn test_last_write_wins_mode_single_writer() {
    let config = config().with_write_mode(WriteMode::LastWriteWins);
    let filter = MoanaBloomFilter::with_config(MemoryStore::new(), "lww", config).unwrap();

    filter.add(b"rajiv").await.unwrap();

    assert!(filter.contains(b"rajiv").await.unwrap());
    assert_eq!(filter.approximate_size().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_lose_nothing_under_cas() {
    // Each conditional-write loss implies some other writer succeeded, so
    // with 200 total writes an attempt budget of 256 can never exhaust.
    let config = config().with_write_mode(WriteMode::CompareAndSwap { max_attempts: 256 });
    let store = Arc::new(MemoryStore::new());

    let mut tasks = Vec::new();
    for writer in 0..8u32 {
        let filter = MoanaBloomFilter::with_config(
            Arc::clone(&store),
            "contended",
            config.clone(),
        )
        .unwrap();
        tasks.push(tokio::spawn(async move {
            for i in 0..25u32 {
                filter
                    .add(format!("writer-{writer}-element-{i}").as_bytes())
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let filter = MoanaBloomFilter::with_config(store, "contended", config).unwrap();
    assert_eq!(filter.approximate_size().await.unwrap(), 200);
    for writer in 0..8u32 {
        for i in 0..25u32 {
            assert!(
                filter
                    .contains(format!("writer-{writer}-element-{i}").as_bytes())
                    .await
                    .unwrap(),
                "no add may be lost under compare-and-swap"
            );
        }
    }
}
