// Copyright (c) 2025 Moana Bloom Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Moana Bloom Filter: a Bloom filter whose bit array lives in a shared
//! external key-value store.
//!
//! A Bloom filter answers the question "have I seen this element before?"
//! with no false negatives and a tunable false-positive rate. This crate
//! keeps the filter's bit array in an external cache rather than in process
//! memory, so any number of processes or hosts pointing the same key at the
//! same store share one logical filter.
//!
//! # Features
//!
//! - Optimal sizing from expected element count and target false-positive
//!   rate, computed once at construction.
//! - Deterministic double-hashing over caller-supplied byte sequences, stable
//!   across processes and hosts.
//! - A narrow async [`BitArrayStore`] port for the backing cache, with an
//!   in-memory [`MemoryStore`] adapter included.
//! - Explicit write-concurrency policy: compare-and-swap with bounded retry
//!   (default), or last-write-wins for stores without a CAS primitive.
//! - Zero unsafe code.
//!
//! # Example
//!
//! ```
//! use moana_bloom::{MemoryStore, MoanaBloomFilter};
//!
//! # tokio_test::block_on(async {
//! let filter = MoanaBloomFilter::new(MemoryStore::new(), "dilberts").unwrap();
//!
//! filter.add(b"rajiv").await.unwrap();
//!
//! assert!(filter.contains(b"rajiv").await.unwrap());
//! assert!(!filter.contains(b"raj").await.unwrap());
//! assert_eq!(filter.approximate_size().await.unwrap(), 1);
//! # });
//! ```
//!
//! # Elements are bytes
//!
//! The filter operates purely on byte sequences. Callers are responsible for
//! serializing their values to *canonical* bytes before insertion or lookup:
//! two values that compare equal must serialize to identical bytes, or
//! membership silently breaks (an element added under one encoding will not
//! be found under another).
//!
//! # Approximate counting
//!
//! [`MoanaBloomFilter::approximate_size`] reports a stored insertion counter
//! that increments on every `add`, duplicates included. It is an upper-bound
//! estimate of insertions, not true cardinality; this is an intentional,
//! documented limitation of the design. A fill-ratio based cardinality
//! estimate is available via [`MoanaBloomFilter::estimated_cardinality`].

// Module declarations
mod config;
mod error;
mod filter;
mod hash;
mod state;
pub mod store;

// Re-exports
pub use config::{FilterSpec, MoanaBloomConfig, WriteMode};
pub use error::{MoanaBloomError, Result};
pub use filter::MoanaBloomFilter;
pub use store::memory::MemoryStore;
pub use store::{BitArrayStore, StoreError, Version};

/// Version information for the Moana Bloom library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
