// Copyright (c) 2025 Moana Bloom Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Main implementation of the Moana Bloom filter.

use std::fmt;

use crate::config::{FilterSpec, MoanaBloomConfig, WriteMode};
use crate::error::Result;
use crate::hash::{FnvDoubleHasher, MultiHasher};
use crate::state::BitArrayState;
use crate::store::{BitArrayStore, StoreError, Version};

/// A Bloom filter whose bit array lives in a shared external store.
///
/// Every filter instance addresses one value in the backing store, named by
/// a caller-supplied key. Instances on any number of hosts that share a key,
/// a store, and equal sizing parameters operate on the same logical filter.
/// Instances that share a key but disagree on sizing corrupt each other's
/// data; keeping parameters consistent per key is the caller's
/// responsibility.
///
/// No state is cached between operations: each call runs one fetch (and for
/// mutations one store) against the backing store, so every caller always
/// observes the latest stored bits. How concurrent writers interact is
/// governed by [`WriteMode`].
///
/// # Examples
///
/// ```
/// use moana_bloom::{MemoryStore, MoanaBloomConfig, MoanaBloomFilter};
///
/// # tokio_test::block_on(async {
/// let config = MoanaBloomConfig::new()
///     .with_expected_elements(1_000)
///     .with_false_positive_rate(0.001);
///
/// let filter = MoanaBloomFilter::with_config(MemoryStore::new(), "dilberts", config).unwrap();
///
/// filter.update(["rajiv".as_bytes(), "raj".as_bytes(), "dan".as_bytes()]).await.unwrap();
///
/// assert!(filter.contains(b"rajiv").await.unwrap());
/// assert_eq!(filter.approximate_size().await.unwrap(), 3);
/// # });
/// ```
pub struct MoanaBloomFilter<S: BitArrayStore> {
    /// Immutable sizing, computed once at construction.
    spec: FilterSpec,

    /// Store key naming this filter's shared state.
    key: String,

    /// Policy for the fetch-mutate-store cycle under concurrent writers.
    write_mode: WriteMode,

    /// Hasher for computing bit positions.
    hasher: FnvDoubleHasher,

    /// Backing store adapter.
    store: S,
}

impl<S: BitArrayStore> MoanaBloomFilter<S> {
    /// Create a filter with the default configuration (1,000 expected
    /// elements, 0.1% false-positive rate, compare-and-swap writes).
    ///
    /// # Errors
    ///
    /// Returns [`MoanaBloomError::InvalidParameter`] for out-of-range
    /// configuration values.
    ///
    /// [`MoanaBloomError::InvalidParameter`]: crate::MoanaBloomError::InvalidParameter
    pub fn new(store: S, key: impl Into<String>) -> Result<Self> {
        Self::with_config(store, key, MoanaBloomConfig::default())
    }

    /// Create a filter with the given configuration.
    ///
    /// Sizing is validated and derived here, once; see [`FilterSpec::compute`].
    pub fn with_config(
        store: S,
        key: impl Into<String>,
        config: MoanaBloomConfig,
    ) -> Result<Self> {
        let spec = FilterSpec::from_config(&config)?;
        Ok(Self {
            spec,
            key: key.into(),
            write_mode: config.write_mode(),
            hasher: FnvDoubleHasher::new(),
            store,
        })
    }

    /// The filter's immutable sizing.
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// The store key naming this filter's shared state.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Insert one element. O(k) hashing plus one fetch and one store.
    ///
    /// The approximate insertion counter increments even when every bit was
    /// already set; it estimates insertions, not distinct elements.
    pub async fn add(&self, element: &[u8]) -> Result<()> {
        self.update([element]).await
    }

    /// Insert a batch of elements with a single fetch and a single store.
    ///
    /// Equivalent to one [`add`](Self::add) per element, but the whole batch
    /// shares one round trip to the backing store, which is the efficient
    /// way to populate a filter. An empty batch touches the store not at
    /// all.
    pub async fn update<I, E>(&self, elements: I) -> Result<()>
    where
        I: IntoIterator<Item = E>,
        E: AsRef<[u8]>,
    {
        let mut positions = Vec::new();
        let mut inserted = 0u64;
        for element in elements {
            positions.extend(self.hasher.positions(element.as_ref(), &self.spec));
            inserted += 1;
        }
        if inserted == 0 {
            return Ok(());
        }

        tracing::debug!(
            key = %self.key,
            elements = inserted,
            bits = positions.len(),
            "inserting batch"
        );

        self.read_modify_write(|state| {
            for &position in &positions {
                state.set_bit(position);
            }
            state.increment(inserted);
        })
        .await
    }

    /// Whether the element might have been inserted. O(k) hashing plus one
    /// fetch.
    ///
    /// Returns `true` iff every probed bit is set. False positives are
    /// possible; false negatives are not (absent concurrent clears, or
    /// last-write-wins races, or a conflicting writer under the same key
    /// with different sizing).
    pub async fn contains(&self, element: &[u8]) -> Result<bool> {
        let (state, _) = self.fetch_state().await?;
        let positions = self.hasher.positions(element, &self.spec);
        Ok(positions.iter().all(|&position| state.test_bit(position)))
    }

    /// The stored approximate insertion counter.
    ///
    /// Increments once per inserted element, duplicates included, so this
    /// is an upper-bound estimate of insertions rather than cardinality.
    /// Don't rely on it for anything important like financial systems or
    /// cat gif websites.
    pub async fn approximate_size(&self) -> Result<u64> {
        let (state, _) = self.fetch_state().await?;
        Ok(state.count())
    }

    /// Estimate distinct insertions from the bit array's fill:
    /// `floor(-(m / k) * ln(1 - X / m))`, X = set bits.
    ///
    /// Unlike [`approximate_size`](Self::approximate_size) this does not
    /// grow on duplicate inserts, but it degrades as the array fills. A
    /// fully saturated array carries no information and estimates
    /// `u64::MAX`.
    pub async fn estimated_cardinality(&self) -> Result<u64> {
        let (state, _) = self.fetch_state().await?;
        let set = state.set_bit_count();
        let m = self.spec.bit_array_size();
        if set >= m {
            return Ok(u64::MAX);
        }
        let m = m as f64;
        let k = f64::from(self.spec.hash_rounds());
        let estimate = -(m / k) * (1.0 - set as f64 / m).ln();
        Ok(estimate.floor() as u64)
    }

    /// Fraction of bits currently set, in [0, 1]. One fetch.
    pub async fn fill_ratio(&self) -> Result<f64> {
        let (state, _) = self.fetch_state().await?;
        Ok(state.set_bit_count() as f64 / self.spec.bit_array_size() as f64)
    }

    /// Remove all elements: overwrite the stored state with an all-zero bit
    /// array and a zero counter. Idempotent; one unconditional store.
    pub async fn clear(&self) -> Result<()> {
        tracing::debug!(key = %self.key, "clearing filter");
        let state = BitArrayState::zeroed(self.spec.byte_len());
        self.store.put(&self.key, state.to_bytes()).await?;
        Ok(())
    }

    /// Fetch and decode the current state. An absent key is a fresh
    /// all-zero state with no version token, never an error.
    async fn fetch_state(&self) -> Result<(BitArrayState, Option<Version>)> {
        match self.store.fetch(&self.key).await? {
            Some((bytes, version)) => {
                let state = BitArrayState::from_bytes(&bytes, self.spec.byte_len()).map_err(
                    |err| StoreError::Corrupt {
                        key: self.key.clone(),
                        reason: err.to_string(),
                    },
                )?;
                Ok((state, Some(version)))
            }
            None => Ok((BitArrayState::zeroed(self.spec.byte_len()), None)),
        }
    }

    /// One fetch-mutate-store transaction. The local copy is fully mutated
    /// before the single store call, so a failure anywhere leaves the
    /// remote state untouched.
    async fn read_modify_write<F>(&self, mutate: F) -> Result<()>
    where
        F: Fn(&mut BitArrayState),
    {
        match self.write_mode {
            WriteMode::LastWriteWins => {
                let (mut state, _) = self.fetch_state().await?;
                mutate(&mut state);
                self.store.put(&self.key, state.to_bytes()).await?;
                Ok(())
            }
            WriteMode::CompareAndSwap { max_attempts } => {
                let attempts = max_attempts.max(1);
                for attempt in 1..=attempts {
                    let (mut state, version) = self.fetch_state().await?;
                    mutate(&mut state);
                    let stored = match version {
                        Some(version) => {
                            self.store
                                .compare_and_swap(&self.key, state.to_bytes(), version)
                                .await?
                        }
                        // First write to an absent key must not clobber a
                        // concurrent first writer.
                        None => self.store.put_if_absent(&self.key, state.to_bytes()).await?,
                    };
                    if stored {
                        return Ok(());
                    }
                    tracing::debug!(
                        key = %self.key,
                        attempt,
                        "conditional write lost to a concurrent writer, refetching"
                    );
                }
                Err(StoreError::CasConflict {
                    key: self.key.clone(),
                    attempts,
                }
                .into())
            }
        }
    }
}

impl<S: BitArrayStore> fmt::Debug for MoanaBloomFilter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoanaBloomFilter")
            .field("key", &self.key)
            .field("spec", &self.spec)
            .field("write_mode", &self.write_mode)
            .finish_non_exhaustive()
    }
}
