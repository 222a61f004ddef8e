// Copyright (c) 2025 Moana Bloom Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Configuration and sizing for the Moana Bloom filter.
//!
//! [`MoanaBloomConfig`] is the caller-facing builder; [`FilterSpec`] is the
//! validated, immutable sizing derived from it at filter construction.

use crate::error::{MoanaBloomError, Result};

/// Write-concurrency policy for the fetch-mutate-store cycle.
///
/// The cycle is not atomic on its own: two concurrent writers can fetch the
/// same old state and the second store then silently discards the first
/// writer's bits and counter increment. Which policy to use is an explicit
/// choice, not something the filter guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain fetch/store. Concurrent writers can lose updates, which weakens
    /// the no-false-negative guarantee under write contention. Matches stores
    /// that offer no conditional-write primitive.
    LastWriteWins,

    /// Conditional store against the version token returned by the fetch.
    /// On conflict the whole fetch-mutate-store cycle re-runs against fresh
    /// state, up to `max_attempts` times; exhaustion surfaces as
    /// [`StoreError::CasConflict`](crate::store::StoreError::CasConflict).
    CompareAndSwap {
        /// Total attempts before giving up. Must be at least 1.
        max_attempts: u32,
    },
}

impl Default for WriteMode {
    fn default() -> Self {
        WriteMode::CompareAndSwap { max_attempts: 3 }
    }
}

/// Configuration for the Moana Bloom filter.
///
/// This struct provides configuration options for tuning the filter's
/// accuracy and write-concurrency behavior. Values are validated when the
/// filter is constructed, not when they are set.
#[derive(Debug, Clone)]
pub struct MoanaBloomConfig {
    /// Expected number of elements that will be inserted into the filter.
    /// Used to calculate optimal bit array size.
    expected_elements: u64,

    /// Desired probability of false positives, in the open interval (0, 1).
    /// Lower values increase accuracy but require more storage.
    false_positive_rate: f64,

    /// How writes behave under concurrent mutators of the same key.
    write_mode: WriteMode,
}

impl MoanaBloomConfig {
    /// Create a new default configuration.
    ///
    /// Default values:
    /// - expected_elements: 1,000
    /// - false_positive_rate: 0.001 (0.1%)
    /// - write_mode: compare-and-swap with 3 attempts
    pub fn new() -> Self {
        Self {
            expected_elements: 1_000,
            false_positive_rate: 0.001,
            write_mode: WriteMode::default(),
        }
    }

    /// Set the expected number of elements to be inserted into the filter.
    ///
    /// An accurate estimate keeps the real false-positive rate near the
    /// target; inserting far more elements than declared degrades accuracy.
    pub fn with_expected_elements(mut self, expected_elements: u64) -> Self {
        self.expected_elements = expected_elements;
        self
    }

    /// Set the desired false positive rate (between 0.0 and 1.0 exclusive).
    ///
    /// Typical values range from 0.01 (1%) to 0.001 (0.1%).
    pub fn with_false_positive_rate(mut self, false_positive_rate: f64) -> Self {
        self.false_positive_rate = false_positive_rate;
        self
    }

    /// Set the write-concurrency policy.
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Get the configured write-concurrency policy.
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Get the configured expected element count.
    pub fn expected_elements(&self) -> u64 {
        self.expected_elements
    }

    /// Get the configured false-positive rate.
    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }
}

impl Default for MoanaBloomConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable sizing of one Bloom filter, computed once at construction.
///
/// Two filter instances addressing the same store key must carry an equal
/// `FilterSpec`, or they will corrupt each other's bits: positions computed
/// against one modulus are meaningless against another. The spec never
/// changes after construction; different parameters mean a new filter under
/// a new key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    expected_elements: u64,
    false_positive_rate: f64,
    bit_array_size: u64,
    hash_rounds: u32,
}

impl FilterSpec {
    /// Derive the optimal sizing for the given expectations.
    ///
    /// The bit array size m and hash round count k follow the standard
    /// optimal formulas:
    ///
    /// - `m = ceil(-n * ln(p) / ln(2)^2)`
    /// - `k = round((m / n) * ln(2))`, at least 1
    ///
    /// m is rounded *up* so the filter is never under-provisioned (which
    /// would push the real false-positive rate above the caller's
    /// tolerance), and k is floored at 1 (zero rounds would make every
    /// lookup report "not seen", breaking the no-false-negative guarantee).
    ///
    /// # Errors
    ///
    /// Returns [`MoanaBloomError::InvalidParameter`] if `expected_elements`
    /// is zero or `false_positive_rate` is not in the open interval (0, 1).
    pub fn compute(expected_elements: u64, false_positive_rate: f64) -> Result<Self> {
        if expected_elements == 0 {
            return Err(MoanaBloomError::InvalidParameter(
                "expected_elements must be > 0".to_string(),
            ));
        }
        // The NaN case fails both comparisons' complements, so an explicit
        // !(a < b < c) form is required here.
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(MoanaBloomError::InvalidParameter(format!(
                "false_positive_rate must be in (0, 1), got {false_positive_rate}"
            )));
        }

        let n = expected_elements as f64;
        let ln2_squared = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let m = (-n * false_positive_rate.ln() / ln2_squared).ceil() as u64;
        let k = ((m as f64 / n) * std::f64::consts::LN_2).round().max(1.0) as u32;

        Ok(Self {
            expected_elements,
            false_positive_rate,
            bit_array_size: m,
            hash_rounds: k,
        })
    }

    /// Derive the sizing from a configuration.
    pub fn from_config(config: &MoanaBloomConfig) -> Result<Self> {
        Self::compute(config.expected_elements, config.false_positive_rate)
    }

    /// The caller's expected element count (n).
    pub fn expected_elements(&self) -> u64 {
        self.expected_elements
    }

    /// The caller's target false-positive rate (p).
    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    /// The bit array length in bits (m).
    pub fn bit_array_size(&self) -> u64 {
        self.bit_array_size
    }

    /// The number of bit positions probed or set per element (k).
    pub fn hash_rounds(&self) -> u32 {
        self.hash_rounds
    }

    /// The stored bit array length in bytes: `ceil(m / 8)`.
    pub fn byte_len(&self) -> usize {
        (self.bit_array_size as usize + 7) / 8
    }
}
