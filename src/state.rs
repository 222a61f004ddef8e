// Copyright (c) 2025 Moana Bloom Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Local working copy of the remotely stored filter state.
//!
//! The store holds one value per filter key: an 8-byte big-endian insertion
//! counter followed by the bit array bytes. Packing both into a single value
//! keeps a conditional write covering counter and bits together. The codec
//! must round-trip exactly; any length mismatch is treated as corruption
//! rather than silently reinterpreted.

use thiserror::Error;

/// Length of the counter prefix in the stored value.
const COUNTER_PREFIX_LEN: usize = 8;

/// A stored value whose length does not match the filter's sizing.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected {expected} bytes ({counter} counter + {bits} bit array), got {actual}")]
pub(crate) struct StateDecodeError {
    pub expected: usize,
    pub counter: usize,
    pub bits: usize,
    pub actual: usize,
}

/// Mutable bit array plus approximate insertion counter.
///
/// Instances live only for the duration of one fetch-mutate-store cycle;
/// nothing is cached across filter operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BitArrayState {
    bits: Vec<u8>,
    count: u64,
}

impl BitArrayState {
    /// A fresh all-zero state, as implied by an absent store key.
    pub fn zeroed(byte_len: usize) -> Self {
        Self {
            bits: vec![0u8; byte_len],
            count: 0,
        }
    }

    /// Decode a stored value, verifying the exact expected length.
    pub fn from_bytes(bytes: &[u8], byte_len: usize) -> Result<Self, StateDecodeError> {
        let expected = COUNTER_PREFIX_LEN + byte_len;
        if bytes.len() != expected {
            return Err(StateDecodeError {
                expected,
                counter: COUNTER_PREFIX_LEN,
                bits: byte_len,
                actual: bytes.len(),
            });
        }

        let mut prefix = [0u8; COUNTER_PREFIX_LEN];
        prefix.copy_from_slice(&bytes[..COUNTER_PREFIX_LEN]);

        Ok(Self {
            bits: bytes[COUNTER_PREFIX_LEN..].to_vec(),
            count: u64::from_be_bytes(prefix),
        })
    }

    /// Encode for storage: counter prefix then bit array bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(COUNTER_PREFIX_LEN + self.bits.len());
        out.extend_from_slice(&self.count.to_be_bytes());
        out.extend_from_slice(&self.bits);
        out
    }

    /// Set the bit at the given position to 1.
    pub fn set_bit(&mut self, position: u64) {
        let byte = (position / 8) as usize;
        let mask = 1u8 << (position % 8);
        self.bits[byte] |= mask;
    }

    /// Whether the bit at the given position is 1.
    pub fn test_bit(&self, position: u64) -> bool {
        let byte = (position / 8) as usize;
        let mask = 1u8 << (position % 8);
        self.bits[byte] & mask != 0
    }

    /// Bump the approximate insertion counter.
    pub fn increment(&mut self, by: u64) {
        self.count = self.count.saturating_add(by);
    }

    /// The approximate insertion counter.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total number of set bits across the array.
    pub fn set_bit_count(&self) -> u64 {
        self.bits.iter().map(|b| u64::from(b.count_ones())).sum()
    }
}
