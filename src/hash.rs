// Copyright (c) 2025 Moana Bloom Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Hash diffusion for the Moana Bloom filter.
//!
//! Turns one element byte sequence into `hash_rounds` bit positions in
//! `[0, bit_array_size)` via the double-hashing construction: two
//! independent base digests combined as `h1 + i * h2 (mod m)`. Because the
//! bit array is shared across processes and hosts, every digest here must be
//! stable across builds; only explicitly seeded hashers are used (never
//! `DefaultHasher`, whose keys are not guaranteed stable between Rust
//! releases).

use std::hash::Hasher;

use crate::config::FilterSpec;

/// A trait for diffusing one element into multiple bit positions.
pub(crate) trait MultiHasher {
    /// Compute `spec.hash_rounds()` positions for the element, each in
    /// `[0, spec.bit_array_size())`, in a deterministic order.
    fn positions(&self, element: &[u8], spec: &FilterSpec) -> Vec<u64>;
}

/// Second FNV-1a offset basis, the standard basis with its bytes reversed.
/// Starting the second digest from a different state decorrelates it from
/// the first over the same input bytes.
const SECOND_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325u64.swap_bytes();

/// Double hasher built on two FNV-1a digests with distinct offset bases.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FnvDoubleHasher;

impl FnvDoubleHasher {
    pub fn new() -> Self {
        Self
    }
}

impl MultiHasher for FnvDoubleHasher {
    fn positions(&self, element: &[u8], spec: &FilterSpec) -> Vec<u64> {
        let m = spec.bit_array_size();
        let rounds = spec.hash_rounds();

        let mut hasher = fnv::FnvHasher::default();
        hasher.write(element);
        let h1 = hasher.finish();

        let mut hasher = fnv::FnvHasher::with_key(SECOND_OFFSET_BASIS);
        hasher.write(element);
        let h2 = hasher.finish();

        // m is not a power of two, so positions reduce modulo m rather than
        // through a bit mask.
        (0..rounds as u64)
            .map(|i| h1.wrapping_add(i.wrapping_mul(h2)) % m)
            .collect()
    }
}
