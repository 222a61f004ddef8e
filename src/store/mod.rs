// Copyright (c) 2025 Moana Bloom Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Backing store port for the Moana Bloom filter.
//!
//! The filter talks to its shared cache through [`BitArrayStore`], a narrow
//! key-value surface with an optional conditional-write primitive. Network
//! transport, timeouts, and retry policy all belong to the adapter behind
//! this trait, not to the filter core. The in-tree [`memory`] adapter backs
//! tests and serves as a local stand-in.

use async_trait::async_trait;

pub mod memory;

/// Opaque version token for conditional writes, analogous to a memcache
/// CAS id. Tokens are only meaningful to the store that issued them.
pub type Version = u64;

/// Errors surfaced by a backing store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store backend failed (connection refused, server error, ...).
    #[error("backend failure: {0}")]
    Backend(String),

    /// An I/O error from the transport.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A conditional write kept losing to concurrent writers until the
    /// configured attempts ran out.
    #[error("compare-and-swap conflict on key {key:?} after {attempts} attempts")]
    CasConflict { key: String, attempts: u32 },

    /// The stored value does not round-trip through the filter's codec,
    /// usually because another filter with different sizing wrote the key.
    #[error("stored value for key {key:?} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Key-value store holding filter state, shared across processes and hosts.
///
/// Implementations must round-trip stored bytes exactly. `fetch` returning
/// `None` means the key was never written (or was evicted); the filter
/// treats that as a fresh all-zero state, never as an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BitArrayStore: Send + Sync {
    /// Read the value and its current version token, or `None` if absent.
    async fn fetch(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>, StoreError>;

    /// Write the value unconditionally, replacing whatever is stored.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Write the value only if the key is currently absent. Returns whether
    /// the write happened.
    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, StoreError>;

    /// Write the value only if the key's version still matches the token
    /// from an earlier `fetch`. Returns whether the write happened; `false`
    /// covers both a version mismatch and a key deleted in the meantime.
    async fn compare_and_swap(
        &self,
        key: &str,
        value: Vec<u8>,
        version: Version,
    ) -> Result<bool, StoreError>;
}

// Filters take their store by value; wrapping the adapter in an `Arc` lets
// any number of filters in one process share it.
#[async_trait]
impl<S: BitArrayStore + ?Sized> BitArrayStore for std::sync::Arc<S> {
    async fn fetch(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>, StoreError> {
        (**self).fetch(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).put(key, value).await
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, StoreError> {
        (**self).put_if_absent(key, value).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        value: Vec<u8>,
        version: Version,
    ) -> Result<bool, StoreError> {
        (**self).compare_and_swap(key, value, version).await
    }
}
