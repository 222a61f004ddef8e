// Copyright (c) 2025 Moana Bloom Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! In-memory [`BitArrayStore`] adapter.
//!
//! Backed by a concurrent map; each operation holds the key's shard entry
//! for its duration, so `put_if_absent` and `compare_and_swap` are atomic
//! with respect to each other. Useful for tests and as a single-process
//! stand-in for a real shared cache.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::store::{BitArrayStore, StoreError, Version};

#[derive(Debug, Clone)]
struct VersionedValue {
    version: Version,
    bytes: Vec<u8>,
}

/// In-memory key-value store with versioned conditional writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, VersionedValue>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl BitArrayStore for MemoryStore {
    async fn fetch(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>, StoreError> {
        Ok(self
            .entries
            .get(key)
            .map(|entry| (entry.bytes.clone(), entry.version)))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let stored = occupied.get_mut();
                stored.version += 1;
                stored.bytes = value;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(VersionedValue {
                    version: 1,
                    bytes: value,
                });
            }
        }
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, StoreError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(VersionedValue {
                    version: 1,
                    bytes: value,
                });
                Ok(true)
            }
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        value: Vec<u8>,
        version: Version,
    ) -> Result<bool, StoreError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().version == version => {
                let stored = occupied.get_mut();
                stored.version += 1;
                stored.bytes = value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
