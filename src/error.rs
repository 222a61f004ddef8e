// Copyright (c) 2025 Moana Bloom Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Error types for the Moana Bloom filter.

use crate::store::StoreError;

/// Errors that can occur in Moana Bloom filter operations.
#[derive(Debug, thiserror::Error)]
pub enum MoanaBloomError {
    /// A construction argument was out of range. Raised immediately; no
    /// partially constructed filter is ever observable.
    #[error("invalid filter parameter: {0}")]
    InvalidParameter(String),

    /// The backing store failed during a fetch or store. The operation is
    /// aborted whole; the remote state is never left half-updated.
    #[error("backing store error: {0}")]
    BackingStore(#[from] StoreError),
}

/// Result type for Moana Bloom filter operations.
pub type Result<T> = std::result::Result<T, MoanaBloomError>;
