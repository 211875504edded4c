//! Error types for the memocache library.
//!
//! ## Key Components
//!
//! - [`CacheError::SizeExceeded`]: a single value is larger than the high
//!   threshold and is rejected before any mutation.
//! - [`CacheError::InsufficientCapacity`]: even after evicting everything
//!   evictable, the incoming entry cannot fit.
//! - [`CacheError::Computation`] / [`CacheError::Serialize`] /
//!   [`CacheError::Deserialize`]: failures raised by the caller-supplied
//!   collaborators, propagated unchanged and never cached.
//! - [`CacheError::Storage`]: an underlying SQLite failure.
//!
//! Storage-side failures on the write path never replace a successfully
//! computed value; see [`crate::memo::MemoizeStatus::NotStored`].

use thiserror::Error;

/// Opaque error produced by a caller-supplied computation or codec.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the cache engine.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The value to be stored is larger than the high threshold on its own.
    /// Raised before any mutation; the store is left unchanged.
    #[error("entry of {size} bytes exceeds the high threshold of {high_threshold} bytes")]
    SizeExceeded {
        /// Serialized size of the rejected value.
        size: u64,
        /// Configured hard ceiling.
        high_threshold: u64,
    },

    /// Even after evicting everything evictable the incoming entry cannot
    /// fit under the high threshold.
    #[error(
        "entry of {size} bytes does not fit: {occupied} bytes remain occupied \
         after eviction (high threshold {high_threshold})"
    )]
    InsufficientCapacity {
        /// Serialized size of the rejected value.
        size: u64,
        /// Bytes still held by non-evictable entries.
        occupied: u64,
        /// Configured hard ceiling.
        high_threshold: u64,
    },

    /// Invalid cache configuration (builder validation).
    #[error("invalid cache configuration: {0}")]
    Config(String),

    /// The caller-supplied computation failed on a miss.
    #[error("computation failed: {0}")]
    Computation(#[source] BoxedError),

    /// The caller-supplied serializer failed.
    #[error("serialization failed: {0}")]
    Serialize(#[source] BoxedError),

    /// The caller-supplied deserializer failed on a hit.
    #[error("deserialization failed: {0}")]
    Deserialize(#[source] BoxedError),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl CacheError {
    /// True for the two capacity outcomes of the write path, which are
    /// best-effort from the memoizer's point of view.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            CacheError::SizeExceeded { .. } | CacheError::InsufficientCapacity { .. }
        )
    }
}
