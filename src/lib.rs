//! memocache: persistent, size-bounded memoization with cost-aware eviction.
//!
//! Results of expensive deterministic computations are stored in an embedded
//! SQLite table, keyed by a fingerprint of (computation id, version,
//! serialized input), and served from the table on later calls instead of
//! being recomputed. The store survives process restarts; total stored size
//! is kept under a configured ceiling by evicting the least valuable entries,
//! scored on recency, recomputation cost, and size.
//!
//! See [`memo::Cache`] for the public entry point and
//! [`policy::cost_aware`] for the eviction algorithm.

pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod memo;
pub mod policy;
pub mod prelude;
pub mod store;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{CacheConfig, CacheConfigBuilder, StorageLocation};
pub use crate::entry::CacheEntry;
pub use crate::error::CacheError;
pub use crate::fingerprint::Fingerprint;
pub use crate::memo::{Cache, Memoized, MemoizeStatus};
pub use crate::store::{CacheStats, EntryStore};
