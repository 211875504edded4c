//! Cache handle and memoize orchestration.
//!
//! [`Cache::memoize`] is the public entry point:
//!
//! ```text
//! MEMOIZE(id, version, params, compute, serialize, deserialize):
//!   key = fingerprint(id, version, params)
//!   if store.get(key) hits: return deserialize(bytes)      // Hit
//!   value = compute()                // elapsed wall clock -> latency_gain_ms
//!   store.put(entry(serialize(value)))                     // best effort
//!   return value                                           // Stored / NotStored
//! ```
//!
//! Caching is best-effort: a storage failure on the write path rides back in
//! [`MemoizeStatus::NotStored`] next to the freshly computed value instead of
//! replacing it. Computation and codec failures are genuine errors and are
//! never cached.
//!
//! There is no cache-stampede protection: two concurrent misses for the same
//! fingerprint both run the computation, and the later write upserts over the
//! earlier one. That is wasted work, not a correctness violation.

use std::sync::Arc;
use std::time::Instant;

use tracing::{trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{BoxedError, CacheError};
use crate::fingerprint::Fingerprint;
use crate::store::{CacheStats, EntryStore};

/// How a [`Memoized`] value was obtained and whether it was persisted.
#[derive(Debug)]
pub enum MemoizeStatus {
    /// Deserialized from the store; the computation did not run.
    Hit,
    /// Computed on a miss and persisted.
    Stored,
    /// Computed on a miss but not persisted; carries the storage failure.
    NotStored(CacheError),
}

/// A memoized value together with its caching outcome.
#[derive(Debug)]
pub struct Memoized<T> {
    pub value: T,
    pub status: MemoizeStatus,
}

impl<T> Memoized<T> {
    /// Unwraps the value, discarding the caching outcome.
    pub fn into_value(self) -> T {
        self.value
    }

    /// True when the value came from the store.
    pub fn is_hit(&self) -> bool {
        matches!(self.status, MemoizeStatus::Hit)
    }
}

/// Persistent memoization cache.
///
/// Owns the entry store and the injected clock. All operations go through
/// the store's per-operation transactions; dropping the cache closes the
/// underlying connection.
pub struct Cache {
    store: EntryStore,
    clock: Arc<dyn Clock>,
}

impl Cache {
    /// Opens a cache with the system wall clock.
    pub fn open(config: CacheConfig) -> Result<Self, CacheError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Opens a cache with an injected clock, for deterministic tests.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        Ok(Self {
            store: EntryStore::open(config)?,
            clock,
        })
    }

    /// Returns the cached result for `(computation_id, version, params)`, or
    /// runs `compute`, stores its serialized result, and returns it.
    ///
    /// `computation_id` is a caller-supplied stable identity for the
    /// computation; nothing is derived by introspection. `params` must
    /// already be serialized by the caller so the fingerprint is reproducible
    /// across environments.
    ///
    /// On a hit the returned value has round-tripped through
    /// `serialize`/`deserialize`; on a miss it is the native value from
    /// `compute`. The two must be observably equivalent for a deterministic
    /// computation.
    pub fn memoize<T, C, S, D>(
        &self,
        computation_id: &str,
        version: &str,
        params: &[u8],
        compute: C,
        serialize: S,
        deserialize: D,
    ) -> Result<Memoized<T>, CacheError>
    where
        C: FnOnce() -> Result<T, BoxedError>,
        S: FnOnce(&T) -> Result<Vec<u8>, BoxedError>,
        D: FnOnce(&[u8]) -> Result<T, BoxedError>,
    {
        let key = Fingerprint::compute(computation_id, version, params);

        if let Some(bytes) = self.store.get(&key, self.clock.now())? {
            trace!(%key, computation_id, "hit");
            let value = deserialize(&bytes).map_err(CacheError::Deserialize)?;
            return Ok(Memoized {
                value,
                status: MemoizeStatus::Hit,
            });
        }
        trace!(%key, computation_id, "miss");

        let started = Instant::now();
        let value = compute().map_err(CacheError::Computation)?;
        // clamp: a sub-resolution delta would make the score undefined and
        // the entry permanently non-evictable
        let latency_gain_ms = (started.elapsed().as_secs_f64() * 1_000.0).max(1e-6);

        let data = serialize(&value).map_err(CacheError::Serialize)?;
        let now = self.clock.now();
        let entry = CacheEntry {
            key,
            insert_time: now,
            access_time: now,
            latency_gain_ms,
            data,
            code_location: computation_id.to_string(),
            version: version.to_string(),
        };

        let status = match self.store.put(entry, now) {
            Ok(()) => MemoizeStatus::Stored,
            Err(err) => {
                warn!(%key, computation_id, error = %err, "computed value not cached");
                MemoizeStatus::NotStored(err)
            }
        };
        Ok(Memoized { value, status })
    }

    /// Number of stored entries.
    pub fn count(&self) -> Result<u64, CacheError> {
        self.store.count()
    }

    /// Sum of stored payload sizes in bytes.
    pub fn total_size(&self) -> Result<u64, CacheError> {
        self.store.total_size()
    }

    /// Per-entry size listing.
    pub fn list_sizes(&self) -> Result<Vec<(Fingerprint, u64)>, CacheError> {
        self.store.list_sizes()
    }

    /// Full-table dump.
    pub fn entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        self.store.entries()
    }

    /// Removes all entries.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.store.clear()
    }

    /// Hit/miss/insert/eviction counters since the cache was opened.
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Hard ceiling on total and per-entry size, in bytes.
    pub fn high_threshold(&self) -> u64 {
        self.store.config().high_threshold
    }

    /// Target bytes to free per eviction pass.
    pub fn low_threshold(&self) -> u64 {
        self.store.config().low_threshold
    }
}
