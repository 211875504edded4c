//! SQLite-backed entry store.
//!
//! One table, one row per fingerprint:
//!
//! ```text
//! cache_entries(key BLOB PRIMARY KEY, insert_time REAL, access_time REAL,
//!               latency_gain_ms REAL, data BLOB, code_location TEXT,
//!               version TEXT)
//! ```
//!
//! Every public operation runs inside a single transaction, so the
//! read-plus-touch pair on hits and the check/evict/upsert sequence on writes
//! are each atomic with respect to other writers. The connection sits behind
//! a mutex; the store is a plain owned handle with no ambient global state,
//! so tests can open as many independent stores as they like.
//!
//! ## Write path
//!
//! ```text
//! PUT(entry, now):
//!   reject with SizeExceeded if len(data) > high_threshold
//!   BEGIN IMMEDIATE
//!     total = SUM(length(data))
//!     if total + len(data) >= high_threshold:
//!       plan = cost_aware::plan_eviction(all rows, min(low, high - len), now)
//!       delete plan.victims
//!       if remaining + len(data) > high_threshold:
//!         COMMIT the deletions, fail with InsufficientCapacity
//!     INSERT OR REPLACE the entry
//!   COMMIT
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, ToSql, TransactionBehavior};
use tracing::debug;

use crate::config::{CacheConfig, StorageLocation};
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::fingerprint::{Fingerprint, FINGERPRINT_LEN};
use crate::policy::cost_aware::{plan_eviction, Candidate};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cache_entries (
    key             BLOB PRIMARY KEY,
    insert_time     REAL NOT NULL,
    access_time     REAL NOT NULL,
    latency_gain_ms REAL NOT NULL,
    data            BLOB NOT NULL,
    code_location   TEXT NOT NULL,
    version         TEXT NOT NULL
)";

impl ToSql for Fingerprint {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(&self.as_bytes()[..]))
    }
}

impl FromSql for Fingerprint {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let bytes = value.as_blob()?;
        Fingerprint::from_slice(bytes).ok_or(FromSqlError::InvalidBlobSize {
            expected_size: FINGERPRINT_LEN,
            blob_size: bytes.len(),
        })
    }
}

/// Snapshot of store activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

impl StoreCounters {
    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Persistent table of cache entries with atomic operations.
pub struct EntryStore {
    conn: Mutex<Connection>,
    config: CacheConfig,
    counters: StoreCounters,
}

impl EntryStore {
    /// Opens (and creates if missing) the store described by `config`.
    pub fn open(config: CacheConfig) -> Result<Self, CacheError> {
        config.validate()?;
        let conn = match &config.storage {
            StorageLocation::InMemory => Connection::open_in_memory()?,
            StorageLocation::Disk(path) => Connection::open(path)?,
        };
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
            config,
            counters: StoreCounters::default(),
        })
    }

    /// Configuration this store was opened with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the stored payload for `key` if present, refreshing its
    /// access time to `now` in the same transaction.
    pub fn get(&self, key: &Fingerprint, now: f64) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let data: Option<Vec<u8>> = tx
            .query_row(
                "SELECT data FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if data.is_some() {
            tx.execute(
                "UPDATE cache_entries SET access_time = ?1 WHERE key = ?2",
                params![now, key],
            )?;
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
        }
        tx.commit()?;
        Ok(data)
    }

    /// Upserts `entry`, evicting first if the ceiling would be crossed.
    ///
    /// Fails with [`CacheError::SizeExceeded`] before any mutation when the
    /// entry alone is larger than the high threshold, and with
    /// [`CacheError::InsufficientCapacity`] when even a full eviction pass
    /// cannot make it fit. In the latter case the eviction itself persists;
    /// the policy has already deleted everything it may.
    pub fn put(&self, entry: CacheEntry, now: f64) -> Result<(), CacheError> {
        let size = entry.size();
        let high = self.config.high_threshold;
        if size > high {
            return Err(CacheError::SizeExceeded {
                size,
                high_threshold: high,
            });
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let total = total_size_of(&tx)?;
        if total + size >= high {
            let target = self.config.eviction_target(size);
            let plan = plan_eviction(candidates_of(&tx)?, target, now);
            debug!(
                target_bytes = target,
                freed_bytes = plan.freed,
                victims = plan.victims.len(),
                "eviction pass"
            );
            delete_keys(&tx, &plan.victims)?;
            self.counters
                .evictions
                .fetch_add(plan.victims.len() as u64, Ordering::Relaxed);

            let occupied = total_size_of(&tx)?;
            if occupied + size > high {
                // keep the deletions: the policy freed everything it could
                tx.commit()?;
                return Err(CacheError::InsufficientCapacity {
                    size,
                    occupied,
                    high_threshold: high,
                });
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO cache_entries \
             (key, insert_time, access_time, latency_gain_ms, data, code_location, version) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.key,
                entry.insert_time,
                entry.access_time,
                entry.latency_gain_ms,
                entry.data,
                entry.code_location,
                entry.version,
            ],
        )?;
        tx.commit()?;
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Sum of stored payload sizes in bytes, 0 when empty.
    pub fn total_size(&self) -> Result<u64, CacheError> {
        let conn = self.conn.lock();
        Ok(total_size_of(&conn)?)
    }

    /// Number of stored entries.
    pub fn count(&self) -> Result<u64, CacheError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Per-entry size listing for diagnostics.
    pub fn list_sizes(&self) -> Result<Vec<(Fingerprint, u64)>, CacheError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, length(data) FROM cache_entries")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(CacheError::from)
    }

    /// Full-table dump for diagnostics.
    pub fn entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT key, insert_time, access_time, latency_gain_ms, data, code_location, version \
             FROM cache_entries",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CacheEntry {
                key: row.get(0)?,
                insert_time: row.get(1)?,
                access_time: row.get(2)?,
                latency_gain_ms: row.get(3)?,
                data: row.get(4)?,
                code_location: row.get(5)?,
                version: row.get(6)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(CacheError::from)
    }

    /// Atomic bulk delete.
    pub fn delete_many(&self, keys: &[Fingerprint]) -> Result<(), CacheError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        delete_keys(&tx, keys)?;
        tx.commit()?;
        Ok(())
    }

    /// Removes all entries; count and total size drop to zero and the store
    /// stays usable.
    pub fn clear(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM cache_entries", [])?;
        Ok(())
    }

    /// Snapshot of hit/miss/insert/eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

fn total_size_of(conn: &Connection) -> rusqlite::Result<u64> {
    conn.query_row(
        "SELECT COALESCE(SUM(length(data)), 0) FROM cache_entries",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|total| total as u64)
}

fn candidates_of(conn: &Connection) -> rusqlite::Result<Vec<Candidate>> {
    let mut stmt = conn
        .prepare("SELECT key, access_time, latency_gain_ms, length(data) FROM cache_entries")?;
    let rows = stmt.query_map([], |row| {
        Ok(Candidate {
            key: row.get(0)?,
            access_time: row.get(1)?,
            latency_gain_ms: row.get(2)?,
            size: row.get::<_, i64>(3)? as u64,
        })
    })?;
    rows.collect()
}

fn delete_keys(conn: &Connection, keys: &[Fingerprint]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("DELETE FROM cache_entries WHERE key = ?1")?;
    for key in keys {
        stmt.execute(params![key])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn small_store(high: u64, low: u64) -> EntryStore {
        let config = CacheConfig::builder()
            .high_threshold(high)
            .low_threshold(low)
            .in_memory()
            .build()
            .unwrap();
        EntryStore::open(config).unwrap()
    }

    fn entry(tag: u8, size: usize, access_time: f64, latency_gain_ms: f64) -> CacheEntry {
        CacheEntry {
            key: Fingerprint::compute("store-test", "0", &[tag]),
            insert_time: access_time,
            access_time,
            latency_gain_ms,
            data: vec![tag; size],
            code_location: format!("job-{tag}"),
            version: "0.1.0".into(),
        }
    }

    #[test]
    fn put_get_round_trip_refreshes_access_time() {
        let store = small_store(1_000, 500);
        let e = entry(1, 10, 10.0, 5.0);
        store.put(e.clone(), 10.0).unwrap();

        let data = store.get(&e.key, 50.0).unwrap();
        assert_eq!(data.as_deref(), Some(&e.data[..]));

        let rows = store.entries().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].access_time, 50.0);
        assert_eq!(rows[0].insert_time, 10.0);
    }

    #[test]
    fn get_missing_key_is_none() {
        let store = small_store(1_000, 500);
        let key = Fingerprint::compute("absent", "0", b"");
        assert_eq!(store.get(&key, 1.0).unwrap(), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let store = small_store(1_000, 500);
        let mut e = entry(1, 10, 10.0, 5.0);
        store.put(e.clone(), 10.0).unwrap();
        e.data = vec![9; 20];
        store.put(e.clone(), 11.0).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.total_size().unwrap(), 20);
    }

    #[test]
    fn totals_and_listing_track_contents() {
        let store = small_store(1_000, 500);
        assert_eq!(store.total_size().unwrap(), 0);
        assert_eq!(store.count().unwrap(), 0);

        let a = entry(1, 100, 10.0, 5.0);
        let b = entry(2, 200, 10.0, 5.0);
        store.put(a.clone(), 10.0).unwrap();
        store.put(b.clone(), 10.0).unwrap();

        assert_eq!(store.total_size().unwrap(), 300);
        assert_eq!(store.count().unwrap(), 2);

        let mut sizes = store.list_sizes().unwrap();
        sizes.sort_by_key(|(_, size)| *size);
        assert_eq!(sizes, vec![(a.key, 100), (b.key, 200)]);
    }

    #[test]
    fn oversized_entry_is_rejected_without_mutation() {
        let store = small_store(100, 50);
        store.put(entry(1, 40, 10.0, 5.0), 10.0).unwrap();

        let err = store.put(entry(2, 101, 10.0, 5.0), 10.0).unwrap_err();
        assert!(matches!(err, CacheError::SizeExceeded { size: 101, .. }));
        assert_eq!(store.total_size().unwrap(), 40);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn crossing_the_ceiling_evicts_lowest_scored_entries() {
        let store = small_store(1_000, 500);
        // stale and cheap, scores lowest
        store.put(entry(1, 600, 10.0, 1.0), 10.0).unwrap();
        // fresh and expensive, scores highest
        store.put(entry(2, 300, 990.0, 1_000.0), 990.0).unwrap();

        // 900 + 200 >= 1000 triggers a pass with target min(500, 800)
        let incoming = entry(3, 200, 1_000.0, 50.0);
        store.put(incoming.clone(), 1_000.0).unwrap();

        let keys: Vec<_> = store.entries().unwrap().into_iter().map(|e| e.key).collect();
        assert!(keys.contains(&incoming.key));
        assert!(keys.contains(&entry(2, 0, 0.0, 1.0).key));
        assert!(!keys.contains(&entry(1, 0, 0.0, 1.0).key));
        assert_eq!(store.total_size().unwrap(), 500);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn insufficient_capacity_when_everything_left_is_fresh() {
        let store = small_store(1_000, 500);
        // access_time == eviction time, so the entry is non-evictable
        store.put(entry(1, 600, 100.0, 5.0), 100.0).unwrap();

        let err = store.put(entry(2, 500, 100.0, 5.0), 100.0).unwrap_err();
        assert!(matches!(
            err,
            CacheError::InsufficientCapacity {
                size: 500,
                occupied: 600,
                ..
            }
        ));
        // the resident entry survived, the incoming one was never written
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.total_size().unwrap(), 600);
    }

    #[test]
    fn delete_many_and_clear_reset_accounting() {
        let store = small_store(1_000, 500);
        let a = entry(1, 100, 10.0, 5.0);
        let b = entry(2, 100, 10.0, 5.0);
        let c = entry(3, 100, 10.0, 5.0);
        for e in [&a, &b, &c] {
            store.put(e.clone(), 10.0).unwrap();
        }

        store.delete_many(&[a.key, b.key]).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.total_size().unwrap(), 100);

        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.total_size().unwrap(), 0);
    }

    #[test]
    fn exact_fit_after_eviction_is_allowed() {
        let store = small_store(1_000, 1_000);
        store.put(entry(1, 400, 10.0, 1.0), 10.0).unwrap();
        // 400 + 600 >= 1000: evicts the stale entry, then 0 + 600 fits
        store.put(entry(2, 600, 500.0, 1.0), 500.0).unwrap();
        assert_eq!(store.total_size().unwrap(), 600);
        assert_eq!(store.count().unwrap(), 1);
    }
}
