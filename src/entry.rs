//! Persisted cache entry row.

use crate::fingerprint::Fingerprint;

/// One row of the entry store, keyed by fingerprint.
///
/// `insert_time` and `access_time` are fractional epoch seconds from the
/// injected clock; `access_time` is refreshed on every read hit.
/// `latency_gain_ms` is the wall-clock cost of the original computation and
/// must be positive for the eviction score to be defined.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Unique identifier, primary key.
    pub key: Fingerprint,
    /// When the entry was first written.
    pub insert_time: f64,
    /// Last read hit, updated in the same transaction as the read.
    pub access_time: f64,
    /// Wall-clock cost of the original computation, in milliseconds.
    pub latency_gain_ms: f64,
    /// Serialized result; its length drives all size accounting.
    pub data: Vec<u8>,
    /// Human-readable identity of the computation (diagnostic only).
    pub code_location: String,
    /// Version tag of the producing system (diagnostic only).
    pub version: String,
}

impl CacheEntry {
    /// Stored size of this entry in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
