//! Persistent entry storage.
//!
//! One backend ships today: [`sqlite`], an embedded SQLite table with one row
//! per fingerprint. Policies plan over snapshots taken inside the store's
//! transactions; the store owns all mutation.

pub mod sqlite;

pub use sqlite::{CacheStats, EntryStore};
