//! Convenience re-exports for common usage.

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{CacheConfig, StorageLocation};
pub use crate::error::CacheError;
pub use crate::memo::{Cache, Memoized, MemoizeStatus};
