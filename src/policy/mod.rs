//! Eviction policies.
//!
//! One policy ships today: [`cost_aware`], a recency/cost/size-weighted
//! variant of greedy-dual-size eviction. The policy is pure: it plans over a
//! snapshot of scoring rows and returns the keys to delete, so the store can
//! execute the deletion inside the same transaction that triggered it.

pub mod cost_aware;

pub use cost_aware::{plan_eviction, score, Candidate, EvictionPlan};
