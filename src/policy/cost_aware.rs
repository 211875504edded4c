//! Cost-aware eviction: recency/cost/size-weighted greedy-dual-size.
//!
//! Each entry gets a value score at eviction time:
//!
//! ```text
//! score(e) = ln(1 / (now - e.access_time)) + 2*ln(e.latency_gain_ms) - ln(len(e.data))
//! ```
//!
//! | Term                          | Effect                                      |
//! |-------------------------------|---------------------------------------------|
//! | `ln(1 / (now - access_time))` | Long-idle entries score lower               |
//! | `2 * ln(latency_gain_ms)`     | Expensive-to-recompute entries score higher |
//! | `- ln(len(data))`             | Large entries score lower                   |
//!
//! ## Algorithm
//!
//! ```text
//! PLAN(candidates, target, now):
//!   score every candidate
//!   sort ascending by score
//!   freed = 0
//!   for each tie-group (run of equal scores), lowest first:
//!     if freed >= target: stop
//!     if group score is +inf: stop        // non-evictable
//!     take the whole group, freed += group size
//!   return selected keys and freed bytes
//! ```
//!
//! Tie-groups are eviction-atomic: entries with exactly equal scores are
//! selected all-or-none, so the freed-size target may be overshot but the
//! score order is never split. If even selecting every evictable entry cannot
//! reach the target, the plan contains all of them and the caller re-checks
//! capacity.
//!
//! ## Undefined scores
//!
//! `now == access_time` would divide by zero and `latency_gain_ms <= 0`
//! has no logarithm. Both cases score `+inf`: the entry counts as just
//! accessed at maximal freshness and is never evicted.

use std::cmp::Ordering;

use crate::fingerprint::Fingerprint;

/// Scoring inputs for one stored entry, snapshotted inside the eviction
/// transaction.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Entry key.
    pub key: Fingerprint,
    /// Last read hit, fractional epoch seconds.
    pub access_time: f64,
    /// Wall-clock cost of the original computation, milliseconds.
    pub latency_gain_ms: f64,
    /// Stored size in bytes.
    pub size: u64,
}

/// Keys selected for deletion and the bytes they free.
#[derive(Debug, Clone, Default)]
pub struct EvictionPlan {
    /// Keys to delete, lowest-scored first.
    pub victims: Vec<Fingerprint>,
    /// Combined size of the victims in bytes.
    pub freed: u64,
}

/// Value score of one candidate at time `now`.
///
/// Returns `+inf` (never evicted) when the formula is undefined: the entry
/// was accessed at or after `now`, or its recorded latency is non-positive.
pub fn score(candidate: &Candidate, now: f64) -> f64 {
    let idle = now - candidate.access_time;
    if idle <= 0.0 || candidate.latency_gain_ms <= 0.0 {
        return f64::INFINITY;
    }
    (1.0 / idle).ln() + 2.0 * candidate.latency_gain_ms.ln() - (candidate.size as f64).ln()
}

/// Plans which entries to evict so that at least `target` bytes are freed.
///
/// Selects complete tie-groups in ascending score order until the cumulative
/// size reaches `target` or only non-evictable (`+inf`) entries remain.
pub fn plan_eviction(candidates: Vec<Candidate>, target: u64, now: f64) -> EvictionPlan {
    let mut plan = EvictionPlan::default();
    if target == 0 || candidates.is_empty() {
        return plan;
    }

    let mut scored: Vec<(f64, Candidate)> = candidates
        .into_iter()
        .map(|c| (score(&c, now), c))
        .collect();
    // scores are never NaN: undefined cases map to +inf above
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let mut i = 0;
    while i < scored.len() && plan.freed < target {
        let group_score = scored[i].0;
        if group_score == f64::INFINITY {
            break;
        }
        let mut j = i;
        while j < scored.len() && scored[j].0 == group_score {
            plan.freed += scored[j].1.size;
            plan.victims.push(scored[j].1.key);
            j += 1;
        }
        i = j;
    }
    plan
}
