// stats.rs - Optional match counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by a context when stats collection is enabled.
#[derive(Debug, Default)]
pub struct MatchStats {
    compiles: AtomicU64,
    linear_compiles: AtomicU64,
    linear_refusals: AtomicU64,
    linear_matches: AtomicU64,
    backtrack_matches: AtomicU64,
    fallbacks: AtomicU64,
    bool_only_matches: AtomicU64,
}

/// A point-in-time copy of `MatchStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub compiles: u64,
    pub linear_compiles: u64,
    pub linear_refusals: u64,
    pub linear_matches: u64,
    pub backtrack_matches: u64,
    pub fallbacks: u64,
    pub bool_only_matches: u64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Counter {
    Compile,
    LinearCompile,
    LinearRefusal,
    LinearMatch,
    BacktrackMatch,
    Fallback,
    BoolOnlyMatch,
}

impl MatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, c: Counter) -> &AtomicU64 {
        match c {
            Counter::Compile => &self.compiles,
            Counter::LinearCompile => &self.linear_compiles,
            Counter::LinearRefusal => &self.linear_refusals,
            Counter::LinearMatch => &self.linear_matches,
            Counter::BacktrackMatch => &self.backtrack_matches,
            Counter::Fallback => &self.fallbacks,
            Counter::BoolOnlyMatch => &self.bool_only_matches,
        }
    }

    pub(crate) fn bump(&self, c: Counter) {
        self.counter(c).fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c| self.counter(c).load(Ordering::Relaxed);
        StatsSnapshot {
            compiles: get(Counter::Compile),
            linear_compiles: get(Counter::LinearCompile),
            linear_refusals: get(Counter::LinearRefusal),
            linear_matches: get(Counter::LinearMatch),
            backtrack_matches: get(Counter::BacktrackMatch),
            fallbacks: get(Counter::Fallback),
            bool_only_matches: get(Counter::BoolOnlyMatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_bumps() {
        let stats = MatchStats::new();
        stats.bump(Counter::Fallback);
        stats.bump(Counter::Fallback);
        stats.bump(Counter::Compile);
        let snap = stats.snapshot();
        assert_eq!(snap.fallbacks, 2);
        assert_eq!(snap.compiles, 1);
        assert_eq!(snap.linear_matches, 0);
    }
}
