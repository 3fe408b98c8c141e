// region.rs - Match region: per-group byte bounds.
//
// Bounds are stored as atomics so a shared match result can resolve
// lazily-computed groups from several threads. A bound is `LAZY` until
// first read, then written exactly once with the value the backend
// reports; racing resolvers compute the same value, and the first
// compare-exchange wins.

use std::fmt;
use std::sync::atomic::{AtomicIsize, Ordering};

use crate::engine::Spans;

/// Group did not participate in the match.
pub const REGION_MISSING: isize = -1;
/// Group not read from the backend yet.
pub const REGION_LAZY: isize = -2;

/// A decoded region bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lazy,
    Missing,
    At(usize),
}

impl Bound {
    fn from_raw(raw: isize) -> Bound {
        match raw {
            REGION_LAZY => Bound::Lazy,
            r if r < 0 => Bound::Missing,
            r => Bound::At(r as usize),
        }
    }

    pub fn raw(self) -> isize {
        match self {
            Bound::Lazy => REGION_LAZY,
            Bound::Missing => REGION_MISSING,
            Bound::At(n) => n as isize,
        }
    }

    pub fn position(self) -> Option<usize> {
        match self {
            Bound::At(n) => Some(n),
            _ => None,
        }
    }
}

pub struct MatchRegion {
    beg: Box<[AtomicIsize]>,
    end: Box<[AtomicIsize]>,
}

fn filled(n: usize, raw: isize) -> Box<[AtomicIsize]> {
    (0..n).map(|_| AtomicIsize::new(raw)).collect()
}

impl MatchRegion {
    /// A region with every bound `LAZY`.
    pub fn lazy(num_regs: usize) -> Self {
        MatchRegion {
            beg: filled(num_regs, REGION_LAZY),
            end: filled(num_regs, REGION_LAZY),
        }
    }

    /// A fully resolved region.
    pub fn from_spans(spans: &Spans) -> Self {
        let raw = |f: fn(&(usize, usize)) -> usize| -> Box<[AtomicIsize]> {
            spans
                .iter()
                .map(|s| AtomicIsize::new(s.as_ref().map_or(REGION_MISSING, |s| f(s) as isize)))
                .collect()
        };
        MatchRegion {
            beg: raw(|s| s.0),
            end: raw(|s| s.1),
        }
    }

    pub fn num_regs(&self) -> usize {
        self.beg.len()
    }

    pub fn begin(&self, i: usize) -> Bound {
        Bound::from_raw(self.beg[i].load(Ordering::Acquire))
    }

    pub fn end(&self, i: usize) -> Bound {
        Bound::from_raw(self.end[i].load(Ordering::Acquire))
    }

    pub fn is_lazy(&self, i: usize) -> bool {
        self.begin(i) == Bound::Lazy || self.end(i) == Bound::Lazy
    }

    /// Bounds of group `i`, computing them with `fetch` if still lazy.
    ///
    /// `fetch` must be deterministic: concurrent callers may both run it,
    /// and only the first result is stored.
    pub fn resolve_with<F>(&self, i: usize, fetch: F) -> Option<(usize, usize)>
    where
        F: FnOnce(usize) -> Option<(usize, usize)>,
    {
        if self.is_lazy(i) {
            let (b, e) = match fetch(i) {
                Some((b, e)) => (b as isize, e as isize),
                None => (REGION_MISSING, REGION_MISSING),
            };
            let publish = |slot: &AtomicIsize, v: isize| {
                let _ = slot.compare_exchange(REGION_LAZY, v, Ordering::AcqRel, Ordering::Acquire);
            };
            publish(&self.beg[i], b);
            publish(&self.end[i], e);
        }
        match (self.begin(i), self.end(i)) {
            (Bound::At(b), Bound::At(e)) => Some((b, e)),
            _ => None,
        }
    }

    /// Resolve every lazy group.
    pub fn resolve_all_with<F>(&self, fetch: F)
    where
        F: Fn(usize) -> Option<(usize, usize)>,
    {
        for i in 0..self.num_regs() {
            self.resolve_with(i, &fetch);
        }
    }

    /// Add `delta` to every resolved bound. Lazy bounds are left alone,
    /// so resolve first.
    pub fn shift(&mut self, delta: usize) {
        for slot in self.beg.iter_mut().chain(self.end.iter_mut()) {
            let v = slot.get_mut();
            if *v >= 0 {
                *v += delta as isize;
            }
        }
    }
}

impl fmt::Debug for MatchRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries((0..self.num_regs()).map(|i| (self.begin(i), self.end(i))))
            .finish()
    }
}
