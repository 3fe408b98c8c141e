// engine.rs - Matching engine interfaces.
//
// Two pluggable backends sit behind these traits: a general
// backtracking engine (always able to compile a valid pattern) and a
// linear-time engine (may refuse a pattern or encoding). Programs are
// immutable and shared across threads; a search never mutates them.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::encoding::EncodingRef;
use crate::error::RegexpError;
use crate::options::Options;
use crate::syntax::NameTable;

/// Per-group `(begin, end)` byte offsets; `None` for a group that did
/// not participate.
pub type Spans = SmallVec<[Option<(usize, usize)>; 8]>;

/// Outcome of one engine attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Matched(T),
    /// The engine cannot run this request; try the other one.
    NotEligible,
    NoMatch,
}

impl<T> Attempt<T> {
    pub fn is_matched(&self) -> bool {
        matches!(self, Attempt::Matched(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U> {
        match self {
            Attempt::Matched(t) => Attempt::Matched(f(t)),
            Attempt::NotEligible => Attempt::NotEligible,
            Attempt::NoMatch => Attempt::NoMatch,
        }
    }
}

/// Search window, relative to the haystack the engine is given.
///
/// A forward search looks for the leftmost match starting in
/// `from..=to`. With `backward` set, `from >= to` and the rightmost
/// match starting in `to..=from` is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRange {
    pub from: usize,
    pub to: usize,
    pub backward: bool,
    /// The match must start exactly at `from`.
    pub only_at_start: bool,
}

impl SearchRange {
    pub fn forward(from: usize, to: usize) -> Self {
        SearchRange {
            from,
            to,
            backward: false,
            only_at_start: false,
        }
    }

    /// Lowest and highest allowed start positions.
    pub fn bounds(&self) -> (usize, usize) {
        if self.backward {
            (self.to, self.from)
        } else {
            (self.from, self.to)
        }
    }
}

// === Cancellation ===

/// Cooperative cancellation flag, polled between engine attempts.
///
/// A single forward backtracking attempt runs to completion once
/// started; it is bounded by the engine's backtrack limit, not by the
/// token.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Interrupted)` once cancelled.
    pub fn check(&self) -> Result<(), RegexpError> {
        if self.is_cancelled() {
            Err(RegexpError::Interrupted)
        } else {
            Ok(())
        }
    }
}

// === Backtracking engine ===

/// A pattern compiled by the backtracking engine for one encoding.
pub trait BacktrackProgram: Send + Sync + fmt::Debug {
    /// Number of capture groups, excluding group 0.
    fn group_count(&self) -> usize;

    /// Named groups and their numbers.
    fn names(&self) -> &NameTable;

    /// Search `haystack`; on a match, spans for groups `0..=group_count`.
    fn search(
        &self,
        haystack: &[u8],
        range: &SearchRange,
        cancel: &CancelToken,
    ) -> Result<Option<Spans>, RegexpError>;

    /// Convert `haystack` once for repeated searches over it. `None`
    /// when the engine searches raw bytes directly.
    fn prepare(&self, _haystack: &[u8]) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }

    /// `search` over a haystack already converted by `prepare`.
    fn search_prepared(
        &self,
        haystack: &[u8],
        _prepared: &(dyn Any + Send + Sync),
        range: &SearchRange,
        cancel: &CancelToken,
    ) -> Result<Option<Spans>, RegexpError> {
        self.search(haystack, range, cancel)
    }
}

/// Compiles canonical pattern bytes for the backtracking engine.
pub trait BacktrackEngine: Send + Sync {
    fn compile(
        &self,
        pattern: &[u8],
        encoding: EncodingRef,
        options: &Options,
    ) -> Result<Arc<dyn BacktrackProgram>, RegexpError>;
}

// === Linear engine ===

/// Groups of a linear-engine match, read on demand.
pub trait LinearMatch: Send + Sync + fmt::Debug {
    fn group_count(&self) -> usize;

    /// Bounds of group `index`, relative to the searched haystack.
    fn group(&self, index: usize) -> Option<(usize, usize)>;
}

/// A pattern compiled by the linear engine.
pub trait LinearProgram: Send + Sync + fmt::Debug {
    /// True when the engine accepted the pattern but runs it by
    /// backtracking internally.
    fn is_backtracking(&self) -> bool {
        false
    }

    fn group_count(&self) -> usize;

    fn search(
        &self,
        haystack: &[u8],
        range: &SearchRange,
    ) -> Result<Option<Arc<dyn LinearMatch>>, RegexpError>;
}

/// Compiles canonical pattern bytes for the linear engine, or refuses.
pub trait LinearEngine: Send + Sync {
    /// `None` when the engine cannot express the pattern under this
    /// encoding. `only_at_start` selects an anchored program.
    fn compile(
        &self,
        pattern: &[u8],
        encoding: EncodingRef,
        options: &Options,
        only_at_start: bool,
    ) -> Option<Arc<dyn LinearProgram>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds() {
        let fwd = SearchRange::forward(2, 9);
        assert_eq!(fwd.bounds(), (2, 9));
        let back = SearchRange {
            from: 9,
            to: 2,
            backward: true,
            only_at_start: false,
        };
        assert_eq!(back.bounds(), (2, 9));
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert_eq!(token.check(), Err(RegexpError::Interrupted));
    }

    #[test]
    fn attempt_map() {
        let a: Attempt<u8> = Attempt::Matched(2);
        assert_eq!(a.map(|x| x * 2), Attempt::Matched(4));
        assert!(!Attempt::<u8>::NoMatch.is_matched());
    }
}
