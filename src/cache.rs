// cache.rs - Compiled-form caches.
//
// PatternCache interns compiled patterns for a context. EncodingCache
// holds a pattern's backtracking programs for encodings other than its
// own. TRegexCache holds its linear programs, one slot per built-in
// encoding and anchoring mode.
//
// Lookups take a shared lock. A miss compiles with no lock held and
// publishes under the write lock; if another thread published first,
// its value wins and ours is dropped.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use log::{debug, trace};

use crate::compile::Regexp;
use crate::encoding::{Builtin, EncodingRef};
use crate::engine::{BacktrackProgram, LinearProgram};
use crate::error::RegexpError;
use crate::options::Options;

// === PatternCache ===

/// Identity of an interned pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternKey {
    pub source: Box<[u8]>,
    pub canonical: Box<[u8]>,
    pub encoding: EncodingRef,
    pub options: Options,
}

/// Entry count below which `publish` never purges.
const MIN_PURGE_THRESHOLD: usize = 64;

#[derive(Debug, Default)]
struct Interned {
    entries: HashMap<PatternKey, Weak<Regexp>>,
    /// `publish` purges dead entries once `entries` grows past this.
    purge_at: usize,
}

impl Interned {
    fn purge(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        self.purge_at = MIN_PURGE_THRESHOLD.max(self.entries.len() * 2);
        before - self.entries.len()
    }
}

/// Weakly-held interned patterns; an entry lives as long as some caller
/// holds the `Regexp`. Dead entries are dropped whenever the map doubles
/// past its live size at the last purge.
#[derive(Debug, Default)]
pub struct PatternCache {
    map: RwLock<Interned>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PatternKey) -> Option<Arc<Regexp>> {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        map.entries.get(key).and_then(Weak::upgrade)
    }

    /// Publish `regexp` under `key` unless a live entry already exists,
    /// and return whichever one is now cached.
    pub fn publish(&self, key: PatternKey, regexp: Arc<Regexp>) -> Arc<Regexp> {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.entries.get(&key).and_then(Weak::upgrade) {
            trace!("pattern cache: lost publish race");
            return existing;
        }
        map.entries.insert(key, Arc::downgrade(&regexp));
        if map.entries.len() > map.purge_at {
            let purged = map.purge();
            trace!("pattern cache: purged {} dead entries on publish", purged);
        }
        regexp
    }

    /// Drop entries whose pattern is no longer referenced.
    pub fn purge(&self) -> usize {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        let purged = map.purge();
        if purged > 0 {
            debug!("pattern cache: purged {} dead entries", purged);
        }
        purged
    }

    /// Number of entries, live or not yet purged.
    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// === EncodingCache ===

/// Backtracking programs of one pattern, by runtime encoding.
#[derive(Debug, Default)]
pub struct EncodingCache {
    map: RwLock<HashMap<EncodingRef, Arc<dyn BacktrackProgram>>>,
}

impl EncodingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, enc: EncodingRef) -> Option<Arc<dyn BacktrackProgram>> {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&enc).cloned()
    }

    /// The program for `enc`, compiling it with `compile` on a miss.
    /// Compile errors are returned and nothing is cached.
    pub fn get_or_create<F>(
        &self,
        enc: EncodingRef,
        compile: F,
    ) -> Result<Arc<dyn BacktrackProgram>, RegexpError>
    where
        F: FnOnce() -> Result<Arc<dyn BacktrackProgram>, RegexpError>,
    {
        if let Some(program) = self.get(enc) {
            return Ok(program);
        }
        debug!("encoding cache miss for {}", enc);
        let program = compile()?;
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        Ok(map.entry(enc).or_insert(program).clone())
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// === TRegexCache ===

const LINEAR_SLOTS: usize = Builtin::COUNT * 2;

/// Linear programs of one pattern: one slot per built-in encoding, for
/// unanchored and at-start searches. A refusal is cached as `None`
/// and never retried.
#[derive(Debug, Default)]
pub struct TRegexCache {
    slots: [OnceLock<Option<Arc<dyn LinearProgram>>>; LINEAR_SLOTS],
}

impl TRegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, builtin: Builtin, at_start: bool) -> &OnceLock<Option<Arc<dyn LinearProgram>>> {
        &self.slots[builtin.index() * 2 + at_start as usize]
    }

    /// The linear program for `enc`, compiling on first use. Encodings
    /// outside the built-in set are never compiled or cached.
    pub fn get_or_compile<F>(
        &self,
        enc: EncodingRef,
        at_start: bool,
        compile: F,
    ) -> Option<Arc<dyn LinearProgram>>
    where
        F: FnOnce() -> Option<Arc<dyn LinearProgram>>,
    {
        let builtin = enc.builtin()?;
        self.slot(builtin, at_start).get_or_init(compile).clone()
    }

    /// Whether a compile has been attempted for this slot.
    pub fn is_resolved(&self, enc: EncodingRef, at_start: bool) -> bool {
        enc.builtin()
            .is_some_and(|b| self.slot(b, at_start).get().is_some())
    }
}
