// common/mod.rs - Test engines and sinks shared by the integration tests.

#![allow(dead_code)]

use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rbregexp::encoding::EncodingRef;
use rbregexp::engine::{LinearEngine, LinearMatch, LinearProgram, SearchRange};
use rbregexp::error::RegexpError;
use rbregexp::linear::MetaEngine;
use rbregexp::options::Options;
use rbregexp::warning::{WarningKind, WarningSink};

// === Warning sink ===

/// Records every warning it receives.
#[derive(Default)]
pub struct CollectingSink {
    pub seen: Mutex<Vec<WarningKind>>,
    pub files: Mutex<Vec<&'static str>>,
}

impl CollectingSink {
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|k| k.to_string()).collect()
    }
}

impl WarningSink for CollectingSink {
    fn warn(&self, kind: &WarningKind, location: &'static Location<'static>) {
        self.seen.lock().unwrap().push(kind.clone());
        self.files.lock().unwrap().push(location.file());
    }
}

// === Linear engines ===

/// Wraps the default linear engine and counts compile calls.
#[derive(Default)]
pub struct CountingLinear {
    pub compiles: AtomicUsize,
    pub refuse_all: bool,
}

impl CountingLinear {
    pub fn refusing() -> Self {
        CountingLinear {
            compiles: AtomicUsize::new(0),
            refuse_all: true,
        }
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

impl LinearEngine for CountingLinear {
    fn compile(
        &self,
        pattern: &[u8],
        encoding: EncodingRef,
        options: &Options,
        only_at_start: bool,
    ) -> Option<Arc<dyn LinearProgram>> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if self.refuse_all {
            return None;
        }
        MetaEngine::new().compile(pattern, encoding, options, only_at_start)
    }
}

/// A match whose groups are fixed in advance.
#[derive(Debug)]
pub struct FixedMatch {
    pub groups: Vec<Option<(usize, usize)>>,
    pub reads: AtomicUsize,
}

impl LinearMatch for FixedMatch {
    fn group_count(&self) -> usize {
        self.groups.len() - 1
    }

    fn group(&self, index: usize) -> Option<(usize, usize)> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.groups.get(index).copied().flatten()
    }
}

/// A program that always "matches" with the same groups.
#[derive(Debug)]
pub struct FixedProgram {
    pub groups: Vec<Option<(usize, usize)>>,
    pub degraded: bool,
}

impl LinearProgram for FixedProgram {
    fn is_backtracking(&self) -> bool {
        self.degraded
    }

    fn group_count(&self) -> usize {
        self.groups.len() - 1
    }

    fn search(
        &self,
        _haystack: &[u8],
        _range: &SearchRange,
    ) -> Result<Option<Arc<dyn LinearMatch>>, RegexpError> {
        let m: Arc<dyn LinearMatch> = Arc::new(FixedMatch {
            groups: self.groups.clone(),
            reads: AtomicUsize::new(0),
        });
        Ok(Some(m))
    }
}

/// Compiles every pattern to a `FixedProgram`.
pub struct FixedLinear {
    pub groups: Vec<Option<(usize, usize)>>,
    pub degraded: bool,
}

impl LinearEngine for FixedLinear {
    fn compile(
        &self,
        _pattern: &[u8],
        _encoding: EncodingRef,
        _options: &Options,
        _only_at_start: bool,
    ) -> Option<Arc<dyn LinearProgram>> {
        let program: Arc<dyn LinearProgram> = Arc::new(FixedProgram {
            groups: self.groups.clone(),
            degraded: self.degraded,
        });
        Some(program)
    }
}
