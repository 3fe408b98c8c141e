// matcher.rs - Dual-engine match driver.
//
// A search negotiates its encoding, then walks a small state machine:
// try the linear engine when it is configured and the request suits it,
// and fall back to the backtracking engine otherwise. Linear matches
// keep their group bounds lazy; backtracking matches are resolved
// eagerly. Engines search `subject[start..]` and the bounds they
// report are shifted back by `start`.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use log::trace;

use crate::compile::Regexp;
use crate::encoding::{CodeRange, EncodingRef};
use crate::engine::{Attempt, CancelToken, LinearEngine, LinearMatch, LinearProgram, SearchRange, Spans};
use crate::error::RegexpError;
use crate::match_data::MatchData;
use crate::negotiate::negotiate;
use crate::region::MatchRegion;
use crate::stats::{Counter, MatchStats};
use crate::warning::{WarningKind, Warnings};

// === Request / outcome ===

/// A subject converted once for the backtracking engine and shared by
/// consecutive searches over it. Valid only while the pattern, subject
/// and encoding stay the same.
#[derive(Debug, Default)]
pub(crate) struct PreparedSubject(OnceLock<Option<Arc<dyn Any + Send + Sync>>>);

/// One search over a subject.
///
/// `from..=to` bounds where a match may start; `to < from` searches
/// backward for the rightmost match. `start` is the zero point the
/// engines see, so anchors like `\A` apply there.
#[derive(Debug, Clone)]
pub struct MatchRequest<'s> {
    pub subject: &'s [u8],
    pub encoding: EncodingRef,
    pub code_range: CodeRange,
    pub from: usize,
    pub to: usize,
    pub only_at_start: bool,
    pub start: usize,
    pub want_capture_data: bool,
    shared: Option<Arc<[u8]>>,
    prepared: Option<&'s PreparedSubject>,
}

impl<'s> MatchRequest<'s> {
    /// A forward search over the whole subject, scanning its code range.
    pub fn new(subject: &'s [u8], encoding: EncodingRef) -> Self {
        Self::scanned(subject, encoding, CodeRange::scan(subject, encoding))
    }

    /// A forward search over a subject whose code range is already
    /// known.
    pub fn scanned(subject: &'s [u8], encoding: EncodingRef, code_range: CodeRange) -> Self {
        MatchRequest {
            subject,
            encoding,
            code_range,
            from: 0,
            to: subject.len(),
            only_at_start: false,
            start: 0,
            want_capture_data: true,
            shared: None,
            prepared: None,
        }
    }

    /// Use a code range the caller already knows.
    pub fn with_code_range(mut self, code_range: CodeRange) -> Self {
        self.code_range = code_range;
        self
    }

    pub fn with_range(mut self, from: usize, to: usize) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_only_at_start(mut self, yes: bool) -> Self {
        self.only_at_start = yes;
        self
    }

    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    /// Only report whether there is a match.
    pub fn bool_only(mut self) -> Self {
        self.want_capture_data = false;
        self
    }

    /// Reuse an existing copy of the subject for the result.
    pub(crate) fn with_shared(mut self, shared: Arc<[u8]>) -> Self {
        self.shared = Some(shared);
        self
    }

    pub(crate) fn with_prepared(mut self, prepared: &'s PreparedSubject) -> Self {
        self.prepared = Some(prepared);
        self
    }

    fn subject_copy(&self) -> Arc<[u8]> {
        match &self.shared {
            Some(shared) => shared.clone(),
            None => Arc::from(self.subject),
        }
    }
}

/// What a search produced.
#[derive(Debug)]
pub enum MatchOutcome {
    Data(MatchData),
    /// A match, for a request that did not want capture data.
    Matched,
    NoMatch,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchOutcome::NoMatch)
    }

    pub fn into_match_data(self) -> Option<MatchData> {
        match self {
            MatchOutcome::Data(md) => Some(md),
            _ => None,
        }
    }

    pub fn match_data(&self) -> Option<&MatchData> {
        match self {
            MatchOutcome::Data(md) => Some(md),
            _ => None,
        }
    }
}

// === State machine ===

#[derive(Debug)]
enum Found {
    Linear(Arc<dyn LinearMatch>),
    Spans(Spans),
}

#[derive(Debug)]
enum State {
    NotAttempted,
    LinearEligible,
    LinearCompiled(Arc<dyn LinearProgram>),
    LinearRan(Arc<dyn LinearMatch>),
    Fallback,
    BacktrackRan(Spans),
    Done(Option<Found>),
}

/// Runs searches for a context.
pub(crate) struct Matcher<'a> {
    pub linear: Option<&'a dyn LinearEngine>,
    pub use_linear: bool,
    pub warn_on_fallback: bool,
    pub warnings: &'a Warnings,
    pub stats: Option<&'a MatchStats>,
    pub cancel: &'a CancelToken,
}

impl Matcher<'_> {
    fn bump(&self, counter: Counter) {
        if let Some(stats) = self.stats {
            stats.bump(counter);
        }
    }

    fn linear_enabled(&self) -> bool {
        self.use_linear && self.linear.is_some()
    }

    /// The request can run on the linear engine: built-in encoding and a
    /// window on whole characters that starts at or after `start`.
    fn linear_eligible(&self, enc: EncodingRef, req: &MatchRequest<'_>) -> bool {
        self.linear_enabled()
            && enc.builtin().is_some()
            && req.from >= req.start
            && req.to >= req.start
            && [req.start, req.from, req.to]
                .iter()
                .all(|&p| enc.is_char_boundary(req.subject, p))
    }

    #[track_caller]
    fn fall_back(&self, regexp: &Regexp) -> State {
        if self.linear_enabled() {
            self.bump(Counter::Fallback);
            if self.warn_on_fallback {
                self.warnings.warn_once(WarningKind::LinearFallback {
                    pattern: String::from_utf8_lossy(regexp.source()).into_owned(),
                });
            }
        }
        State::Fallback
    }

    #[track_caller]
    fn compile_linear(&self, regexp: &Regexp, enc: EncodingRef, at_start: bool) -> Option<Arc<dyn LinearProgram>> {
        let engine = self.linear?;
        let program = regexp.linear_program(engine, enc, at_start, |compiled| {
            self.bump(Counter::LinearCompile);
            if !compiled {
                self.bump(Counter::LinearRefusal);
            }
        })?;
        if program.is_backtracking() {
            self.warnings.warn_once(WarningKind::DegradedToBacktracking {
                pattern: String::from_utf8_lossy(regexp.source()).into_owned(),
            });
        }
        Some(program)
    }

    fn run_linear(
        &self,
        regexp: &Regexp,
        program: &dyn LinearProgram,
        haystack: &[u8],
        range: &SearchRange,
    ) -> Result<Attempt<Arc<dyn LinearMatch>>, RegexpError> {
        if program.group_count() != regexp.group_count() {
            trace!(
                "linear program has {} groups, pattern has {}",
                program.group_count(),
                regexp.group_count()
            );
            return Ok(Attempt::NotEligible);
        }
        self.cancel.check()?;
        Ok(match program.search(haystack, range)? {
            Some(m) => Attempt::Matched(m),
            None => Attempt::NoMatch,
        })
    }

    fn run_backtracking(
        &self,
        regexp: &Regexp,
        enc: EncodingRef,
        req: &MatchRequest<'_>,
        haystack: &[u8],
        range: &SearchRange,
    ) -> Result<Attempt<Spans>, RegexpError> {
        let program = regexp.program_for(enc)?;
        self.cancel.check()?;
        let prepared = match req.prepared {
            Some(cache) if req.start == 0 => cache
                .0
                .get_or_init(|| program.prepare(req.subject))
                .as_deref(),
            _ => None,
        };
        let found = match prepared {
            Some(prepared) => program.search_prepared(haystack, prepared, range, self.cancel)?,
            None => program.search(haystack, range, self.cancel)?,
        };
        Ok(match found {
            Some(spans) => Attempt::Matched(spans),
            None => Attempt::NoMatch,
        })
    }

    #[track_caller]
    pub(crate) fn run(
        &self,
        regexp: &Arc<Regexp>,
        req: &MatchRequest<'_>,
    ) -> Result<MatchOutcome, RegexpError> {
        let negotiated = negotiate(regexp, req.encoding, req.code_range)?;
        if negotiated.historical_binary {
            self.warnings.warn_once(WarningKind::HistoricalBinaryMatch {
                subject: req.encoding,
            });
        }
        let enc = negotiated.encoding;
        if req.start > req.subject.len() {
            return Ok(MatchOutcome::NoMatch);
        }
        let haystack = &req.subject[req.start..];
        let range = SearchRange {
            from: req.from.saturating_sub(req.start),
            to: req.to.saturating_sub(req.start),
            backward: req.to < req.from,
            only_at_start: req.only_at_start,
        };

        let mut state = State::NotAttempted;
        let found = loop {
            trace!("match state: {:?}", state);
            state = match state {
                State::NotAttempted => {
                    if self.linear_eligible(enc, req) {
                        State::LinearEligible
                    } else {
                        self.fall_back(regexp)
                    }
                }
                State::LinearEligible => match self.compile_linear(regexp, enc, req.only_at_start) {
                    Some(program) => State::LinearCompiled(program),
                    None => self.fall_back(regexp),
                },
                State::LinearCompiled(program) => {
                    match self.run_linear(regexp, program.as_ref(), haystack, &range)? {
                        Attempt::Matched(m) => State::LinearRan(m),
                        Attempt::NoMatch => State::Done(None),
                        Attempt::NotEligible => self.fall_back(regexp),
                    }
                }
                State::LinearRan(m) => {
                    self.bump(Counter::LinearMatch);
                    State::Done(Some(Found::Linear(m)))
                }
                State::Fallback => match self.run_backtracking(regexp, enc, req, haystack, &range)? {
                    Attempt::Matched(spans) => State::BacktrackRan(spans),
                    _ => State::Done(None),
                },
                State::BacktrackRan(spans) => {
                    self.bump(Counter::BacktrackMatch);
                    State::Done(Some(Found::Spans(spans)))
                }
                State::Done(found) => break found,
            };
        };

        let Some(found) = found else {
            return Ok(MatchOutcome::NoMatch);
        };
        if !req.want_capture_data {
            self.bump(Counter::BoolOnlyMatch);
            return Ok(MatchOutcome::Matched);
        }
        let (region, backend) = match found {
            Found::Linear(m) => (MatchRegion::lazy(m.group_count() + 1), Some(m)),
            Found::Spans(spans) => (MatchRegion::from_spans(&spans), None),
        };
        let mut md = MatchData::new(
            regexp.clone(),
            req.subject_copy(),
            req.encoding,
            req.code_range,
            region,
            backend,
        );
        md.fixup_for_start(req.start);
        Ok(MatchOutcome::Data(md))
    }
}
