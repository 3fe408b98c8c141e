// api.rs - Context and high-level API for rbregexp.
//
// A RegexpContext owns the engines, the pattern cache, the warning
// channel and optional stats. Everything that compiles or matches goes
// through a context: compile, search, is_match, match_at, find_iter.

use std::sync::Arc;

use log::debug;

use crate::backtrack::{FancyEngine, DEFAULT_BACKTRACK_LIMIT};
use crate::compile::{prepare, Regexp};
use crate::encoding::{CodeRange, EncodingRef};
use crate::encodings;
use crate::engine::{BacktrackEngine, CancelToken, LinearEngine};
use crate::error::RegexpError;
use crate::linear::MetaEngine;
use crate::match_data::MatchData;
use crate::matcher::{MatchOutcome, MatchRequest, Matcher, PreparedSubject};
use crate::options::Options;
use crate::quote;
use crate::cache::PatternCache;
use crate::stats::{Counter, MatchStats, StatsSnapshot};
use crate::warning::{LogWarningSink, WarningSink, Warnings};

// === RegexpConfig ===

/// Matching policy of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexpConfig {
    /// Try the linear-time engine before backtracking.
    pub use_linear_engine: bool,
    /// Warn (once per call site) when a search falls back to backtracking.
    pub warn_on_linear_fallback: bool,
    /// Step budget of the default backtracking engine.
    pub backtrack_limit: usize,
    /// Keep `MatchStats` counters.
    pub collect_stats: bool,
}

impl Default for RegexpConfig {
    fn default() -> Self {
        RegexpConfig {
            use_linear_engine: true,
            warn_on_linear_fallback: false,
            backtrack_limit: DEFAULT_BACKTRACK_LIMIT,
            collect_stats: false,
        }
    }
}

// === RegexpContextBuilder ===

/// Builder for a [`RegexpContext`].
///
/// # Examples
///
/// ```
/// use rbregexp::api::RegexpContext;
///
/// let ctx = RegexpContext::builder()
///     .use_linear_engine(false)
///     .collect_stats(true)
///     .build();
/// assert!(!ctx.config().use_linear_engine);
/// ```
pub struct RegexpContextBuilder {
    config: RegexpConfig,
    backtrack: Option<Arc<dyn BacktrackEngine>>,
    linear: Option<Option<Arc<dyn LinearEngine>>>,
    sink: Option<Arc<dyn WarningSink>>,
}

impl RegexpContextBuilder {
    pub fn new() -> Self {
        RegexpContextBuilder {
            config: RegexpConfig::default(),
            backtrack: None,
            linear: None,
            sink: None,
        }
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: RegexpConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the backtracking engine. `backtrack_limit` then no longer
    /// applies.
    pub fn backtrack_engine(mut self, engine: Arc<dyn BacktrackEngine>) -> Self {
        self.backtrack = Some(engine);
        self
    }

    /// Replace the linear-time engine.
    pub fn linear_engine(mut self, engine: Arc<dyn LinearEngine>) -> Self {
        self.linear = Some(Some(engine));
        self
    }

    /// Run without any linear-time engine.
    pub fn without_linear_engine(mut self) -> Self {
        self.linear = Some(None);
        self
    }

    pub fn use_linear_engine(mut self, yes: bool) -> Self {
        self.config.use_linear_engine = yes;
        self
    }

    pub fn warn_on_linear_fallback(mut self, yes: bool) -> Self {
        self.config.warn_on_linear_fallback = yes;
        self
    }

    pub fn backtrack_limit(mut self, limit: usize) -> Self {
        self.config.backtrack_limit = limit;
        self
    }

    /// Send warnings somewhere other than the `log` facade.
    pub fn warning_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn collect_stats(mut self, yes: bool) -> Self {
        self.config.collect_stats = yes;
        self
    }

    pub fn build(self) -> RegexpContext {
        let config = self.config;
        let backtrack: Arc<dyn BacktrackEngine> = match self.backtrack {
            Some(engine) => engine,
            None => Arc::new(FancyEngine::new(config.backtrack_limit)),
        };
        let linear: Option<Arc<dyn LinearEngine>> = match self.linear {
            Some(engine) => engine,
            None => Some(Arc::new(MetaEngine::new())),
        };
        let sink: Arc<dyn WarningSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(LogWarningSink),
        };
        debug!("new regexp context: {:?}", config);
        RegexpContext {
            config,
            backtrack,
            linear,
            patterns: PatternCache::new(),
            warnings: Warnings::new(sink),
            stats: config.collect_stats.then(MatchStats::new),
            cancel: CancelToken::new(),
        }
    }
}

impl Default for RegexpContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// === RegexpContext ===

/// Compiles and matches patterns.
///
/// # Examples
///
/// ```
/// use rbregexp::api::RegexpContext;
/// use rbregexp::encodings;
/// use rbregexp::options::Options;
///
/// let ctx = RegexpContext::new();
/// let re = ctx.compile(br"(?<year>\d{4})-(\d\d)", encodings::UTF_8, Options::new()).unwrap();
/// let md = ctx.match_at(&re, b"on 2026-02", encodings::UTF_8, 0).unwrap().unwrap();
/// assert_eq!(md.group_by_name("year").unwrap(), Some(&b"2026"[..]));
/// assert_eq!(md.begin(0).unwrap(), Some(3));
/// ```
pub struct RegexpContext {
    config: RegexpConfig,
    backtrack: Arc<dyn BacktrackEngine>,
    linear: Option<Arc<dyn LinearEngine>>,
    patterns: PatternCache,
    warnings: Warnings,
    stats: Option<MatchStats>,
    cancel: CancelToken,
}

impl RegexpContext {
    /// A context with the default engines and configuration.
    pub fn new() -> Self {
        RegexpContextBuilder::new().build()
    }

    pub fn builder() -> RegexpContextBuilder {
        RegexpContextBuilder::new()
    }

    pub fn config(&self) -> &RegexpConfig {
        &self.config
    }

    fn bump(&self, counter: Counter) {
        if let Some(stats) = &self.stats {
            stats.bump(counter);
        }
    }

    // --- Compiling ---

    /// Compile `pattern`, written in `source_encoding`, or return the
    /// interned copy of an identical pattern.
    pub fn compile(
        &self,
        pattern: &[u8],
        source_encoding: EncodingRef,
        options: Options,
    ) -> Result<Arc<Regexp>, RegexpError> {
        let prepared = prepare(pattern, source_encoding, options)?;
        if let Some(hit) = self.patterns.get(&prepared.key) {
            return Ok(hit);
        }
        let key = prepared.key.clone();
        let regexp = Arc::new(Regexp::build(prepared, self.backtrack.clone())?);
        self.bump(Counter::Compile);
        Ok(self.patterns.publish(key, regexp))
    }

    /// Compile a UTF-8 pattern.
    pub fn compile_str(&self, pattern: &str, options: Options) -> Result<Arc<Regexp>, RegexpError> {
        self.compile(pattern.as_bytes(), encodings::UTF_8, options)
    }

    /// `Regexp.union`: alternation of the given items. Strings are
    /// quoted, patterns embedded through `to_s`. No items gives a
    /// pattern that never matches; a single pattern is returned as is.
    pub fn union(&self, items: &[UnionItem<'_>]) -> Result<Arc<Regexp>, RegexpError> {
        match items {
            [] => return self.compile(b"(?!)", encodings::US_ASCII, Options::new()),
            [UnionItem::Regexp(re)] => return Ok(re.clone()),
            [UnionItem::Str(bytes, enc)] => {
                let (quoted, enc) = quote::quote(bytes, *enc);
                return self.compile(&quoted, enc, Options::new());
            }
            _ => {}
        }
        let mut source = Vec::new();
        let mut source_enc: Option<EncodingRef> = None;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                source.push(b'|');
            }
            let (piece, enc, ascii) = match item {
                UnionItem::Str(bytes, enc) => {
                    let (quoted, enc) = quote::quote(bytes, *enc);
                    let ascii = CodeRange::scan(bytes, enc).is_ascii();
                    (quoted, enc, ascii)
                }
                UnionItem::Regexp(re) => (re.to_s(), re.encoding(), !re.is_fixed_encoding()),
            };
            if !ascii {
                match source_enc {
                    Some(seen) if seen != enc => {
                        return Err(RegexpError::Argument(format!(
                            "incompatible encodings: {} and {}",
                            seen, enc
                        )));
                    }
                    _ => source_enc = Some(enc),
                }
            }
            source.extend_from_slice(&piece);
        }
        self.compile(&source, source_enc.unwrap_or(encodings::US_ASCII), Options::new())
    }

    /// `Regexp.escape`.
    pub fn escape(bytes: &[u8], enc: EncodingRef) -> (Vec<u8>, EncodingRef) {
        quote::quote(bytes, enc)
    }

    // --- Matching ---

    fn matcher(&self) -> Matcher<'_> {
        Matcher {
            linear: self.linear.as_deref(),
            use_linear: self.config.use_linear_engine,
            warn_on_fallback: self.config.warn_on_linear_fallback,
            warnings: &self.warnings,
            stats: self.stats.as_ref(),
            cancel: &self.cancel,
        }
    }

    /// Run one search.
    #[track_caller]
    pub fn search(
        &self,
        regexp: &Arc<Regexp>,
        request: &MatchRequest<'_>,
    ) -> Result<MatchOutcome, RegexpError> {
        self.matcher().run(regexp, request)
    }

    /// Run one search that stops with `Interrupted` once `cancel` fires.
    ///
    /// The token is polled before each engine attempt and between start
    /// positions of a backward search. A forward backtracking attempt
    /// already under way is not interrupted; `backtrack_limit` bounds it.
    #[track_caller]
    pub fn search_with_cancel(
        &self,
        regexp: &Arc<Regexp>,
        request: &MatchRequest<'_>,
        cancel: &CancelToken,
    ) -> Result<MatchOutcome, RegexpError> {
        Matcher {
            cancel,
            ..self.matcher()
        }
        .run(regexp, request)
    }

    /// `Regexp#match?`: no match data is built.
    #[track_caller]
    pub fn is_match(
        &self,
        regexp: &Arc<Regexp>,
        subject: &[u8],
        encoding: EncodingRef,
    ) -> Result<bool, RegexpError> {
        let request = MatchRequest::new(subject, encoding).bool_only();
        Ok(self.search(regexp, &request)?.is_match())
    }

    /// `Regexp#match(str, pos)`: search from character `pos`; negative
    /// positions count from the end.
    #[track_caller]
    pub fn match_at(
        &self,
        regexp: &Arc<Regexp>,
        subject: &[u8],
        encoding: EncodingRef,
        pos: isize,
    ) -> Result<Option<MatchData>, RegexpError> {
        let chars = encoding.str_length(subject) as isize;
        let pos = if pos < 0 { pos + chars } else { pos };
        if pos < 0 || pos > chars {
            return Ok(None);
        }
        let mut from = 0;
        for _ in 0..pos {
            from += encoding.mbc_enc_len(&subject[from..]);
        }
        let request = MatchRequest::new(subject, encoding).with_range(from, subject.len());
        Ok(self.search(regexp, &request)?.into_match_data())
    }

    /// Every non-overlapping match, left to right.
    pub fn find_iter<'c>(
        &'c self,
        regexp: &Arc<Regexp>,
        subject: &[u8],
        encoding: EncodingRef,
    ) -> FindIter<'c> {
        let subject: Arc<[u8]> = Arc::from(subject);
        FindIter {
            ctx: self,
            regexp: regexp.clone(),
            code_range: CodeRange::scan(&subject, encoding),
            subject,
            encoding,
            prepared: PreparedSubject::default(),
            last_end: 0,
            last_was_empty: false,
            done: false,
        }
    }

    // --- Housekeeping ---

    /// Counter snapshot, if stats are collected.
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.stats.as_ref().map(MatchStats::snapshot)
    }

    /// The context-wide cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Drop interned patterns nobody holds any more.
    pub fn purge_cache(&self) -> usize {
        self.patterns.purge()
    }

    pub fn cached_patterns(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for RegexpContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegexpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexpContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// An operand of [`RegexpContext::union`].
#[derive(Debug, Clone)]
pub enum UnionItem<'a> {
    Str(&'a [u8], EncodingRef),
    Regexp(Arc<Regexp>),
}

// === FindIter ===

/// Iterator over all non-overlapping matches in a subject.
pub struct FindIter<'c> {
    ctx: &'c RegexpContext,
    regexp: Arc<Regexp>,
    subject: Arc<[u8]>,
    encoding: EncodingRef,
    code_range: CodeRange,
    prepared: PreparedSubject,
    last_end: usize,
    last_was_empty: bool,
    done: bool,
}

impl Iterator for FindIter<'_> {
    type Item = Result<MatchData, RegexpError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || self.last_end > self.subject.len() {
                return None;
            }
            let request = MatchRequest::scanned(&self.subject, self.encoding, self.code_range)
                .with_range(self.last_end, self.subject.len())
                .with_shared(self.subject.clone())
                .with_prepared(&self.prepared);
            let md = match self.ctx.search(&self.regexp, &request) {
                Ok(outcome) => outcome.into_match_data()?,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            let Some((start, end)) = md.bounds(0) else {
                return None;
            };

            // An empty match right after an empty match: step one character.
            if start == end {
                if self.last_was_empty && start == self.last_end {
                    if self.last_end >= self.subject.len() {
                        return None;
                    }
                    self.last_end += self.encoding.mbc_enc_len(&self.subject[self.last_end..]);
                    self.last_was_empty = false;
                    continue;
                }
                self.last_was_empty = true;
            } else {
                self.last_was_empty = false;
            }
            self.last_end = end;
            return Some(Ok(md));
        }
    }
}
