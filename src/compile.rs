// compile.rs - Compiled patterns.
//
// A `Regexp` is built in two steps. `prepare` preprocesses the source
// and resolves the pattern's encoding and options; this is cheap and
// yields the pattern-cache key. `Regexp::build` then runs the
// backtracking engine on the canonical bytes. Programs for other
// runtime encodings are compiled on demand from the original source.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::debug;

use crate::cache::{EncodingCache, PatternKey, TRegexCache};
use crate::encoding::EncodingRef;
use crate::encodings;
use crate::engine::{BacktrackEngine, BacktrackProgram, LinearEngine, LinearProgram};
use crate::error::RegexpError;
use crate::options::{OptionFlags, Options};
use crate::preprocess::{preprocess, ErrorMode};
use crate::quote;
use crate::regerror::PreprocessErrorKind;

// === Encoding resolution ===

/// Resolve the encoding of a compiled pattern from its options, the
/// encoding of its source and the encoding the source pins, if any.
///
/// A pinned encoding always sets the fixed-encoding flag. A pattern
/// that pins nothing and is not already fixed compiles as US-ASCII so it
/// can adapt to any ASCII-compatible subject.
///
/// # Examples
///
/// ```
/// use rbregexp::compile::compute_encoding;
/// use rbregexp::encodings;
/// use rbregexp::options::Options;
///
/// let (opts, enc) = compute_encoding(Options::new(), encodings::UTF_8, None).unwrap();
/// assert_eq!(enc, encodings::US_ASCII);
/// assert!(!opts.is_fixed());
///
/// let (opts, enc) =
///     compute_encoding(Options::new(), encodings::US_ASCII, Some(encodings::UTF_8)).unwrap();
/// assert_eq!(enc, encodings::UTF_8);
/// assert!(opts.is_fixed());
/// ```
pub fn compute_encoding(
    options: Options,
    source_encoding: EncodingRef,
    forced: Option<EncodingRef>,
) -> Result<(Options, EncodingRef), RegexpError> {
    let mut options = options;
    let mut enc = source_encoding;
    match forced {
        Some(forced) => {
            if (forced != enc && options.is_fixed())
                || (forced != encodings::BINARY && options.is_encoding_none())
            {
                let kind = PreprocessErrorKind::IncompatibleCharacterEncoding;
                return Err(RegexpError::Preprocess {
                    kind,
                    message: kind.message().to_string(),
                });
            }
            if forced != encodings::BINARY {
                enc = forced;
            }
            options = options.with_fixed(true);
        }
        None if !options.is_fixed() => enc = encodings::US_ASCII,
        None => {}
    }
    Ok((options, enc))
}

/// Canonical form of a pattern, ready to compile.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    pub key: PatternKey,
}

/// Preprocess `source` and resolve its encoding and options.
pub(crate) fn prepare(
    source: &[u8],
    source_encoding: EncodingRef,
    options: Options,
) -> Result<Prepared, RegexpError> {
    let (options, kcode_encoding) = options.setup();
    let source_encoding = kcode_encoding.unwrap_or(source_encoding);
    let pre = preprocess(source, source_encoding, ErrorMode::Raise)?;
    let (options, encoding) = compute_encoding(options, source_encoding, pre.fixed_encoding)?;
    Ok(Prepared {
        key: PatternKey {
            source: source.into(),
            canonical: pre.bytes.into_boxed_slice(),
            encoding,
            options,
        },
    })
}

/// `"<engine message>: /<source>/<opts>"`.
fn compile_error(err: RegexpError, source: &[u8], options: &Options) -> RegexpError {
    match err {
        RegexpError::Compile { message } => RegexpError::Compile {
            message: format!(
                "{}: /{}/{}",
                message,
                String::from_utf8_lossy(source),
                options.to_options_string()
            ),
        },
        other => other,
    }
}

// === Regexp ===

/// A compiled pattern.
///
/// Shared read-only behind an `Arc`; the per-encoding caches fill in as
/// the pattern meets subjects in other encodings.
pub struct Regexp {
    source: Box<[u8]>,
    canonical: Box<[u8]>,
    encoding: EncodingRef,
    options: Options,
    program: Arc<dyn BacktrackProgram>,
    engine: Arc<dyn BacktrackEngine>,
    encoding_cache: EncodingCache,
    linear_cache: TRegexCache,
}

impl Regexp {
    pub(crate) fn build(
        prepared: Prepared,
        engine: Arc<dyn BacktrackEngine>,
    ) -> Result<Regexp, RegexpError> {
        let PatternKey {
            source,
            canonical,
            encoding,
            options,
        } = prepared.key;
        let program = engine
            .compile(&canonical, encoding, &options)
            .map_err(|err| compile_error(err, &source, &options))?;
        debug!(
            "compiled /{}/{} as {} ({} groups)",
            String::from_utf8_lossy(&source),
            options,
            encoding,
            program.group_count()
        );
        Ok(Regexp {
            source,
            canonical,
            encoding,
            options,
            program,
            engine,
            encoding_cache: EncodingCache::new(),
            linear_cache: TRegexCache::new(),
        })
    }

    // --- Programs ---

    /// Canonical bytes for running under `enc`: the pattern's own, or
    /// the source preprocessed again under `enc`.
    fn canonical_for(&self, enc: EncodingRef) -> Result<Cow<'_, [u8]>, RegexpError> {
        if enc == self.encoding {
            return Ok(Cow::Borrowed(&self.canonical));
        }
        let pre = preprocess(&self.source, enc, ErrorMode::Raise)?;
        Ok(Cow::Owned(pre.bytes))
    }

    /// Backtracking program for matching under `enc`.
    pub fn program_for(&self, enc: EncodingRef) -> Result<Arc<dyn BacktrackProgram>, RegexpError> {
        if enc == self.encoding {
            return Ok(self.program.clone());
        }
        self.encoding_cache.get_or_create(enc, || {
            let bytes = self.canonical_for(enc)?;
            self.engine
                .compile(&bytes, enc, &self.options)
                .map_err(|err| compile_error(err, &self.source, &self.options))
        })
    }

    /// Linear program for matching under `enc`, compiled by `engine` on
    /// first use. `None` if the engine refuses.
    pub(crate) fn linear_program(
        &self,
        engine: &dyn LinearEngine,
        enc: EncodingRef,
        at_start: bool,
        on_compile: impl FnOnce(bool),
    ) -> Option<Arc<dyn LinearProgram>> {
        self.linear_cache.get_or_compile(enc, at_start, || {
            let program = match self.canonical_for(enc) {
                Ok(bytes) => engine.compile(&bytes, enc, &self.options, at_start),
                Err(err) => {
                    debug!("linear engine skipped: {}", err);
                    None
                }
            };
            on_compile(program.is_some());
            program
        })
    }

    pub fn encoding_cache(&self) -> &EncodingCache {
        &self.encoding_cache
    }

    pub fn linear_cache(&self) -> &TRegexCache {
        &self.linear_cache
    }

    // --- Accessors ---

    /// The pattern as written.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// The pattern after preprocessing.
    pub fn canonical_bytes(&self) -> &[u8] {
        &self.canonical
    }

    pub fn encoding(&self) -> EncodingRef {
        self.encoding
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// `Regexp#options`: the Ruby option integer.
    pub fn options_int(&self) -> i32 {
        self.options.to_ruby_int()
    }

    pub fn is_casefold(&self) -> bool {
        self.options.is_ignorecase()
    }

    pub fn is_fixed_encoding(&self) -> bool {
        self.options.is_fixed()
    }

    /// Number of capture groups, excluding group 0.
    pub fn group_count(&self) -> usize {
        self.program.group_count()
    }

    /// Group names in definition order.
    pub fn names(&self) -> Vec<&str> {
        self.program.names().iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Each group name with the group numbers it labels.
    pub fn named_captures(&self) -> Vec<(&str, &[usize])> {
        self.program
            .names()
            .iter()
            .map(|(n, groups)| (n.as_str(), groups.as_slice()))
            .collect()
    }

    /// Group numbers labelled `name`, if it is defined.
    pub fn name_to_groups(&self, name: &str) -> Option<&[usize]> {
        self.program
            .names()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, groups)| groups.as_slice())
    }

    /// Name of group `index`, if it has one.
    pub fn group_name(&self, index: usize) -> Option<&str> {
        self.program
            .names()
            .iter()
            .find(|(_, groups)| groups.contains(&index))
            .map(|(n, _)| n.as_str())
    }

    // --- Rendering ---

    /// `Regexp#to_s`, e.g. `(?i-mx:abc)`.
    pub fn to_s(&self) -> Vec<u8> {
        quote::to_s(&self.source, self.encoding, self.options, |body| {
            self.engine
                .compile(body, self.encoding, &Options::new())
                .is_ok()
        })
    }

    /// `Regexp#inspect`, e.g. `/a\/b/i`.
    pub fn inspect(&self) -> Vec<u8> {
        quote::inspect(&self.source, self.encoding, self.options)
    }

    /// `Regexp.escape`.
    pub fn escape(bytes: &[u8], enc: EncodingRef) -> (Vec<u8>, EncodingRef) {
        quote::quote(bytes, enc)
    }

    fn identity_bits(&self) -> u32 {
        self.options.flags().bits() & (crate::options::RUBY_OPTION_MASK & !OptionFlags::NOENCODING.bits())
    }
}

impl PartialEq for Regexp {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.encoding == other.encoding
            && self.identity_bits() == other.identity_bits()
    }
}

impl Eq for Regexp {}

impl Hash for Regexp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.identity_bits().hash(state);
    }
}

impl fmt::Debug for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Regexp")
            .field("source", &String::from_utf8_lossy(&self.source))
            .field("encoding", &self.encoding)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.inspect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtrack::FancyEngine;
    use crate::encodings::{BINARY, EUC_JP, LATIN1, US_ASCII, UTF_8};

    fn compile(src: &[u8], enc: EncodingRef, opts: Options) -> Result<Regexp, RegexpError> {
        Regexp::build(prepare(src, enc, opts)?, Arc::new(FancyEngine::default()))
    }

    // === compute_encoding ===

    #[test]
    fn forced_encoding_conflicts() {
        let fixed = Options::new().with_fixed(true);
        let err = compute_encoding(fixed, LATIN1, Some(UTF_8)).unwrap_err();
        assert_eq!(err.to_string(), "incompatible character encoding");
        let none = Options::new().with_encoding_none(true);
        assert!(compute_encoding(none, BINARY, Some(UTF_8)).is_err());
        assert!(compute_encoding(none, BINARY, Some(BINARY)).is_ok());
    }

    #[test]
    fn forced_binary_keeps_source_encoding() {
        let (opts, enc) = compute_encoding(Options::new(), EUC_JP, Some(BINARY)).unwrap();
        assert_eq!(enc, EUC_JP);
        assert!(opts.is_fixed());
    }

    #[test]
    fn fixed_without_forced_keeps_source() {
        let fixed = Options::new().with_fixed(true);
        assert_eq!(compute_encoding(fixed, UTF_8, None).unwrap().1, UTF_8);
    }

    // === Regexp ===

    #[test]
    fn ascii_pattern_adapts() {
        let re = compile(b"a(b)c", UTF_8, Options::new()).unwrap();
        assert_eq!(re.encoding(), US_ASCII);
        assert!(!re.is_fixed_encoding());
        assert_eq!(re.group_count(), 1);
    }

    #[test]
    fn non_ascii_pattern_is_fixed() {
        let re = compile("caf\u{e9}".as_bytes(), UTF_8, Options::new()).unwrap();
        assert_eq!(re.encoding(), UTF_8);
        assert!(re.is_fixed_encoding());
        assert_eq!(re.options_int(), 16);
    }

    #[test]
    fn kcode_n_is_binary() {
        let opts = Options::parse("n").unwrap();
        let re = compile(b"abc", UTF_8, opts).unwrap();
        assert_eq!(re.encoding(), US_ASCII);
        assert_eq!(re.options_int(), 32);
        assert_eq!(re.inspect(), b"/abc/n");
    }

    #[test]
    fn compile_error_names_source() {
        let err = compile(b"a(b", UTF_8, Options::new().with_ignorecase(true)).unwrap_err();
        assert!(matches!(err, RegexpError::Compile { .. }));
        assert!(err.to_string().ends_with(": /a(b/i"), "{}", err);
    }

    #[test]
    fn names_and_groups() {
        let re = compile(b"(?<y>\\d+)-(?<m>\\d+)", UTF_8, Options::new()).unwrap();
        assert_eq!(re.names(), vec!["y", "m"]);
        assert_eq!(re.name_to_groups("m"), Some(&[2][..]));
        assert_eq!(re.group_name(1), Some("y"));
        assert_eq!(re.name_to_groups("d"), None);
    }

    #[test]
    fn program_for_other_encoding_is_cached() {
        let re = compile(b"a.c", UTF_8, Options::new()).unwrap();
        let p1 = re.program_for(LATIN1).unwrap();
        let p2 = re.program_for(LATIN1).unwrap();
        assert!(Arc::ptr_eq(&p1, &p2));
        assert_eq!(re.encoding_cache().len(), 1);
        assert!(Arc::ptr_eq(&re.program_for(US_ASCII).unwrap(), &re.program));
    }

    #[test]
    fn equality_ignores_encoding_none() {
        let a = compile(b"abc", US_ASCII, Options::new()).unwrap();
        let b = compile(b"abc", US_ASCII, Options::parse("n").unwrap()).unwrap();
        let c = compile(b"abc", US_ASCII, Options::parse("i").unwrap()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn to_s_and_inspect() {
        let re = compile(b"a/b", UTF_8, Options::parse("i").unwrap()).unwrap();
        assert_eq!(re.to_s(), b"(?i-mx:a\\/b)");
        assert_eq!(re.inspect(), b"/a\\/b/i");
        assert_eq!(re.to_string(), "/a\\/b/i");
    }
}
