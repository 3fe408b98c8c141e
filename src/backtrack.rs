// backtrack.rs - Backtracking engine adapter over fancy-regex.
//
// fancy-regex matches `str` text, so subjects and patterns in other
// encodings are transcoded first: single-byte encodings map byte `b` to
// U+00bb, Unicode encodings decode to their real characters, and the
// Japanese multibyte encodings map each character to a private-use
// proxy. Pattern and subject go through the same mapping, so literal
// characters still line up; offsets are mapped back afterwards.

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

use log::{debug, trace};

use crate::encoding::{CharLen, EncodingRef};
use crate::engine::{BacktrackEngine, BacktrackProgram, CancelToken, SearchRange, Spans};
use crate::error::RegexpError;
use crate::options::Options;
use crate::syntax::{self, NameTable, Target};

/// fancy-regex's own default step budget.
pub const DEFAULT_BACKTRACK_LIMIT: usize = 1_000_000;

// === Transcoding ===

const MULTIBYTE_PROXY_BASE: u32 = 0xF0000;
const EUC_SS3_PROXY_BASE: u32 = 0x100000;
const INVALID_BYTE_PROXY_BASE: u32 = 0x10FF00;

fn proxy(code: u32) -> char {
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// The stand-in character for the encoded character at the head of `p`,
/// and its length in bytes.
fn decode_char(enc: EncodingRef, p: &[u8]) -> (char, usize) {
    let n = match enc.char_len(p) {
        CharLen::Valid(n) => n,
        _ => return (proxy(INVALID_BYTE_PROXY_BASE + p[0] as u32), enc.mbc_enc_len(p)),
    };
    if enc.is_single_byte() {
        return (proxy(p[0] as u32), 1);
    }
    let code = enc.mbc_to_code(&p[..n]);
    if enc.is_unicode() {
        let c = char::from_u32(code).unwrap_or_else(|| proxy(INVALID_BYTE_PROXY_BASE + p[0] as u32));
        return (c, n);
    }
    let c = match (n, code) {
        (1, b) if b < 0x80 => proxy(b),
        (3, code) => proxy(EUC_SS3_PROXY_BASE + (code & 0xffff)),
        (_, code) => proxy(MULTIBYTE_PROXY_BASE + (code & 0xffff)),
    };
    (c, n)
}

/// Text offsets to byte offsets and back. Interior positions round up
/// to the next character.
#[derive(Debug)]
struct OffsetMap {
    to_orig: Vec<usize>,
    to_text: Vec<usize>,
}

/// A byte string seen as `str` text.
#[derive(Debug)]
pub(crate) struct Transcoded<'h> {
    text: Cow<'h, str>,
    map: Option<OffsetMap>,
}

impl<'h> Transcoded<'h> {
    pub(crate) fn new(bytes: &'h [u8], enc: EncodingRef) -> Self {
        if enc.is_ascii_compatible() && (enc.is_unicode() || bytes.is_ascii()) {
            if let Ok(text) = std::str::from_utf8(bytes) {
                return Transcoded {
                    text: Cow::Borrowed(text),
                    map: None,
                };
            }
        }
        let mut text = String::with_capacity(bytes.len());
        let mut to_orig = Vec::with_capacity(bytes.len() + 1);
        let mut to_text = Vec::with_capacity(bytes.len() + 1);
        let mut p = 0;
        while p < bytes.len() {
            let (c, n) = decode_char(enc, &bytes[p..]);
            let t = text.len();
            text.push(c);
            to_text.push(t);
            to_text.extend(std::iter::repeat(text.len()).take(n - 1));
            to_orig.push(p);
            to_orig.extend(std::iter::repeat(p + n).take(c.len_utf8() - 1));
            p += n;
        }
        to_text.push(text.len());
        to_orig.push(bytes.len());
        Transcoded {
            text: Cow::Owned(text),
            map: Some(OffsetMap { to_orig, to_text }),
        }
    }

    fn into_owned(self) -> Transcoded<'static> {
        Transcoded {
            text: Cow::Owned(self.text.into_owned()),
            map: self.map,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    fn text_pos(&self, orig: usize) -> usize {
        match &self.map {
            None => {
                let mut t = orig.min(self.text.len());
                while !self.text.is_char_boundary(t) {
                    t += 1;
                }
                t
            }
            Some(m) => m.to_text.get(orig).copied().unwrap_or(self.text.len()),
        }
    }

    fn orig_pos(&self, text: usize) -> usize {
        match &self.map {
            None => text,
            Some(m) => m.to_orig[text],
        }
    }
}

// === Program ===

/// A pattern compiled by fancy-regex.
#[derive(Debug)]
pub struct FancyProgram {
    regex: fancy_regex::Regex,
    encoding: EncodingRef,
    group_count: usize,
    names: NameTable,
}

impl FancyProgram {
    fn spans(&self, caps: &fancy_regex::Captures<'_>, text: &Transcoded<'_>) -> Spans {
        (0..=self.group_count)
            .map(|i| {
                caps.get(i)
                    .map(|m| (text.orig_pos(m.start()), text.orig_pos(m.end())))
            })
            .collect()
    }

    /// Leftmost match at or after text offset `pos`.
    fn find_from<'t>(
        &self,
        text: &'t Transcoded<'_>,
        pos: usize,
    ) -> Result<Option<fancy_regex::Captures<'t>>, RegexpError> {
        Ok(self.regex.captures_from_pos(text.as_str(), pos)?)
    }

    fn search_text(
        &self,
        haystack: &[u8],
        text: &Transcoded<'_>,
        range: &SearchRange,
        cancel: &CancelToken,
    ) -> Result<Option<Spans>, RegexpError> {
        cancel.check()?;
        let (lo, hi) = range.bounds();
        if lo > haystack.len() {
            return Ok(None);
        }

        if !range.backward {
            let from = text.text_pos(range.from);
            let Some(caps) = self.find_from(text, from)? else {
                return Ok(None);
            };
            let start = caps.get(0).map_or(usize::MAX, |m| text.orig_pos(m.start()));
            if start > hi || (range.only_at_start && start != range.from) {
                return Ok(None);
            }
            return Ok(Some(self.spans(&caps, text)));
        }

        // Backward: the rightmost match starting in lo..=hi.
        let lo_text = text.text_pos(lo);
        let mut p = text.text_pos(hi.min(haystack.len()));
        loop {
            cancel.check()?;
            if let Some(caps) = self.find_from(text, p)? {
                if caps.get(0).is_some_and(|m| m.start() == p) {
                    return Ok(Some(self.spans(&caps, text)));
                }
            }
            if range.only_at_start || p <= lo_text {
                return Ok(None);
            }
            p -= 1;
            while !text.as_str().is_char_boundary(p) {
                p -= 1;
            }
        }
    }
}

impl BacktrackProgram for FancyProgram {
    fn group_count(&self) -> usize {
        self.group_count
    }

    fn names(&self) -> &NameTable {
        &self.names
    }

    fn search(
        &self,
        haystack: &[u8],
        range: &SearchRange,
        cancel: &CancelToken,
    ) -> Result<Option<Spans>, RegexpError> {
        cancel.check()?;
        let text = Transcoded::new(haystack, self.encoding);
        self.search_text(haystack, &text, range, cancel)
    }

    fn prepare(&self, haystack: &[u8]) -> Option<Arc<dyn Any + Send + Sync>> {
        Some(Arc::new(Transcoded::new(haystack, self.encoding).into_owned()))
    }

    fn search_prepared(
        &self,
        haystack: &[u8],
        prepared: &(dyn Any + Send + Sync),
        range: &SearchRange,
        cancel: &CancelToken,
    ) -> Result<Option<Spans>, RegexpError> {
        match prepared.downcast_ref::<Transcoded<'static>>() {
            Some(text) => self.search_text(haystack, text, range, cancel),
            None => self.search(haystack, range, cancel),
        }
    }
}

// === Engine ===

/// The default backtracking engine.
#[derive(Debug, Clone)]
pub struct FancyEngine {
    backtrack_limit: usize,
}

impl Default for FancyEngine {
    fn default() -> Self {
        FancyEngine {
            backtrack_limit: DEFAULT_BACKTRACK_LIMIT,
        }
    }
}

impl FancyEngine {
    pub fn new(backtrack_limit: usize) -> Self {
        FancyEngine { backtrack_limit }
    }
}

impl BacktrackEngine for FancyEngine {
    fn compile(
        &self,
        pattern: &[u8],
        encoding: EncodingRef,
        options: &Options,
    ) -> Result<Arc<dyn BacktrackProgram>, RegexpError> {
        let source = Transcoded::new(pattern, encoding);
        let translated = syntax::translate(source.as_str(), Target::Backtracking, options.is_extended())
            .map_err(|unsupported| RegexpError::Compile {
                message: unsupported.0.to_string(),
            })?;

        let mut flags = String::from("(?m");
        if options.is_multiline() {
            flags.push('s');
        }
        if options.is_extended() {
            flags.push('x');
        }
        flags.push(')');
        let full = flags + &translated.pattern;
        trace!("fancy-regex pattern {:?}", full);

        let regex = fancy_regex::RegexBuilder::new(&full)
            .case_insensitive(options.is_ignorecase())
            .backtrack_limit(self.backtrack_limit)
            .build()?;
        debug!(
            "compiled backtracking program ({} groups, {})",
            translated.group_count, encoding
        );
        Ok(Arc::new(FancyProgram {
            regex,
            encoding,
            group_count: translated.group_count,
            names: translated.names,
        }))
    }
}
