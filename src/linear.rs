// linear.rs - Linear-time engine adapter over regex-automata's meta regex.
//
// Only the four built-in encodings are accepted. UTF-8 and US-ASCII
// patterns run in Unicode mode; BINARY and ISO-8859-1 patterns run on
// raw bytes with Unicode disabled. Anything the dialect translator
// cannot express, or regex-automata rejects, is a refusal.
//
// Byte mode folds case for ASCII only, so case-insensitive ISO-8859-1
// patterns are refused as well.

use std::sync::Arc;

use log::debug;
use regex_automata::meta;
use regex_automata::util::captures::Captures;
use regex_automata::util::syntax;
use regex_automata::{Anchored, Input};

use crate::encoding::{Builtin, EncodingRef};
use crate::engine::{LinearEngine, LinearMatch, LinearProgram, SearchRange};
use crate::error::RegexpError;
use crate::options::Options;
use crate::syntax::{translate, Target};

/// Pattern bytes of a byte-mode encoding as pattern text: high bytes
/// become `\xHH`.
fn byte_pattern_text(pattern: &[u8]) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut escaping = false;
    for &b in pattern {
        if b < 0x80 {
            out.push(b as char);
            escaping = b == b'\\' && !escaping;
            continue;
        }
        if escaping {
            // `\<byte>` is the byte itself.
            out.pop();
        }
        out.push_str(&format!("\\x{:02X}", b));
        escaping = false;
    }
    out
}

/// Groups of one meta-regex match.
#[derive(Debug)]
pub struct MetaMatch {
    caps: Captures,
    group_count: usize,
}

impl LinearMatch for MetaMatch {
    fn group_count(&self) -> usize {
        self.group_count
    }

    fn group(&self, index: usize) -> Option<(usize, usize)> {
        self.caps.get_group(index).map(|span| (span.start, span.end))
    }
}

/// A pattern compiled by the meta regex engine.
#[derive(Debug)]
pub struct MetaProgram {
    regex: meta::Regex,
    anchored: bool,
    unicode: bool,
    group_count: usize,
}

impl MetaProgram {
    fn attempt(&self, haystack: &[u8], at: usize, anchored: bool) -> Option<Captures> {
        let input = Input::new(haystack)
            .span(at..haystack.len())
            .anchored(if anchored { Anchored::Yes } else { Anchored::No });
        let mut caps = self.regex.create_captures();
        self.regex.search_captures(&input, &mut caps);
        caps.is_match().then_some(caps)
    }

    fn wrap(&self, caps: Captures) -> Arc<dyn LinearMatch> {
        Arc::new(MetaMatch {
            caps,
            group_count: self.group_count,
        })
    }
}

impl LinearProgram for MetaProgram {
    fn group_count(&self) -> usize {
        self.group_count
    }

    fn search(
        &self,
        haystack: &[u8],
        range: &SearchRange,
    ) -> Result<Option<Arc<dyn LinearMatch>>, RegexpError> {
        let (lo, hi) = range.bounds();
        if lo > haystack.len() {
            return Ok(None);
        }
        let only_at_start = self.anchored || range.only_at_start;

        if !range.backward {
            let Some(caps) = self.attempt(haystack, range.from, only_at_start) else {
                return Ok(None);
            };
            let start = caps.get_group(0).map_or(usize::MAX, |s| s.start);
            if start > hi {
                return Ok(None);
            }
            return Ok(Some(self.wrap(caps)));
        }

        let hi = hi.min(haystack.len());
        for p in (lo..=hi).rev() {
            if self.unicode && p < haystack.len() && (haystack[p] & 0xc0) == 0x80 {
                continue;
            }
            if let Some(caps) = self.attempt(haystack, p, true) {
                return Ok(Some(self.wrap(caps)));
            }
            if only_at_start {
                break;
            }
        }
        Ok(None)
    }
}

/// The default linear-time engine.
#[derive(Debug, Clone, Default)]
pub struct MetaEngine;

impl MetaEngine {
    pub fn new() -> Self {
        MetaEngine
    }
}

impl LinearEngine for MetaEngine {
    fn compile(
        &self,
        pattern: &[u8],
        encoding: EncodingRef,
        options: &Options,
        only_at_start: bool,
    ) -> Option<Arc<dyn LinearProgram>> {
        let builtin = encoding.builtin()?;
        let unicode = match builtin {
            Builtin::Utf8 | Builtin::UsAscii => true,
            Builtin::Binary | Builtin::Latin1 => false,
        };
        if builtin == Builtin::Latin1 && options.is_ignorecase() {
            debug!("linear engine refused: ISO-8859-1 case folding");
            return None;
        }
        let text = if unicode {
            match std::str::from_utf8(pattern) {
                Ok(text) => text.to_string(),
                Err(_) => {
                    debug!("linear engine refused: pattern is not UTF-8");
                    return None;
                }
            }
        } else {
            byte_pattern_text(pattern)
        };
        let translated = match translate(&text, Target::Linear { unicode }, options.is_extended()) {
            Ok(t) => t,
            Err(unsupported) => {
                debug!("linear engine refused: {}", unsupported.0);
                return None;
            }
        };
        if builtin == Builtin::Latin1 && translated.inline_ignorecase {
            debug!("linear engine refused: ISO-8859-1 case folding");
            return None;
        }

        let syntax = syntax::Config::new()
            .multi_line(true)
            .dot_matches_new_line(options.is_multiline())
            .case_insensitive(options.is_ignorecase())
            .ignore_whitespace(options.is_extended())
            .unicode(unicode)
            .utf8(unicode);
        let regex = meta::Regex::builder()
            .syntax(syntax)
            .configure(meta::Config::new().utf8_empty(unicode))
            .build(&translated.pattern);
        let regex = match regex {
            Ok(regex) => regex,
            Err(err) => {
                debug!("linear engine refused: {}", RegexpError::from(err));
                return None;
            }
        };
        debug!(
            "compiled linear program ({} groups, {}, anchored: {})",
            translated.group_count, encoding, only_at_start
        );
        Some(Arc::new(MetaProgram {
            regex,
            anchored: only_at_start,
            unicode,
            group_count: translated.group_count,
        }))
    }
}
