// preprocess.rs - Pattern source preprocessing.
//
// Rewrites raw Ruby regexp source into the canonical bytes handed to a
// matching engine: byte escapes become `\xHH` (or raw multibyte chars),
// Unicode escapes become UTF-8, and the encoding the pattern is pinned
// to is discovered along the way. Also handles dynamic (interpolated)
// regexps and the encoding rules of regexp literals.

use log::trace;

use crate::encoding::{CharLen, EncodingRef};
use crate::encodings::{self, utf8};
use crate::error::RegexpError;
use crate::options::{KCode, Options};
use crate::regerror::PreprocessErrorKind;

/// How preprocessing failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMode {
    /// `RegexpError` with the source appended: `"<err>: /<source>/"`.
    Raise,
    /// `ArgumentError("regexp preprocess failed: <err>")`.
    Preprocess,
    /// Silent; the unprocessed rest of the source is copied through.
    Desc,
}

/// Canonical pattern bytes and the encoding they pin, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub bytes: Vec<u8>,
    pub fixed_encoding: Option<EncodingRef>,
}

/// A failed escape or encoding check, before the error mode is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PreprocessError {
    pub kind: PreprocessErrorKind,
    pub detail: String,
}

impl From<PreprocessErrorKind> for PreprocessError {
    fn from(kind: PreprocessErrorKind) -> Self {
        PreprocessError {
            kind,
            detail: kind.message().to_string(),
        }
    }
}

impl PreprocessError {
    fn into_regexp_error(self, mode: ErrorMode, source: &[u8]) -> RegexpError {
        match mode {
            ErrorMode::Preprocess => {
                RegexpError::Argument(format!("regexp preprocess failed: {}", self.detail))
            }
            _ => RegexpError::preprocess(self.kind, &self.detail, source),
        }
    }
}

type PResult<T> = Result<T, PreprocessError>;

// === Numeric scanning ===

fn hex_val(b: u8) -> Option<u32> {
    (b as char).to_digit(16)
}

/// Up to `max` hex digits at the head of `s`: (value, digit count).
/// The value saturates; callers reject long runs by count.
fn scan_hex(s: &[u8], max: usize) -> (u32, usize) {
    let mut v: u32 = 0;
    let mut n = 0;
    while n < max && n < s.len() {
        match hex_val(s[n]) {
            Some(d) => v = v.saturating_mul(16).saturating_add(d),
            None => break,
        }
        n += 1;
    }
    (v, n)
}

/// Up to `max` octal digits at the head of `s`: (value, digit count).
fn scan_oct(s: &[u8], max: usize) -> (u32, usize) {
    let mut v: u32 = 0;
    let mut n = 0;
    while n < max && n < s.len() && (b'0'..=b'7').contains(&s[n]) {
        v = v.saturating_mul(8).saturating_add((s[n] - b'0') as u32);
        n += 1;
    }
    (v, n)
}

fn push_hex_escape(out: &mut Vec<u8>, b: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.extend_from_slice(&[b'\\', b'x', HEX[(b >> 4) as usize], HEX[(b & 0xf) as usize]]);
}

// === Byte escapes ===

/// Read one backslash escape at `s[p..]` denoting a single byte.
///
/// Returns the byte and the position after the escape. Handles named
/// escapes, octal, `\xH[H]`, and the meta/control prefixes (`\M-`,
/// `\C-`, `\c`), which may nest.
pub(crate) fn read_escaped_byte(s: &[u8], mut p: usize) -> PResult<(u8, usize)> {
    use PreprocessErrorKind::*;

    if s.get(p) != Some(&b'\\') {
        return Err(TooShortEscapedMultibyte.into());
    }
    p += 1;

    let mut meta = false;
    let mut ctrl = false;
    loop {
        let Some(&c) = s.get(p) else {
            return Err(TooShortEscapeSequence.into());
        };
        p += 1;
        let code: u32 = match c {
            b'\\' => b'\\' as u32,
            b'n' => b'\n' as u32,
            b't' => b'\t' as u32,
            b'r' => b'\r' as u32,
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'a' => 0x07,
            b'e' => 0x1b,
            b'0'..=b'7' => {
                let (v, n) = scan_oct(&s[p - 1..], 3);
                p += n - 1;
                v
            }
            b'x' => {
                let (v, n) = scan_hex(&s[p..], 2);
                if n == 0 {
                    return Err(InvalidHexEscape.into());
                }
                p += n;
                v
            }
            b'M' => {
                if meta {
                    return Err(DuplicateMetaEscape.into());
                }
                meta = true;
                if p + 1 < s.len() && s[p] == b'-' && s[p + 1] < 0x80 {
                    p += 1;
                    if s[p] == b'\\' {
                        p += 1;
                        continue;
                    }
                    p += 1;
                    s[p - 1] as u32
                } else {
                    return Err(TooShortMetaEscape.into());
                }
            }
            b'C' | b'c' => {
                if c == b'C' {
                    if s.get(p) != Some(&b'-') {
                        return Err(TooShortControlEscape.into());
                    }
                    p += 1;
                }
                if ctrl {
                    return Err(DuplicateControlEscape.into());
                }
                ctrl = true;
                match s.get(p) {
                    Some(b'\\') => {
                        p += 1;
                        continue;
                    }
                    Some(&x) if x < 0x80 => {
                        p += 1;
                        x as u32
                    }
                    _ => return Err(TooShortControlEscape.into()),
                }
            }
            _ => return Err(UnexpectedEscapeSequence.into()),
        };

        if code > 0xff {
            return Err(InvalidEscapeCode.into());
        }
        let mut byte = code as u8;
        if ctrl {
            byte &= 0x1f;
        }
        if meta {
            byte |= 0x80;
        }
        return Ok((byte, p));
    }
}

// === Unescaper ===

/// One pass over a pattern source. With `out == None` only the checks
/// and the encoding discovery run.
struct Unescaper<'a> {
    src: &'a [u8],
    enc: EncodingRef,
    out: Option<&'a mut Vec<u8>>,
    fixed: Option<EncodingRef>,
    has_property: bool,
}

impl<'a> Unescaper<'a> {
    fn emit(&mut self, bytes: &[u8]) {
        if let Some(out) = self.out.as_deref_mut() {
            out.extend_from_slice(bytes);
        }
    }

    fn emit_hex(&mut self, b: u8) {
        if let Some(out) = self.out.as_deref_mut() {
            push_hex_escape(out, b);
        }
    }

    fn fix(&mut self, enc: EncodingRef, conflict: PreprocessErrorKind) -> PResult<()> {
        match self.fixed {
            None => {
                self.fixed = Some(enc);
                Ok(())
            }
            Some(fixed) if fixed == enc => Ok(()),
            Some(_) => Err(conflict.into()),
        }
    }

    /// Scan the whole source. On failure, also reports where the
    /// failing token began.
    fn run(&mut self) -> Result<(), (PreprocessError, usize)> {
        let mut p = 0;
        while p < self.src.len() {
            let token = p;
            p = self.step(p).map_err(|e| (e, token))?;
        }
        Ok(())
    }

    /// Process the token at `p`; returns the position after it.
    fn step(&mut self, p: usize) -> PResult<usize> {
        use PreprocessErrorKind::*;

        let src = self.src;
        let cl = match self.enc.char_len(&src[p..]) {
            CharLen::Valid(n) => n,
            _ => return Err(InvalidMultibyteCharacter.into()),
        };
        if cl > 1 || src[p] & 0x80 != 0 {
            self.emit(&src[p..p + cl]);
            self.fix(self.enc, NonAsciiInUtf8)?;
            return Ok(p + cl);
        }
        if src[p] != b'\\' {
            self.emit(&src[p..p + 1]);
            return Ok(p + 1);
        }

        let Some(&c) = src.get(p + 1) else {
            return Err(TooShortEscapeSequence.into());
        };
        match c {
            b'1'..=b'7' if scan_oct(&src[p + 1..], usize::MAX).0 <= 0o177 => {
                self.emit(&src[p..p + 2]);
                Ok(p + 2)
            }
            b'0'..=b'7' | b'x' | b'c' | b'C' | b'M' => {
                if self.enc == encodings::US_ASCII {
                    let (_, next) = read_escaped_byte(src, p)?;
                    self.emit(&src[p..next]);
                    Ok(next)
                } else {
                    self.escaped_non_ascii(p)
                }
            }
            b'u' => {
                let q = p + 2;
                match src.get(q) {
                    None => Err(TooShortEscapeSequence.into()),
                    Some(b'{') => {
                        let q = self.unicode_list(q + 1)?;
                        if src.get(q) != Some(&b'}') {
                            return Err(InvalidUnicodeList.into());
                        }
                        Ok(q + 1)
                    }
                    Some(_) => self.unicode_bmp(q),
                }
            }
            b'p' | b'P' => {
                if self.fixed.is_none() {
                    self.has_property = true;
                }
                self.emit(&src[p..p + 2]);
                Ok(p + 2)
            }
            _ => {
                // A raw multibyte char after the backslash stays whole.
                let n = match self.enc.char_len(&src[p + 1..]) {
                    CharLen::Valid(n) => n,
                    _ => 1,
                };
                self.emit(&src[p..p + 1 + n]);
                Ok(p + 1 + n)
            }
        }
    }

    /// A run of byte escapes forming one character of the source encoding.
    fn escaped_non_ascii(&mut self, mut p: usize) -> PResult<usize> {
        use PreprocessErrorKind::*;

        let max = self.enc.max_enc_len();
        let mut buf: smallvec::SmallVec<[u8; 4]> = smallvec::SmallVec::new();
        let (b, next) = read_escaped_byte(self.src, p)?;
        buf.push(b);
        p = next;
        while buf.len() < max && matches!(self.enc.char_len(&buf), CharLen::NeedMore(_)) {
            let (b, next) = read_escaped_byte(self.src, p)?;
            buf.push(b);
            p = next;
        }
        if self.enc.char_len(&buf) == CharLen::Invalid {
            return Err(InvalidMultibyteEscape.into());
        }
        if buf.len() > 1 || buf[0] & 0x80 != 0 {
            self.emit(&buf);
            self.fix(self.enc, EscapedNonAsciiInUtf8)?;
        } else {
            self.emit_hex(buf[0]);
        }
        Ok(p)
    }

    /// `\uHHHH`; `p` is just past the `u`.
    fn unicode_bmp(&mut self, p: usize) -> PResult<usize> {
        let (code, n) = scan_hex(&self.src[p..], 4);
        if n != 4 {
            return Err(PreprocessErrorKind::InvalidUnicodeEscape.into());
        }
        self.append_utf8(code)?;
        Ok(p + 4)
    }

    /// `\u{H HH ...}` body; `p` is just past the `{`. Returns the
    /// position of the expected `}`.
    fn unicode_list(&mut self, mut p: usize) -> PResult<usize> {
        let src = self.src;
        let skip_space = |mut p: usize| {
            while p < src.len() && src[p].is_ascii_whitespace() {
                p += 1;
            }
            p
        };
        p = skip_space(p);
        let mut any = false;
        loop {
            let (code, n) = scan_hex(&src[p..], usize::MAX);
            if n == 0 {
                break;
            }
            if n > 6 {
                return Err(PreprocessErrorKind::InvalidUnicodeRange.into());
            }
            p += n;
            self.append_utf8(code)?;
            any = true;
            p = skip_space(p);
        }
        if !any {
            return Err(PreprocessErrorKind::InvalidUnicodeList.into());
        }
        Ok(p)
    }

    fn append_utf8(&mut self, code: u32) -> PResult<()> {
        if (0xd800..=0xdfff).contains(&code) || code > 0x10ffff {
            return Err(PreprocessErrorKind::InvalidUnicodeRange.into());
        }
        if code < 0x80 {
            self.emit_hex(code as u8);
            return Ok(());
        }
        let mut buf = [0u8; 4];
        let n = utf8::code_to_mbc(code, &mut buf);
        self.emit(&buf[..n]);
        self.fix(encodings::UTF_8, PreprocessErrorKind::Utf8InNonUtf8)
    }
}

fn initial_fixed(enc: EncodingRef) -> Option<EncodingRef> {
    if enc.is_ascii_compatible() {
        None
    } else {
        Some(enc)
    }
}

// === Entry points ===

/// Preprocess `source` (in `enc`) into canonical engine input.
///
/// # Examples
///
/// ```
/// use rbregexp::encodings;
/// use rbregexp::preprocess::{preprocess, ErrorMode};
///
/// let out = preprocess(br"caf\u00e9", encodings::US_ASCII, ErrorMode::Raise).unwrap();
/// assert_eq!(out.bytes, "caf\u{e9}".as_bytes());
/// assert_eq!(out.fixed_encoding, Some(encodings::UTF_8));
/// ```
pub fn preprocess(
    source: &[u8],
    enc: EncodingRef,
    mode: ErrorMode,
) -> Result<Preprocessed, RegexpError> {
    let mut bytes = Vec::with_capacity(source.len());
    let mut un = Unescaper {
        src: source,
        enc,
        out: Some(&mut bytes),
        fixed: initial_fixed(enc),
        has_property: false,
    };
    let result = un.run();
    let (mut fixed, has_property) = (un.fixed, un.has_property);
    if let Err((err, token)) = result {
        if mode != ErrorMode::Desc {
            return Err(err.into_regexp_error(mode, source));
        }
        trace!("preprocess: {} at byte {}, copying rest", err.detail, token);
        bytes.extend_from_slice(&source[token..]);
    }
    if has_property && fixed.is_none() {
        fixed = Some(enc);
    }
    Ok(Preprocessed {
        bytes,
        fixed_encoding: fixed,
    })
}

/// Check `source` without building output; returns the fixed encoding.
pub(crate) fn preprocess_light(
    source: &[u8],
    enc: EncodingRef,
) -> Result<Option<EncodingRef>, RegexpError> {
    let mut un = Unescaper {
        src: source,
        enc,
        out: None,
        fixed: initial_fixed(enc),
        has_property: false,
    };
    un.run()
        .map_err(|(err, _)| err.into_regexp_error(ErrorMode::Preprocess, source))?;
    if un.has_property && un.fixed.is_none() {
        return Ok(Some(enc));
    }
    Ok(un.fixed)
}

/// Validate a pattern source the way a regexp literal is checked.
pub fn preprocess_check(source: &[u8], enc: EncodingRef) -> Result<(), RegexpError> {
    preprocess(source, enc, ErrorMode::Raise).map(|_| ())
}

// === Dynamic regexps ===

/// One interpolated piece of a dynamic regexp.
#[derive(Debug, Clone, Copy)]
pub struct DRegexpPart<'a> {
    pub bytes: &'a [u8],
    pub encoding: EncodingRef,
}

/// True if `bytes` is 7-bit, counting `\xHH` escapes by their value.
fn all_7bit(bytes: &[u8]) -> bool {
    let mut n = 0;
    while n < bytes.len() {
        if bytes[n] >= 0x80 {
            return false;
        }
        if bytes[n] == b'\\' && bytes.get(n + 1) == Some(&b'x') {
            let (v, len) = scan_hex(&bytes[n + 2..], 2);
            if len > 0 && v > 0x7f {
                return false;
            }
            n += 1 + len;
        }
        n += 1;
    }
    true
}

fn dregexp_part_encoding(
    part: &DRegexpPart<'_>,
    options: &Options,
    current: Option<EncodingRef>,
) -> Result<Option<EncodingRef>, RegexpError> {
    let mut enc = part.encoding;
    if options.is_encoding_none() && enc != encodings::BINARY {
        if !part.bytes.is_ascii() {
            let kind = PreprocessErrorKind::NonEscapedNonAsciiInBinary;
            return Err(RegexpError::Preprocess {
                kind,
                message: kind.message().to_string(),
            });
        }
        enc = encodings::BINARY;
    }
    match preprocess_light(part.bytes, enc)? {
        None => Ok(current),
        Some(fixed) => match current {
            Some(cur) if cur != fixed => {
                let kind = PreprocessErrorKind::DynamicEncodingMismatch;
                Err(RegexpError::Preprocess {
                    kind,
                    message: format!("{}: {} and {}", kind.message(), cur, fixed),
                })
            }
            _ => Ok(Some(fixed)),
        },
    }
}

/// Join the parts of an interpolated regexp, checking each, and pick
/// the encoding of the result.
pub fn preprocess_dregexp(
    parts: &[DRegexpPart<'_>],
    options: &Options,
) -> Result<(Vec<u8>, EncodingRef), RegexpError> {
    let Some(first) = parts.first() else {
        return Err(RegexpError::Argument("empty dynamic regexp".to_string()));
    };
    let mut bytes = Vec::new();
    let mut enc = None;
    for part in parts {
        enc = dregexp_part_encoding(part, options, enc)?;
        bytes.extend_from_slice(part.bytes);
    }
    if options.is_encoding_none() {
        enc = Some(if all_7bit(&bytes) {
            encodings::US_ASCII
        } else {
            encodings::BINARY
        });
    }
    Ok((bytes, enc.unwrap_or(first.encoding)))
}

// === Literal encoding ===

/// Pick the encoding of a regexp literal's source from its options and
/// the encoding of the surrounding script.
pub fn set_regexp_encoding(
    source: &[u8],
    source_encoding: EncodingRef,
    options: &Options,
    lexer_encoding: EncodingRef,
) -> Result<EncodingRef, RegexpError> {
    let (options, option_encoding) = options.setup();
    let ascii_only = source_encoding.is_ascii_compatible() && source.is_ascii();

    if let (Some(kcode), Some(enc)) = (options.kcode(), option_encoding) {
        if kcode != KCode::None {
            if enc != source_encoding && !ascii_only {
                return Err(RegexpError::Argument(format!(
                    "regexp encoding option '{}' differs from source encoding '{}'",
                    kcode.flag_char(),
                    source_encoding
                )));
            }
            return Ok(enc);
        }
    }
    if options.is_encoding_none() {
        if source_encoding == encodings::BINARY && !ascii_only {
            return Err(RegexpError::Argument(format!(
                "regexp encoding option ' ' differs from source encoding '{}'",
                source_encoding
            )));
        }
        return Ok(encodings::BINARY);
    }
    if lexer_encoding == encodings::US_ASCII {
        // A non-ASCII US-ASCII source is rejected later by preprocessing.
        return Ok(if ascii_only {
            encodings::BINARY
        } else {
            encodings::US_ASCII
        });
    }
    Ok(source_encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodings::{BINARY, EUC_JP, SHIFT_JIS, US_ASCII, UTF_16LE, UTF_8};

    fn pp(src: &[u8], enc: EncodingRef) -> Preprocessed {
        preprocess(src, enc, ErrorMode::Raise).unwrap()
    }

    fn pp_err(src: &[u8], enc: EncodingRef) -> String {
        preprocess(src, enc, ErrorMode::Raise).unwrap_err().to_string()
    }

    // === Byte escapes ===

    #[test]
    fn escaped_byte_forms() {
        assert_eq!(read_escaped_byte(b"\\n", 0).unwrap(), (b'\n', 2));
        assert_eq!(read_escaped_byte(b"\\101x", 0).unwrap(), (b'A', 4));
        assert_eq!(read_escaped_byte(b"\\x4", 0).unwrap(), (0x04, 3));
        assert_eq!(read_escaped_byte(b"\\xff", 0).unwrap(), (0xff, 4));
        assert_eq!(read_escaped_byte(b"\\M-a", 0).unwrap(), (b'a' | 0x80, 4));
        assert_eq!(read_escaped_byte(b"\\C-a", 0).unwrap(), (0x01, 4));
        assert_eq!(read_escaped_byte(b"\\ca", 0).unwrap(), (0x01, 3));
        assert_eq!(read_escaped_byte(b"\\M-\\C-a", 0).unwrap(), (0x81, 7));
        assert_eq!(read_escaped_byte(b"\\c\\M-a", 0).unwrap(), (0x81, 6));
    }

    #[test]
    fn escaped_byte_errors() {
        use PreprocessErrorKind::*;
        let kind = |s: &[u8]| read_escaped_byte(s, 0).unwrap_err().kind;
        assert_eq!(kind(b"x"), TooShortEscapedMultibyte);
        assert_eq!(kind(b"\\"), TooShortEscapeSequence);
        assert_eq!(kind(b"\\xg"), InvalidHexEscape);
        assert_eq!(kind(b"\\M-\\M-a"), DuplicateMetaEscape);
        assert_eq!(kind(b"\\M"), TooShortMetaEscape);
        assert_eq!(kind(b"\\C"), TooShortControlEscape);
        assert_eq!(kind(b"\\c\\ca"), DuplicateControlEscape);
        assert_eq!(kind(b"\\c"), TooShortControlEscape);
        assert_eq!(kind(b"\\q"), UnexpectedEscapeSequence);
        assert_eq!(kind(b"\\777"), InvalidEscapeCode);
    }

    // === Preprocess ===

    #[test]
    fn plain_ascii_is_unchanged() {
        let out = pp(b"a(b|c)*\\d+\\.", US_ASCII);
        assert_eq!(out.bytes, b"a(b|c)*\\d+\\.");
        assert_eq!(out.fixed_encoding, None);
    }

    #[test]
    fn unicode_escape_fixes_utf8() {
        let out = pp(b"\\u00e9", US_ASCII);
        assert_eq!(out.bytes, [0xc3, 0xa9]);
        assert_eq!(out.fixed_encoding, Some(UTF_8));

        let out = pp(b"\\u{41 20AC}", UTF_8);
        assert_eq!(out.bytes, b"\\x41\xe2\x82\xac");
        assert_eq!(out.fixed_encoding, Some(UTF_8));
    }

    #[test]
    fn hex_escape_kept_under_us_ascii() {
        let out = pp(b"\\x41", US_ASCII);
        assert_eq!(out.bytes, b"\\x41");
        assert_eq!(out.fixed_encoding, None);
    }

    #[test]
    fn hex_escape_normalized_elsewhere() {
        assert_eq!(pp(b"\\x4a\\x7", UTF_8).bytes, b"\\x4A\\x07");
        // Small octal values pass through for the engine to read.
        assert_eq!(pp(b"\\101", UTF_8).bytes, b"\\101");
        let out = pp(b"\\xc3\\xa9", UTF_8);
        assert_eq!(out.bytes, [0xc3, 0xa9]);
        assert_eq!(out.fixed_encoding, Some(UTF_8));
        let out = pp(b"\\xe9", BINARY);
        assert_eq!(out.bytes, [0xe9]);
        assert_eq!(out.fixed_encoding, Some(BINARY));
    }

    #[test]
    fn backrefs_stay_backrefs() {
        assert_eq!(pp(b"(a)\\1", UTF_8).bytes, b"(a)\\1");
        assert_eq!(pp(b"\\177", UTF_8).bytes, b"\\177");
        // 0o200 is above the threshold: a byte escape.
        assert_eq!(pp(b"\\200", BINARY).bytes, [0x80]);
    }

    #[test]
    fn raw_multibyte_fixes_source_encoding() {
        let out = pp("caf\u{e9}".as_bytes(), UTF_8);
        assert_eq!(out.fixed_encoding, Some(UTF_8));
        assert_eq!(out.bytes, "caf\u{e9}".as_bytes());
        let out = pp(b"\x82\xa0", SHIFT_JIS);
        assert_eq!(out.fixed_encoding, Some(SHIFT_JIS));
    }

    #[test]
    fn property_forces_source_encoding() {
        let out = pp(b"\\p{Alpha}", UTF_8);
        assert_eq!(out.bytes, b"\\p{Alpha}");
        assert_eq!(out.fixed_encoding, Some(UTF_8));
    }

    #[test]
    fn ascii_incompatible_source_is_fixed_up_front() {
        let out = pp(b"a\0", UTF_16LE);
        assert_eq!(out.fixed_encoding, Some(UTF_16LE));
    }

    #[test]
    fn error_messages_carry_source() {
        assert_eq!(pp_err(b"\\", UTF_8), "too short escape sequence: /\\/");
        assert_eq!(pp_err(b"\\u12", UTF_8), "invalid Unicode escape: /\\u12/");
        assert_eq!(pp_err(b"\\u{}", UTF_8), "invalid Unicode list: /\\u{}/");
        assert_eq!(pp_err(b"\\u{41", UTF_8), "invalid Unicode list: /\\u{41/");
        assert_eq!(
            pp_err(b"\\u{1234567}", UTF_8),
            "invalid Unicode range: /\\u{1234567}/"
        );
        assert_eq!(pp_err(b"\\uD800", UTF_8), "invalid Unicode range: /\\uD800/");
        assert_eq!(pp_err(b"\\u", UTF_8), "too short escape sequence: /\\u/");
        assert!(pp_err(b"\xff", UTF_8).starts_with("invalid multibyte character"));
        assert!(pp_err(b"\\xff", UTF_8).starts_with("invalid multibyte escape"));
    }

    #[test]
    fn encoding_conflicts() {
        // A Unicode escape pins UTF-8; a raw EUC-JP char then conflicts.
        let err = pp_err(b"\\u3042\xa4\xa2", EUC_JP);
        assert!(err.starts_with("non ASCII character in UTF-8 regexp"), "{}", err);
        let err = pp_err(b"\xa4\xa2\\u3042", EUC_JP);
        assert!(err.starts_with("UTF-8 character in non UTF-8 regexp"), "{}", err);
        let err = pp_err(b"\\u3042\\xa4\\xa2", EUC_JP);
        assert!(err.starts_with("escaped non ASCII character in UTF-8 regexp"), "{}", err);
    }

    #[test]
    fn preprocess_mode_wraps_in_argument_error() {
        let err = preprocess(b"\\", UTF_8, ErrorMode::Preprocess).unwrap_err();
        assert_eq!(
            err,
            RegexpError::Argument("regexp preprocess failed: too short escape sequence".into())
        );
    }

    #[test]
    fn desc_mode_copies_rest() {
        let out = preprocess(b"a\\x41\\u{zz}b", UTF_8, ErrorMode::Desc).unwrap();
        assert_eq!(out.bytes, b"a\\x41\\u{zz}b");
    }

    // === Dynamic regexps ===

    #[test]
    fn dregexp_joins_parts() {
        let parts = [
            DRegexpPart { bytes: b"a", encoding: US_ASCII },
            DRegexpPart { bytes: "\u{e9}".as_bytes(), encoding: UTF_8 },
        ];
        let (bytes, enc) = preprocess_dregexp(&parts, &Options::new()).unwrap();
        assert_eq!(bytes, "a\u{e9}".as_bytes());
        assert_eq!(enc, UTF_8);
    }

    #[test]
    fn dregexp_unresolved_uses_first_encoding() {
        let parts = [
            DRegexpPart { bytes: b"a", encoding: US_ASCII },
            DRegexpPart { bytes: b"b", encoding: UTF_8 },
        ];
        let (_, enc) = preprocess_dregexp(&parts, &Options::new()).unwrap();
        assert_eq!(enc, US_ASCII);
    }

    #[test]
    fn dregexp_encoding_mismatch() {
        let parts = [
            DRegexpPart { bytes: "\u{e9}".as_bytes(), encoding: UTF_8 },
            DRegexpPart { bytes: b"\xa4\xa2", encoding: EUC_JP },
        ];
        let err = preprocess_dregexp(&parts, &Options::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "encoding mismatch in dynamic regexp: UTF-8 and EUC-JP"
        );
    }

    #[test]
    fn dregexp_encoding_none() {
        let opts = Options::parse("n").unwrap().setup().0;
        let parts = [DRegexpPart { bytes: b"a\\x41", encoding: UTF_8 }];
        assert_eq!(preprocess_dregexp(&parts, &opts).unwrap().1, US_ASCII);
        let parts = [DRegexpPart { bytes: b"a\\xff", encoding: UTF_8 }];
        assert_eq!(preprocess_dregexp(&parts, &opts).unwrap().1, BINARY);
        let parts = [DRegexpPart { bytes: "\u{e9}".as_bytes(), encoding: UTF_8 }];
        let err = preprocess_dregexp(&parts, &opts).unwrap_err();
        assert_eq!(
            err.preprocess_kind(),
            Some(PreprocessErrorKind::NonEscapedNonAsciiInBinary)
        );
    }

    // === Literal encoding ===

    #[test]
    fn literal_encoding_rules() {
        let u = Options::parse("u").unwrap();
        assert_eq!(set_regexp_encoding(b"a", BINARY, &u, UTF_8).unwrap(), UTF_8);
        let err = set_regexp_encoding(b"\xa4\xa2", EUC_JP, &u, UTF_8).unwrap_err();
        assert_eq!(
            err.to_string(),
            "regexp encoding option 'u' differs from source encoding 'EUC-JP'"
        );

        let n = Options::parse("n").unwrap();
        assert_eq!(set_regexp_encoding(b"a", UTF_8, &n, UTF_8).unwrap(), BINARY);
        assert!(set_regexp_encoding(b"\xff", BINARY, &n, UTF_8).is_err());

        let plain = Options::new();
        assert_eq!(set_regexp_encoding(b"a", US_ASCII, &plain, US_ASCII).unwrap(), BINARY);
        assert_eq!(set_regexp_encoding(b"a", UTF_8, &plain, UTF_8).unwrap(), UTF_8);
    }
}
