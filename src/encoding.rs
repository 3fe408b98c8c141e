// encoding.rs - Encoding trait, encoding handles and code ranges.
//
// Only the surface the preprocessor, the negotiator and the engine
// adapters need: precise character length, code point decoding, ASCII
// compatibility and built-in identity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

// === Encoding flags ===
pub const ENC_FLAG_ASCII_COMPATIBLE: u32 = 1 << 0;
pub const ENC_FLAG_UNICODE: u32 = 1 << 1;

/// Result of measuring the character at the head of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharLen {
    /// A complete, well-formed character of this many bytes.
    Valid(usize),
    /// The bytes cannot start a character in this encoding.
    Invalid,
    /// A valid prefix; this many more bytes are needed.
    NeedMore(usize),
}

/// The four encodings the linear-time engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    UsAscii,
    Latin1,
    Utf8,
    Binary,
}

impl Builtin {
    pub const COUNT: usize = 4;

    /// Dense index, `0..COUNT`.
    pub fn index(self) -> usize {
        match self {
            Builtin::UsAscii => 0,
            Builtin::Latin1 => 1,
            Builtin::Utf8 => 2,
            Builtin::Binary => 3,
        }
    }
}

// === Encoding Trait ===
pub trait Encoding: Send + Sync {
    /// Canonical name (e.g. "US-ASCII", "UTF-8").
    fn name(&self) -> &'static str;

    /// Maximum encoded character length in bytes.
    fn max_enc_len(&self) -> usize;

    /// Minimum encoded character length in bytes.
    fn min_enc_len(&self) -> usize {
        1
    }

    /// Encoding flags (`ENC_FLAG_*`).
    fn flag(&self) -> u32;

    /// Precise length of the character starting at `p[0]`.
    fn char_len(&self, p: &[u8]) -> CharLen;

    /// Decode one complete character (as measured by `char_len`).
    fn mbc_to_code(&self, p: &[u8]) -> u32;

    /// Built-in identity, if this is one of the four linear-engine encodings.
    fn builtin(&self) -> Option<Builtin> {
        None
    }

    /// Lenient length used when walking possibly broken text: an invalid
    /// or truncated character counts as `min_enc_len` bytes.
    fn mbc_enc_len(&self, p: &[u8]) -> usize {
        match self.char_len(p) {
            CharLen::Valid(n) => n,
            _ => self.min_enc_len().min(p.len()).max(1),
        }
    }

    fn is_ascii_compatible(&self) -> bool {
        self.flag() & ENC_FLAG_ASCII_COMPATIBLE != 0
    }

    fn is_unicode(&self) -> bool {
        self.flag() & ENC_FLAG_UNICODE != 0
    }

    fn is_single_byte(&self) -> bool {
        self.max_enc_len() == 1
    }

    /// Whether `s` is a sequence of complete, well-formed characters.
    fn is_valid_mbc_string(&self, s: &[u8]) -> bool {
        let mut p = 0;
        while p < s.len() {
            match self.char_len(&s[p..]) {
                CharLen::Valid(n) => p += n,
                _ => return false,
            }
        }
        true
    }
}

// === EncodingRef ===

/// A copyable handle to a static encoding. Handles compare by name.
#[derive(Clone, Copy)]
pub struct EncodingRef(&'static dyn Encoding);

impl EncodingRef {
    pub const fn new(enc: &'static dyn Encoding) -> Self {
        EncodingRef(enc)
    }

    pub fn get(self) -> &'static dyn Encoding {
        self.0
    }

    /// Whether `offset` falls on a character boundary of `bytes`.
    ///
    /// UTF-8 is checked locally and assumes well-formed input; other
    /// multibyte encodings walk from the start.
    pub fn is_char_boundary(self, bytes: &[u8], offset: usize) -> bool {
        if offset == 0 || offset == bytes.len() {
            return true;
        }
        if offset > bytes.len() {
            return false;
        }
        if self.is_single_byte() {
            return true;
        }
        if self.builtin() == Some(Builtin::Utf8) {
            return bytes[offset] & 0xc0 != 0x80;
        }
        let mut p = 0;
        while p < offset {
            p += self.mbc_enc_len(&bytes[p..]);
        }
        p == offset
    }

    /// Number of characters in `bytes`, counting broken units as one each.
    pub fn str_length(self, bytes: &[u8]) -> usize {
        if self.is_single_byte() {
            return bytes.len();
        }
        let mut p = 0;
        let mut n = 0;
        while p < bytes.len() {
            p += self.mbc_enc_len(&bytes[p..]);
            n += 1;
        }
        n
    }
}

impl Deref for EncodingRef {
    type Target = dyn Encoding;

    fn deref(&self) -> &(dyn Encoding + 'static) {
        self.0
    }
}

impl PartialEq for EncodingRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.name() == other.0.name()
    }
}

impl Eq for EncodingRef {}

impl Hash for EncodingRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name().hash(state);
    }
}

impl fmt::Debug for EncodingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<Encoding:{}>", self.0.name())
    }
}

impl fmt::Display for EncodingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

// === CodeRange ===

/// Well-formedness classification of a byte string under its encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeRange {
    /// ASCII-compatible encoding and every byte < 0x80.
    Ascii,
    /// Well-formed, with at least one non-ASCII character.
    Valid,
    /// Not well formed.
    Broken,
}

impl CodeRange {
    /// Classify `bytes` under `enc`.
    ///
    /// Callers that already track code ranges should pass theirs instead.
    pub fn scan(bytes: &[u8], enc: EncodingRef) -> CodeRange {
        if enc.is_ascii_compatible() && bytes.is_ascii() {
            return CodeRange::Ascii;
        }
        if enc.is_valid_mbc_string(bytes) {
            CodeRange::Valid
        } else {
            CodeRange::Broken
        }
    }

    pub fn is_ascii(self) -> bool {
        self == CodeRange::Ascii
    }
}
