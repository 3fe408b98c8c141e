// options.rs - Regexp option flags.
//
// Immutable value carried by every compiled pattern. The low bits line
// up with the integers Ruby exposes through `Regexp#options`; the rest
// are compile-time bookkeeping (literal, once, default kcode).

use std::fmt;

use bitflags::bitflags;

use crate::encoding::EncodingRef;
use crate::encodings;
use crate::error::RegexpError;

bitflags! {
    /// Raw option bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OptionFlags: u32 {
        const IGNORECASE = 1;
        const EXTENDED = 2;
        const MULTILINE = 4;
        const FIXED = 16;
        const NOENCODING = 32;
        const ONCE = 1 << 8;
        const LITERAL = 1 << 9;
        const KCODE_DEFAULT = 1 << 10;
    }
}

/// Bits visible through `Regexp#options`.
pub const RUBY_OPTION_MASK: u32 = OptionFlags::IGNORECASE.bits()
    | OptionFlags::EXTENDED.bits()
    | OptionFlags::MULTILINE.bits()
    | OptionFlags::FIXED.bits()
    | OptionFlags::NOENCODING.bits();

/// Explicit encoding selected by a literal flag (`/.../n`, `e`, `s`, `u`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KCode {
    None,
    Euc,
    Sjis,
    Utf8,
}

impl KCode {
    pub fn from_flag(c: char) -> Option<KCode> {
        match c {
            'n' | 'N' => Some(KCode::None),
            'e' | 'E' => Some(KCode::Euc),
            's' | 'S' => Some(KCode::Sjis),
            'u' | 'U' => Some(KCode::Utf8),
            _ => None,
        }
    }

    pub fn flag_char(self) -> char {
        match self {
            KCode::None => 'n',
            KCode::Euc => 'e',
            KCode::Sjis => 's',
            KCode::Utf8 => 'u',
        }
    }

    pub fn encoding(self) -> EncodingRef {
        match self {
            KCode::None => encodings::BINARY,
            KCode::Euc => encodings::EUC_JP,
            KCode::Sjis => encodings::SHIFT_JIS,
            KCode::Utf8 => encodings::UTF_8,
        }
    }
}

/// Options of a regexp.
///
/// # Examples
///
/// ```
/// use rbregexp::options::Options;
///
/// let opts = Options::new().with_ignorecase(true).with_multiline(true);
/// assert_eq!(opts.to_options_string(), "mi");
/// assert_eq!(opts.to_ruby_int(), 5);
/// assert!(opts.can_adapt_encoding());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Options {
    flags: OptionFlags,
    kcode: KCode,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            flags: OptionFlags::KCODE_DEFAULT,
            kcode: KCode::None,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_flags(flags: OptionFlags) -> Self {
        Options {
            flags: flags | OptionFlags::KCODE_DEFAULT,
            kcode: KCode::None,
        }
    }

    /// Options from a `Regexp#options`-style integer. Unknown bits are ignored.
    pub fn from_ruby_int(bits: i32) -> Self {
        Self::from_flags(OptionFlags::from_bits_truncate(bits as u32 & RUBY_OPTION_MASK))
    }

    /// Parse literal flags such as `"mix"`, `"o"` or `"n"`.
    pub fn parse(flags: &str) -> Result<Self, RegexpError> {
        let mut opts = Options::new();
        for c in flags.chars() {
            opts = match c {
                'm' => opts.with_multiline(true),
                'i' => opts.with_ignorecase(true),
                'x' => opts.with_extended(true),
                'o' => opts.with_once(true),
                c => match KCode::from_flag(c) {
                    Some(kcode) => opts.with_kcode(kcode),
                    None => {
                        return Err(RegexpError::Argument(format!(
                            "unknown regexp option: {}",
                            c
                        )))
                    }
                },
            };
        }
        Ok(opts)
    }

    pub fn flags(&self) -> OptionFlags {
        self.flags
    }

    #[inline]
    fn with(mut self, flag: OptionFlags, yes: bool) -> Self {
        self.flags.set(flag, yes);
        self
    }

    pub fn is_multiline(&self) -> bool {
        self.flags.contains(OptionFlags::MULTILINE)
    }

    pub fn is_ignorecase(&self) -> bool {
        self.flags.contains(OptionFlags::IGNORECASE)
    }

    pub fn is_extended(&self) -> bool {
        self.flags.contains(OptionFlags::EXTENDED)
    }

    pub fn is_fixed(&self) -> bool {
        self.flags.contains(OptionFlags::FIXED)
    }

    pub fn is_encoding_none(&self) -> bool {
        self.flags.contains(OptionFlags::NOENCODING)
    }

    pub fn is_literal(&self) -> bool {
        self.flags.contains(OptionFlags::LITERAL)
    }

    pub fn is_once(&self) -> bool {
        self.flags.contains(OptionFlags::ONCE)
    }

    pub fn is_kcode_default(&self) -> bool {
        self.flags.contains(OptionFlags::KCODE_DEFAULT)
    }

    pub fn with_multiline(self, yes: bool) -> Self {
        self.with(OptionFlags::MULTILINE, yes)
    }

    pub fn with_ignorecase(self, yes: bool) -> Self {
        self.with(OptionFlags::IGNORECASE, yes)
    }

    pub fn with_extended(self, yes: bool) -> Self {
        self.with(OptionFlags::EXTENDED, yes)
    }

    pub fn with_fixed(self, yes: bool) -> Self {
        self.with(OptionFlags::FIXED, yes)
    }

    pub fn with_encoding_none(self, yes: bool) -> Self {
        self.with(OptionFlags::NOENCODING, yes)
    }

    pub fn with_literal(self, yes: bool) -> Self {
        self.with(OptionFlags::LITERAL, yes)
    }

    pub fn with_once(self, yes: bool) -> Self {
        self.with(OptionFlags::ONCE, yes)
    }

    /// Select an explicit kcode; clears the default-kcode marker.
    pub fn with_kcode(mut self, kcode: KCode) -> Self {
        self.kcode = kcode;
        self.flags.remove(OptionFlags::KCODE_DEFAULT);
        self
    }

    /// The explicitly selected kcode, if any.
    pub fn kcode(&self) -> Option<KCode> {
        if self.is_kcode_default() {
            None
        } else {
            Some(self.kcode)
        }
    }

    /// A pattern may run in the subject's encoding unless its own
    /// encoding is fixed or it is an `/n` pattern.
    pub fn can_adapt_encoding(&self) -> bool {
        !(self.is_fixed() || self.is_encoding_none())
    }

    /// `m`, `i` and `x` all on: `to_s` needs no `-mix` suffix.
    pub fn is_embeddable(&self) -> bool {
        self.is_multiline() && self.is_ignorecase() && self.is_extended()
    }

    /// Resolve the explicit kcode into flags and the encoding it selects.
    /// `n` marks encoding-none (BINARY) without fixing; any other kcode
    /// fixes its encoding.
    pub fn setup(self) -> (Options, Option<EncodingRef>) {
        match self.kcode() {
            None => (self, None),
            Some(KCode::None) => (self.with_encoding_none(true), Some(encodings::BINARY)),
            Some(kcode) => (self.with_fixed(true), Some(kcode.encoding())),
        }
    }

    /// The `Regexp#options` integer.
    pub fn to_ruby_int(&self) -> i32 {
        (self.flags.bits() & RUBY_OPTION_MASK) as i32
    }

    /// `"mix"` subset in canonical order.
    pub fn to_options_string(&self) -> String {
        let mut s = String::with_capacity(3);
        if self.is_multiline() {
            s.push('m');
        }
        if self.is_ignorecase() {
            s.push('i');
        }
        if self.is_extended() {
            s.push('x');
        }
        s
    }

    pub fn without_once(self) -> Self {
        self.with_once(false)
    }

    /// Ruby-level equality: `literal` and `once` never matter, and the
    /// default-kcode marker only matters when neither side is `/n`.
    pub fn equivalent(&self, other: &Options) -> bool {
        let syntax = OptionFlags::EXTENDED
            | OptionFlags::FIXED
            | OptionFlags::IGNORECASE
            | OptionFlags::MULTILINE;
        let same = self.flags & syntax == other.flags & syntax && self.kcode == other.kcode;
        if self.is_encoding_none() || other.is_encoding_none() {
            same
        } else {
            same && self.is_encoding_none() == other.is_encoding_none()
                && self.is_kcode_default() == other.is_kcode_default()
        }
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_options_string())
    }
}
