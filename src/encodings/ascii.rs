// encodings/ascii.rs - US-ASCII and ASCII-8BIT (BINARY).
// Both are single-byte; US-ASCII rejects bytes >= 0x80, BINARY accepts all.

use crate::encoding::*;

// === US-ASCII ===
pub struct AsciiEncoding;

pub static ENCODING_ASCII: AsciiEncoding = AsciiEncoding;

impl Encoding for AsciiEncoding {
    fn name(&self) -> &'static str {
        "US-ASCII"
    }

    fn max_enc_len(&self) -> usize {
        1
    }

    fn flag(&self) -> u32 {
        ENC_FLAG_ASCII_COMPATIBLE
    }

    fn char_len(&self, p: &[u8]) -> CharLen {
        match p.first() {
            None => CharLen::NeedMore(1),
            Some(&b) if b < 0x80 => CharLen::Valid(1),
            Some(_) => CharLen::Invalid,
        }
    }

    fn mbc_to_code(&self, p: &[u8]) -> u32 {
        p.first().copied().unwrap_or(0) as u32
    }

    fn builtin(&self) -> Option<Builtin> {
        Some(Builtin::UsAscii)
    }

    fn is_valid_mbc_string(&self, s: &[u8]) -> bool {
        s.is_ascii()
    }
}

// === ASCII-8BIT ===
pub struct BinaryEncoding;

pub static ENCODING_BINARY: BinaryEncoding = BinaryEncoding;

impl Encoding for BinaryEncoding {
    fn name(&self) -> &'static str {
        "ASCII-8BIT"
    }

    fn max_enc_len(&self) -> usize {
        1
    }

    fn flag(&self) -> u32 {
        ENC_FLAG_ASCII_COMPATIBLE
    }

    fn char_len(&self, p: &[u8]) -> CharLen {
        if p.is_empty() {
            CharLen::NeedMore(1)
        } else {
            CharLen::Valid(1)
        }
    }

    fn mbc_to_code(&self, p: &[u8]) -> u32 {
        p.first().copied().unwrap_or(0) as u32
    }

    fn builtin(&self) -> Option<Builtin> {
        Some(Builtin::Binary)
    }

    fn is_valid_mbc_string(&self, _s: &[u8]) -> bool {
        true
    }
}
