// encodings/utf8.rs - UTF-8 (RFC 3629 range: U+0000 - U+10FFFF).
// Strict: rejects overlong forms, surrogates and code points past U+10FFFF.

use crate::encoding::*;

// === EncLen_UTF8 Table ===
// Maps first byte to character length; 0 marks bytes that never lead.
static ENC_LEN_UTF8: [u8; 256] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

#[inline]
fn utf8_istail(c: u8) -> bool {
    (c & 0xc0) == 0x80
}

/// Allowed range for the second byte, which depends on the lead byte.
#[inline]
fn second_byte_range(lead: u8) -> (u8, u8) {
    match lead {
        0xe0 => (0xa0, 0xbf),
        0xed => (0x80, 0x9f),
        0xf0 => (0x90, 0xbf),
        0xf4 => (0x80, 0x8f),
        _ => (0x80, 0xbf),
    }
}

// === UTF-8 Encoding Struct ===
pub struct Utf8Encoding;

pub static ENCODING_UTF8: Utf8Encoding = Utf8Encoding;

impl Encoding for Utf8Encoding {
    fn name(&self) -> &'static str {
        "UTF-8"
    }

    fn max_enc_len(&self) -> usize {
        4
    }

    fn flag(&self) -> u32 {
        ENC_FLAG_ASCII_COMPATIBLE | ENC_FLAG_UNICODE
    }

    fn char_len(&self, p: &[u8]) -> CharLen {
        let Some(&lead) = p.first() else {
            return CharLen::NeedMore(1);
        };
        let len = ENC_LEN_UTF8[lead as usize] as usize;
        if len == 0 {
            return CharLen::Invalid;
        }
        if len == 1 {
            return CharLen::Valid(1);
        }
        for i in 1..len {
            let Some(&b) = p.get(i) else {
                return CharLen::NeedMore(len - i);
            };
            let ok = if i == 1 {
                let (lo, hi) = second_byte_range(lead);
                (lo..=hi).contains(&b)
            } else {
                utf8_istail(b)
            };
            if !ok {
                return CharLen::Invalid;
            }
        }
        CharLen::Valid(len)
    }

    fn mbc_to_code(&self, p: &[u8]) -> u32 {
        let len = match self.char_len(p) {
            CharLen::Valid(n) => n,
            _ => return p.first().copied().unwrap_or(0) as u32,
        };
        let mut code = match len {
            1 => return p[0] as u32,
            2 => (p[0] & 0x1f) as u32,
            3 => (p[0] & 0x0f) as u32,
            _ => (p[0] & 0x07) as u32,
        };
        for &b in &p[1..len] {
            code = (code << 6) | (b & 0x3f) as u32;
        }
        code
    }

    fn builtin(&self) -> Option<Builtin> {
        Some(Builtin::Utf8)
    }

    fn is_valid_mbc_string(&self, s: &[u8]) -> bool {
        std::str::from_utf8(s).is_ok()
    }
}

/// Encode `code` as UTF-8 into `buf`, returning the byte count.
/// `code` must be a Unicode scalar value.
pub fn code_to_mbc(code: u32, buf: &mut [u8; 4]) -> usize {
    if code < 0x80 {
        buf[0] = code as u8;
        1
    } else if code < 0x800 {
        buf[0] = 0xc0 | (code >> 6) as u8;
        buf[1] = 0x80 | (code & 0x3f) as u8;
        2
    } else if code < 0x10000 {
        buf[0] = 0xe0 | (code >> 12) as u8;
        buf[1] = 0x80 | ((code >> 6) & 0x3f) as u8;
        buf[2] = 0x80 | (code & 0x3f) as u8;
        3
    } else {
        buf[0] = 0xf0 | (code >> 18) as u8;
        buf[1] = 0x80 | ((code >> 12) & 0x3f) as u8;
        buf[2] = 0x80 | ((code >> 6) & 0x3f) as u8;
        buf[3] = 0x80 | (code & 0x3f) as u8;
        4
    }
}
