// encodings/sjis.rs - Shift_JIS.
// ASCII compatible; half-width katakana are single bytes, JIS X 0208 is
// two bytes (lead 0x81-0x9F / 0xE0-0xFC, trail 0x40-0x7E / 0x80-0xFC).

use crate::encoding::*;

#[inline]
fn sjis_islead(b: u8) -> bool {
    matches!(b, 0x81..=0x9f | 0xe0..=0xfc)
}

#[inline]
fn sjis_istrail(b: u8) -> bool {
    matches!(b, 0x40..=0x7e | 0x80..=0xfc)
}

pub struct SjisEncoding;

pub static ENCODING_SJIS: SjisEncoding = SjisEncoding;

impl Encoding for SjisEncoding {
    fn name(&self) -> &'static str {
        "Shift_JIS"
    }

    fn max_enc_len(&self) -> usize {
        2
    }

    fn flag(&self) -> u32 {
        ENC_FLAG_ASCII_COMPATIBLE
    }

    fn char_len(&self, p: &[u8]) -> CharLen {
        let Some(&b) = p.first() else {
            return CharLen::NeedMore(1);
        };
        match b {
            0x00..=0x7f | 0xa1..=0xdf => CharLen::Valid(1),
            b if sjis_islead(b) => match p.get(1) {
                None => CharLen::NeedMore(1),
                Some(&t) if sjis_istrail(t) => CharLen::Valid(2),
                Some(_) => CharLen::Invalid,
            },
            _ => CharLen::Invalid,
        }
    }

    fn mbc_to_code(&self, p: &[u8]) -> u32 {
        match self.char_len(p) {
            CharLen::Valid(2) => ((p[0] as u32) << 8) | p[1] as u32,
            _ => p.first().copied().unwrap_or(0) as u32,
        }
    }
}
