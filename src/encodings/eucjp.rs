// encodings/eucjp.rs - EUC-JP.
// ASCII compatible; JIS X 0208 as two bytes in 0xA1-0xFE, half-width
// katakana behind SS2 (0x8E), JIS X 0212 behind SS3 (0x8F).

use crate::encoding::*;

#[inline]
fn euc_isgraph(b: u8) -> bool {
    (0xa1..=0xfe).contains(&b)
}

pub struct EucJpEncoding;

pub static ENCODING_EUC_JP: EucJpEncoding = EucJpEncoding;

impl EucJpEncoding {
    fn tail(p: &[u8], needed: usize) -> CharLen {
        for i in 1..needed {
            match p.get(i) {
                None => return CharLen::NeedMore(needed - i),
                Some(&b) if euc_isgraph(b) => {}
                Some(_) => return CharLen::Invalid,
            }
        }
        CharLen::Valid(needed)
    }
}

impl Encoding for EucJpEncoding {
    fn name(&self) -> &'static str {
        "EUC-JP"
    }

    fn max_enc_len(&self) -> usize {
        3
    }

    fn flag(&self) -> u32 {
        ENC_FLAG_ASCII_COMPATIBLE
    }

    fn char_len(&self, p: &[u8]) -> CharLen {
        let Some(&b) = p.first() else {
            return CharLen::NeedMore(1);
        };
        match b {
            0x00..=0x7f => CharLen::Valid(1),
            0x8e => Self::tail(p, 2),
            0x8f => Self::tail(p, 3),
            b if euc_isgraph(b) => Self::tail(p, 2),
            _ => CharLen::Invalid,
        }
    }

    fn mbc_to_code(&self, p: &[u8]) -> u32 {
        match self.char_len(p) {
            CharLen::Valid(n) => p[..n].iter().fold(0u32, |acc, &b| (acc << 8) | b as u32),
            _ => p.first().copied().unwrap_or(0) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        let enc = &ENCODING_EUC_JP;
        assert_eq!(enc.char_len(b"a"), CharLen::Valid(1));
        assert_eq!(enc.char_len(b"\xa4\xa2"), CharLen::Valid(2));
        assert_eq!(enc.char_len(b"\x8e\xb1"), CharLen::Valid(2));
        assert_eq!(enc.char_len(b"\x8f\xb0\xa1"), CharLen::Valid(3));
        assert_eq!(enc.char_len(b"\x8f\xb0"), CharLen::NeedMore(1));
        assert_eq!(enc.char_len(b"\xa4\x41"), CharLen::Invalid);
        assert_eq!(enc.mbc_to_code(b"\x8f\xb0\xa1"), 0x8fb0a1);
    }
}
