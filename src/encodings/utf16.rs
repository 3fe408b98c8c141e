// encodings/utf16.rs - UTF-16LE and UTF-16BE.
// Not ASCII compatible: ASCII characters occupy two bytes.

use crate::encoding::*;

pub struct Utf16Encoding {
    pub(crate) big_endian: bool,
}

pub static ENCODING_UTF16LE: Utf16Encoding = Utf16Encoding { big_endian: false };
pub static ENCODING_UTF16BE: Utf16Encoding = Utf16Encoding { big_endian: true };

impl Utf16Encoding {
    #[inline]
    fn unit(&self, p: &[u8]) -> u16 {
        if self.big_endian {
            u16::from_be_bytes([p[0], p[1]])
        } else {
            u16::from_le_bytes([p[0], p[1]])
        }
    }
}

impl Encoding for Utf16Encoding {
    fn name(&self) -> &'static str {
        if self.big_endian {
            "UTF-16BE"
        } else {
            "UTF-16LE"
        }
    }

    fn max_enc_len(&self) -> usize {
        4
    }

    fn min_enc_len(&self) -> usize {
        2
    }

    fn flag(&self) -> u32 {
        ENC_FLAG_UNICODE
    }

    fn char_len(&self, p: &[u8]) -> CharLen {
        if p.len() < 2 {
            return CharLen::NeedMore(2 - p.len());
        }
        match self.unit(p) {
            0xd800..=0xdbff => {
                if p.len() < 4 {
                    return CharLen::NeedMore(4 - p.len());
                }
                match self.unit(&p[2..]) {
                    0xdc00..=0xdfff => CharLen::Valid(4),
                    _ => CharLen::Invalid,
                }
            }
            0xdc00..=0xdfff => CharLen::Invalid,
            _ => CharLen::Valid(2),
        }
    }

    fn mbc_to_code(&self, p: &[u8]) -> u32 {
        match self.char_len(p) {
            CharLen::Valid(2) => self.unit(p) as u32,
            CharLen::Valid(_) => {
                let hi = (self.unit(p) as u32) - 0xd800;
                let lo = (self.unit(&p[2..]) as u32) - 0xdc00;
                0x10000 + ((hi << 10) | lo)
            }
            _ => p.first().copied().unwrap_or(0) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian() {
        let enc = &ENCODING_UTF16LE;
        assert_eq!(enc.char_len(b"a\0"), CharLen::Valid(2));
        assert_eq!(enc.mbc_to_code(b"a\0"), 'a' as u32);
        assert_eq!(enc.char_len(b"a"), CharLen::NeedMore(1));
        // U+1F600 as D83D DE00
        let face = [0x3d, 0xd8, 0x00, 0xde];
        assert_eq!(enc.char_len(&face), CharLen::Valid(4));
        assert_eq!(enc.mbc_to_code(&face), 0x1f600);
        assert_eq!(enc.char_len(&[0x00, 0xdc]), CharLen::Invalid);
    }

    #[test]
    fn big_endian() {
        let enc = &ENCODING_UTF16BE;
        assert_eq!(enc.mbc_to_code(b"\0a"), 'a' as u32);
        assert!(!enc.is_ascii_compatible());
        assert_eq!(enc.name(), "UTF-16BE");
    }
}
