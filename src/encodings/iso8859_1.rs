// encodings/iso8859_1.rs - ISO-8859-1 (Latin-1).

use crate::encoding::*;

pub struct Latin1Encoding;

pub static ENCODING_ISO_8859_1: Latin1Encoding = Latin1Encoding;

impl Encoding for Latin1Encoding {
    fn name(&self) -> &'static str {
        "ISO-8859-1"
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

    // Latin-1 bytes are their own Unicode code points.
    fn mbc_to_code(&self, p: &[u8]) -> u32 {
        p.first().copied().unwrap_or(0) as u32
    }

    fn builtin(&self) -> Option<Builtin> {
        Some(Builtin::Latin1)
    }

    fn is_valid_mbc_string(&self, _s: &[u8]) -> bool {
        true
    }
}
