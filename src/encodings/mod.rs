// encodings/mod.rs - Encoding registry
// One module per encoding family, plus handles and name lookup.

pub mod ascii;
pub mod eucjp;
pub mod iso8859_1;
pub mod sjis;
pub mod utf16;
pub mod utf8;

use crate::encoding::EncodingRef;

pub const US_ASCII: EncodingRef = EncodingRef::new(&ascii::AsciiEncoding);
pub const BINARY: EncodingRef = EncodingRef::new(&ascii::BinaryEncoding);
pub const LATIN1: EncodingRef = EncodingRef::new(&iso8859_1::Latin1Encoding);
pub const UTF_8: EncodingRef = EncodingRef::new(&utf8::Utf8Encoding);
pub const SHIFT_JIS: EncodingRef = EncodingRef::new(&sjis::SjisEncoding);
pub const EUC_JP: EncodingRef = EncodingRef::new(&eucjp::EucJpEncoding);
pub const UTF_16LE: EncodingRef = EncodingRef::new(&utf16::Utf16Encoding { big_endian: false });
pub const UTF_16BE: EncodingRef = EncodingRef::new(&utf16::Utf16Encoding { big_endian: true });

/// All known encodings, built-ins first.
pub const ALL: [EncodingRef; 8] = [
    US_ASCII, LATIN1, UTF_8, BINARY, SHIFT_JIS, EUC_JP, UTF_16LE, UTF_16BE,
];

/// Look up an encoding by name or alias, ignoring ASCII case.
pub fn find(name: &str) -> Option<EncodingRef> {
    let alias = match name.to_ascii_uppercase().as_str() {
        "ASCII" | "ANSI_X3.4-1968" | "646" => "US-ASCII",
        "BINARY" => "ASCII-8BIT",
        "ISO8859-1" | "LATIN1" => "ISO-8859-1",
        "CP65001" => "UTF-8",
        "SJIS" | "SHIFT_JIS" => "Shift_JIS",
        "EUCJP" => "EUC-JP",
        _ => name,
    };
    ALL.iter()
        .copied()
        .find(|enc| enc.name().eq_ignore_ascii_case(alias))
}
