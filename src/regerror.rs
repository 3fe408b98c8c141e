// regerror.rs - Preprocessor error catalogue.
//
// Every malformed-escape or encoding-conflict condition the pattern
// preprocessor can report, with the exact message text Ruby programs
// match against.

/// A preprocessor failure condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreprocessErrorKind {
    TooShortEscapeSequence,
    InvalidHexEscape,
    InvalidUnicodeRange,
    InvalidUnicodeList,
    InvalidUnicodeEscape,
    DuplicateMetaEscape,
    DuplicateControlEscape,
    TooShortMetaEscape,
    TooShortControlEscape,
    UnexpectedEscapeSequence,
    InvalidEscapeCode,
    TooShortEscapedMultibyte,
    NonAsciiInUtf8,
    EscapedNonAsciiInUtf8,
    Utf8InNonUtf8,
    InvalidMultibyteCharacter,
    InvalidMultibyteEscape,
    IncompatibleCharacterEncoding,
    /// `/.../n` dynamic regexp with a raw non-ASCII part.
    NonEscapedNonAsciiInBinary,
    /// Interpolated parts fixed to different encodings.
    DynamicEncodingMismatch,
}

impl PreprocessErrorKind {
    /// The message text for this condition.
    ///
    /// `DynamicEncodingMismatch` is reported with both encoding names
    /// appended; this returns the common prefix.
    pub fn message(self) -> &'static str {
        use PreprocessErrorKind::*;
        match self {
            TooShortEscapeSequence => "too short escape sequence",
            InvalidHexEscape => "invalid hex escape",
            InvalidUnicodeRange => "invalid Unicode range",
            InvalidUnicodeList => "invalid Unicode list",
            InvalidUnicodeEscape => "invalid Unicode escape",
            DuplicateMetaEscape => "duplicate meta escape",
            DuplicateControlEscape => "duplicate control escape",
            TooShortMetaEscape => "too short meta escape",
            TooShortControlEscape => "too short control escape",
            UnexpectedEscapeSequence => "unexpected escape sequence",
            InvalidEscapeCode => "invalid escape code",
            TooShortEscapedMultibyte => "too short escaped multibyte character",
            NonAsciiInUtf8 => "non ASCII character in UTF-8 regexp",
            EscapedNonAsciiInUtf8 => "escaped non ASCII character in UTF-8 regexp",
            Utf8InNonUtf8 => "UTF-8 character in non UTF-8 regexp",
            InvalidMultibyteCharacter => "invalid multibyte character",
            InvalidMultibyteEscape => "invalid multibyte escape",
            IncompatibleCharacterEncoding => "incompatible character encoding",
            NonEscapedNonAsciiInBinary => {
                "/.../n has a non escaped non ASCII character in non ASCII-8BIT script"
            }
            DynamicEncodingMismatch => "encoding mismatch in dynamic regexp",
        }
    }
}
