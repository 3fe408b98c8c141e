// negotiate.rs - Runtime encoding negotiation.
//
// Picks the encoding a match runs under from the pattern's encoding and
// options and the subject's encoding and code range. The subject's code
// range is trusted as given; only a broken subject is rejected outright.

use crate::compile::Regexp;
use crate::encoding::{CodeRange, EncodingRef};
use crate::encodings;
use crate::error::RegexpError;
use crate::options::Options;

/// Result of negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    pub encoding: EncodingRef,
    /// An `/n` pattern is being matched against non-ASCII text that is
    /// not binary; callers report this once.
    pub historical_binary: bool,
}

impl Negotiated {
    fn plain(encoding: EncodingRef) -> Self {
        Negotiated {
            encoding,
            historical_binary: false,
        }
    }
}

/// Negotiate from raw parts.
///
/// # Examples
///
/// ```
/// use rbregexp::encoding::CodeRange;
/// use rbregexp::encodings;
/// use rbregexp::negotiate::negotiate_encoding;
/// use rbregexp::options::Options;
///
/// let n = negotiate_encoding(
///     encodings::US_ASCII,
///     &Options::new(),
///     encodings::UTF_8,
///     CodeRange::Valid,
/// )
/// .unwrap();
/// assert_eq!(n.encoding, encodings::UTF_8);
/// ```
pub fn negotiate_encoding(
    pattern_encoding: EncodingRef,
    options: &Options,
    subject_encoding: EncodingRef,
    code_range: CodeRange,
) -> Result<Negotiated, RegexpError> {
    if code_range == CodeRange::Broken {
        return Err(RegexpError::InvalidByteSequence {
            encoding: subject_encoding,
        });
    }
    let ascii = code_range.is_ascii();

    if pattern_encoding == encodings::US_ASCII && options.can_adapt_encoding() {
        if ascii {
            return Ok(Negotiated::plain(encodings::US_ASCII));
        }
        if subject_encoding == encodings::UTF_8 || subject_encoding == encodings::BINARY {
            return Ok(Negotiated::plain(subject_encoding));
        }
    }

    if pattern_encoding == subject_encoding {
        return Ok(Negotiated::plain(pattern_encoding));
    }
    if ascii && pattern_encoding == encodings::US_ASCII {
        return Ok(Negotiated::plain(encodings::US_ASCII));
    }
    let incompatible = RegexpError::EncodingCompatibility {
        pattern: pattern_encoding,
        subject: subject_encoding,
    };
    if !subject_encoding.is_ascii_compatible() {
        return Err(incompatible);
    }
    if options.is_fixed() {
        if !pattern_encoding.is_ascii_compatible() || !ascii {
            return Err(incompatible);
        }
        return Ok(Negotiated::plain(pattern_encoding));
    }
    Ok(Negotiated {
        encoding: subject_encoding,
        historical_binary: options.is_encoding_none()
            && subject_encoding != encodings::BINARY
            && !ascii,
    })
}

/// The encoding to match `pattern` against a subject in
/// `subject_encoding` with the given code range.
pub fn negotiate(
    pattern: &Regexp,
    subject_encoding: EncodingRef,
    code_range: CodeRange,
) -> Result<Negotiated, RegexpError> {
    negotiate_encoding(
        pattern.encoding(),
        &pattern.options(),
        subject_encoding,
        code_range,
    )
}
