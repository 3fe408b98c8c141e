// error.rs - Error types for pattern compilation and matching.
//
// One enum covers the whole surface: malformed pattern sources, engine
// rejections, encoding negotiation failures and result-lookup errors.
// Engine-specific errors are folded in through `From` impls.

use std::fmt;

use crate::encoding::EncodingRef;
use crate::regerror::PreprocessErrorKind;

/// Error type for regexp compilation, negotiation and matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexpError {
    /// Malformed escape or encoding conflict in the pattern source.
    /// `message` already carries the offending source, e.g.
    /// `too short escape sequence: /\/`.
    Preprocess {
        kind: PreprocessErrorKind,
        message: String,
    },
    /// The matching engine rejected the canonical pattern.
    Compile { message: String },
    /// Invalid argument, including preprocess-mode failures.
    Argument(String),
    /// Pattern and subject encodings cannot be reconciled.
    EncodingCompatibility {
        pattern: EncodingRef,
        subject: EncodingRef,
    },
    /// The subject is not well formed in its own encoding.
    InvalidByteSequence { encoding: EncodingRef },
    /// Undefined group name or out-of-range group index.
    Index(String),
    /// The backtracking engine gave up after its step budget.
    BacktrackLimit,
    /// Other engine runtime failure.
    Engine(String),
    /// The search was cancelled through its `CancelToken`.
    Interrupted,
}

impl fmt::Display for RegexpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexpError::Preprocess { message, .. } => f.write_str(message),
            RegexpError::Compile { message } => f.write_str(message),
            RegexpError::Argument(message) => f.write_str(message),
            RegexpError::EncodingCompatibility { pattern, subject } => write!(
                f,
                "incompatible encoding regexp match ({} regexp with {} string)",
                pattern, subject
            ),
            RegexpError::InvalidByteSequence { encoding } => {
                write!(f, "invalid byte sequence in {}", encoding)
            }
            RegexpError::Index(message) => f.write_str(message),
            RegexpError::BacktrackLimit => write!(f, "backtrack limit exceeded"),
            RegexpError::Engine(message) => write!(f, "match failed: {}", message),
            RegexpError::Interrupted => write!(f, "match interrupted"),
        }
    }
}

impl std::error::Error for RegexpError {}

impl From<fancy_regex::Error> for RegexpError {
    fn from(err: fancy_regex::Error) -> Self {
        match err {
            fancy_regex::Error::RuntimeError(fancy_regex::RuntimeError::BacktrackLimitExceeded) => {
                RegexpError::BacktrackLimit
            }
            fancy_regex::Error::RuntimeError(other) => RegexpError::Engine(other.to_string()),
            other => RegexpError::Compile {
                message: other.to_string(),
            },
        }
    }
}

impl From<regex_automata::meta::BuildError> for RegexpError {
    fn from(err: regex_automata::meta::BuildError) -> Self {
        RegexpError::Compile {
            message: err.to_string(),
        }
    }
}

impl RegexpError {
    /// Build the error raised for a preprocess failure in raise mode.
    pub(crate) fn preprocess(kind: PreprocessErrorKind, detail: &str, source: &[u8]) -> Self {
        RegexpError::Preprocess {
            kind,
            message: format!("{}: /{}/", detail, String::from_utf8_lossy(source)),
        }
    }

    /// The preprocess condition behind this error, if any.
    pub fn preprocess_kind(&self) -> Option<PreprocessErrorKind> {
        match self {
            RegexpError::Preprocess { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for the errors Ruby reports as `RegexpError`.
    pub fn is_regexp_error(&self) -> bool {
        matches!(
            self,
            RegexpError::Preprocess { .. } | RegexpError::Compile { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodings::{US_ASCII, UTF_16LE, UTF_8};

    #[test]
    fn preprocess_message_carries_source() {
        let err = RegexpError::preprocess(
            PreprocessErrorKind::TooShortEscapeSequence,
            PreprocessErrorKind::TooShortEscapeSequence.message(),
            b"\\",
        );
        assert_eq!(err.to_string(), "too short escape sequence: /\\/");
        assert_eq!(
            err.preprocess_kind(),
            Some(PreprocessErrorKind::TooShortEscapeSequence)
        );
        assert!(err.is_regexp_error());
    }

    #[test]
    fn encoding_compatibility_names_both_sides() {
        let err = RegexpError::EncodingCompatibility {
            pattern: US_ASCII,
            subject: UTF_16LE,
        };
        assert_eq!(
            err.to_string(),
            "incompatible encoding regexp match (US-ASCII regexp with UTF-16LE string)"
        );
        assert!(!err.is_regexp_error());
    }

    #[test]
    fn invalid_byte_sequence() {
        let err = RegexpError::InvalidByteSequence { encoding: UTF_8 };
        assert_eq!(err.to_string(), "invalid byte sequence in UTF-8");
    }

    #[test]
    fn from_fancy_parse_error() {
        let err: RegexpError = fancy_regex::Regex::new("(unclosed").unwrap_err().into();
        assert!(matches!(err, RegexpError::Compile { .. }));
    }
}
