// prelude.rs - Convenient re-exports for the high-level API.
//
//! # Prelude
//!
//! ```
//! use rbregexp::prelude::*;
//!
//! let ctx = RegexpContext::new();
//! let re = ctx.compile_str(r"\d+", Options::new()).unwrap();
//! let md = ctx.match_at(&re, b"answer: 42", encodings::UTF_8, 0).unwrap().unwrap();
//! assert_eq!(md.to_s(), b"42");
//! ```

pub use crate::api::{FindIter, RegexpConfig, RegexpContext, RegexpContextBuilder, UnionItem};
pub use crate::compile::Regexp;
pub use crate::encoding::{CodeRange, EncodingRef};
pub use crate::encodings;
pub use crate::engine::CancelToken;
pub use crate::error::RegexpError;
pub use crate::match_data::MatchData;
pub use crate::matcher::{MatchOutcome, MatchRequest};
pub use crate::options::Options;
