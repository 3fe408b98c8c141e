//! # rbregexp
//!
//! Ruby-compatible `Regexp` front end: pattern preprocessing, encoding
//! negotiation and dual-engine matching.
//!
//! Patterns are written in Ruby syntax and carry a source encoding. They
//! are preprocessed into canonical bytes (escapes resolved, the pattern's
//! encoding pinned where the source demands it), compiled by a
//! backtracking engine and interned per context. At match time the
//! subject's encoding and code range decide which encoding the match runs
//! under, and a linear-time engine is tried before falling back to
//! backtracking.
//!
//! ## Quick Start
//!
//! ```rust
//! use rbregexp::prelude::*;
//!
//! let ctx = RegexpContext::new();
//! let re = ctx.compile_str(r"(\d{4})-(\d{2})", Options::new()).unwrap();
//! let md = ctx
//!     .search(&re, &MatchRequest::new(b"Date: 2026-02", encodings::UTF_8))
//!     .unwrap()
//!     .into_match_data()
//!     .unwrap();
//! assert_eq!(md.group(1), Some(&b"2026"[..]));
//! assert_eq!(md.begin(0).unwrap(), Some(6));
//! ```
//!
//! Contexts are configured through a builder:
//!
//! ```rust
//! use rbregexp::prelude::*;
//!
//! let ctx = RegexpContext::builder()
//!     .use_linear_engine(false)
//!     .backtrack_limit(10_000)
//!     .build();
//! let re = ctx.compile_str("hello", Options::parse("i").unwrap()).unwrap();
//! assert!(ctx.is_match(&re, b"Hello World", encodings::UTF_8).unwrap());
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`options`] | Regexp option flags and kcodes |
//! | [`encoding`], [`encodings`] | Encoding trait, code ranges, built-in encodings |
//! | [`preprocess`] | Escape preprocessing, dynamic regexps, literal encodings |
//! | [`syntax`] | Ruby-to-engine dialect translation |
//! | [`compile`] | Encoding resolution and compiled patterns |
//! | [`negotiate`] | Runtime encoding negotiation |
//! | [`cache`] | Pattern, per-encoding and linear-program caches |
//! | [`engine`], [`backtrack`], [`linear`] | Engine traits and default adapters |
//! | [`matcher`] | The dual-engine search driver |
//! | [`region`], [`match_data`] | Match results |
//! | [`quote`] | `Regexp.escape`, `to_s` and `inspect` |
//! | [`warning`], [`stats`] | Diagnostics |
//! | [`api`] | Contexts and the high-level API |
//! | [`error`], [`regerror`] | Error types and messages |

pub mod api;
pub mod backtrack;
pub mod cache;
pub mod compile;
pub mod encoding;
pub mod encodings;
pub mod engine;
pub mod error;
pub mod linear;
pub mod match_data;
pub mod matcher;
pub mod negotiate;
pub mod options;
pub mod prelude;
pub mod preprocess;
pub mod quote;
pub mod regerror;
pub mod region;
pub mod stats;
pub mod syntax;
pub mod warning;
