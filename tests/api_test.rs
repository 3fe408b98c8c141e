// api_test.rs - End-to-end tests through RegexpContext.

mod common;

use std::sync::Arc;

use common::CollectingSink;
use rbregexp::encodings::{BINARY, LATIN1, US_ASCII, UTF_8};
use rbregexp::error::RegexpError;
use rbregexp::prelude::*;

fn ctx() -> RegexpContext {
    RegexpContext::builder().collect_stats(true).build()
}

// === Compiling ===

#[test]
fn compile_resolves_encoding() {
    let ctx = ctx();
    let re = ctx.compile_str("abc", Options::new()).unwrap();
    assert_eq!(re.encoding(), US_ASCII);
    assert!(!re.is_fixed_encoding());

    let re = ctx.compile_str("caf\u{e9}", Options::new()).unwrap();
    assert_eq!(re.encoding(), UTF_8);
    assert!(re.is_fixed_encoding());

    let re = ctx.compile(br"\u00e9", US_ASCII, Options::new()).unwrap();
    assert_eq!(re.encoding(), UTF_8);
    assert_eq!(re.canonical_bytes(), [0xc3, 0xa9]);
    assert_eq!(re.source(), br"\u00e9");
}

#[test]
fn compile_is_interned_per_context() {
    let a = ctx();
    let b = ctx();
    let r1 = a.compile_str("x+", Options::new()).unwrap();
    let r2 = a.compile_str("x+", Options::new()).unwrap();
    let r3 = b.compile_str("x+", Options::new()).unwrap();
    assert!(Arc::ptr_eq(&r1, &r2));
    assert!(!Arc::ptr_eq(&r1, &r3));
    assert_eq!(r1, r3);
    assert_eq!(a.stats().unwrap().compiles, 1);
}

#[test]
fn compile_concurrently_yields_one_pattern() {
    let ctx = Arc::new(ctx());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = ctx.clone();
            std::thread::spawn(move || ctx.compile_str("(a|b)+c", Options::new()).unwrap())
        })
        .collect();
    let all: Vec<Arc<Regexp>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    // Every thread ends up holding the interned copy or an equal one.
    for re in &all {
        assert_eq!(re, &all[0]);
    }
    assert_eq!(ctx.cached_patterns(), 1);
}

#[test]
fn dropped_patterns_do_not_pile_up() {
    let ctx = ctx();
    let mut kept = Vec::new();
    for i in 0..1000 {
        let re = ctx.compile_str(&format!("x{}y", i), Options::new()).unwrap();
        if i % 100 == 0 {
            kept.push(re);
        }
        assert!(ctx.cached_patterns() <= 128, "{} entries after {}", ctx.cached_patterns(), i);
    }
    for (n, re) in kept.iter().enumerate() {
        let again = ctx
            .compile_str(&format!("x{}y", n * 100), Options::new())
            .unwrap();
        assert!(Arc::ptr_eq(re, &again));
    }
    ctx.purge_cache();
    assert_eq!(ctx.cached_patterns(), kept.len());
}

#[test]
fn options_flags() {
    let ctx = ctx();
    let re = ctx.compile_str("hello", Options::parse("i").unwrap()).unwrap();
    assert!(re.is_casefold());
    assert!(ctx.is_match(&re, b"HeLLo", UTF_8).unwrap());

    let re = ctx.compile_str("a.b", Options::parse("m").unwrap()).unwrap();
    assert!(ctx.is_match(&re, b"a\nb", UTF_8).unwrap());
    let re = ctx.compile_str("a.b", Options::new()).unwrap();
    assert!(!ctx.is_match(&re, b"a\nb", UTF_8).unwrap());

    let re = ctx.compile_str("a b # comment", Options::parse("x").unwrap()).unwrap();
    assert!(ctx.is_match(&re, b"ab", UTF_8).unwrap());
}

#[test]
fn unknown_option_letter() {
    let err = Options::parse("iq").unwrap_err();
    assert_eq!(err.to_string(), "unknown regexp option: q");
}

// === Errors ===

#[test]
fn preprocess_error_message() {
    let ctx = ctx();
    let err = ctx.compile(br"ab\u12", UTF_8, Options::new()).unwrap_err();
    assert!(err.is_regexp_error());
    assert_eq!(err.to_string(), "invalid Unicode escape: /ab\\u12/");
}

#[test]
fn engine_error_names_pattern() {
    let ctx = ctx();
    let err = ctx.compile_str("(unclosed", Options::new()).unwrap_err();
    assert!(matches!(err, RegexpError::Compile { .. }));
    assert!(err.to_string().ends_with(": /(unclosed/"), "{}", err);
}

#[test]
fn broken_subject_is_rejected() {
    let ctx = ctx();
    let re = ctx.compile_str("a", Options::new()).unwrap();
    let err = ctx.is_match(&re, b"a\xff", UTF_8).unwrap_err();
    assert_eq!(err.to_string(), "invalid byte sequence in UTF-8");
}

#[test]
fn incompatible_subject() {
    let ctx = ctx();
    let re = ctx.compile_str("\u{e9}", Options::new()).unwrap();
    let err = ctx.is_match(&re, b"\xe9", LATIN1).unwrap_err();
    assert_eq!(
        err,
        RegexpError::EncodingCompatibility {
            pattern: UTF_8,
            subject: LATIN1
        }
    );
    assert_eq!(
        err.to_string(),
        "incompatible encoding regexp match (UTF-8 regexp with ISO-8859-1 string)"
    );
}

// === Searching ===

#[test]
fn search_groups_and_offsets() {
    let ctx = ctx();
    let re = ctx
        .compile_str(r"(?<word>\w+)@(?<host>\w+)", Options::new())
        .unwrap();
    let md = ctx
        .search(&re, &MatchRequest::new(b"mail: joe@example now", UTF_8))
        .unwrap()
        .into_match_data()
        .unwrap();
    assert_eq!(md.to_s(), b"joe@example");
    assert_eq!(md.group_by_name("host").unwrap(), Some(&b"example"[..]));
    assert_eq!(md.pre_match(), b"mail: ");
    assert_eq!(md.post_match(), b" now");
    assert_eq!(md.names(), vec!["word", "host"]);
    assert_eq!(md.offset(1).unwrap(), Some((6, 9)));
    assert_eq!(md.size(), 3);
}

#[test]
fn search_with_and_without_linear_engine_agree() {
    let linear = ctx();
    let backtracking = RegexpContext::builder().use_linear_engine(false).build();
    let subjects: [&[u8]; 4] = [b"xx aab yy", b"nothing", b"ab ab", b""];
    for pattern in ["a+b", "(a)?b", "^y+$", "b|ab"] {
        let r1 = linear.compile_str(pattern, Options::new()).unwrap();
        let r2 = backtracking.compile_str(pattern, Options::new()).unwrap();
        for subject in subjects {
            let m1 = linear.search(&r1, &MatchRequest::new(subject, UTF_8)).unwrap();
            let m2 = backtracking.search(&r2, &MatchRequest::new(subject, UTF_8)).unwrap();
            let b1 = m1.match_data().map(|md| md.to_array().iter().map(|g| g.map(<[u8]>::to_vec)).collect::<Vec<_>>());
            let b2 = m2.match_data().map(|md| md.to_array().iter().map(|g| g.map(<[u8]>::to_vec)).collect::<Vec<_>>());
            assert_eq!(b1, b2, "pattern {:?} on {:?}", pattern, subject);
        }
    }
}

#[test]
fn latin1_case_folding_agrees_across_engines() {
    let linear = RegexpContext::builder().collect_stats(true).build();
    let backtracking = RegexpContext::builder().use_linear_engine(false).build();
    let icase = Options::new().with_ignorecase(true);
    let patterns: [&[u8]; 2] = [b"\xe9", b"[\xe0-\xef]"];
    for pattern in patterns {
        for ctx in [&linear, &backtracking] {
            let re = ctx.compile(pattern, LATIN1, icase).unwrap();
            assert!(ctx.is_match(&re, b"\xc9", LATIN1).unwrap(), "{:?}", pattern);
            assert!(ctx.is_match(&re, b"\xe9", LATIN1).unwrap(), "{:?}", pattern);
            assert!(!ctx.is_match(&re, b"\xf9", LATIN1).unwrap(), "{:?}", pattern);
        }
    }
    let stats = linear.stats().unwrap();
    assert_eq!(stats.linear_matches, 0);
    assert_eq!(stats.linear_refusals, 2);
}

#[test]
fn ruby_repetition_and_grapheme_forms() {
    for ctx in [ctx(), RegexpContext::builder().use_linear_engine(false).build()] {
        let re = ctx.compile_str("^a{2}{3}$", Options::new()).unwrap();
        assert!(ctx.is_match(&re, b"aaaaaa", UTF_8).unwrap());
        assert!(!ctx.is_match(&re, b"aaaaa", UTF_8).unwrap());

        let re = ctx.compile_str(r"^\X\X$", Options::new()).unwrap();
        assert!(ctx.is_match(&re, "e\u{301}x".as_bytes(), UTF_8).unwrap());
        assert!(ctx.is_match(&re, b"\r\nx", UTF_8).unwrap());
        assert!(!ctx.is_match(&re, b"abc", UTF_8).unwrap());
    }
}

#[test]
fn only_at_start() {
    let ctx = ctx();
    let re = ctx.compile_str("b", Options::new()).unwrap();
    let req = MatchRequest::new(b"ab", UTF_8).with_only_at_start(true);
    assert!(!ctx.search(&re, &req).unwrap().is_match());
    let req = MatchRequest::new(b"ab", UTF_8)
        .with_range(1, 2)
        .with_only_at_start(true);
    assert!(ctx.search(&re, &req).unwrap().is_match());
}

#[test]
fn backward_search_finds_rightmost() {
    let ctx = ctx();
    let re = ctx.compile_str("o", Options::new()).unwrap();
    let req = MatchRequest::new(b"foo boo", UTF_8).with_range(7, 0);
    let md = ctx.search(&re, &req).unwrap().into_match_data().unwrap();
    assert_eq!(md.byte_begin(0).unwrap(), Some(6));
}

#[test]
fn match_at_counts_characters() {
    let ctx = ctx();
    let re = ctx.compile_str("\u{e9}", Options::new()).unwrap();
    let subject = "\u{e9}t\u{e9}".as_bytes();
    let md = ctx.match_at(&re, subject, UTF_8, 1).unwrap().unwrap();
    assert_eq!(md.begin(0).unwrap(), Some(2));
    assert_eq!(md.byte_begin(0).unwrap(), Some(3));
    assert!(ctx.match_at(&re, subject, UTF_8, 4).unwrap().is_none());
}

#[test]
fn find_iter_over_multibyte() {
    let ctx = ctx();
    let re = ctx.compile_str("\u{e9}+", Options::new()).unwrap();
    let found: Vec<(usize, usize)> = ctx
        .find_iter(&re, "a\u{e9}\u{e9}b\u{e9}".as_bytes(), UTF_8)
        .map(|md| md.unwrap().offset(0).unwrap().unwrap())
        .collect();
    assert_eq!(found, vec![(1, 3), (4, 5)]);
}

#[test]
fn find_iter_reuses_transcoded_subject() {
    let ctx = RegexpContext::builder().use_linear_engine(false).build();
    let re = ctx.compile(b"\\xe9(.)", BINARY, Options::new()).unwrap();
    let mut subject = b"\xe9x".repeat(50);
    subject.push(0xe9);
    let found: Vec<_> = ctx
        .find_iter(&re, &subject, BINARY)
        .map(|md| {
            let md = md.unwrap();
            (md.bounds(0), md.group(1).map(<[u8]>::to_vec))
        })
        .collect();
    assert_eq!(found.len(), 50);
    for (i, (bounds, group)) in found.into_iter().enumerate() {
        assert_eq!(bounds, Some((2 * i, 2 * i + 2)));
        assert_eq!(group, Some(b"x".to_vec()));
    }
}

#[test]
fn binary_pattern_on_binary_subject() {
    let ctx = ctx();
    let re = ctx.compile(b"\\xff+", BINARY, Options::new()).unwrap();
    assert_eq!(re.encoding(), BINARY);
    let md = ctx.match_at(&re, b"a\xff\xffb", BINARY, 0).unwrap().unwrap();
    assert_eq!(md.byte_offset(0).unwrap(), Some((1, 3)));
}

#[test]
fn historical_binary_warning() {
    let sink = Arc::new(CollectingSink::default());
    let ctx = RegexpContext::builder().warning_sink(sink.clone()).build();
    let re = ctx.compile_str(".", Options::parse("n").unwrap()).unwrap();
    let subject = "\u{e9}".as_bytes();
    assert!(ctx.is_match(&re, subject, UTF_8).unwrap());
    assert!(ctx.is_match(&re, subject, UTF_8).unwrap());
    assert_eq!(
        sink.messages(),
        vec!["historical binary regexp match /.../n against UTF-8 string".to_string()]
    );
}

// === Union and escape ===

#[test]
fn union_of_strings_and_patterns() {
    let ctx = ctx();
    let re = ctx.compile_str("x+", Options::parse("i").unwrap()).unwrap();
    let u = ctx
        .union(&[
            UnionItem::Str(b"1+1", UTF_8),
            UnionItem::Regexp(re),
            UnionItem::Str(b"?", UTF_8),
        ])
        .unwrap();
    assert_eq!(u.source(), b"1\\+1|(?i-mx:x+)|\\?");
    assert!(ctx.is_match(&u, b"XX", UTF_8).unwrap());
    assert!(ctx.is_match(&u, b"1+1", UTF_8).unwrap());
    assert!(!ctx.is_match(&u, b"11", UTF_8).unwrap());
}

#[test]
fn union_keeps_non_ascii_encoding() {
    let ctx = ctx();
    let u = ctx
        .union(&[UnionItem::Str(b"a", US_ASCII), UnionItem::Str("\u{e9}".as_bytes(), UTF_8)])
        .unwrap();
    assert_eq!(u.encoding(), UTF_8);
    assert!(ctx.is_match(&u, "\u{e9}".as_bytes(), UTF_8).unwrap());
}

#[test]
fn escape_special_characters() {
    let (q, enc) = RegexpContext::escape(b"a.b*c\n d", UTF_8);
    assert_eq!(q, b"a\\.b\\*c\\n\\ d");
    assert_eq!(enc, US_ASCII);
    let (q, enc) = RegexpContext::escape("\u{e9}?".as_bytes(), UTF_8);
    assert_eq!(q, "\u{e9}\\?".as_bytes());
    assert_eq!(enc, UTF_8);
}

#[test]
fn escaped_string_matches_itself() {
    let ctx = ctx();
    let text = b"(1+2)*[3]";
    let (q, enc) = RegexpContext::escape(text, UTF_8);
    let re = ctx.compile(&q, enc, Options::new()).unwrap();
    let md = ctx.match_at(&re, text, UTF_8, 0).unwrap().unwrap();
    assert_eq!(md.to_s(), text);
}

// === Rendering ===

#[test]
fn inspect_and_to_s() {
    let ctx = ctx();
    let re = ctx.compile_str("a/b", Options::parse("mx").unwrap()).unwrap();
    assert_eq!(re.inspect(), b"/a\\/b/mx");
    assert_eq!(re.to_s(), b"(?mx-i:a\\/b)");
    assert_eq!(format!("{}", re), "/a\\/b/mx");
}
