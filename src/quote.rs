// quote.rs - Pattern quoting and stringification.
//
// `quote` escapes regexp metacharacters in a literal string, and the
// `to_s` / `inspect` helpers render a pattern source back into Ruby
// syntax. All three walk the source character by character in its own
// encoding, so multibyte characters are never split.

use crate::encoding::{CharLen, EncodingRef};
use crate::encodings;
use crate::options::Options;

/// One step of a character walk: the code point (None if broken) and
/// the byte length consumed.
fn next_char(enc: EncodingRef, s: &[u8]) -> (Option<u32>, usize) {
    match enc.char_len(s) {
        CharLen::Valid(n) => (Some(enc.mbc_to_code(&s[..n])), n),
        _ => (None, enc.mbc_enc_len(s)),
    }
}

fn is_meta(c: u32) -> bool {
    matches!(
        char::from_u32(c),
        Some(
            '[' | ']' | '{' | '}' | '(' | ')' | '|' | '-' | '*' | '.' | '\\' | '?' | '+' | '^'
                | '$' | ' ' | '#' | '\t' | '\x0c' | '\x0b' | '\n' | '\r'
        )
    )
}

/// Append the ASCII code `code` in the same byte layout as `ch`, an
/// encoded ASCII character. For ASCII-compatible encodings this is just
/// the byte; for wide encodings the code unit's other bytes are zero.
fn push_like(out: &mut Vec<u8>, ch: &[u8], orig: u8, code: u8) {
    out.extend(ch.iter().map(|&b| if b == orig { code } else { b }));
}

// === Quote ===

/// Escape the regexp metacharacters of `bytes`.
///
/// Returns the input unchanged when nothing needs escaping; ASCII-only
/// input is retagged US-ASCII either way.
///
/// # Examples
///
/// ```
/// use rbregexp::encodings;
/// use rbregexp::quote::quote;
///
/// let (q, enc) = quote(b"1.5 * x\n", encodings::UTF_8);
/// assert_eq!(q, b"1\\.5\\ \\*\\ x\\n");
/// assert_eq!(enc, encodings::US_ASCII);
/// ```
pub fn quote(bytes: &[u8], enc: EncodingRef) -> (Vec<u8>, EncodingRef) {
    let ascii_only = enc.is_ascii_compatible() && bytes.is_ascii();
    let result_enc = if ascii_only { encodings::US_ASCII } else { enc };

    let mut p = 0;
    let mut meta_found = false;
    while p < bytes.len() {
        let (c, n) = next_char(enc, &bytes[p..]);
        if c.is_some_and(is_meta) {
            meta_found = true;
            break;
        }
        p += n;
    }
    if !meta_found {
        return (bytes.to_vec(), result_enc);
    }

    let mut out = Vec::with_capacity(bytes.len() * 2);
    let mut p = 0;
    while p < bytes.len() {
        let (c, n) = next_char(enc, &bytes[p..]);
        let ch = &bytes[p..p + n];
        p += n;
        let Some(c) = c.filter(|&c| c < 0x80) else {
            out.extend_from_slice(ch);
            continue;
        };
        let c = c as u8;
        let named = match c {
            b'\t' => Some(b't'),
            b'\n' => Some(b'n'),
            b'\r' => Some(b'r'),
            0x0c => Some(b'f'),
            0x0b => Some(b'v'),
            _ => None,
        };
        if let Some(letter) = named {
            push_like(&mut out, ch, c, b'\\');
            push_like(&mut out, ch, c, letter);
        } else if is_meta(c as u32) {
            push_like(&mut out, ch, c, b'\\');
            out.extend_from_slice(ch);
        } else {
            out.extend_from_slice(ch);
        }
    }
    (out, result_enc)
}

// === Source rendering ===

fn is_print(c: u8) -> bool {
    (0x20..0x7f).contains(&c)
}

fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

fn push_hex(out: &mut Vec<u8>, b: u8) {
    out.extend_from_slice(format!("\\x{:02X}", b).as_bytes());
}

/// Append `src` as it appears between the slashes of a literal: `/` is
/// escaped, escape pairs are kept, and unprintable ASCII and broken
/// bytes become `\xHH`.
pub fn append_regexp_string(out: &mut Vec<u8>, src: &[u8], enc: EncodingRef) {
    let needs_escape = {
        let mut p = 0;
        let mut found = false;
        while p < src.len() {
            let (c, n) = next_char(enc, &src[p..]);
            if let Some(c) = c.filter(|&c| c < 0x80) {
                let c = c as u8;
                if c == b'/' || !is_print(c) {
                    found = true;
                    break;
                }
            }
            p += n;
        }
        found
    };
    if !needs_escape {
        out.extend_from_slice(src);
        return;
    }

    let mut p = 0;
    while p < src.len() {
        let start = p;
        let (c, n) = next_char(enc, &src[p..]);
        p += n;
        match c {
            None => src[start..p].iter().for_each(|&b| push_hex(out, b)),
            Some(c) if c >= 0x80 => out.extend_from_slice(&src[start..p]),
            Some(c) => {
                let c = c as u8;
                if c == b'\\' && p < src.len() {
                    let (_, m) = next_char(enc, &src[p..]);
                    p += m;
                    out.extend_from_slice(&src[start..p]);
                } else if c == b'/' {
                    push_like(out, &src[start..p], c, b'\\');
                    out.extend_from_slice(&src[start..p]);
                } else if is_print(c) || is_space(c) {
                    out.extend_from_slice(&src[start..p]);
                } else {
                    push_hex(out, c);
                }
            }
        }
    }
}

/// Leading `(?mix-mix)` / `(?mix-mix:...)` groups folded into the
/// options, with the remaining body range.
fn absorb_option_groups<F>(source: &[u8], options: Options, validate: F) -> (Options, usize, usize)
where
    F: Fn(&[u8]) -> bool,
{
    let mut opts = options;
    let mut p = 0;
    let mut len = source.len();
    let at = |i: usize| source.get(i).copied().unwrap_or(0);

    while len >= 4 && at(p) == b'(' && at(p + 1) == b'?' {
        p += 2;
        len -= 2;
        while len > 0 {
            match at(p) {
                b'm' => opts = opts.with_multiline(true),
                b'i' => opts = opts.with_ignorecase(true),
                b'x' => opts = opts.with_extended(true),
                _ => break,
            }
            p += 1;
            len -= 1;
        }
        if len > 1 && at(p) == b'-' {
            p += 1;
            len -= 1;
            while len > 0 {
                match at(p) {
                    b'm' => opts = opts.with_multiline(false),
                    b'i' => opts = opts.with_ignorecase(false),
                    b'x' => opts = opts.with_extended(false),
                    _ => break,
                }
                p += 1;
                len -= 1;
            }
        }
        if len > 0 && at(p) == b')' {
            p += 1;
            len -= 1;
            continue;
        }
        if len >= 2 && at(p) == b':' && at(p + len - 1) == b')' {
            let body = (p + 1, p + len - 1);
            if validate(&source[body.0..body.1]) {
                return (opts, body.0, body.1);
            }
        }
        return (options, 0, source.len());
    }
    (opts, p, p + len)
}

/// `Regexp#to_s`: the source wrapped in an option group that restores
/// its flags, e.g. `(?i-mx:abc)`.
///
/// `validate` checks that a candidate inner body still compiles; an
/// option group is only unwrapped when it does.
pub fn to_s<F>(source: &[u8], enc: EncodingRef, options: Options, validate: F) -> Vec<u8>
where
    F: Fn(&[u8]) -> bool,
{
    let (opts, start, end) = absorb_option_groups(source, options, validate);
    let mut out = Vec::with_capacity(source.len() + 8);
    out.extend_from_slice(b"(?");
    out.extend_from_slice(opts.to_options_string().as_bytes());
    if !opts.is_embeddable() {
        out.push(b'-');
        if !opts.is_multiline() {
            out.push(b'm');
        }
        if !opts.is_ignorecase() {
            out.push(b'i');
        }
        if !opts.is_extended() {
            out.push(b'x');
        }
    }
    out.push(b':');
    append_regexp_string(&mut out, &source[start..end], enc);
    out.push(b')');
    out
}

/// `Regexp#inspect`: `/source/opts`, with `n` for encoding-none patterns.
pub fn inspect(source: &[u8], enc: EncodingRef, options: Options) -> Vec<u8> {
    let mut out = Vec::with_capacity(source.len() + 6);
    out.push(b'/');
    append_regexp_string(&mut out, source, enc);
    out.push(b'/');
    out.extend_from_slice(options.to_options_string().as_bytes());
    if options.is_encoding_none() {
        out.push(b'n');
    }
    out
}
