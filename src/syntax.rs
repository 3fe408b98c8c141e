// syntax.rs - Ruby regexp dialect to engine dialect.
//
// The bundled engines speak a Perl-ish dialect that differs from Ruby's
// in a handful of places: ASCII-only shorthand classes, `m` meaning
// dot-all, unnamed groups not capturing once a named group appears,
// byte escapes, `\Z`, and so on. This module rewrites canonical pattern
// text so that both adapters see the same meaning, and builds the
// capture-group name table Ruby exposes (duplicate names included).
//
// Constructs an engine cannot express are reported as `Unsupported`;
// the linear adapter treats that as a refusal, the backtracking adapter
// as a compile error.

use smallvec::SmallVec;

use crate::preprocess::read_escaped_byte;

/// Which engine dialect to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Backtracking,
    /// `unicode` selects Unicode-mode output; otherwise patterns run on
    /// raw bytes.
    Linear { unicode: bool },
}

impl Target {
    fn is_linear(self) -> bool {
        matches!(self, Target::Linear { .. })
    }
}

/// Capture-group name table: name to group numbers, in order of first
/// appearance.
pub type NameTable = Vec<(String, SmallVec<[usize; 2]>)>;

/// Rewritten pattern plus its group layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Translated {
    pub pattern: String,
    pub group_count: usize,
    pub names: NameTable,
    /// An inline `(?i)` or `(?i:...)` turns case folding on somewhere.
    pub inline_ignorecase: bool,
}

/// A construct the target engine cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Unsupported(pub &'static str);

/// Rewrite `pattern` for `target`. `extended` is the pattern-level `x`
/// option.
pub(crate) fn translate(
    pattern: &str,
    target: Target,
    extended: bool,
) -> Result<Translated, Unsupported> {
    // First pass: group layout only.
    let mut scout = Translator::new(pattern, target, extended, None);
    scout.run()?;
    let layout = Layout {
        total_groups: scout.all_groups,
        names: scout.named_table,
    };

    let mut tr = Translator::new(pattern, target, extended, Some(&layout));
    tr.run()?;
    let group_count = if layout.names.is_empty() {
        tr.all_groups
    } else {
        tr.named_groups
    };
    let inline_ignorecase = tr.inline_ignorecase;
    let out = tr.out;
    Ok(Translated {
        pattern: out,
        group_count,
        names: layout.names,
        inline_ignorecase,
    })
}

struct Layout {
    total_groups: usize,
    /// Names numbered by their ordinal among named groups.
    names: NameTable,
}

const SHORTHAND: [(u8, &str); 8] = [
    (b'd', "[:digit:]"),
    (b'D', "[:^digit:]"),
    (b'w', "[:word:]"),
    (b'W', "[:^word:]"),
    (b's', "[:space:]"),
    (b'S', "[:^space:]"),
    (b'h', "[:xdigit:]"),
    (b'H', "[:^xdigit:]"),
];

fn shorthand(c: u8) -> Option<&'static str> {
    SHORTHAND.iter().find(|(k, _)| *k == c).map(|(_, v)| *v)
}

fn push_hex(out: &mut String, b: u8) {
    out.push_str(&format!("\\x{:02X}", b));
}

struct Translator<'a> {
    src: &'a str,
    bytes: &'a [u8],
    target: Target,
    layout: Option<&'a Layout>,
    out: String,
    pos: usize,
    /// `x` state per open group; the last entry is current.
    extended: Vec<bool>,
    all_groups: usize,
    named_groups: usize,
    named_table: NameTable,
    after_quantifier: bool,
    /// Output offset where the most recent atom starts.
    last_atom: usize,
    /// Output offsets of the open groups.
    opens: Vec<usize>,
    inline_ignorecase: bool,
}

impl<'a> Translator<'a> {
    fn new(src: &'a str, target: Target, extended: bool, layout: Option<&'a Layout>) -> Self {
        Translator {
            src,
            bytes: src.as_bytes(),
            target,
            layout,
            out: String::with_capacity(src.len() + 8),
            pos: 0,
            extended: vec![extended],
            all_groups: 0,
            named_groups: 0,
            named_table: Vec::new(),
            after_quantifier: false,
            last_atom: 0,
            opens: Vec::new(),
            inline_ignorecase: false,
        }
    }

    fn names_present(&self) -> bool {
        self.layout.is_some_and(|l| !l.names.is_empty())
    }

    fn is_extended(&self) -> bool {
        self.extended.last().copied().unwrap_or(false)
    }

    fn refuse_linear(&self, what: &'static str) -> Result<(), Unsupported> {
        if self.target.is_linear() {
            Err(Unsupported(what))
        } else {
            Ok(())
        }
    }

    /// Copy the character at `pos` unchanged.
    fn copy_char(&mut self) {
        let len = self.src[self.pos..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        self.out.push_str(&self.src[self.pos..self.pos + len]);
        self.pos += len;
    }

    fn run(&mut self) -> Result<(), Unsupported> {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            match c {
                b'\\' => {
                    self.last_atom = self.out.len();
                    self.escape()?;
                    self.after_quantifier = false;
                }
                b'[' => {
                    self.last_atom = self.out.len();
                    self.class()?;
                    self.after_quantifier = false;
                }
                b'(' => {
                    let (at, depth) = (self.out.len(), self.extended.len());
                    self.group_open()?;
                    if self.extended.len() > depth {
                        self.opens.push(at);
                    }
                    self.after_quantifier = false;
                }
                b')' => {
                    if self.extended.len() > 1 {
                        self.extended.pop();
                    }
                    self.last_atom = self.opens.pop().unwrap_or(self.out.len());
                    self.out.push(')');
                    self.pos += 1;
                    self.after_quantifier = false;
                }
                b'#' if self.is_extended() => {
                    let end = memchr::memchr(b'\n', &self.bytes[self.pos..])
                        .map_or(self.bytes.len(), |i| self.pos + i + 1);
                    self.out.push_str(&self.src[self.pos..end]);
                    self.pos = end;
                }
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c if self.is_extended() => {
                    self.copy_char();
                }
                b'{' => self.brace()?,
                b'*' | b'+' | b'?' => {
                    if self.after_quantifier {
                        if c == b'+' {
                            self.refuse_linear("possessive quantifier")?;
                        } else if c == b'*' {
                            self.refuse_linear("nested quantifier")?;
                        }
                        // `?` lazy or `+` possessive suffix.
                        self.after_quantifier = c == b'*';
                    } else {
                        self.after_quantifier = true;
                    }
                    self.out.push(c as char);
                    self.pos += 1;
                }
                _ => {
                    self.last_atom = self.out.len();
                    self.copy_char();
                    self.after_quantifier = false;
                }
            }
        }
        Ok(())
    }

    // === Quantifier braces ===

    /// `{n}`, `{n,}`, `{,m}` or `{n,m}`; anything else is a literal brace.
    fn brace(&mut self) -> Result<(), Unsupported> {
        let (src, bytes) = (self.src, self.bytes);
        let rest = &bytes[self.pos + 1..];
        let Some(close) = memchr::memchr(b'}', rest) else {
            return self.literal_brace();
        };
        let body = &rest[..close];
        let digits = |s: &[u8]| s.iter().all(u8::is_ascii_digit);
        let (lo, hi) = match memchr::memchr(b',', body) {
            Some(i) => (&body[..i], Some(&body[i + 1..])),
            None => (body, None),
        };
        let valid = digits(lo)
            && hi.map_or(true, digits)
            && (!lo.is_empty() || hi.is_some_and(|h| !h.is_empty()));
        if !valid {
            return self.literal_brace();
        }
        if self.after_quantifier {
            // Ruby repeats the quantified atom: `a{2}{3}` is `(?:a{2}){3}`.
            self.out.insert_str(self.last_atom, "(?:");
            self.out.push(')');
        }
        self.out.push('{');
        if lo.is_empty() {
            self.out.push('0');
        }
        self.out.push_str(&src[self.pos + 1..self.pos + 1 + close]);
        self.out.push('}');
        self.pos += close + 2;
        self.after_quantifier = true;
        Ok(())
    }

    fn literal_brace(&mut self) -> Result<(), Unsupported> {
        self.out.push_str("\\{");
        self.pos += 1;
        self.after_quantifier = false;
        Ok(())
    }

    // === Escapes ===

    /// A byte escape (`\xHH`, octal, `\cX`, `\C-X`, `\M-X`) as `\xHH`.
    fn byte_escape(&mut self) {
        match read_escaped_byte(self.bytes, self.pos) {
            Ok((b, next)) => {
                push_hex(&mut self.out, b);
                self.pos = next;
            }
            Err(_) => {
                self.out.push('\\');
                self.pos += 1;
                self.copy_char();
            }
        }
    }

    /// The escape's character after the backslash, copied as a literal.
    fn escaped_literal(&mut self) {
        self.pos += 1;
        let c = self.bytes[self.pos];
        if c.is_ascii_whitespace() {
            push_hex(&mut self.out, c);
            self.pos += 1;
        } else if c.is_ascii_alphanumeric() || c == b'<' || c == b'>' || c >= 0x80 {
            self.copy_char();
        } else {
            self.out.push('\\');
            self.copy_char();
        }
    }

    fn property(&mut self) {
        let start = self.pos;
        let negate_kind = self.bytes[start + 1] == b'P';
        let body = &self.bytes[start + 2..];
        if body.first() == Some(&b'{') {
            if let Some(close) = memchr::memchr(b'}', body) {
                let name = &self.src[start + 3..start + 2 + close];
                let (negated, name) = match name.strip_prefix('^') {
                    Some(n) => (!negate_kind, n),
                    None => (negate_kind, name),
                };
                self.out.push_str(if negated { "\\P{" } else { "\\p{" });
                self.out.push_str(name);
                self.out.push('}');
                self.pos = start + 3 + close;
                return;
            }
        }
        self.out.push_str(&self.src[start..start + 2]);
        self.pos += 2;
    }

    fn escape(&mut self) -> Result<(), Unsupported> {
        let Some(&c) = self.bytes.get(self.pos + 1) else {
            self.out.push('\\');
            self.pos += 1;
            return Ok(());
        };
        if let Some(class) = shorthand(c) {
            self.out.push('[');
            self.out.push_str(class);
            self.out.push(']');
            self.pos += 2;
            return Ok(());
        }
        match c {
            b'0'..=b'9' => self.numeric_escape()?,
            b'x' | b'c' | b'C' | b'M' => self.byte_escape(),
            b'e' => {
                self.out.push_str("\\x1B");
                self.pos += 2;
            }
            b'a' => {
                self.out.push_str("\\x07");
                self.pos += 2;
            }
            b'A' | b'z' | b'n' | b't' | b'r' | b'f' | b'v' => {
                self.out.push_str(&self.src[self.pos..self.pos + 2]);
                self.pos += 2;
            }
            b'b' | b'B' => {
                match self.target {
                    Target::Linear { unicode: true } => {
                        self.out.push_str(if c == b'b' { "(?-u:\\b)" } else { "(?-u:\\B)" })
                    }
                    _ => self.out.push_str(&self.src[self.pos..self.pos + 2]),
                }
                self.pos += 2;
            }
            b'Z' => {
                self.refuse_linear("\\Z")?;
                self.out.push_str("(?=\\n?\\z)");
                self.pos += 2;
            }
            b'G' | b'K' => {
                self.refuse_linear(if c == b'G' { "\\G" } else { "\\K" })?;
                self.out.push_str(&self.src[self.pos..self.pos + 2]);
                self.pos += 2;
            }
            b'R' => {
                let unicode = matches!(
                    self.target,
                    Target::Backtracking | Target::Linear { unicode: true }
                );
                self.out.push_str(if unicode {
                    "(?:\\r\\n|[\\n\\x0B\\x0C\\r\\x{85}\\x{2028}\\x{2029}])"
                } else {
                    "(?:\\r\\n|[\\n\\x0B\\x0C\\r])"
                });
                self.pos += 2;
            }
            b'X' => {
                self.refuse_linear("\\X")?;
                self.out.push_str("(?>\\r\\n|\\P{M}\\p{M}*)");
                self.pos += 2;
            }
            b'g' => return Err(Unsupported("subexpression call")),
            b'k' => self.named_backref()?,
            b'p' | b'P' => self.property(),
            _ => self.escaped_literal(),
        }
        Ok(())
    }

    /// `\N...` outside a class: backreference or octal byte.
    fn numeric_escape(&mut self) -> Result<(), Unsupported> {
        let start = self.pos + 1;
        let len = self.bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let src = self.src;
        let digits = &src[start..start + len];
        if digits.starts_with('0') {
            self.byte_escape();
            return Ok(());
        }
        let n: usize = digits.parse().unwrap_or(usize::MAX);
        let groups = self.layout.map_or(0, |l| l.total_groups);
        if n <= 9 || n <= groups {
            self.refuse_linear("backreference")?;
            if self.names_present() {
                return Err(Unsupported(
                    "numbered backref/call is not allowed. (use name)",
                ));
            }
            self.out.push('\\');
            self.out.push_str(digits);
            self.pos = start + len;
        } else if (b'1'..=b'7').contains(&self.bytes[start]) {
            self.byte_escape();
        } else {
            self.out.push_str(digits);
            self.pos = start + len;
        }
        Ok(())
    }

    /// `\k<name>`, `\k'name'`, `\k<N>` or `\k<-N>`.
    fn named_backref(&mut self) -> Result<(), Unsupported> {
        self.refuse_linear("backreference")?;
        let start = self.pos;
        let close = match self.bytes.get(start + 2) {
            Some(b'<') => b'>',
            Some(b'\'') => b'\'',
            _ => {
                self.out.push('k');
                self.pos += 2;
                return Ok(());
            }
        };
        let body_start = start + 3;
        let Some(len) = memchr::memchr(close, &self.bytes[body_start..]) else {
            return Err(Unsupported("invalid backref"));
        };
        let src = self.src;
        let reference = &src[body_start..body_start + len];
        self.pos = body_start + len + 1;

        let groups: SmallVec<[usize; 2]> = if let Ok(n) = reference.parse::<isize>() {
            let current = if self.names_present() {
                self.named_groups
            } else {
                self.all_groups
            };
            let abs = if n < 0 { current as isize + 1 + n } else { n };
            if abs <= 0 {
                return Err(Unsupported("invalid backref number/name"));
            }
            smallvec::smallvec![abs as usize]
        } else {
            let found = self
                .layout
                .and_then(|l| l.names.iter().find(|(name, _)| name == reference));
            match found {
                Some((_, idx)) => idx.clone(),
                // Scouting pass: layout unknown yet.
                None if self.layout.is_none() => smallvec::smallvec![1],
                None => return Err(Unsupported("undefined name reference")),
            }
        };
        if groups.len() == 1 {
            self.out.push_str(&format!("\\{}", groups[0]));
        } else {
            // Most recent definition first.
            self.out.push_str("(?:");
            for (i, g) in groups.iter().rev().enumerate() {
                if i > 0 {
                    self.out.push('|');
                }
                self.out.push_str(&format!("\\{}", g));
            }
            self.out.push(')');
        }
        Ok(())
    }

    // === Character classes ===

    fn class(&mut self) -> Result<(), Unsupported> {
        let mut depth = 0usize;
        loop {
            let Some(&c) = self.bytes.get(self.pos) else {
                // Unterminated; the engine reports it.
                return Ok(());
            };
            match c {
                b'[' if self.bytes.get(self.pos + 1) == Some(&b':') && depth > 0 => {
                    match self.src[self.pos + 2..].find(":]") {
                        Some(i) => {
                            let end = self.pos + 2 + i + 2;
                            self.out.push_str(&self.src[self.pos..end]);
                            self.pos = end;
                        }
                        None => {
                            self.out.push_str("\\[");
                            self.pos += 1;
                        }
                    }
                }
                b'[' => {
                    depth += 1;
                    self.out.push('[');
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'^') {
                        self.out.push('^');
                        self.pos += 1;
                    }
                    if self.bytes.get(self.pos) == Some(&b']') {
                        self.out.push_str("\\]");
                        self.pos += 1;
                    }
                }
                b']' => {
                    self.out.push(']');
                    self.pos += 1;
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                b'\\' => self.class_escape(),
                b'#' => {
                    self.out.push_str("\\#");
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => {
                    push_hex(&mut self.out, c);
                    self.pos += 1;
                }
                _ => self.copy_char(),
            }
        }
    }

    fn class_escape(&mut self) {
        let Some(&c) = self.bytes.get(self.pos + 1) else {
            self.out.push('\\');
            self.pos += 1;
            return;
        };
        if let Some(class) = shorthand(c) {
            self.out.push_str(class);
            self.pos += 2;
            return;
        }
        match c {
            b'0'..=b'7' | b'x' | b'c' | b'C' | b'M' => self.byte_escape(),
            b'b' => {
                self.out.push_str("\\x08");
                self.pos += 2;
            }
            b'e' => {
                self.out.push_str("\\x1B");
                self.pos += 2;
            }
            b'a' => {
                self.out.push_str("\\x07");
                self.pos += 2;
            }
            b'n' | b't' | b'r' | b'f' | b'v' => {
                self.out.push_str(&self.src[self.pos..self.pos + 2]);
                self.pos += 2;
            }
            b'p' | b'P' => self.property(),
            _ => self.escaped_literal(),
        }
    }

    // === Groups ===

    fn group_open(&mut self) -> Result<(), Unsupported> {
        let current = self.is_extended();
        if self.bytes.get(self.pos + 1) != Some(&b'?') {
            self.pos += 1;
            self.all_groups += 1;
            if self.names_present() {
                self.out.push_str("(?:");
            } else {
                self.out.push('(');
            }
            self.extended.push(current);
            return Ok(());
        }

        let at = self.pos + 2;
        match self.bytes.get(at).copied() {
            Some(b'#') => {
                let end = memchr::memchr(b')', &self.bytes[at..]).map_or(self.bytes.len(), |i| at + i + 1);
                self.pos = end;
            }
            Some(b':') => self.open_with("(?:", 3, current),
            Some(b'=') | Some(b'!') => {
                self.refuse_linear("look-ahead")?;
                let src = self.src;
                let text = &src[self.pos..self.pos + 3];
                self.open_with(text, 3, current);
            }
            Some(b'>') => {
                self.refuse_linear("atomic group")?;
                self.open_with("(?>", 3, current);
            }
            Some(b'~') => return Err(Unsupported("absent operator")),
            Some(b'<') if matches!(self.bytes.get(at + 1), Some(b'=') | Some(b'!')) => {
                self.refuse_linear("look-behind")?;
                let src = self.src;
                let text = &src[self.pos..self.pos + 4];
                self.open_with(text, 4, current);
            }
            Some(b'<') => self.named_group(b'>')?,
            Some(b'\'') => self.named_group(b'\'')?,
            Some(b'(') => self.conditional()?,
            _ => self.option_group()?,
        }
        Ok(())
    }

    fn open_with(&mut self, text: &str, consumed: usize, extended: bool) {
        self.out.push_str(text);
        self.pos += consumed;
        self.extended.push(extended);
    }

    fn named_group(&mut self, close: u8) -> Result<(), Unsupported> {
        let name_start = self.pos + 3;
        let Some(len) = memchr::memchr(close, &self.bytes[name_start..]) else {
            return Err(Unsupported("invalid group name"));
        };
        let src = self.src;
        let name = &src[name_start..name_start + len];
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| !c.is_ascii_digit())
            && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid {
            return Err(Unsupported("invalid group name"));
        }
        self.all_groups += 1;
        self.named_groups += 1;
        let ordinal = self.named_groups;
        match self.named_table.iter_mut().find(|(n, _)| n == name) {
            Some((_, idx)) => idx.push(ordinal),
            None => self
                .named_table
                .push((name.to_string(), smallvec::smallvec![ordinal])),
        }
        let current = self.is_extended();
        self.open_with("(", 0, current);
        self.pos = name_start + len + 1;
        Ok(())
    }

    /// `(?(cond)yes|no)` with a group number or name as condition.
    fn conditional(&mut self) -> Result<(), Unsupported> {
        self.refuse_linear("conditional")?;
        let cond_start = self.pos + 3;
        let Some(len) = memchr::memchr(b')', &self.bytes[cond_start..]) else {
            return Err(Unsupported("invalid conditional pattern"));
        };
        let cond = &self.src[cond_start..cond_start + len];
        let name = cond
            .strip_prefix('<')
            .and_then(|c| c.strip_suffix('>'))
            .or_else(|| cond.strip_prefix('\'').and_then(|c| c.strip_suffix('\'')))
            .unwrap_or(cond);
        let group = match name.parse::<usize>() {
            Ok(n) => n,
            Err(_) => match self.layout {
                Some(l) => l
                    .names
                    .iter()
                    .find(|(n, _)| n == name)
                    .and_then(|(_, idx)| idx.last().copied())
                    .ok_or(Unsupported("undefined name reference"))?,
                None => 1,
            },
        };
        self.out.push_str(&format!("(?({})", group));
        self.pos = cond_start + len + 1;
        let current = self.is_extended();
        self.extended.push(current);
        Ok(())
    }

    /// `(?imx-imx)` or `(?imx-imx:...)`. Ruby `m` is dot-all.
    fn option_group(&mut self) -> Result<(), Unsupported> {
        let mut p = self.pos + 2;
        let mut flags = String::new();
        let mut extended = self.is_extended();
        let mut negate = false;
        loop {
            match self.bytes.get(p).copied() {
                Some(b'i') => {
                    flags.push('i');
                    self.inline_ignorecase |= !negate;
                }
                Some(b'm') => flags.push('s'),
                Some(b'x') => {
                    flags.push('x');
                    extended = !negate;
                }
                Some(b'-') if !negate => {
                    negate = true;
                    flags.push('-');
                }
                // Character-set options have no engine counterpart.
                Some(b'a') | Some(b'd') | Some(b'u') => {}
                Some(b':') | Some(b')') => break,
                _ => return Err(Unsupported("undefined group option")),
            }
            p += 1;
        }
        if flags.ends_with('-') {
            flags.pop();
        }
        let scoped = self.bytes[p] == b':';
        self.pos = p + 1;
        if flags.is_empty() {
            if scoped {
                self.out.push_str("(?:");
                self.extended.push(extended);
            }
            return Ok(());
        }
        self.out.push_str("(?");
        self.out.push_str(&flags);
        if scoped {
            self.out.push(':');
            self.extended.push(extended);
        } else {
            self.out.push(')');
            if let Some(last) = self.extended.last_mut() {
                *last = extended;
            }
        }
        Ok(())
    }
}
