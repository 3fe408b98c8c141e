// match_data.rs - Match results.
//
// A MatchData owns a private copy of the subject and a region of group
// bounds. After a linear-engine match the bounds start out lazy and are
// read from the engine's match handle on first access. Character
// offsets are derived from byte offsets once, on first request.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::compile::Regexp;
use crate::encoding::{CodeRange, EncodingRef};
use crate::engine::LinearMatch;
use crate::error::RegexpError;
use crate::region::{Bound, MatchRegion};

/// Byte offset to character offset table over every resolved bound.
#[derive(Debug)]
struct CharOffsets {
    bytes: Vec<usize>,
    chars: Vec<usize>,
}

impl CharOffsets {
    fn build(subject: &[u8], enc: EncodingRef, region: &MatchRegion) -> Self {
        let mut bytes: Vec<usize> = (0..region.num_regs())
            .flat_map(|i| [region.begin(i), region.end(i)])
            .filter_map(Bound::position)
            .collect();
        bytes.sort_unstable();
        bytes.dedup();

        let mut chars = Vec::with_capacity(bytes.len());
        let (mut p, mut n) = (0, 0);
        for &target in &bytes {
            while p < target && p < subject.len() {
                p += enc.mbc_enc_len(&subject[p..]);
                n += 1;
            }
            chars.push(n);
        }
        CharOffsets { bytes, chars }
    }

    fn lookup(&self, byte: usize) -> Option<usize> {
        self.bytes
            .binary_search(&byte)
            .ok()
            .map(|i| self.chars[i])
    }
}

/// The result of a successful match.
pub struct MatchData {
    regexp: Arc<Regexp>,
    subject: Arc<[u8]>,
    encoding: EncodingRef,
    code_range: CodeRange,
    region: MatchRegion,
    char_offsets: OnceLock<CharOffsets>,
    backend: Option<Arc<dyn LinearMatch>>,
}

impl MatchData {
    pub(crate) fn new(
        regexp: Arc<Regexp>,
        subject: Arc<[u8]>,
        encoding: EncodingRef,
        code_range: CodeRange,
        region: MatchRegion,
        backend: Option<Arc<dyn LinearMatch>>,
    ) -> Self {
        MatchData {
            regexp,
            subject,
            encoding,
            code_range,
            region,
            char_offsets: OnceLock::new(),
            backend,
        }
    }

    // === Bounds ===

    /// Number of groups, including group 0.
    pub fn size(&self) -> usize {
        self.region.num_regs()
    }

    /// Byte bounds of group `index`, reading them from the engine if
    /// they are still lazy.
    pub fn bounds(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.size() {
            return None;
        }
        self.region.resolve_with(index, |i| {
            self.backend.as_ref().and_then(|backend| backend.group(i))
        })
    }

    fn resolve_all(&self) {
        self.region.resolve_all_with(|i| {
            self.backend.as_ref().and_then(|backend| backend.group(i))
        });
    }

    /// The region, for inspection.
    pub fn region(&self) -> &MatchRegion {
        &self.region
    }

    /// Shift every bound by `delta` bytes, after a search that ran on a
    /// suffix of the subject starting at `delta`.
    pub fn fixup_for_start(&mut self, delta: usize) {
        if delta == 0 {
            return;
        }
        self.resolve_all();
        self.region.shift(delta);
        self.backend = None;
        self.char_offsets = OnceLock::new();
    }

    fn normalize(&self, index: isize) -> Option<usize> {
        let size = self.size() as isize;
        let i = if index < 0 { index + size } else { index };
        (0..size).contains(&i).then_some(i as usize)
    }

    fn slice(&self, bounds: Option<(usize, usize)>) -> Option<&[u8]> {
        bounds.map(|(b, e)| &self.subject[b..e])
    }

    // === Groups ===

    /// Group `index`; negative indices count from the end.
    pub fn group(&self, index: isize) -> Option<&[u8]> {
        let i = self.normalize(index)?;
        self.slice(self.bounds(i))
    }

    /// The first group labelled `name` that took part in the match.
    pub fn group_by_name(&self, name: &str) -> Result<Option<&[u8]>, RegexpError> {
        let groups = self.regexp.name_to_groups(name).ok_or_else(|| {
            RegexpError::Index(format!("undefined group name reference: {}", name))
        })?;
        Ok(groups
            .iter()
            .find_map(|&g| self.bounds(g))
            .map(|(b, e)| &self.subject[b..e]))
    }

    /// Group 0.
    pub fn to_s(&self) -> &[u8] {
        self.group(0).unwrap_or_default()
    }

    pub fn pre_match(&self) -> &[u8] {
        match self.bounds(0) {
            Some((b, _)) => &self.subject[..b],
            None => &[],
        }
    }

    pub fn post_match(&self) -> &[u8] {
        match self.bounds(0) {
            Some((_, e)) => &self.subject[e..],
            None => &[],
        }
    }

    /// Every group, group 0 first.
    pub fn to_array(&self) -> Vec<Option<&[u8]>> {
        (0..self.size()).map(|i| self.slice(self.bounds(i))).collect()
    }

    /// Groups 1 and up.
    pub fn captures(&self) -> Vec<Option<&[u8]>> {
        (1..self.size()).map(|i| self.slice(self.bounds(i))).collect()
    }

    /// Each group name with its value.
    pub fn named_captures(&self) -> Vec<(&str, Option<&[u8]>)> {
        self.regexp
            .named_captures()
            .into_iter()
            .map(|(name, groups)| {
                let value = groups.iter().find_map(|&g| self.bounds(g));
                (name, self.slice(value))
            })
            .collect()
    }

    pub fn values_at(&self, indices: &[isize]) -> Vec<Option<&[u8]>> {
        indices.iter().map(|&i| self.group(i)).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.regexp.names()
    }

    pub fn string(&self) -> &[u8] {
        &self.subject
    }

    pub fn encoding(&self) -> EncodingRef {
        self.encoding
    }

    pub fn regexp(&self) -> &Arc<Regexp> {
        &self.regexp
    }

    // === Offsets ===

    fn checked(&self, index: usize) -> Result<Option<(usize, usize)>, RegexpError> {
        if index >= self.size() {
            return Err(RegexpError::Index(format!("index {} out of matches", index)));
        }
        Ok(self.bounds(index))
    }

    pub fn byte_begin(&self, index: usize) -> Result<Option<usize>, RegexpError> {
        Ok(self.checked(index)?.map(|(b, _)| b))
    }

    pub fn byte_end(&self, index: usize) -> Result<Option<usize>, RegexpError> {
        Ok(self.checked(index)?.map(|(_, e)| e))
    }

    pub fn byte_offset(&self, index: usize) -> Result<Option<(usize, usize)>, RegexpError> {
        self.checked(index)
    }

    fn single_byte_optimizable(&self) -> bool {
        self.code_range.is_ascii() || self.encoding.is_single_byte()
    }

    fn offsets(&self) -> &CharOffsets {
        self.char_offsets.get_or_init(|| {
            self.resolve_all();
            CharOffsets::build(&self.subject, self.encoding, &self.region)
        })
    }

    fn to_char(&self, byte: usize) -> usize {
        if self.single_byte_optimizable() {
            return byte;
        }
        self.offsets()
            .lookup(byte)
            .unwrap_or_else(|| self.encoding.str_length(&self.subject[..byte]))
    }

    /// Character offset where group `index` begins.
    pub fn char_begin(&self, index: usize) -> Option<usize> {
        self.bounds(index).map(|(b, _)| self.to_char(b))
    }

    /// Character offset where group `index` ends.
    pub fn char_end(&self, index: usize) -> Option<usize> {
        self.bounds(index).map(|(_, e)| self.to_char(e))
    }

    /// `MatchData#begin`: character offset, or an index error.
    pub fn begin(&self, index: usize) -> Result<Option<usize>, RegexpError> {
        Ok(self.checked(index)?.map(|(b, _)| self.to_char(b)))
    }

    /// `MatchData#end`: character offset, or an index error.
    pub fn end(&self, index: usize) -> Result<Option<usize>, RegexpError> {
        Ok(self.checked(index)?.map(|(_, e)| self.to_char(e)))
    }

    pub fn offset(&self, index: usize) -> Result<Option<(usize, usize)>, RegexpError> {
        Ok(self
            .checked(index)?
            .map(|(b, e)| (self.to_char(b), self.to_char(e))))
    }

    /// `#<MatchData "ab" 1:"a" name:nil>`.
    pub fn inspect(&self) -> String {
        let quoted = |v: Option<&[u8]>| match v {
            Some(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
            None => "nil".to_string(),
        };
        let mut out = format!("#<MatchData {}", quoted(self.group(0)));
        for i in 1..self.size() {
            out.push(' ');
            match self.regexp.group_name(i) {
                Some(name) => out.push_str(name),
                None => out.push_str(&i.to_string()),
            }
            out.push(':');
            out.push_str(&quoted(self.slice(self.bounds(i))));
        }
        out.push('>');
        out
    }
}

impl fmt::Debug for MatchData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchData")
            .field("regexp", &self.regexp)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for MatchData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}
