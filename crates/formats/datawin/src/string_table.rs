//! The string pool (STRG).
//!
//! Every chunk refers to text through pointers into STRG. The pool is an
//! append-only arena: a [`StringRef`] is an index into it, and two refs are
//! equal only when they name the same pooled record. Text that appears twice
//! on disk stays two records so that re-serialisation reproduces the file.
//!
//! On-disk record: `u32` byte length, UTF-8 bytes, one NUL byte. STRG's own
//! offset table points at the length; pointers from other chunks point at the
//! character data (record + 4).

use std::collections::HashMap;
use std::ops::Range;

use crate::cursor::Cursor;
use crate::error::{Error, Result};

/// Reference to a pooled string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringRef(u32);

impl StringRef {
    /// Distance from a record's start to its character data.
    pub const CHARS_BIAS: u32 = 4;

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
pub struct StringTable {
    entries: Vec<String>,
    by_text: HashMap<String, StringRef>,
    by_offset: HashMap<u32, StringRef>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `text`: returns the existing ref for equal text, otherwise
    /// appends a new record. The flag is `true` when a record was added.
    pub fn intern(&mut self, text: &str) -> (StringRef, bool) {
        if let Some(&existing) = self.by_text.get(text) {
            tracing::trace!(text, "string pool hit");
            return (existing, false);
        }
        let sref = self.push(text.to_owned());
        self.by_text.insert(text.to_owned(), sref);
        (sref, true)
    }

    /// Resolve the record starting at `offset`, decoding it on first sight.
    ///
    /// `pool` is the STRG chunk's payload range; a record outside it, or one
    /// that is truncated, unterminated or not UTF-8, is pool corruption.
    pub fn resolve(
        &mut self,
        data: &[u8],
        pool: Option<&Range<usize>>,
        offset: u32,
    ) -> Result<StringRef> {
        if let Some(&existing) = self.by_offset.get(&offset) {
            return Ok(existing);
        }
        let text = read_record(data, pool, offset as usize)?;
        let sref = self.push(text);
        self.by_offset.insert(offset, sref);
        Ok(sref)
    }

    /// The ref decoded at record `offset`, if any.
    pub fn lookup_offset(&self, offset: u32) -> Option<StringRef> {
        self.by_offset.get(&offset).copied()
    }

    pub fn get(&self, sref: StringRef) -> Option<&str> {
        self.entries.get(sref.index()).map(String::as_str)
    }

    /// The ref `intern` would return for `text`, without adding anything.
    pub fn find(&self, text: &str) -> Option<StringRef> {
        self.by_text.get(text).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringRef, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, s)| (StringRef::from_index(i), s.as_str()))
    }

    /// Rebuild the text lookup after parsing. The first ref in `order` wins
    /// for text that occurs more than once; refs not in `order` come after.
    pub(crate) fn index_text(&mut self, order: impl IntoIterator<Item = StringRef>) {
        let mut by_text = HashMap::with_capacity(self.entries.len());
        let all = (0..self.entries.len()).map(StringRef::from_index);
        for sref in order.into_iter().chain(all) {
            if let Some(text) = self.entries.get(sref.index()) {
                by_text.entry(text.clone()).or_insert(sref);
            }
        }
        self.by_text = by_text;
    }

    fn push(&mut self, text: String) -> StringRef {
        let sref = StringRef::from_index(self.entries.len());
        self.entries.push(text);
        sref
    }
}

fn read_record(data: &[u8], pool: Option<&Range<usize>>, offset: usize) -> Result<String> {
    let corrupt = |message: String| Error::PoolCorruption { offset, message };
    let Some(pool) = pool else {
        return Err(corrupt("no STRG chunk to resolve strings from".into()));
    };
    if !pool.contains(&offset) {
        return Err(corrupt(format!(
            "outside STRG ({:#x}..{:#x})",
            pool.start, pool.end
        )));
    }
    let mut c = Cursor::new(&data[..pool.end.min(data.len())]);
    c.seek(offset)
        .map_err(|_| corrupt("offset past the end of the file".into()))?;
    let len = c
        .read_u32()
        .map_err(|_| corrupt("truncated length prefix".into()))? as usize;
    let bytes = c
        .read_bytes(len)
        .map_err(|_| corrupt(format!("length {len} runs past the end of STRG")))?;
    if c.read_u8().ok() != Some(0) {
        return Err(corrupt("missing NUL terminator".into()));
    }
    String::from_utf8(bytes.to_vec()).map_err(|e| corrupt(format!("not valid UTF-8: {e}")))
}
