//! Pointer lists: the format's way of persisting an ordered collection.
//!
//! On disk: `u32` count, `count` × `u32` absolute offsets, then the element
//! payloads wherever the offsets point. Several slots may point at one
//! payload; such elements decode to one shared `Arc` and are written once.

use std::ops::Index;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::reader::DataReader;
use crate::resolver::ObjectKey;
use crate::string_table::StringRef;
use crate::version::Quirk;
use crate::writer::DataWriter;

/// A record with a fixed binary layout.
pub trait Element: Sized {
    fn read(r: &mut DataReader<'_>) -> Result<Self>;
    fn write(&self, w: &mut DataWriter<'_>) -> Result<()>;
}

/// Something a pointer-list slot can hold.
pub trait ListItem: Sized {
    /// The item already decoded at `offset`, if any.
    fn recall(r: &mut DataReader<'_>, offset: u32) -> Result<Option<Self>>;
    /// Decode a fresh item at the reader's position, which is `offset`.
    fn decode(r: &mut DataReader<'_>, offset: u32) -> Result<Self>;
    /// Identity used to share one payload between slots when writing.
    fn key(&self) -> ObjectKey;
    fn write_payload(&self, w: &mut DataWriter<'_>) -> Result<()>;
}

impl<T: Element + Send + Sync + 'static> ListItem for Arc<T> {
    fn recall(r: &mut DataReader<'_>, offset: u32) -> Result<Option<Self>> {
        r.resolver().lookup_object_for::<T>(offset)
    }

    fn decode(r: &mut DataReader<'_>, offset: u32) -> Result<Self> {
        let item = Arc::new(T::read(r)?);
        r.resolver().record_read(offset, item.clone());
        Ok(item)
    }

    fn key(&self) -> ObjectKey {
        ObjectKey::of(self)
    }

    fn write_payload(&self, w: &mut DataWriter<'_>) -> Result<()> {
        T::write(self, w)
    }
}

impl ListItem for StringRef {
    fn recall(r: &mut DataReader<'_>, offset: u32) -> Result<Option<Self>> {
        Ok(r.strings().lookup_offset(offset))
    }

    fn decode(r: &mut DataReader<'_>, offset: u32) -> Result<Self> {
        let sref = r.resolve_string(offset)?;
        let len = r.strings().get(sref).map_or(0, str::len);
        r.seek(offset as usize + 4 + len + 1)?;
        Ok(sref)
    }

    fn key(&self) -> ObjectKey {
        ObjectKey::String(*self)
    }

    fn write_payload(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_string_record(*self)
    }
}

/// One offset-table slot, as seen by a read hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub index: usize,
    pub count: usize,
    /// Absolute offset the slot points at.
    pub offset: u32,
    /// Bytes from `offset` to the next greater offset in the table, or to the
    /// end of the chunk for the last element.
    pub span: usize,
    /// Whether `span` runs to the end of the chunk, so it may include the
    /// chunk's trailing padding.
    pub runs_to_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerList<I> {
    items: Vec<I>,
}

impl<I> Default for PointerList<I> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<I> PointerList<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&I> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, I> {
        self.items.iter()
    }

    pub fn push(&mut self, item: I) {
        self.items.push(item);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn as_slice(&self) -> &[I] {
        &self.items
    }
}

impl<T> PointerList<Arc<T>> {
    /// Append a new, unshared element.
    pub fn add(&mut self, value: T) -> Arc<T> {
        let item = Arc::new(value);
        self.items.push(Arc::clone(&item));
        item
    }

    /// Mutable access to an element no other slot or list shares.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index).and_then(Arc::get_mut)
    }

    /// The element's handle, for placing the same record in another slot.
    pub fn shared(&self, index: usize) -> Option<Arc<T>> {
        self.items.get(index).cloned()
    }
}

impl<I: ListItem> PointerList<I> {
    pub fn read(r: &mut DataReader<'_>) -> Result<Self> {
        Self::read_with(r, |_, _| Ok(()))
    }

    /// Decode a list, calling `hook` once per table slot (shared or not),
    /// in table order, with the reader positioned at the slot's offset and
    /// before the element is decoded.
    pub fn read_with(
        r: &mut DataReader<'_>,
        mut hook: impl FnMut(&mut DataReader<'_>, &Slot) -> Result<()>,
    ) -> Result<Self> {
        let table_at = r.position();
        let count = r.read_u32()? as usize;
        if count > r.region_remaining() / 4 {
            return Err(Error::MalformedList {
                offset: table_at,
                message: format!(
                    "count {count} does not fit in the {} bytes left in the chunk",
                    r.region_remaining()
                ),
            });
        }
        let offsets = (0..count)
            .map(|_| r.read_u32())
            .collect::<Result<Vec<_>>>()?;
        let table_end = r.position();
        let region = r.region();

        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        sorted.dedup();

        let mut end = table_end;
        let mut items = Vec::with_capacity(count);
        for (index, &offset) in offsets.iter().enumerate() {
            let at = offset as usize;
            let next = sorted.partition_point(|&o| o <= offset);
            let bound = sorted.get(next).map(|&o| o as usize);
            let span = bound.unwrap_or(region.end).saturating_sub(at);
            let slot = Slot {
                index,
                count,
                offset,
                span,
                runs_to_end: bound.is_none(),
            };
            tracing::trace!(index, count, offset, span, "pointer list slot");

            let recalled = I::recall(r, offset)?;
            if recalled.is_none() && (at < table_end || at >= region.end) {
                return Err(Error::MalformedList {
                    offset: table_at + 4 + index * 4,
                    message: format!(
                        "entry {index} points at {at:#x}, outside {table_end:#x}..{:#x}",
                        region.end
                    ),
                });
            }

            r.seek(at)?;
            hook(r, &slot)?;

            let item = match recalled {
                Some(item) => item,
                None => {
                    r.seek(at)?;
                    let item = I::decode(r, offset)?;
                    let consumed = r.position().saturating_sub(at);
                    // Short elements are fine: alignment padding may follow them.
                    if consumed > span {
                        return Err(Error::MalformedList {
                            offset: at,
                            message: format!(
                                "entry {index} decodes {consumed} bytes but its region holds {span}"
                            ),
                        });
                    }
                    end = end.max(r.position());
                    item
                }
            };
            items.push(item);
        }

        r.seek(end)?;
        Ok(Self { items })
    }

    pub fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        self.write_with(w, |_, _, _| Ok(()))
    }

    /// Reserve, write, patch: count and placeholder table first, then each
    /// payload not already written elsewhere, then the table is backpatched.
    /// `hook` runs once per slot just before its offset is fixed.
    pub fn write_with(
        &self,
        w: &mut DataWriter<'_>,
        mut hook: impl FnMut(&mut DataWriter<'_>, usize, usize) -> Result<()>,
    ) -> Result<()> {
        let count = self.items.len();
        let count_u32 = u32::try_from(count).map_err(|_| Error::TooLarge { size: count })?;
        w.write_u32(count_u32);
        let table = w.position();
        for _ in 0..count {
            w.reserve_u32();
        }

        let mut offsets = Vec::with_capacity(count);
        for (index, item) in self.items.iter().enumerate() {
            hook(w, index, count)?;
            let key = item.key();
            let offset = match w.resolver().lookup_offset_for(key) {
                Some(existing) => existing,
                None => {
                    let offset = w.offset()?;
                    w.resolver().record_write(key, offset);
                    item.write_payload(w)?;
                    offset
                }
            };
            offsets.push(offset);
        }

        for (index, offset) in offsets.into_iter().enumerate() {
            w.patch_u32(table + index * 4, offset)?;
        }
        Ok(())
    }
}

impl<I: ListItem> Element for PointerList<I> {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        PointerList::read(r)
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        PointerList::write(self, w)
    }
}

impl<I> Index<usize> for PointerList<I> {
    type Output = I;

    fn index(&self, index: usize) -> &I {
        &self.items[index]
    }
}

impl<I> FromIterator<I> for PointerList<I> {
    fn from_iter<It: IntoIterator<Item = I>>(iter: It) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'l, I> IntoIterator for &'l PointerList<I> {
    type Item = &'l I;
    type IntoIter = std::slice::Iter<'l, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Whether the element at `slot` carries an optional `u32` field after its
/// first `base` bytes, judged from the room the offset table leaves it.
///
/// `None` when the answer is hidden by alignment padding: the slot runs to
/// the end of a padded chunk, the extra room is under 16 bytes and the word
/// after `base` is zero, which is what both padding and a null or zero field
/// look like.
pub fn trailing_field(r: &mut DataReader<'_>, slot: &Slot, base: usize) -> Result<Option<bool>> {
    let extra = slot.span.saturating_sub(base);
    if extra < 4 {
        return Ok(Some(false));
    }
    let may_be_padding = slot.runs_to_end
        && !r.in_last_chunk()
        && r.version().align_chunks_to_16 != Quirk::Known(false)
        && extra < 16;
    if !may_be_padding {
        return Ok(Some(true));
    }
    let resume = r.position();
    r.seek(slot.offset as usize + base)?;
    let word = r.read_u32()?;
    r.seek(resume)?;
    Ok((word != 0).then_some(true))
}

/// Read a simple list: `u32` count followed by the elements inline.
pub fn read_simple_list<T: Element>(r: &mut DataReader<'_>) -> Result<Vec<T>> {
    let at = r.position();
    let count = r.read_u32()? as usize;
    read_inline(r, at, count)
}

/// Read `count` elements laid out back to back.
pub fn read_inline<T: Element>(r: &mut DataReader<'_>, at: usize, count: usize) -> Result<Vec<T>> {
    if count > r.region_remaining() {
        return Err(Error::MalformedList {
            offset: at,
            message: format!(
                "count {count} exceeds the {} bytes left in the chunk",
                r.region_remaining()
            ),
        });
    }
    (0..count).map(|_| T::read(r)).collect()
}

pub fn write_simple_list<T: Element>(w: &mut DataWriter<'_>, items: &[T]) -> Result<()> {
    let count = u32::try_from(items.len()).map_err(|_| Error::TooLarge { size: items.len() })?;
    w.write_u32(count);
    items.iter().try_for_each(|item| item.write(w))
}

impl Element for u32 {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        r.read_u32()
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_u32(*self);
        Ok(())
    }
}
