//! Offset ↔ object identity maps shared by every pointer-bearing structure.
//!
//! Reading: a pointer is looked up before anything is decoded, so the same
//! offset always yields the same `Arc`. Writing: an object is looked up before
//! its payload is emitted, so shared objects are written once and every other
//! slot receives the first offset. Pointers to objects that have not been
//! written yet (strings referenced before STRG) are parked as fixups and
//! patched when the target lands.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cursor::Writer;
use crate::error::{Error, Result};
use crate::string_table::StringRef;

/// Identity of an object during serialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    /// A pooled string, by pool index.
    String(StringRef),
    /// A shared record, by allocation address of its `Arc`.
    Object(usize),
}

impl ObjectKey {
    pub fn of<T>(arc: &Arc<T>) -> Self {
        ObjectKey::Object(Arc::as_ptr(arc) as *const () as usize)
    }
}

/// A pointer slot waiting for its target's offset.
#[derive(Debug, Clone, Copy)]
struct Fixup {
    at: usize,
    target: ObjectKey,
    bias: u32,
}

#[derive(Default)]
pub struct Resolver {
    objects: HashMap<u32, Arc<dyn Any + Send + Sync>>,
    offsets: HashMap<ObjectKey, u32>,
    fixups: Vec<Fixup>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the object decoded at `offset`.
    pub fn record_read(&mut self, offset: u32, object: Arc<dyn Any + Send + Sync>) {
        self.objects.insert(offset, object);
    }

    /// The object previously decoded at `offset`, if it has type `T`.
    ///
    /// `Ok(None)` means nothing was decoded there yet; an object of another
    /// type at the same offset is a malformed pointer.
    pub fn lookup_object_for<T: Any + Send + Sync>(&self, offset: u32) -> Result<Option<Arc<T>>> {
        let Some(existing) = self.objects.get(&offset) else {
            return Ok(None);
        };
        Arc::clone(existing)
            .downcast::<T>()
            .map(Some)
            .map_err(|_| Error::MalformedList {
                offset: offset as usize,
                message: format!(
                    "offset already decoded as a different type than {}",
                    std::any::type_name::<T>()
                ),
            })
    }

    /// Register the offset an object was written at.
    pub fn record_write(&mut self, key: ObjectKey, offset: u32) {
        self.offsets.insert(key, offset);
    }

    pub fn lookup_offset_for(&self, key: ObjectKey) -> Option<u32> {
        self.offsets.get(&key).copied()
    }

    /// Write a pointer to `target` (plus `bias`) at the current position,
    /// deferring it if the target has not been written yet.
    pub fn write_pointer(&mut self, out: &mut Writer, target: ObjectKey, bias: u32) -> Result<()> {
        match self.lookup_offset_for(target) {
            Some(offset) => out.write_u32(biased(offset, bias)?),
            None => {
                let at = out.reserve_u32();
                self.fixups.push(Fixup { at, target, bias });
            }
        }
        Ok(())
    }

    /// Patch every deferred pointer. A target that never got written is an error.
    pub fn apply_fixups(&mut self, out: &mut Writer) -> Result<()> {
        for fixup in std::mem::take(&mut self.fixups) {
            let Some(offset) = self.lookup_offset_for(fixup.target) else {
                return Err(match fixup.target {
                    ObjectKey::String(s) => Error::PoolCorruption {
                        offset: fixup.at,
                        message: format!("string #{} is referenced but never written", s.index()),
                    },
                    ObjectKey::Object(_) => Error::MalformedList {
                        offset: fixup.at,
                        message: "pointer to an object that is never written".into(),
                    },
                });
            };
            out.patch_u32(fixup.at, biased(offset, fixup.bias)?)?;
        }
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.fixups.len()
    }
}

/// `offset + bias` as a pointer value; past 32 bits the file cannot address it.
fn biased(offset: u32, bias: u32) -> Result<u32> {
    offset.checked_add(bias).ok_or(Error::TooLarge {
        size: offset as usize + bias as usize,
    })
}
