use crate::cursor::Writer;
use crate::error::{Error, Result};
use crate::reader::FORM_MAGIC;
use crate::resolver::{ObjectKey, Resolver};
use crate::string_table::{StringRef, StringTable};
use crate::version::VersionInfo;

/// A raw chunk ready to be framed.
pub struct OutputChunk {
    pub magic: [u8; 4],
    pub data: Vec<u8>,
}

/// Frame already-encoded chunk payloads in a FORM envelope.
///
/// Payloads are copied verbatim, so any absolute offsets inside them must
/// have been computed for the final layout. With `align_to_16`, every chunk
/// but the last is zero-padded so the next one starts on a 16-byte boundary.
pub fn assemble_form(chunks: &[OutputChunk], align_to_16: bool) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    w.write_magic(&FORM_MAGIC);
    let form_len = w.reserve_u32();
    for (i, chunk) in chunks.iter().enumerate() {
        w.write_magic(&chunk.magic);
        let len = w.reserve_u32();
        w.write_bytes(&chunk.data);
        if align_to_16 && i + 1 < chunks.len() {
            w.pad(16)?;
        }
        let size = w.position() - len - 4;
        w.patch_u32(len, u32::try_from(size).map_err(|_| Error::TooLarge { size })?)?;
    }
    let size = w.position() - 8;
    w.patch_u32(form_len, u32::try_from(size).map_err(|_| Error::TooLarge { size })?)?;
    Ok(w.into_bytes())
}

/// Serialisation context threaded through every chunk codec.
///
/// Starts at byte 0 of the output file, so every position is an absolute
/// offset. The version flags are borrowed immutably: layout decisions are
/// fixed before writing starts.
pub struct DataWriter<'a> {
    out: Writer,
    strings: &'a StringTable,
    version: &'a VersionInfo,
    resolver: Resolver,
}

impl<'a> DataWriter<'a> {
    pub fn new(strings: &'a StringTable, version: &'a VersionInfo) -> Self {
        Self {
            out: Writer::new(),
            strings,
            version,
            resolver: Resolver::new(),
        }
    }

    pub fn version(&self) -> &'a VersionInfo {
        self.version
    }

    pub fn strings(&self) -> &'a StringTable {
        self.strings
    }

    pub fn resolver(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    pub fn position(&self) -> usize {
        self.out.position()
    }

    /// Current position as a 32-bit file offset.
    pub fn offset(&self) -> Result<u32> {
        self.out.offset()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.out.write_bytes(bytes);
    }

    pub fn write_magic(&mut self, magic: &[u8; 4]) {
        self.out.write_magic(magic);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.out.write_u8(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.out.write_u16(v);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.out.write_u32(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.out.write_i32(v);
    }

    pub fn write_u64(&mut self, v: u64) {
        self.out.write_u64(v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.out.write_i64(v);
    }

    pub fn write_f32(&mut self, v: f32) {
        self.out.write_f32(v);
    }

    pub fn write_bool32(&mut self, v: bool) {
        self.out.write_bool32(v);
    }

    pub fn reserve_u32(&mut self) -> usize {
        self.out.reserve_u32()
    }

    pub fn patch_u32(&mut self, pos: usize, v: u32) -> Result<()> {
        self.out.patch_u32(pos, v)
    }

    pub fn pad(&mut self, alignment: usize) -> Result<()> {
        self.out.pad(alignment)
    }

    /// Write a pointer to a string's character data.
    ///
    /// Strings that STRG has not emitted yet get a placeholder that
    /// [`DataWriter::finish`] patches.
    pub fn write_string(&mut self, sref: StringRef) -> Result<()> {
        self.resolver
            .write_pointer(&mut self.out, ObjectKey::String(sref), StringRef::CHARS_BIAS)
    }

    /// Write a nullable string pointer; `None` is written as 0.
    pub fn write_optional_string(&mut self, sref: Option<StringRef>) -> Result<()> {
        match sref {
            Some(sref) => self.write_string(sref),
            None => {
                self.out.write_u32(0);
                Ok(())
            }
        }
    }

    /// Emit a string record: `u32` length, bytes, NUL.
    pub fn write_string_record(&mut self, sref: StringRef) -> Result<()> {
        let text = self.strings.get(sref).ok_or_else(|| Error::PoolCorruption {
            offset: self.out.position(),
            message: format!("string #{} is not in this container's pool", sref.index()),
        })?;
        let len = u32::try_from(text.len()).map_err(|_| Error::TooLarge { size: text.len() })?;
        self.out.write_u32(len);
        self.out.write_bytes(text.as_bytes());
        self.out.write_u8(0);
        Ok(())
    }

    /// Start a chunk record; returns the position of its length field.
    pub fn begin_chunk(&mut self, magic: &[u8; 4]) -> usize {
        self.out.write_magic(magic);
        self.out.reserve_u32()
    }

    /// Backpatch a chunk's length with the bytes written since `begin_chunk`.
    pub fn end_chunk(&mut self, len_pos: usize) -> Result<()> {
        let size = self.out.position() - len_pos - 4;
        let size = u32::try_from(size).map_err(|_| Error::TooLarge { size })?;
        self.out.patch_u32(len_pos, size)
    }

    /// Patch every deferred pointer and hand over the bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.resolver.apply_fixups(&mut self.out)?;
        Ok(self.out.into_bytes())
    }
}
