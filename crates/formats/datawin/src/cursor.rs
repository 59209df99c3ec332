use crate::error::{Error, Result};

/// Read cursor over a byte slice. All reads are little-endian.
#[derive(Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of underlying data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether we've reached the end.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Remaining bytes from current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Seek to an absolute position. Seeking to exactly the end is allowed.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::OutOfBounds {
                offset: pos,
                need: 0,
                have: 0,
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Skip `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Advance over padding until the position is a multiple of `alignment`.
    pub fn pad(&mut self, alignment: usize) -> Result<()> {
        let n = padding_for(self.pos, alignment)?;
        self.skip(n)
    }

    /// Read a slice of `n` bytes without copying.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a fixed-width array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a 4-byte magic/tag.
    pub fn read_magic(&mut self) -> Result<[u8; 4]> {
        self.read_array()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Read a 32-bit boolean (any non-zero value is `true`).
    pub fn read_bool32(&mut self) -> Result<bool> {
        Ok(self.read_u32()? != 0)
    }

    /// Access the full underlying data (for absolute offset reads).
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Create a cursor positioned at an absolute offset into the same data.
    pub fn at_offset(&self, offset: usize) -> Result<Self> {
        let mut c = Self {
            data: self.data,
            pos: 0,
        };
        c.seek(offset)?;
        Ok(c)
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos.checked_add(n).is_none_or(|end| end > self.data.len()) {
            return Err(Error::OutOfBounds {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}

/// Writer that builds a byte buffer. All writes are little-endian.
///
/// Positions are absolute within the buffer, so a writer started at byte 0 of a
/// file hands out file offsets directly.
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Current position as a 32-bit file offset.
    pub fn offset(&self) -> Result<u32> {
        u32::try_from(self.buf.len()).map_err(|_| Error::TooLarge {
            size: self.buf.len(),
        })
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_magic(&mut self, magic: &[u8; 4]) {
        self.buf.extend_from_slice(magic);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bool32(&mut self, v: bool) {
        self.write_u32(u32::from(v));
    }

    /// Reserve a u32 slot and return its position for a later [`Writer::patch_u32`].
    pub fn reserve_u32(&mut self) -> usize {
        let pos = self.buf.len();
        self.write_u32(0);
        pos
    }

    /// Patch a u32 at a specific position (for backpatching sizes and offsets).
    pub fn patch_u32(&mut self, pos: usize, v: u32) -> Result<()> {
        let have = self.buf.len().saturating_sub(pos);
        let slot = self.buf.get_mut(pos..pos + 4).ok_or(Error::OutOfBounds {
            offset: pos,
            need: 4,
            have,
        })?;
        slot.copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    /// Zero-fill until the position is a multiple of `alignment`.
    pub fn pad(&mut self, alignment: usize) -> Result<()> {
        let n = padding_for(self.buf.len(), alignment)?;
        self.buf.resize(self.buf.len() + n, 0);
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes needed to bring `pos` up to a multiple of `alignment`.
fn padding_for(pos: usize, alignment: usize) -> Result<usize> {
    if alignment == 0 {
        return Err(Error::UnalignedWrite { alignment });
    }
    Ok((alignment - pos % alignment) % alignment)
}
