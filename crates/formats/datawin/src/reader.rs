use std::fmt::Debug;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::resolver::Resolver;
use crate::string_table::{StringRef, StringTable};
use crate::version::{Flag, FlagConflict, Narrowing, Quirk, VersionInfo};

/// Magic bytes for the FORM container.
pub const FORM_MAGIC: [u8; 4] = *b"FORM";

/// A single chunk entry in the file.
#[derive(Debug, Clone, Copy)]
pub struct ChunkEntry {
    /// 4-byte ASCII magic identifying the chunk type.
    pub magic: [u8; 4],
    /// Absolute byte offset of the chunk header (magic field) in the file.
    pub offset: usize,
    /// Size of the chunk's content (excluding the 8-byte header).
    pub size: usize,
}

impl ChunkEntry {
    /// Absolute offset where chunk content begins (after magic + size fields).
    pub fn data_offset(&self) -> usize {
        self.offset + 8
    }

    /// Absolute offset one past the chunk's last content byte.
    pub fn end(&self) -> usize {
        self.data_offset() + self.size
    }

    /// Absolute byte range of the chunk content.
    pub fn data_range(&self) -> Range<usize> {
        self.data_offset()..self.end()
    }

    /// Magic as a string (for display).
    pub fn magic_str(&self) -> &str {
        std::str::from_utf8(&self.magic).unwrap_or("????")
    }
}

/// Index of all top-level chunks in a FORM file.
///
/// This is Layer 1: it only knows about the FORM envelope and chunk boundaries.
/// It does not parse any chunk internals.
pub struct ChunkIndex {
    /// Ordered list of chunks as they appear in the file.
    chunks: Vec<ChunkEntry>,
}

impl ChunkIndex {
    /// Parse the FORM envelope and build a chunk index.
    ///
    /// The `data` slice must be the entire file contents.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        // Read FORM header
        let magic = cursor.read_magic()?;
        if magic != FORM_MAGIC {
            return Err(Error::InvalidMagic {
                expected: FORM_MAGIC,
                found: magic,
            });
        }
        let form_size = cursor.read_u32()? as usize;
        let form_end = 8 + form_size;
        if form_end > data.len() {
            return Err(Error::OutOfBounds {
                offset: 8,
                need: form_size,
                have: data.len() - 8,
            });
        }

        // Iterate over chunks
        let mut chunks: Vec<ChunkEntry> = Vec::new();
        while cursor.position() < form_end {
            let chunk_offset = cursor.position();

            let chunk_magic = cursor.read_magic()?;
            // Validate chunk magic is ASCII
            if !chunk_magic.iter().all(|&b| b.is_ascii_alphanumeric()) {
                return Err(Error::InvalidChunkMagic {
                    offset: chunk_offset,
                    magic: chunk_magic,
                });
            }
            if chunks.iter().any(|c| c.magic == chunk_magic) {
                return Err(Error::DuplicateChunk {
                    magic: chunk_magic,
                    offset: chunk_offset,
                });
            }

            let chunk_size = cursor.read_u32()? as usize;
            let entry = ChunkEntry {
                magic: chunk_magic,
                offset: chunk_offset,
                size: chunk_size,
            };
            if entry.end() > form_end {
                return Err(Error::OutOfBounds {
                    offset: entry.data_offset(),
                    need: chunk_size,
                    have: form_end.saturating_sub(entry.data_offset()),
                });
            }
            chunks.push(entry);

            // Skip to next chunk
            cursor.seek(entry.end())?;
        }

        Ok(Self { chunks })
    }

    /// All chunks in file order.
    pub fn chunks(&self) -> &[ChunkEntry] {
        &self.chunks
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Find a chunk by its 4-byte magic.
    pub fn find(&self, magic: &[u8; 4]) -> Option<&ChunkEntry> {
        self.chunks.iter().find(|c| &c.magic == magic)
    }

    /// Get the raw content bytes for a chunk from the file data.
    pub fn chunk_data<'a>(&self, data: &'a [u8], magic: &[u8; 4]) -> Result<&'a [u8]> {
        let entry = self.find(magic).ok_or(Error::ChunkNotFound { magic: *magic })?;
        data.get(entry.data_range()).ok_or(Error::OutOfBounds {
            offset: entry.data_offset(),
            need: entry.size,
            have: data.len().saturating_sub(entry.data_offset()),
        })
    }

    /// Whether every chunk but the last ends on a 16-byte boundary.
    ///
    /// `None` when there is no chunk boundary to judge by.
    pub fn chunks_aligned_to_16(&self) -> Option<bool> {
        let (_, inner) = self.chunks.split_last()?;
        if inner.is_empty() {
            return None;
        }
        Some(inner.iter().all(|c| c.end() % 16 == 0))
    }
}

/// Options for [`crate::DataWin::parse_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Fail the parse when layout evidence contradicts an already-known
    /// version flag, instead of logging and recording the conflict.
    pub strict_quirks: bool,
}

/// Parse context threaded through every chunk codec.
///
/// Owns the pool, resolver and version state for the duration of one parse.
/// The cursor spans the whole file so absolute pointers can be followed; the
/// current chunk's payload range bounds pointer lists.
pub struct DataReader<'a> {
    cursor: Cursor<'a>,
    region: Range<usize>,
    /// End of the directory's last chunk, the only one never padded.
    last_chunk_end: usize,
    pool: Option<Range<usize>>,
    strings: StringTable,
    version: VersionInfo,
    resolver: Resolver,
    options: ReadOptions,
}

impl<'a> DataReader<'a> {
    pub fn new(data: &'a [u8], index: &ChunkIndex, options: ReadOptions) -> Self {
        Self {
            cursor: Cursor::new(data),
            region: 0..data.len(),
            last_chunk_end: index.chunks().last().map_or(0, ChunkEntry::end),
            pool: index.find(b"STRG").map(ChunkEntry::data_range),
            strings: StringTable::new(),
            version: VersionInfo::default(),
            resolver: Resolver::new(),
            options,
        }
    }

    /// Position the reader at the start of `entry`'s payload and bound it.
    pub fn enter_chunk(&mut self, entry: &ChunkEntry) -> Result<()> {
        self.region = entry.data_range();
        self.cursor.seek(entry.data_offset())
    }

    /// Payload range of the chunk being decoded.
    pub fn region(&self) -> Range<usize> {
        self.region.clone()
    }

    /// Whether the current chunk is the last in the directory.
    pub fn in_last_chunk(&self) -> bool {
        self.region.end == self.last_chunk_end
    }

    /// Bytes left in the current chunk.
    pub fn region_remaining(&self) -> usize {
        self.region.end.saturating_sub(self.cursor.position())
    }

    pub fn cursor(&mut self) -> &mut Cursor<'a> {
        &mut self.cursor
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        self.cursor.seek(pos)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.cursor.read_bytes(n)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.cursor.read_array()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.cursor.read_u16()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.cursor.read_i32()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor.read_u64()
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.cursor.read_i64()
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.cursor.read_f32()
    }

    pub fn read_bool32(&mut self) -> Result<bool> {
        self.cursor.read_bool32()
    }

    /// Resolve the string record at `offset` (pointing at its length prefix).
    pub fn resolve_string(&mut self, offset: u32) -> Result<StringRef> {
        self.strings
            .resolve(self.cursor.data(), self.pool.as_ref(), offset)
    }

    /// Read a string pointer that may be null.
    pub fn read_optional_string(&mut self) -> Result<Option<StringRef>> {
        let at = self.cursor.position();
        match self.cursor.read_u32()? {
            0 => Ok(None),
            ptr if ptr < StringRef::CHARS_BIAS => Err(Error::PoolCorruption {
                offset: at,
                message: format!("string pointer {ptr:#x} precedes any record"),
            }),
            ptr => self.resolve_string(ptr - StringRef::CHARS_BIAS).map(Some),
        }
    }

    /// Read a string pointer that must not be null.
    pub fn read_string(&mut self) -> Result<StringRef> {
        let at = self.cursor.position();
        self.read_optional_string()?
            .ok_or_else(|| Error::PoolCorruption {
                offset: at,
                message: "null pointer where a string is required".into(),
            })
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn version_mut(&mut self) -> &mut VersionInfo {
        &mut self.version
    }

    pub fn resolver(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Offer evidence for a flag, attributed to the current position.
    pub fn narrow<T>(
        &mut self,
        flag: Flag,
        select: impl FnOnce(&mut VersionInfo) -> &mut Quirk<T>,
        observed: T,
    ) -> Result<()>
    where
        T: Copy + PartialEq + Debug,
    {
        let offset = self.cursor.position();
        self.narrow_at(offset, flag, select, observed)
    }

    /// Offer evidence for a flag, attributed to `offset`.
    ///
    /// An unknown flag takes the observed value. A known flag keeps its value
    /// no matter what; disagreeing evidence is reported as a conflict.
    pub fn narrow_at<T>(
        &mut self,
        offset: usize,
        flag: Flag,
        select: impl FnOnce(&mut VersionInfo) -> &mut Quirk<T>,
        observed: T,
    ) -> Result<()>
    where
        T: Copy + PartialEq + Debug,
    {
        match select(&mut self.version).narrow(observed) {
            Narrowing::Narrowed => {
                tracing::debug!(flag = flag.name(), value = ?observed, offset, "version flag narrowed");
                self.version.after_narrowing(flag);
                Ok(())
            }
            Narrowing::Confirmed => Ok(()),
            Narrowing::Conflict { known } => {
                let known = format!("{known:?}");
                let observed = format!("{observed:?}");
                tracing::warn!(
                    flag = flag.name(),
                    %known,
                    %observed,
                    offset,
                    "layout contradicts an already-known version flag"
                );
                if self.options.strict_quirks {
                    return Err(Error::VersionFlagConflict {
                        flag: flag.name(),
                        known,
                        observed,
                        offset,
                    });
                }
                self.version.record_conflict(FlagConflict {
                    flag,
                    known,
                    observed,
                    offset,
                });
                Ok(())
            }
        }
    }

    pub(crate) fn finish(self) -> (StringTable, VersionInfo) {
        (self.strings, self.version)
    }
}
