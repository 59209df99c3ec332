use indexmap::IndexMap;

use crate::chunks::{Audo, Chunk, ChunkKind, Strg};
use crate::error::{Error, Result};
use crate::reader::{ChunkEntry, ChunkIndex, DataReader, ReadOptions, FORM_MAGIC};
use crate::string_table::{StringRef, StringTable};
use crate::version::{Flag, FormatConfig, VersionInfo};
use crate::writer::DataWriter;

/// A decoded data.win container.
///
/// Owns the chunks in directory order, the string pool every chunk points
/// into, and the version flags inferred while parsing. Parsing is all or
/// nothing: a failure in any chunk means no `DataWin` is produced.
pub struct DataWin {
    chunks: IndexMap<[u8; 4], Chunk>,
    strings: StringTable,
    version: VersionInfo,
}

impl DataWin {
    /// Parse a data.win file (or a PE exe containing an embedded data.win).
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, &ReadOptions::default())
    }

    /// Parse with explicit options.
    ///
    /// If `data` begins with the PE magic `MZ`, the file is a Windows executable with an
    /// embedded GameMaker FORM blob (e.g. `MomodoraRUtM.exe`). The FORM header is located
    /// by scanning for the `FORM` signature and everything before it is ignored; offsets
    /// inside the blob are relative to the FORM header.
    pub fn parse_with(data: &[u8], options: &ReadOptions) -> Result<Self> {
        let data = match data.starts_with(b"MZ").then(|| find_embedded_form(data)).flatten() {
            Some(offset) => {
                tracing::debug!(offset, "found FORM embedded in executable");
                &data[offset..]
            }
            None => data,
        };
        let index = ChunkIndex::parse(data)?;
        let mut r = DataReader::new(data, &index, options.clone());

        if let Some(aligned) = index.chunks_aligned_to_16() {
            r.narrow_at(
                0,
                Flag::AlignChunksTo16,
                |v| &mut v.align_chunks_to_16,
                aligned,
            )?;
        }

        let mut chunks = IndexMap::with_capacity(index.len());
        for entry in index.chunks() {
            tracing::debug!(
                chunk = entry.magic_str(),
                offset = entry.offset,
                size = entry.size,
                "reading chunk"
            );
            let chunk = read_chunk(&mut r, entry).map_err(|e| e.in_chunk(entry.magic, entry.offset))?;
            chunks.insert(entry.magic, chunk);
        }

        let (mut strings, version) = r.finish();
        let order: Vec<StringRef> = chunks
            .get(&Strg::MAGIC)
            .and_then(Strg::from_chunk)
            .map(|strg| strg.list.iter().copied().collect())
            .unwrap_or_default();
        strings.index_text(order);

        Ok(Self {
            chunks,
            strings,
            version,
        })
    }

    /// An empty container whose layout flags all come from `config`.
    pub fn new(config: &FormatConfig) -> Self {
        Self {
            chunks: IndexMap::new(),
            strings: StringTable::new(),
            version: VersionInfo::from_config(config),
        }
    }

    /// An external audio-group container (`audiogroupN.dat`): a FORM holding
    /// only an empty AUDO chunk.
    pub fn audio_group(config: &FormatConfig) -> Self {
        let mut win = Self::new(config);
        win.insert_chunk(Audo::default().into_chunk());
        win
    }

    /// Serialise the container.
    ///
    /// Chunks are written in directory order into a fresh buffer; a failure
    /// leaves nothing behind. Each chunk's length is backpatched once its
    /// payload and padding are known.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = DataWriter::new(&self.strings, &self.version);
        let align = self.version.align_chunks_to_16.unwrap_or(true);

        w.write_magic(&FORM_MAGIC);
        let form_len = w.reserve_u32();
        let last = self.chunks.len().saturating_sub(1);
        for (i, (magic, chunk)) in self.chunks.iter().enumerate() {
            let offset = w.position();
            let len_pos = w.begin_chunk(magic);
            chunk
                .write(&mut w)
                .and_then(|()| if align && i != last { w.pad(16) } else { Ok(()) })
                .and_then(|()| w.end_chunk(len_pos))
                .map_err(|e| e.in_chunk(*magic, offset))?;
            tracing::debug!(
                chunk = crate::error::magic_str(magic),
                offset,
                size = w.position() - offset - 8,
                "wrote chunk"
            );
        }
        let size = w.position() - 8;
        let size = u32::try_from(size).map_err(|_| Error::TooLarge { size })?;
        w.patch_u32(form_len, size)?;
        w.finish()
    }

    /// Typed access to a registered chunk.
    pub fn chunk<T: ChunkKind>(&self) -> Result<&T> {
        let chunk = self
            .chunks
            .get(&T::MAGIC)
            .ok_or(Error::ChunkNotFound { magic: T::MAGIC })?;
        T::from_chunk(chunk).ok_or(Error::ChunkTypeMismatch { magic: T::MAGIC })
    }

    pub fn chunk_mut<T: ChunkKind>(&mut self) -> Result<&mut T> {
        let chunk = self
            .chunks
            .get_mut(&T::MAGIC)
            .ok_or(Error::ChunkNotFound { magic: T::MAGIC })?;
        T::from_chunk_mut(chunk).ok_or(Error::ChunkTypeMismatch { magic: T::MAGIC })
    }

    /// The chunk of type `T`, appended empty if the container has none.
    pub fn chunk_or_default<T: ChunkKind + Default>(&mut self) -> Result<&mut T> {
        let chunk = self
            .chunks
            .entry(T::MAGIC)
            .or_insert_with(|| T::default().into_chunk());
        T::from_chunk_mut(chunk).ok_or(Error::ChunkTypeMismatch { magic: T::MAGIC })
    }

    /// Any chunk by name, including opaque ones.
    pub fn chunk_by_name(&self, magic: &[u8; 4]) -> Option<&Chunk> {
        self.chunks.get(magic)
    }

    /// Chunk names in directory order.
    pub fn chunk_names(&self) -> impl Iterator<Item = &[u8; 4]> {
        self.chunks.keys()
    }

    /// Whether a chunk with the given magic exists.
    pub fn has_chunk(&self, magic: &[u8; 4]) -> bool {
        self.chunks.contains_key(magic)
    }

    /// Add a chunk at the end of the directory, or replace the chunk of the
    /// same name where it stands. Returns the replaced chunk.
    pub fn insert_chunk(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.magic(), chunk)
    }

    /// Intern `text`, appending it to STRG (created if missing) when new.
    ///
    /// Nothing is interned when STRG cannot take the entry.
    pub fn define_string(&mut self, text: &str) -> Result<StringRef> {
        let strg = self
            .chunks
            .entry(Strg::MAGIC)
            .or_insert_with(|| Strg::default().into_chunk());
        let strg = Strg::from_chunk_mut(strg).ok_or(Error::ChunkTypeMismatch { magic: Strg::MAGIC })?;
        let (sref, added) = self.strings.intern(text);
        if added {
            strg.list.push(sref);
        }
        Ok(sref)
    }

    pub fn string(&self, sref: StringRef) -> Option<&str> {
        self.strings.get(sref)
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }
}

fn read_chunk(r: &mut DataReader<'_>, entry: &ChunkEntry) -> Result<Chunk> {
    r.enter_chunk(entry)?;
    Chunk::read(entry.magic, r)
}

/// Scan `data` (a Windows PE executable) for an embedded GameMaker FORM blob.
///
/// A PE file may contain false-positive `FORM` byte sequences (e.g. inside the
/// import table or resource section), so a candidate is only accepted when its
/// declared size fits within the rest of the file.
fn find_embedded_form(data: &[u8]) -> Option<usize> {
    data.windows(8).enumerate().find_map(|(offset, header)| {
        let (magic, size) = header.split_at(4);
        if magic != FORM_MAGIC {
            return None;
        }
        let size = u32::from_le_bytes(size.try_into().ok()?) as usize;
        (offset + 8 + size <= data.len()).then_some(offset)
    })
}

impl std::fmt::Debug for DataWin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.chunks.keys().map(|m| crate::error::magic_str(m)).collect();
        f.debug_struct("DataWin")
            .field("chunks", &names)
            .field("strings", &self.strings.len())
            .field("version", &self.version.effective())
            .finish()
    }
}
