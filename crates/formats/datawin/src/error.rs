use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid magic: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("out of bounds at offset {offset:#x} (need {need} bytes, have {have})")]
    OutOfBounds {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("invalid chunk magic at offset {offset:#x}: {magic:?}")]
    InvalidChunkMagic { offset: usize, magic: [u8; 4] },

    #[error("chunk {} appears twice (second copy at offset {offset:#x})", magic_str(.magic))]
    DuplicateChunk { magic: [u8; 4], offset: usize },

    #[error("chunk {} not found", magic_str(.magic))]
    ChunkNotFound { magic: [u8; 4] },

    #[error("chunk {} does not hold the requested type", magic_str(.magic))]
    ChunkTypeMismatch { magic: [u8; 4] },

    #[error("malformed pointer list at offset {offset:#x}: {message}")]
    MalformedList { offset: usize, message: String },

    #[error("string pool corruption at offset {offset:#x}: {message}")]
    PoolCorruption { offset: usize, message: String },

    #[error("cannot pad to alignment {alignment}")]
    UnalignedWrite { alignment: usize },

    #[error("version flag {flag} is already {known}, but offset {offset:#x} suggests {observed}")]
    VersionFlagConflict {
        flag: &'static str,
        known: String,
        observed: String,
        offset: usize,
    },

    #[error("output of {size} bytes does not fit 32-bit offsets")]
    TooLarge { size: usize },

    #[error("{context}: {message}")]
    Parse { context: &'static str, message: String },

    #[error("in chunk {} at offset {offset:#x}: {source}", magic_str(.magic))]
    InChunk {
        magic: [u8; 4],
        offset: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach chunk name and header offset to a failure raised inside a chunk codec.
    pub fn in_chunk(self, magic: [u8; 4], offset: usize) -> Self {
        match self {
            // Nested wrapping only ever comes from re-entrant helpers; keep the innermost.
            e @ Error::InChunk { .. } => e,
            e => Error::InChunk {
                magic,
                offset,
                source: Box::new(e),
            },
        }
    }

    /// Name of the chunk the failure occurred in, if known.
    pub fn chunk(&self) -> Option<&[u8; 4]> {
        match self {
            Error::InChunk { magic, .. } => Some(magic),
            _ => None,
        }
    }

    /// The underlying failure, with any chunk context stripped.
    pub fn root(&self) -> &Error {
        match self {
            Error::InChunk { source, .. } => source.root(),
            e => e,
        }
    }
}

pub(crate) fn magic_str(magic: &[u8; 4]) -> &str {
    std::str::from_utf8(magic).unwrap_or("????")
}

pub type Result<T> = std::result::Result<T, Error>;
