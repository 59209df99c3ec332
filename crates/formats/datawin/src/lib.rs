//! Reader/writer for GameMaker's compiled data.win format.
//!
//! Three-layer architecture:
//! - **Layer 1** (`cursor`/`reader`/`writer`): Raw byte I/O, FORM envelope, chunk index,
//!   and the parse/serialise contexts threaded through every codec
//! - **Layer 2** (`chunks`): Typed codecs for individual chunk formats, built on
//!   pointer lists (`list`), the string pool (`string_table`), the offset/identity
//!   maps (`resolver`) and the inferred format flags (`version`)
//! - **Layer 3** (`datawin`): The container handle that owns all of the above
//!
//! Parsing then serialising a file produced by GameMaker reproduces it byte for byte.

pub mod chunks;
pub mod cursor;
pub mod datawin;
pub mod error;
pub mod list;
pub mod reader;
pub mod resolver;
pub mod string_table;
pub mod version;
pub mod writer;

pub use chunks::{Chunk, ChunkKind};
pub use datawin::DataWin;
pub use error::{Error, Result};
pub use list::{Element, PointerList, Slot};
pub use reader::{ChunkIndex, ReadOptions};
pub use string_table::{StringRef, StringTable};
pub use version::{BytecodeVersion, FormatConfig, GameVersion, Quirk, VersionInfo};
