//! Typed chunk codecs and the name → codec registry.
//!
//! Every chunk type reads from a [`DataReader`] positioned at the start of its
//! payload and writes through a [`DataWriter`]. Chunk names the registry does
//! not know decode to [`Chunk::Opaque`] and are written back unchanged.

pub mod agrp;
pub mod audo;
pub mod gen8;
pub mod objt;
pub mod path;
pub mod sond;
pub mod strg;

use crate::error::Result;
use crate::list::Element;
use crate::reader::DataReader;
use crate::writer::DataWriter;

pub use agrp::{Agrp, AudioGroup};
pub use audo::{Audio, Audo};
pub use gen8::Gen8;
pub use objt::{Action, Event, EventList, Object, Objt, Physics, PhysicsVertex};
pub use path::{Path, PathChunk, PathPoint};
pub use sond::{Sond, Sound};
pub use strg::Strg;

/// A chunk type with a fixed name in the registry.
pub trait ChunkKind: Element + Sized {
    const MAGIC: [u8; 4];

    fn from_chunk(chunk: &Chunk) -> Option<&Self>;
    fn from_chunk_mut(chunk: &mut Chunk) -> Option<&mut Self>;
    fn into_chunk(self) -> Chunk;
}

macro_rules! chunk_registry {
    ($($variant:ident($ty:ty) = $magic:literal),* $(,)?) => {
        /// A decoded chunk payload.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Chunk {
            $($variant($ty),)*
            /// A chunk this crate does not decode, kept byte for byte.
            Opaque { magic: [u8; 4], data: Vec<u8> },
        }

        impl Chunk {
            /// Decode the payload of a chunk named `magic`. The reader must be
            /// positioned at the payload start with the chunk region entered.
            pub fn read(magic: [u8; 4], r: &mut DataReader<'_>) -> Result<Self> {
                match &magic {
                    $($magic => <$ty as Element>::read(r).map(Chunk::$variant),)*
                    _ => {
                        let data = r.read_bytes(r.region_remaining())?.to_vec();
                        Ok(Chunk::Opaque { magic, data })
                    }
                }
            }

            pub fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
                match self {
                    $(Chunk::$variant(chunk) => chunk.write(w),)*
                    Chunk::Opaque { data, .. } => {
                        w.write_bytes(data);
                        Ok(())
                    }
                }
            }

            pub fn magic(&self) -> [u8; 4] {
                match self {
                    $(Chunk::$variant(_) => *$magic,)*
                    Chunk::Opaque { magic, .. } => *magic,
                }
            }
        }

        $(
            impl ChunkKind for $ty {
                const MAGIC: [u8; 4] = *$magic;

                fn from_chunk(chunk: &Chunk) -> Option<&Self> {
                    match chunk {
                        Chunk::$variant(c) => Some(c),
                        _ => None,
                    }
                }

                fn from_chunk_mut(chunk: &mut Chunk) -> Option<&mut Self> {
                    match chunk {
                        Chunk::$variant(c) => Some(c),
                        _ => None,
                    }
                }

                fn into_chunk(self) -> Chunk {
                    Chunk::$variant(self)
                }
            }
        )*
    };
}

chunk_registry! {
    Gen8(Gen8) = b"GEN8",
    Strg(Strg) = b"STRG",
    Agrp(Agrp) = b"AGRP",
    Sond(Sond) = b"SOND",
    Audo(Audo) = b"AUDO",
    Path(PathChunk) = b"PATH",
    Objt(Objt) = b"OBJT",
}
