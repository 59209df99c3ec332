use std::sync::Arc;

use crate::error::Result;
use crate::list::{trailing_field, Element, PointerList};
use crate::reader::DataReader;
use crate::string_table::StringRef;
use crate::version::Flag;
use crate::writer::DataWriter;

/// Sound entry flag bits.
pub mod flags {
    pub const EMBEDDED: u32 = 0x1;
    pub const COMPRESSED: u32 = 0x2;
    pub const DECOMPRESS_ON_LOAD: u32 = 0x3;
    pub const REGULAR: u32 = 0x64;
}

/// Size of a sound entry without the trailing audio length.
const BASE_SIZE: usize = 36;

/// A sound entry in the SOND chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    pub name: StringRef,
    /// See [`flags`].
    pub flags: u32,
    /// File extension, e.g. ".ogg".
    pub kind: Option<StringRef>,
    /// Original file name.
    pub file: StringRef,
    pub effects: u32,
    pub volume: f32,
    pub pitch: f32,
    /// Audio group index (AGRP).
    pub group_id: i32,
    /// Index into the group's AUDO chunk, or -1 for streamed audio.
    pub audio_id: i32,
    /// Duration in seconds, in GameMaker 2024.6 and later.
    pub length: Option<f32>,
}

impl Element for Sound {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        let name = r.read_string()?;
        let flags = r.read_u32()?;
        let kind = r.read_optional_string()?;
        let file = r.read_string()?;
        let effects = r.read_u32()?;
        let volume = r.read_f32()?;
        let pitch = r.read_f32()?;
        let group_id = r.read_i32()?;
        let audio_id = r.read_i32()?;
        let length = if r.version().sound_lengths.unwrap_or(false) {
            Some(r.read_f32()?)
        } else {
            None
        };
        Ok(Self {
            name,
            flags,
            kind,
            file,
            effects,
            volume,
            pitch,
            group_id,
            audio_id,
            length,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_string(self.name)?;
        w.write_u32(self.flags);
        w.write_optional_string(self.kind)?;
        w.write_string(self.file)?;
        w.write_u32(self.effects);
        w.write_f32(self.volume);
        w.write_f32(self.pitch);
        w.write_i32(self.group_id);
        w.write_i32(self.audio_id);
        if w.version().sound_lengths.unwrap_or(false) {
            w.write_f32(self.length.unwrap_or(0.0));
        }
        Ok(())
    }
}

/// Parsed SOND chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sond {
    pub sounds: PointerList<Arc<Sound>>,
}

impl Element for Sond {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        let mut settled = false;
        let sounds = PointerList::read_with(r, |r, slot| {
            if settled {
                return Ok(());
            }
            match trailing_field(r, slot, BASE_SIZE)? {
                Some(lengths) => {
                    settled = true;
                    r.narrow(Flag::SoundLengths, |v| &mut v.sound_lengths, lengths)
                }
                None => {
                    tracing::debug!(offset = slot.offset, "sound entry size hidden by chunk padding");
                    Ok(())
                }
            }
        })?;
        Ok(Self { sounds })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        self.sounds.write(w)
    }
}
