use std::sync::Arc;

use crate::error::Result;
use crate::list::{trailing_field, Element, PointerList};
use crate::reader::DataReader;
use crate::string_table::StringRef;
use crate::version::Flag;
use crate::writer::DataWriter;

/// An audio group entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioGroup {
    pub name: StringRef,
    /// Location of the group's audiogroupN.dat, in GameMaker 2024.14 and later.
    pub path: Option<StringRef>,
}

impl Element for AudioGroup {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        let name = r.read_string()?;
        let path = if r.version().audio_group_paths.unwrap_or(false) {
            r.read_optional_string()?
        } else {
            None
        };
        Ok(Self { name, path })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_string(self.name)?;
        if w.version().audio_group_paths.unwrap_or(false) {
            w.write_optional_string(self.path)?;
        }
        Ok(())
    }
}

/// Parsed AGRP chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Agrp {
    pub groups: PointerList<Arc<AudioGroup>>,
}

impl Element for Agrp {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        let mut settled = false;
        let groups = PointerList::read_with(r, |r, slot| {
            if settled {
                return Ok(());
            }
            match trailing_field(r, slot, 4)? {
                Some(paths) => {
                    settled = true;
                    r.narrow(Flag::AudioGroupPaths, |v| &mut v.audio_group_paths, paths)
                }
                None => {
                    tracing::debug!(offset = slot.offset, "audio group size hidden by chunk padding");
                    Ok(())
                }
            }
        })?;
        Ok(Self { groups })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        self.groups.write(w)
    }
}
