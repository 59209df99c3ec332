use std::sync::Arc;

use crate::error::{Error, Result};
use crate::list::{Element, PointerList};
use crate::reader::DataReader;
use crate::writer::DataWriter;

/// An embedded audio file (WAV or OGG bytes).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audio {
    pub data: Vec<u8>,
}

impl Element for Audio {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        let at = r.position();
        let len = r.read_u32()? as usize;
        if len > r.region_remaining() {
            return Err(Error::Parse {
                context: "AUDO",
                message: format!(
                    "entry at {at:#x} declares {len} bytes, {} left in chunk",
                    r.region_remaining()
                ),
            });
        }
        Ok(Self {
            data: r.read_bytes(len)?.to_vec(),
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        let len = u32::try_from(self.data.len()).map_err(|_| Error::TooLarge {
            size: self.data.len(),
        })?;
        w.write_u32(len);
        w.write_bytes(&self.data);
        Ok(())
    }
}

/// Parsed AUDO chunk. Each entry starts on a 4-byte boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Audo {
    pub entries: PointerList<Arc<Audio>>,
}

impl Element for Audo {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        Ok(Self {
            entries: PointerList::read(r)?,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        self.entries.write_with(w, |w, _, _| w.pad(4))
    }
}
