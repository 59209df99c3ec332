use crate::error::Result;
use crate::list::{Element, PointerList};
use crate::reader::DataReader;
use crate::string_table::StringRef;
use crate::version::Flag;
use crate::writer::DataWriter;

/// Parsed STRG chunk: the pooled strings in on-disk order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Strg {
    pub list: PointerList<StringRef>,
}

impl Element for Strg {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        // One unaligned record settles the flag; otherwise the whole table has to be seen.
        let mut all_aligned = true;
        let list = PointerList::read_with(r, |r, slot| {
            if slot.offset % 4 != 0 {
                all_aligned = false;
                r.narrow(Flag::AlignStringsTo4, |v| &mut v.align_strings_to_4, false)?;
            }
            Ok(())
        })?;
        if all_aligned && !list.is_empty() {
            r.narrow(Flag::AlignStringsTo4, |v| &mut v.align_strings_to_4, true)?;
        }
        Ok(Self { list })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        let align = w.version().align_strings_to_4.unwrap_or(true);
        self.list.write_with(w, |w, _, _| if align { w.pad(4) } else { Ok(()) })?;
        w.pad(128)
    }
}
