use std::sync::Arc;

use crate::error::Result;
use crate::list::{read_simple_list, write_simple_list, Element, PointerList};
use crate::reader::DataReader;
use crate::string_table::StringRef;
use crate::writer::DataWriter;

/// A control point of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub x: f32,
    pub y: f32,
    /// Speed factor at this point (1.0 = 100%).
    pub speed: f32,
}

impl Element for PathPoint {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        Ok(Self {
            x: r.read_f32()?,
            y: r.read_f32()?,
            speed: r.read_f32()?,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_f32(self.x);
        w.write_f32(self.y);
        w.write_f32(self.speed);
        Ok(())
    }
}

/// A path asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub name: StringRef,
    /// Curved (true) or straight segments.
    pub smooth: bool,
    pub closed: bool,
    /// Curve subdivision level (1-8).
    pub precision: u32,
    pub points: Vec<PathPoint>,
}

impl Element for Path {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            smooth: r.read_bool32()?,
            closed: r.read_bool32()?,
            precision: r.read_u32()?,
            points: read_simple_list(r)?,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_string(self.name)?;
        w.write_bool32(self.smooth);
        w.write_bool32(self.closed);
        w.write_u32(self.precision);
        write_simple_list(w, &self.points)
    }
}

/// Parsed PATH chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathChunk {
    pub paths: PointerList<Arc<Path>>,
}

impl Element for PathChunk {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        Ok(Self {
            paths: PointerList::read(r)?,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        self.paths.write(w)
    }
}
