use std::sync::Arc;

use crate::error::{Error, Result};
use crate::list::{read_inline, Element, PointerList};
use crate::reader::DataReader;
use crate::string_table::StringRef;
use crate::writer::DataWriter;

/// A drag-and-drop action attached to an event. In compiled games this is
/// almost always a single "execute code" action pointing at a CODE entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub lib_id: u32,
    pub id: u32,
    pub kind: u32,
    pub use_relative: bool,
    pub is_question: bool,
    pub use_apply_to: bool,
    pub exe_type: u32,
    pub action_name: Option<StringRef>,
    /// Index into the CODE chunk, or -1.
    pub code_id: i32,
    pub argument_count: u32,
    /// Target instance (-1 = self).
    pub who: i32,
    pub relative: bool,
    pub is_not: bool,
    pub unknown: u32,
}

impl Element for Action {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        Ok(Self {
            lib_id: r.read_u32()?,
            id: r.read_u32()?,
            kind: r.read_u32()?,
            use_relative: r.read_bool32()?,
            is_question: r.read_bool32()?,
            use_apply_to: r.read_bool32()?,
            exe_type: r.read_u32()?,
            action_name: r.read_optional_string()?,
            code_id: r.read_i32()?,
            argument_count: r.read_u32()?,
            who: r.read_i32()?,
            relative: r.read_bool32()?,
            is_not: r.read_bool32()?,
            unknown: r.read_u32()?,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_u32(self.lib_id);
        w.write_u32(self.id);
        w.write_u32(self.kind);
        w.write_bool32(self.use_relative);
        w.write_bool32(self.is_question);
        w.write_bool32(self.use_apply_to);
        w.write_u32(self.exe_type);
        w.write_optional_string(self.action_name)?;
        w.write_i32(self.code_id);
        w.write_u32(self.argument_count);
        w.write_i32(self.who);
        w.write_bool32(self.relative);
        w.write_bool32(self.is_not);
        w.write_u32(self.unknown);
        Ok(())
    }
}

/// One event handler: the subtype within its event type plus its actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event subtype (e.g. alarm index, key code, collision object id).
    pub subtype: u32,
    pub actions: PointerList<Arc<Action>>,
}

impl Element for Event {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        Ok(Self {
            subtype: r.read_u32()?,
            actions: PointerList::read(r)?,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_u32(self.subtype);
        self.actions.write(w)
    }
}

/// Events of one event type (Create, Step, Draw, ...).
pub type EventList = PointerList<Arc<Event>>;

/// A collision-shape vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsVertex {
    pub x: f32,
    pub y: f32,
}

impl Element for PhysicsVertex {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        Ok(Self {
            x: r.read_f32()?,
            y: r.read_f32()?,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_f32(self.x);
        w.write_f32(self.y);
        Ok(())
    }
}

/// Physics properties of an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Physics {
    pub enabled: bool,
    pub sensor: bool,
    /// 0 = circle, 1 = box, 2 = custom polygon.
    pub shape: u32,
    pub density: f32,
    pub restitution: f32,
    pub group: u32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub friction: f32,
    pub awake: bool,
    pub kinematic: bool,
    pub vertices: Vec<PhysicsVertex>,
}

/// An object definition in the OBJT chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub name: StringRef,
    /// Index into SPRT, or -1.
    pub sprite_id: i32,
    pub visible: bool,
    pub solid: bool,
    pub depth: i32,
    pub persistent: bool,
    /// Index into OBJT, or -100 for none.
    pub parent_id: i32,
    /// Index into SPRT used as collision mask, or -1.
    pub mask_id: i32,
    pub physics: Physics,
    /// Indexed by event type.
    pub events: PointerList<Arc<EventList>>,
}

impl Element for Object {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        let name = r.read_string()?;
        let sprite_id = r.read_i32()?;
        let visible = r.read_bool32()?;
        let solid = r.read_bool32()?;
        let depth = r.read_i32()?;
        let persistent = r.read_bool32()?;
        let parent_id = r.read_i32()?;
        let mask_id = r.read_i32()?;

        let enabled = r.read_bool32()?;
        let sensor = r.read_bool32()?;
        let shape = r.read_u32()?;
        let density = r.read_f32()?;
        let restitution = r.read_f32()?;
        let group = r.read_u32()?;
        let linear_damping = r.read_f32()?;
        let angular_damping = r.read_f32()?;
        let vertex_count_at = r.position();
        let vertex_count = r.read_i32()?;
        let friction = r.read_f32()?;
        let awake = r.read_bool32()?;
        let kinematic = r.read_bool32()?;
        let vertex_count = usize::try_from(vertex_count).map_err(|_| Error::Parse {
            context: "OBJT",
            message: format!("negative vertex count {vertex_count} at {vertex_count_at:#x}"),
        })?;
        let vertices = read_inline(r, vertex_count_at, vertex_count)?;

        Ok(Self {
            name,
            sprite_id,
            visible,
            solid,
            depth,
            persistent,
            parent_id,
            mask_id,
            physics: Physics {
                enabled,
                sensor,
                shape,
                density,
                restitution,
                group,
                linear_damping,
                angular_damping,
                friction,
                awake,
                kinematic,
                vertices,
            },
            events: PointerList::read(r)?,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        let p = &self.physics;
        let vertex_count = i32::try_from(p.vertices.len()).map_err(|_| Error::TooLarge {
            size: p.vertices.len(),
        })?;
        w.write_string(self.name)?;
        w.write_i32(self.sprite_id);
        w.write_bool32(self.visible);
        w.write_bool32(self.solid);
        w.write_i32(self.depth);
        w.write_bool32(self.persistent);
        w.write_i32(self.parent_id);
        w.write_i32(self.mask_id);
        w.write_bool32(p.enabled);
        w.write_bool32(p.sensor);
        w.write_u32(p.shape);
        w.write_f32(p.density);
        w.write_f32(p.restitution);
        w.write_u32(p.group);
        w.write_f32(p.linear_damping);
        w.write_f32(p.angular_damping);
        w.write_i32(vertex_count);
        w.write_f32(p.friction);
        w.write_bool32(p.awake);
        w.write_bool32(p.kinematic);
        p.vertices.iter().try_for_each(|v| v.write(w))?;
        self.events.write(w)
    }
}

/// Parsed OBJT chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Objt {
    pub objects: PointerList<Arc<Object>>,
}

impl Element for Objt {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        Ok(Self {
            objects: PointerList::read(r)?,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        self.objects.write(w)
    }
}
