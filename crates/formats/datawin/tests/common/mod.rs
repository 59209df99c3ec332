//! Hand-assembled FORM buffers laid out the way GameMaker writes them.
//!
//! The builder writes at absolute offsets from byte 0, pads chunks and string
//! records like a conformant writer, and backpatches string pointers that
//! precede STRG once the records are placed.
#![allow(dead_code)]

use std::collections::HashMap;

use datawin::cursor::Writer;

pub struct FormBuilder {
    w: Writer,
    form_len: usize,
    open_chunk: Option<usize>,
    align_chunks: bool,
    align_strings: bool,
    /// Text → offset of its record (length prefix).
    records: HashMap<String, u32>,
    /// String pointers written before their record.
    forward: Vec<(usize, String)>,
}

impl Default for FormBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FormBuilder {
    pub fn new() -> Self {
        let mut w = Writer::new();
        w.write_magic(b"FORM");
        let form_len = w.reserve_u32();
        Self {
            w,
            form_len,
            open_chunk: None,
            align_chunks: true,
            align_strings: true,
            records: HashMap::new(),
            forward: Vec::new(),
        }
    }

    pub fn align_chunks(mut self, on: bool) -> Self {
        self.align_chunks = on;
        self
    }

    pub fn align_strings(mut self, on: bool) -> Self {
        self.align_strings = on;
        self
    }

    /// Start a chunk; the previous one is padded (unless it was the last) and closed.
    pub fn chunk(&mut self, magic: &[u8; 4]) -> &mut Self {
        self.close_chunk(true);
        self.w.write_magic(magic);
        self.open_chunk = Some(self.w.reserve_u32());
        self
    }

    fn close_chunk(&mut self, more_follow: bool) {
        if let Some(len) = self.open_chunk.take() {
            if more_follow && self.align_chunks {
                self.w.pad(16).unwrap();
            }
            let size = self.w.position() - len - 4;
            self.w.patch_u32(len, size as u32).unwrap();
        }
    }

    pub fn pos(&self) -> u32 {
        self.w.position() as u32
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.w.write_u8(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.w.write_u16(v);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.w.write_u32(v);
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.w.write_i32(v);
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.w.write_u64(v);
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.w.write_f32(v);
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.w.write_bool32(v);
        self
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.w.write_bytes(v);
        self
    }

    pub fn pad(&mut self, alignment: usize) -> &mut Self {
        self.w.pad(alignment).unwrap();
        self
    }

    /// Pointer to the character data of `text`'s record.
    pub fn string(&mut self, text: &str) -> &mut Self {
        match self.records.get(text) {
            Some(&record) => self.u32(record + 4),
            None => {
                let at = self.w.reserve_u32();
                self.forward.push((at, text.to_owned()));
                self
            }
        }
    }

    pub fn null(&mut self) -> &mut Self {
        self.u32(0)
    }

    /// Pointer list whose payloads `item` writes back to back.
    pub fn list(&mut self, count: usize, item: impl FnMut(&mut Self, usize)) -> &mut Self {
        self.list_aligned(count, 1, item)
    }

    /// Pointer list whose payloads each start on an `alignment` boundary.
    pub fn list_aligned(
        &mut self,
        count: usize,
        alignment: usize,
        mut item: impl FnMut(&mut Self, usize),
    ) -> &mut Self {
        let table = self.table(count);
        for i in 0..count {
            self.pad(alignment);
            let at = self.pos();
            self.set_slot(table, i, at);
            item(self, i);
        }
        self
    }

    /// Write a count and a zeroed offset table; returns the table position.
    pub fn table(&mut self, count: usize) -> usize {
        self.u32(count as u32);
        let table = self.w.position();
        for _ in 0..count {
            self.w.reserve_u32();
        }
        table
    }

    pub fn set_slot(&mut self, table: usize, index: usize, offset: u32) {
        self.w.patch_u32(table + index * 4, offset).unwrap();
    }

    /// A STRG chunk holding `texts` in order.
    pub fn strg(&mut self, texts: &[&str]) -> &mut Self {
        self.chunk(b"STRG");
        let alignment = if self.align_strings { 4 } else { 1 };
        self.list_aligned(texts.len(), alignment, |b, i| {
            let at = b.pos();
            b.records.entry(texts[i].to_owned()).or_insert(at);
            b.u32(texts[i].len() as u32).bytes(texts[i].as_bytes()).u8(0);
        });
        self.pad(128)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.close_chunk(false);
        for (at, text) in std::mem::take(&mut self.forward) {
            let record = self.records.get(&text).copied();
            let record = record.unwrap_or_else(|| panic!("{text:?} is not in STRG"));
            self.w.patch_u32(at, record + 4).unwrap();
        }
        let size = self.w.position() - 8;
        self.w.patch_u32(self.form_len, size as u32).unwrap();
        self.w.into_bytes()
    }
}

/// GEN8 with the usual GMS2 shape and no trailer.
pub fn gen8(b: &mut FormBuilder, bytecode: u8, version: [u32; 4]) {
    b.chunk(b"GEN8");
    b.u8(0).u8(bytecode).u16(0);
    b.string("sample").string("Default");
    b.u32(100_012).u32(10_000_001).u32(1234);
    b.bytes(&[0; 16]);
    b.string("sample");
    for part in version {
        b.u32(part);
    }
    b.u32(640).u32(480).u32(0x0300);
    b.u32(0xDEAD_BEEF).bytes(&[7; 16]);
    b.u64(1_700_000_000);
    b.string("Sample Game");
    b.u64(0).u64(0).i32(0);
    if bytecode >= 14 {
        b.u32(6502);
    }
    b.u32(2).u32(0).u32(1);
}

/// AGRP entries of 4 bytes, or 8 with a path.
pub fn agrp(b: &mut FormBuilder, groups: &[(&str, Option<&str>)], with_paths: bool) {
    b.chunk(b"AGRP");
    b.list(groups.len(), |b, i| {
        let (name, path) = groups[i];
        b.string(name);
        if with_paths {
            match path {
                Some(path) => b.string(path),
                None => b.null(),
            };
        }
    });
}

pub struct SoundDef<'a> {
    pub name: &'a str,
    pub kind: Option<&'a str>,
    pub file: &'a str,
    pub group_id: i32,
    pub audio_id: i32,
    pub length: f32,
}

/// SOND entries of 36 bytes, or 40 with the audio length.
pub fn sond(b: &mut FormBuilder, sounds: &[SoundDef<'_>], with_lengths: bool) {
    b.chunk(b"SOND");
    b.list(sounds.len(), |b, i| {
        let s = &sounds[i];
        b.string(s.name).u32(0x64);
        match s.kind {
            Some(kind) => b.string(kind),
            None => b.null(),
        };
        b.string(s.file).u32(0).f32(1.0).f32(1.0);
        b.i32(s.group_id).i32(s.audio_id);
        if with_lengths {
            b.f32(s.length);
        }
    });
}

pub fn path(b: &mut FormBuilder, name: &str, points: &[[f32; 3]]) {
    b.chunk(b"PATH");
    b.list(1, |b, _| {
        b.string(name).bool(true).bool(false).u32(4);
        b.u32(points.len() as u32);
        for [x, y, speed] in points {
            b.f32(*x).f32(*y).f32(*speed);
        }
    });
}

pub struct ObjectDef<'a> {
    pub name: &'a str,
    pub vertices: &'a [[f32; 2]],
    /// Per event type: `(subtype, code ids of its actions)`.
    pub events: &'a [&'a [(u32, &'a [i32])]],
}

fn action(b: &mut FormBuilder, code_id: i32) {
    b.u32(1).u32(603).u32(7);
    b.bool(false).bool(false).bool(true);
    b.u32(2).null().i32(code_id).u32(1).i32(-1);
    b.bool(false).bool(false).u32(0);
}

pub fn objt(b: &mut FormBuilder, objects: &[ObjectDef<'_>]) {
    b.chunk(b"OBJT");
    b.list(objects.len(), |b, i| {
        let o = &objects[i];
        b.string(o.name).i32(-1).bool(true).bool(false).i32(0).bool(false);
        b.i32(-100).i32(-1);
        b.bool(!o.vertices.is_empty()).bool(false).u32(2);
        b.f32(0.5).f32(0.1).u32(0).f32(0.1).f32(0.1);
        b.i32(o.vertices.len() as i32).f32(0.2).bool(true).bool(false);
        for [x, y] in o.vertices {
            b.f32(*x).f32(*y);
        }
        b.list(o.events.len(), |b, ty| {
            let events = o.events[ty];
            b.list(events.len(), |b, e| {
                let (subtype, code_ids) = events[e];
                b.u32(subtype);
                b.list(code_ids.len(), |b, a| action(b, code_ids[a]));
            });
        });
    });
}

pub fn audo(b: &mut FormBuilder, entries: &[&[u8]]) {
    b.chunk(b"AUDO");
    b.list_aligned(entries.len(), 4, |b, i| {
        b.u32(entries[i].len() as u32).bytes(entries[i]);
    });
}

pub const SAMPLE_STRINGS: &[&str] = &[
    "sample",
    "Default",
    "Sample Game",
    "audiogroup_default",
    "music",
    "snd_jump",
    ".wav",
    "jump.wav",
    "snd_theme",
    "theme.ogg",
    "path_patrol",
    "obj_player",
    "obj_wall",
];

pub fn sample_sounds() -> [SoundDef<'static>; 2] {
    [
        SoundDef {
            name: "snd_jump",
            kind: Some(".wav"),
            file: "jump.wav",
            group_id: 0,
            audio_id: 0,
            length: 0.25,
        },
        SoundDef {
            name: "snd_theme",
            kind: None,
            file: "theme.ogg",
            group_id: 1,
            audio_id: -1,
            length: 92.5,
        },
    ]
}

pub fn sample_objects() -> [ObjectDef<'static>; 2] {
    [
        ObjectDef {
            name: "obj_player",
            vertices: &[],
            events: &[&[(0, &[3])], &[], &[(0, &[4, 5]), (1, &[6])]],
        },
        ObjectDef {
            name: "obj_wall",
            vertices: &[[0.0, 0.0], [16.0, 16.0]],
            events: &[],
        },
    ]
}

/// A GMS2-shaped game touching every typed chunk plus an opaque one.
pub fn sample_game(align_chunks: bool, align_strings: bool) -> Vec<u8> {
    let mut b = FormBuilder::new()
        .align_chunks(align_chunks)
        .align_strings(align_strings);
    gen8(&mut b, 17, [2, 0, 0, 0]);
    b.chunk(b"OPTN").u32(0x8000_0000).u32(2).bytes(&[1, 2, 3, 4, 5]);
    agrp(&mut b, &[("audiogroup_default", None), ("music", None)], false);
    sond(&mut b, &sample_sounds(), false);
    path(&mut b, "path_patrol", &[[0.0, 0.0, 100.0], [64.0, 0.0, 100.0], [64.0, 32.0, 50.0]]);
    objt(&mut b, &sample_objects());
    b.strg(SAMPLE_STRINGS);
    audo(&mut b, &[b"RIFF\x01\x02\x03", b"OggS"]);
    b.finish()
}

/// A game whose AGRP entries carry paths and SOND entries carry lengths.
pub fn modern_audio_game() -> Vec<u8> {
    let mut b = FormBuilder::new();
    gen8(&mut b, 17, [2, 0, 0, 0]);
    agrp(
        &mut b,
        &[("audiogroup_default", None), ("music", Some("audiogroup1.dat"))],
        true,
    );
    sond(&mut b, &sample_sounds(), true);
    let mut strings = SAMPLE_STRINGS.to_vec();
    strings.push("audiogroup1.dat");
    b.strg(&strings);
    b.finish()
}

/// STRG alone, holding `texts`.
pub fn strings_only(texts: &[&str], align_strings: bool) -> Vec<u8> {
    let mut b = FormBuilder::new().align_strings(align_strings);
    b.strg(texts);
    b.finish()
}
