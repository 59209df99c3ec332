mod common;

use std::sync::Arc;

use common::FormBuilder;
use datawin::chunks::{Action, Event, EventList, Object, Objt, Path, PathChunk, PathPoint, Physics};
use datawin::{DataWin, FormatConfig, StringRef};

fn occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

const MARKER_X: f32 = 1234.5;
const MARKER_SUBTYPE: u32 = 0xABCD_1234;

fn patrol(name: StringRef) -> Path {
    Path {
        name,
        smooth: false,
        closed: true,
        precision: 4,
        points: vec![
            PathPoint { x: MARKER_X, y: 0.0, speed: 100.0 },
            PathPoint { x: 0.0, y: 8.0, speed: 100.0 },
        ],
    }
}

fn action(code_id: i32) -> Action {
    Action {
        lib_id: 1,
        id: 603,
        kind: 7,
        use_relative: false,
        is_question: false,
        use_apply_to: true,
        exe_type: 2,
        action_name: None,
        code_id,
        argument_count: 1,
        who: -1,
        relative: false,
        is_not: false,
        unknown: 0,
    }
}

fn object(name: StringRef, events: Vec<EventList>) -> Object {
    Object {
        name,
        sprite_id: -1,
        visible: true,
        solid: false,
        depth: 0,
        persistent: false,
        parent_id: -100,
        mask_id: -1,
        physics: Physics::default(),
        events: events.into_iter().map(Arc::new).collect(),
    }
}

fn paths_container(share: bool) -> Vec<u8> {
    let mut win = DataWin::new(&FormatConfig::default());
    let name = win.define_string("path_patrol").unwrap();
    let paths = &mut win.chunk_or_default::<PathChunk>().unwrap().paths;
    let first = paths.add(patrol(name));
    if share {
        paths.push(first);
    } else {
        paths.add(patrol(name));
    }
    win.to_bytes().unwrap()
}

#[test]
fn shared_path_is_written_once() {
    let marker = MARKER_X.to_le_bytes();
    assert_eq!(occurrences(&paths_container(true), &marker), 1);
    assert_eq!(occurrences(&paths_container(false), &marker), 2);
}

#[test]
fn shared_path_decodes_to_one_instance() {
    let bytes = paths_container(true);
    let win = DataWin::parse(&bytes).unwrap();
    let paths = &win.chunk::<PathChunk>().unwrap().paths;
    assert_eq!(paths.len(), 2);
    assert!(Arc::ptr_eq(&paths[0], &paths[1]));
    assert_eq!(win.to_bytes().unwrap(), bytes);

    let win = DataWin::parse(&paths_container(false)).unwrap();
    let paths = &win.chunk::<PathChunk>().unwrap().paths;
    assert!(!Arc::ptr_eq(&paths[0], &paths[1]));
    assert_eq!(paths[0], paths[1]);
}

#[test]
fn event_shared_between_objects() {
    let mut win = DataWin::new(&FormatConfig::default());
    let player = win.define_string("obj_player").unwrap();
    let ghost = win.define_string("obj_ghost").unwrap();

    let mut create = EventList::new();
    let shared = create.add(Event {
        subtype: MARKER_SUBTYPE,
        actions: [action(3), action(4)].into_iter().map(Arc::new).collect(),
    });
    let mut inherited = EventList::new();
    inherited.push(shared);

    let objt = win.chunk_or_default::<Objt>().unwrap();
    objt.objects.add(object(player, vec![create, EventList::new()]));
    objt.objects.add(object(ghost, vec![inherited]));

    let bytes = win.to_bytes().unwrap();
    assert_eq!(occurrences(&bytes, &MARKER_SUBTYPE.to_le_bytes()), 1);

    let back = DataWin::parse(&bytes).unwrap();
    let objects = &back.chunk::<Objt>().unwrap().objects;
    let a = &objects[0].events[0][0];
    let b = &objects[1].events[0][0];
    assert!(Arc::ptr_eq(a, b));
    assert_eq!(a.actions.len(), 2);
    assert_eq!(a.actions[1].code_id, 4);
    assert!(objects[0].events[1].is_empty());
    assert_eq!(back.to_bytes().unwrap(), bytes);
}

#[test]
fn shared_slots_on_disk_round_trip() {
    let mut b = FormBuilder::new();
    b.strg(&["path_patrol"]);
    b.chunk(b"PATH");
    let table = b.table(3);
    let first = b.pos();
    b.string("path_patrol").bool(true).bool(false).u32(4);
    b.u32(1).f32(MARKER_X).f32(2.0).f32(100.0);
    let second = b.pos();
    b.string("path_patrol").bool(false).bool(false).u32(1).u32(0);
    b.set_slot(table, 0, first);
    b.set_slot(table, 1, second);
    b.set_slot(table, 2, first);
    let data = b.finish();

    let win = DataWin::parse(&data).unwrap();
    let paths = &win.chunk::<PathChunk>().unwrap().paths;
    assert_eq!(paths.len(), 3);
    assert!(Arc::ptr_eq(&paths[0], &paths[2]));
    assert!(!Arc::ptr_eq(&paths[0], &paths[1]));
    assert_eq!(paths[0].name, paths[1].name);
    assert_eq!(win.to_bytes().unwrap(), data);
}
