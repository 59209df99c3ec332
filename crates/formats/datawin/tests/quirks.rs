mod common;

use common::FormBuilder;
use datawin::chunks::{Agrp, Gen8, Sond, Strg};
use datawin::reader::{ChunkIndex, DataReader, ReadOptions};
use datawin::version::Flag;
use datawin::{BytecodeVersion, DataWin, Element, Error, FormatConfig, GameVersion, Quirk};

#[test]
fn aligned_string_table() {
    // count at 16, table 20..28, "alpha" at 28, "beta" at 40.
    let data = common::strings_only(&["alpha", "beta"], true);
    let win = DataWin::parse(&data).unwrap();
    let list = &win.chunk::<Strg>().unwrap().list;
    let texts: Vec<_> = list.iter().filter_map(|&s| win.string(s)).collect();
    assert_eq!(texts, ["alpha", "beta"]);
    assert_eq!(win.version().align_strings_to_4, Quirk::Known(true));
    assert!(win.version().conflicts().is_empty());
}

#[test]
fn unaligned_string_table() {
    // "beta" follows "alpha" directly, at 38.
    let data = common::strings_only(&["alpha", "beta"], false);
    let win = DataWin::parse(&data).unwrap();
    assert_eq!(win.version().align_strings_to_4, Quirk::Known(false));
    assert_eq!(win.to_bytes().unwrap(), data);
}

#[test]
fn empty_string_table_decides_nothing() {
    let data = common::strings_only(&[], true);
    let win = DataWin::parse(&data).unwrap();
    assert_eq!(win.version().align_strings_to_4, Quirk::Unknown);
    assert_eq!(win.version().align_chunks_to_16, Quirk::Unknown);
    assert_eq!(win.to_bytes().unwrap(), data);
}

fn read_strg_with_known_alignment(data: &[u8], options: ReadOptions) -> (DataReader<'_>, datawin::Result<Strg>) {
    let index = ChunkIndex::parse(data).unwrap();
    let mut r = DataReader::new(data, &index, options);
    r.version_mut().align_strings_to_4 = Quirk::Known(true);
    r.enter_chunk(index.find(b"STRG").unwrap()).unwrap();
    let strg = Strg::read(&mut r);
    (r, strg)
}

#[test]
fn contradicting_evidence_is_recorded_not_applied() {
    let data = common::strings_only(&["alpha", "beta"], false);
    let (r, strg) = read_strg_with_known_alignment(&data, ReadOptions::default());
    assert_eq!(strg.unwrap().list.len(), 2);
    assert_eq!(r.version().align_strings_to_4, Quirk::Known(true));

    let conflicts = r.version().conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].flag, Flag::AlignStringsTo4);
    assert_eq!(conflicts[0].offset, 38);
    assert_eq!(conflicts[0].known, "true");
    assert_eq!(conflicts[0].observed, "false");
}

#[test]
fn strict_mode_rejects_contradicting_evidence() {
    let data = common::strings_only(&["alpha", "beta"], false);
    let (_, strg) = read_strg_with_known_alignment(&data, ReadOptions { strict_quirks: true });
    assert!(matches!(
        strg,
        Err(Error::VersionFlagConflict {
            flag: "align_strings_to_4",
            offset: 38,
            ..
        })
    ));
}

#[test]
fn audio_layout_flags_from_entry_size() {
    let win = DataWin::parse(&common::sample_game(true, true)).unwrap();
    let v = win.version();
    assert_eq!(v.audio_group_paths, Quirk::Known(false));
    assert_eq!(v.sound_lengths, Quirk::Known(false));
    assert_eq!(v.align_chunks_to_16, Quirk::Known(true));
    assert_eq!(v.effective(), GameVersion::new(2, 0, 0, 0));
    assert!(!v.is_at_least(2024, 6, 0, 0));

    let win = DataWin::parse(&common::modern_audio_game()).unwrap();
    let v = win.version();
    assert_eq!(v.audio_group_paths, Quirk::Known(true));
    assert_eq!(v.sound_lengths, Quirk::Known(true));
    assert_eq!(v.declared(), GameVersion::new(2, 0, 0, 0));
    assert_eq!(v.effective(), GameVersion::AUDIO_GROUP_PATHS);
    assert!(v.is_at_least(2024, 6, 0, 0));
}

fn old_game(bytecode: u8, version: [u32; 4]) -> Vec<u8> {
    let mut b = FormBuilder::new();
    common::gen8(&mut b, bytecode, version);
    b.strg(common::SAMPLE_STRINGS);
    b.finish()
}

#[test]
fn gen8_narrows_bytecode_and_builtin_group() {
    let data = old_game(15, [1, 0, 0, 1250]);
    let win = DataWin::parse(&data).unwrap();
    let v = win.version();
    assert_eq!(v.bytecode_version, Quirk::Known(BytecodeVersion::V15));
    assert_eq!(v.builtin_audio_group, Quirk::Known(1));
    assert_eq!(v.declared(), GameVersion::new(1, 0, 0, 1250));
    assert_eq!(win.to_bytes().unwrap(), data);

    let win = DataWin::parse(&old_game(16, [1, 0, 0, 1763])).unwrap();
    assert_eq!(win.version().builtin_audio_group, Quirk::Known(0));
}

#[test]
fn gen8_without_debugger_port() {
    let data = old_game(13, [1, 0, 0, 1000]);
    let win = DataWin::parse(&data).unwrap();
    let gen8 = win.chunk::<Gen8>().unwrap();
    assert_eq!(gen8.debugger_port, None);
    assert_eq!(gen8.room_order, [0, 1]);
    assert_eq!(win.to_bytes().unwrap(), data);
}

#[test]
fn configured_layout_survives_a_round_trip() {
    let config = FormatConfig {
        align_strings_to_4: false,
        ..FormatConfig::default()
    };
    let mut win = DataWin::new(&config);
    win.define_string("sample").unwrap();
    win.define_string("x").unwrap();
    assert_eq!(win.version().align_strings_to_4, Quirk::Known(false));

    let back = DataWin::parse(&win.to_bytes().unwrap()).unwrap();
    assert_eq!(back.version().align_strings_to_4, Quirk::Known(false));
}

const SINGLE_AUDIO_STRINGS: &[&str] = &[
    "sample",
    "Default",
    "Sample Game",
    "audiogroup_default",
    "snd_jump",
    ".wav",
    "jump.wav",
    "audiogroup1.dat",
];

/// One audio group and one sound, each chunk padded to 16 before the next.
fn single_audio_game(path: Option<&str>, with_fields: bool) -> Vec<u8> {
    let mut b = FormBuilder::new();
    common::gen8(&mut b, 17, [2, 0, 0, 0]);
    common::agrp(&mut b, &[("audiogroup_default", path)], with_fields);
    common::sond(&mut b, &common::sample_sounds()[..1], with_fields);
    b.strg(SINGLE_AUDIO_STRINGS);
    b.finish()
}

#[test]
fn padding_after_a_single_entry_decides_nothing() {
    let data = single_audio_game(None, false);
    let win = DataWin::parse(&data).unwrap();
    let v = win.version();
    assert_eq!(v.audio_group_paths, Quirk::Unknown);
    assert_eq!(v.sound_lengths, Quirk::Unknown);
    assert_eq!(v.effective(), GameVersion::new(2, 0, 0, 0));
    assert_eq!(win.chunk::<Sond>().unwrap().sounds[0].length, None);
    assert_eq!(win.to_bytes().unwrap(), data);
}

#[test]
fn non_zero_trailing_field_of_a_single_entry_is_detected() {
    let data = single_audio_game(Some("audiogroup1.dat"), true);
    let win = DataWin::parse(&data).unwrap();
    let v = win.version();
    assert_eq!(v.audio_group_paths, Quirk::Known(true));
    assert_eq!(v.sound_lengths, Quirk::Known(true));
    assert_eq!(v.effective(), GameVersion::AUDIO_GROUP_PATHS);

    let group = &win.chunk::<Agrp>().unwrap().groups[0];
    assert_eq!(group.path.and_then(|p| win.string(p)), Some("audiogroup1.dat"));
    assert_eq!(win.chunk::<Sond>().unwrap().sounds[0].length, Some(0.25));
    assert_eq!(win.to_bytes().unwrap(), data);
}

#[test]
fn single_entry_in_the_last_chunk_is_exact() {
    let mut b = FormBuilder::new();
    common::gen8(&mut b, 17, [2, 0, 0, 0]);
    b.strg(SINGLE_AUDIO_STRINGS);
    common::sond(&mut b, &common::sample_sounds()[..1], false);
    let data = b.finish();

    let win = DataWin::parse(&data).unwrap();
    assert_eq!(win.version().sound_lengths, Quirk::Known(false));
    assert_eq!(win.to_bytes().unwrap(), data);
}
