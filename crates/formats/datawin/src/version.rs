//! Format-version tracking.
//!
//! data.win files carry a bytecode version and a declared game version in
//! GEN8, but several layout variations are not governed by either (GMS2 games
//! all declare 2.0.0.0, for one). Those variations are tracked as [`Quirk`]s:
//! each starts [`Quirk::Unknown`] and is narrowed exactly once by a chunk
//! codec that has seen evidence in the byte layout. Later chunks branch on the
//! narrowed value; they never re-derive it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bytecode version extracted from GEN8.
///
/// Known versions:
/// - 13: Early GameMaker: Studio
/// - 14: GameMaker: Studio 1.x (old instruction format)
/// - 15: GameMaker: Studio 1.4.x (new instruction format, VARI extended)
/// - 16: GameMaker: Studio 1.4.9999+ (adds LANG, GLOB chunks)
/// - 17: GameMaker Studio 2.x
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BytecodeVersion(pub u8);

impl BytecodeVersion {
    pub const V14: Self = Self(14);
    pub const V15: Self = Self(15);
    pub const V16: Self = Self(16);
    pub const V17: Self = Self(17);

    /// Whether GEN8 carries the debugger port field (v14+).
    pub fn has_debugger_port(self) -> bool {
        self.0 >= 14
    }
}

impl fmt::Display for BytecodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A four-part GameMaker version (`major.minor.release.build`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GameVersion {
    pub major: u32,
    pub minor: u32,
    pub release: u32,
    pub build: u32,
}

impl GameVersion {
    pub const fn new(major: u32, minor: u32, release: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            release,
            build,
        }
    }

    /// First version whose AGRP entries carry a path string.
    pub const AUDIO_GROUP_PATHS: Self = Self::new(2024, 14, 0, 0);
    /// First version whose SOND entries carry an audio length.
    pub const SOUND_LENGTHS: Self = Self::new(2024, 6, 0, 0);
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.release, self.build
        )
    }
}

/// A capability inferred from the data rather than declared by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quirk<T> {
    Unknown,
    Known(T),
}

impl<T> Default for Quirk<T> {
    fn default() -> Self {
        Quirk::Unknown
    }
}

/// Outcome of offering evidence to a [`Quirk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrowing<T> {
    /// The flag was unknown and now holds the observed value.
    Narrowed,
    /// The flag already held the observed value.
    Confirmed,
    /// The flag already held a different value, which it keeps.
    Conflict { known: T },
}

impl<T: Copy + PartialEq> Quirk<T> {
    pub fn get(self) -> Option<T> {
        match self {
            Quirk::Unknown => None,
            Quirk::Known(v) => Some(v),
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Quirk::Known(_))
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.get().unwrap_or(default)
    }

    /// Record `observed`. Only an unknown flag changes; a known one is never rewritten.
    pub fn narrow(&mut self, observed: T) -> Narrowing<T> {
        match *self {
            Quirk::Unknown => {
                *self = Quirk::Known(observed);
                Narrowing::Narrowed
            }
            Quirk::Known(v) if v == observed => Narrowing::Confirmed,
            Quirk::Known(known) => Narrowing::Conflict { known },
        }
    }
}

/// Identifies a quirk flag in logs and conflict reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    BytecodeVersion,
    AlignChunksTo16,
    AlignStringsTo4,
    BuiltinAudioGroup,
    AudioGroupPaths,
    SoundLengths,
}

impl Flag {
    pub fn name(self) -> &'static str {
        match self {
            Flag::BytecodeVersion => "bytecode_version",
            Flag::AlignChunksTo16 => "align_chunks_to_16",
            Flag::AlignStringsTo4 => "align_strings_to_4",
            Flag::BuiltinAudioGroup => "builtin_audio_group",
            Flag::AudioGroupPaths => "audio_group_paths",
            Flag::SoundLengths => "sound_lengths",
        }
    }
}

/// Evidence that disagreed with an already-known flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagConflict {
    pub flag: Flag,
    pub known: String,
    pub observed: String,
    pub offset: usize,
}

/// Version state of one container.
///
/// While a container is parsed, chunk codecs narrow the flags through
/// [`crate::reader::DataReader::narrow`]; the writer only ever sees `&VersionInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    pub bytecode_version: Quirk<BytecodeVersion>,
    pub align_chunks_to_16: Quirk<bool>,
    pub align_strings_to_4: Quirk<bool>,
    pub builtin_audio_group: Quirk<u32>,
    pub audio_group_paths: Quirk<bool>,
    pub sound_lengths: Quirk<bool>,
    /// Version as written in GEN8.
    declared: GameVersion,
    /// Best known version: the declared one, raised by inferred features.
    effective: GameVersion,
    conflicts: Vec<FlagConflict>,
}

impl VersionInfo {
    /// All flags known up front, as chosen by `config`.
    pub fn from_config(config: &FormatConfig) -> Self {
        let mut info = Self {
            bytecode_version: Quirk::Known(BytecodeVersion(config.bytecode_version)),
            align_chunks_to_16: Quirk::Known(config.align_chunks_to_16),
            align_strings_to_4: Quirk::Known(config.align_strings_to_4),
            builtin_audio_group: Quirk::Known(
                config
                    .builtin_audio_group
                    .unwrap_or_else(|| builtin_audio_group_for(config.version)),
            ),
            audio_group_paths: Quirk::Known(config.audio_group_paths),
            sound_lengths: Quirk::Known(config.sound_lengths),
            declared: config.version,
            effective: config.version,
            conflicts: Vec::new(),
        };
        info.raise_for_features();
        info
    }

    pub fn declared(&self) -> GameVersion {
        self.declared
    }

    pub fn effective(&self) -> GameVersion {
        self.effective
    }

    /// Whether the effective version is at least `major.minor.release.build`.
    pub fn is_at_least(&self, major: u32, minor: u32, release: u32, build: u32) -> bool {
        self.effective >= GameVersion::new(major, minor, release, build)
    }

    /// Evidence that contradicted already-known flags during parsing.
    pub fn conflicts(&self) -> &[FlagConflict] {
        &self.conflicts
    }

    /// Record the GEN8 version. The effective version never goes down.
    pub(crate) fn set_declared(&mut self, version: GameVersion) {
        self.declared = version;
        self.raise_to(version);
    }

    pub(crate) fn raise_to(&mut self, version: GameVersion) {
        if version > self.effective {
            tracing::debug!(from = %self.effective, to = %version, "raising format version");
            self.effective = version;
        }
    }

    pub(crate) fn record_conflict(&mut self, conflict: FlagConflict) {
        self.conflicts.push(conflict);
    }

    fn raise_for_features(&mut self) {
        if self.audio_group_paths == Quirk::Known(true) {
            self.raise_to(GameVersion::AUDIO_GROUP_PATHS);
        }
        if self.sound_lengths == Quirk::Known(true) {
            self.raise_to(GameVersion::SOUND_LENGTHS);
        }
    }

    pub(crate) fn after_narrowing(&mut self, flag: Flag) {
        if matches!(flag, Flag::AudioGroupPaths | Flag::SoundLengths) {
            self.raise_for_features();
        }
    }
}

/// ID of the audio group that lives in the main data file.
///
/// Which id the runtime treats as built-in changed during GMS 1.x.
pub fn builtin_audio_group_for(version: GameVersion) -> u32 {
    if version.major >= 2 || (version.major == 1 && version.build >= 1354) {
        0
    } else {
        1
    }
}

/// Layout choices for a container built from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub bytecode_version: u8,
    pub version: GameVersion,
    pub align_chunks_to_16: bool,
    pub align_strings_to_4: bool,
    pub audio_group_paths: bool,
    pub sound_lengths: bool,
    /// Overrides the id derived from `version`.
    pub builtin_audio_group: Option<u32>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            bytecode_version: 17,
            version: GameVersion::new(2, 0, 0, 0),
            align_chunks_to_16: true,
            align_strings_to_4: true,
            audio_group_paths: false,
            sound_lengths: false,
            builtin_audio_group: None,
        }
    }
}
