use crate::error::Result;
use crate::list::{read_simple_list, write_simple_list, Element};
use crate::reader::DataReader;
use crate::string_table::StringRef;
use crate::version::{builtin_audio_group_for, BytecodeVersion, Flag, GameVersion};
use crate::writer::DataWriter;

/// Parsed GEN8 chunk (general game information).
#[derive(Debug, Clone, PartialEq)]
pub struct Gen8 {
    /// Whether the debugger is disabled.
    pub debug_disabled: u8,
    /// Bytecode format version.
    pub bytecode_version: BytecodeVersion,
    pub unknown: u16,
    /// Project file name.
    pub filename: StringRef,
    /// Build configuration name (usually "Default").
    pub config: StringRef,
    /// Highest object id ever allocated in the project.
    pub last_object_id: u32,
    /// Highest tile id ever allocated in the project.
    pub last_tile_id: u32,
    pub game_id: u32,
    /// DirectPlay GUID (zero for most games).
    pub guid: [u8; 16],
    /// Internal game name.
    pub name: StringRef,
    /// Declared IDE version.
    pub version: GameVersion,
    pub default_window_width: u32,
    pub default_window_height: u32,
    /// Option flags (fullscreen, interpolation, ...).
    pub info: u32,
    pub license_crc32: u32,
    pub license_md5: [u8; 16],
    /// Build time, seconds since the Unix epoch.
    pub timestamp: u64,
    /// Window title.
    pub display_name: StringRef,
    pub active_targets: u64,
    pub function_classifications: u64,
    pub steam_app_id: i32,
    /// Present from bytecode 14 on.
    pub debugger_port: Option<u32>,
    /// Room ids in play order.
    pub room_order: Vec<u32>,
    /// GMS2 trailer (random seeds and a checksum), kept verbatim.
    pub tail: Vec<u8>,
}

impl Element for Gen8 {
    fn read(r: &mut DataReader<'_>) -> Result<Self> {
        let debug_disabled = r.read_u8()?;
        let bytecode_version = BytecodeVersion(r.read_u8()?);
        r.narrow(
            Flag::BytecodeVersion,
            |v| &mut v.bytecode_version,
            bytecode_version,
        )?;
        let unknown = r.read_u16()?;
        let filename = r.read_string()?;
        let config = r.read_string()?;
        let last_object_id = r.read_u32()?;
        let last_tile_id = r.read_u32()?;
        let game_id = r.read_u32()?;
        let guid = r.read_array::<16>()?;
        let name = r.read_string()?;

        let version_at = r.position();
        let version = GameVersion::new(r.read_u32()?, r.read_u32()?, r.read_u32()?, r.read_u32()?);
        r.version_mut().set_declared(version);
        r.narrow_at(
            version_at,
            Flag::BuiltinAudioGroup,
            |v| &mut v.builtin_audio_group,
            builtin_audio_group_for(version),
        )?;

        let default_window_width = r.read_u32()?;
        let default_window_height = r.read_u32()?;
        let info = r.read_u32()?;
        let license_crc32 = r.read_u32()?;
        let license_md5 = r.read_array::<16>()?;
        let timestamp = r.read_u64()?;
        let display_name = r.read_string()?;
        let active_targets = r.read_u64()?;
        let function_classifications = r.read_u64()?;
        let steam_app_id = r.read_i32()?;
        let debugger_port = if bytecode_version.has_debugger_port() {
            Some(r.read_u32()?)
        } else {
            None
        };
        let room_order = read_simple_list(r)?;
        let tail = r.read_bytes(r.region_remaining())?.to_vec();

        Ok(Self {
            debug_disabled,
            bytecode_version,
            unknown,
            filename,
            config,
            last_object_id,
            last_tile_id,
            game_id,
            guid,
            name,
            version,
            default_window_width,
            default_window_height,
            info,
            license_crc32,
            license_md5,
            timestamp,
            display_name,
            active_targets,
            function_classifications,
            steam_app_id,
            debugger_port,
            room_order,
            tail,
        })
    }

    fn write(&self, w: &mut DataWriter<'_>) -> Result<()> {
        w.write_u8(self.debug_disabled);
        w.write_u8(self.bytecode_version.0);
        w.write_u16(self.unknown);
        w.write_string(self.filename)?;
        w.write_string(self.config)?;
        w.write_u32(self.last_object_id);
        w.write_u32(self.last_tile_id);
        w.write_u32(self.game_id);
        w.write_bytes(&self.guid);
        w.write_string(self.name)?;
        w.write_u32(self.version.major);
        w.write_u32(self.version.minor);
        w.write_u32(self.version.release);
        w.write_u32(self.version.build);
        w.write_u32(self.default_window_width);
        w.write_u32(self.default_window_height);
        w.write_u32(self.info);
        w.write_u32(self.license_crc32);
        w.write_bytes(&self.license_md5);
        w.write_u64(self.timestamp);
        w.write_string(self.display_name)?;
        w.write_u64(self.active_targets);
        w.write_u64(self.function_classifications);
        w.write_i32(self.steam_app_id);
        if let Some(port) = self.debugger_port {
            w.write_u32(port);
        }
        write_simple_list(w, &self.room_order)?;
        w.write_bytes(&self.tail);
        Ok(())
    }
}
