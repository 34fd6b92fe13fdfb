//! Packet id tables and flat packet structs for protocol 47.
//!
//! Structs here are plain sequentially-encoded field lists, so they derive
//! `Encode`/`Decode` the way the teacher's packets did; anything with a
//! variable shape (chunk columns, entity metadata, slots) reaches into
//! `mc_protocol` directly from the dispatch tables instead of living here.

use mc_protocol::{Decode, Encode};

pub mod handshaking {
    pub const SERVERBOUND_HANDSHAKE: i32 = 0x00;
}

pub mod login {
    // Clientbound
    pub const DISCONNECT: i32 = 0x00;
    pub const ENCRYPTION_REQUEST: i32 = 0x01;
    pub const LOGIN_SUCCESS: i32 = 0x02;
    pub const SET_COMPRESSION: i32 = 0x03;

    // Serverbound
    pub const LOGIN_START: i32 = 0x00;
}

pub mod play {
    // Clientbound (the ones this client actually decodes/surfaces)
    pub const KEEP_ALIVE: i32 = 0x00;
    pub const JOIN_GAME: i32 = 0x01;
    pub const CHAT_MESSAGE: i32 = 0x02;
    pub const SPAWN_POSITION: i32 = 0x05;
    pub const PLAYER_POSITION_AND_LOOK: i32 = 0x08;
    pub const CHUNK_DATA: i32 = 0x21;
    pub const MULTI_BLOCK_CHANGE: i32 = 0x22;
    pub const BLOCK_CHANGE: i32 = 0x23;
    pub const BLOCK_ACTION: i32 = 0x24;
    pub const BLOCK_BREAK_ANIMATION: i32 = 0x25;
    pub const CHUNK_BULK: i32 = 0x26;
    pub const PLUGIN_MESSAGE: i32 = 0x3F;
    pub const DISCONNECT: i32 = 0x40;

    // Serverbound
    pub const SB_KEEP_ALIVE: i32 = 0x00;
    pub const SB_CHAT_MESSAGE: i32 = 0x01;
    pub const SB_PLAYER_POSITION_AND_LOOK: i32 = 0x06;
    pub const SB_PLUGIN_MESSAGE: i32 = 0x17;

    /// Every other clientbound id named in `examples/original_source/`'s
    /// `protocol_47.py` packet table that this client recognizes (so it can
    /// tell "known but not surfaced" apart from "truly unknown id") without
    /// needing a dedicated struct for each one.
    pub const KNOWN_UNSURFACED: &[i32] = &[
        0x03, // Time Update
        0x04, // Entity Equipment
        0x06, // Update Health
        0x07, // Respawn
        0x09, // Held Item Change
        0x0B, // Animation
        0x0C, // Spawn Player
        0x0D, // Collect Item
        0x0E, // Spawn Object
        0x0F, // Spawn Mob
        0x10, // Spawn Painting
        0x11, // Spawn Experience Orb
        0x12, // Entity Velocity
        0x13, // Destroy Entities
        0x14, // Entity
        0x15, // Entity Relative Move
        0x16, // Entity Look
        0x17, // Entity Look And Relative Move
        0x18, // Entity Teleport
        0x19, // Entity Head Look
        0x1A, // Entity Status
        0x1B, // Attach Entity
        0x1C, // Entity Metadata
        0x1D, // Entity Effect
        0x1E, // Remove Entity Effect
        0x1F, // Set Experience
        0x20, // Entity Properties
        0x27, // Explosion
        0x28, // Effect
        0x29, // Sound Effect
        0x2A, // Particle
        0x2B, // Change Game State
        0x2C, // Spawn Global Entity
        0x2D, // Open Window
        0x2E, // Close Window
        0x2F, // Set Slot
        0x30, // Window Items
        0x31, // Window Property
        0x32, // Confirm Transaction
        0x33, // Update Sign
        0x34, // Maps
        0x35, // Update Block Entity
        0x36, // Sign Editor Open
        0x37, // Statistics
        0x38, // Player List Item
        0x39, // Player Abilities
        0x3A, // Tab Complete
        0x3B, // Scoreboard Objective
        0x3C, // Update Score
        0x3D, // Display Scoreboard
        0x3E, // Teams
        0x41, // Server Difficulty
        0x42, // Combat Event
        0x43, // Camera
        0x44, // World Border
        0x45, // Title
        0x47, // Player List Header/Footer
        0x48, // Resource Pack Send
        0x49, // Update Entity NBT
    ];
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Handshake {
    pub protocol_version: mc_protocol::VarInt,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: mc_protocol::VarInt,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct LoginStart {
    pub name: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct LoginSuccess {
    pub uuid: String,
    pub username: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct LoginDisconnect {
    pub reason: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct JoinGame {
    pub entity_id: i32,
    pub gamemode: u8,
    pub dimension: i8,
    pub difficulty: u8,
    pub max_players: u8,
    pub level_type: String,
    pub reduced_debug_info: bool,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct ChatMessageClientbound {
    pub json_data: String,
    pub position: i8,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct SpawnPosition {
    pub location: mc_protocol::Position,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct PlayerPositionAndLookClientbound {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub flags: u8,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct PlayerPositionAndLookServerbound {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct PluginMessage {
    pub channel: String,
    #[allow(dead_code)]
    pub data: RemainingBytes,
}

/// Consumes whatever bytes remain in the current packet body — plugin
/// message payloads have no length prefix of their own, they just run to
/// the end of the packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemainingBytes(pub Vec<u8>);

impl Encode for RemainingBytes {
    fn encode<W: std::io::Write>(&self, writer: &mut W) -> mc_protocol::Result<()> {
        writer.write_all(&self.0)?;
        Ok(())
    }
}

impl Decode<'_> for RemainingBytes {
    fn decode<R: std::io::Read>(reader: &mut R) -> mc_protocol::Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(RemainingBytes(buf))
    }
}
