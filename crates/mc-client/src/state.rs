//! Connection state machine.
//!
//! Protocol 47 has no separate "configuration" phase (that's 1.20.2+): a
//! client goes Handshaking -> Login -> Play, or drops to Disconnected from
//! either Login or Play when the server sends a Disconnect packet.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    Handshaking,
    Login,
    Play,
    Disconnected,
}

/// Session-scoped facts gathered over the handshake/login exchange.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    pub player_name: String,
    /// Dashed UUID string as sent by Login Success (protocol 47 sends this
    /// as a string, not a binary UUID).
    pub player_uuid: String,
    pub compression_threshold: Option<i32>,
    pub entity_id: Option<i32>,
    pub host_brand: Option<String>,
}
