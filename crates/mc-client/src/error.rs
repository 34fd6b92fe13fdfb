use mc_protocol::ProtocolError;

use crate::state::ProtocolState;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),
    #[error("packet id 0x{id:02X} is not supported in state {state:?}")]
    UnsupportedPacket { id: i32, state: ProtocolState },
    /// Never propagated — the dispatcher logs this and moves on. Kept as a
    /// typed value so that path has the same shape as every other error.
    #[error("unknown packet id 0x{id:02X} in state {state:?}")]
    UnknownPacket { id: i32, state: ProtocolState },
    #[error("connection closed")]
    ConnectionClosed,
    #[error("disconnected by server: {reason}")]
    Disconnected { reason: String },
}

pub type Result<T> = std::result::Result<T, SessionError>;
