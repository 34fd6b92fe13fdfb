//! Client-side implementation of Minecraft protocol version 47 (1.8.x):
//! framing, the Handshaking/Login/Play state machine, a tokio-driven
//! session engine, and an event surface for chat, state transitions and
//! chunk data.

mod dispatch;
pub mod error;
pub mod event;
pub mod framer;
pub mod packets;
pub mod session;
pub mod state;

pub use error::SessionError;
pub use event::{ChatEvent, Handlers, MapEvent, StateEvent};
pub use session::{Session, SessionHandle, PROTOCOL_VERSION};
pub use state::{ProtocolState, SessionInfo};
