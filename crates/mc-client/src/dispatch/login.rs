use std::io::Cursor;
use std::sync::Arc;

use mc_protocol::{Decode, read_varint};
use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::event::StateEvent;
use crate::framer::Frame;
use crate::packets::{self, LoginDisconnect, LoginSuccess};
use crate::session::{SessionContext, Writer};
use crate::state::ProtocolState;

pub async fn handle(
    ctx: &mut SessionContext,
    _writer: &Arc<Writer>,
    threshold: &Arc<std::sync::Mutex<Option<i32>>>,
    frame: Frame,
) -> Result<()> {
    let mut cursor = Cursor::new(&frame.body[..]);
    match frame.packet_id {
        packets::login::DISCONNECT => {
            let disconnect = LoginDisconnect::decode(&mut cursor)?;
            Err(SessionError::Disconnected {
                reason: disconnect.reason,
            })
        }
        packets::login::ENCRYPTION_REQUEST => Err(SessionError::UnsupportedPacket {
            id: frame.packet_id,
            state: ProtocolState::Login,
        }),
        packets::login::LOGIN_SUCCESS => {
            let success = LoginSuccess::decode(&mut cursor)?;
            info!(uuid = %success.uuid, username = %success.username, "login success");
            ctx.info.player_uuid = success.uuid;
            ctx.info.player_name = success.username;
            let from = ctx.state;
            ctx.state = ProtocolState::Play;
            ctx.handlers.emit_state(StateEvent { from, to: ctx.state });
            Ok(())
        }
        packets::login::SET_COMPRESSION => {
            let new_threshold = read_varint(&mut cursor)?;
            debug!(threshold = new_threshold, "set compression");
            *threshold.lock().unwrap() = Some(new_threshold);
            ctx.info.compression_threshold = Some(new_threshold);
            Ok(())
        }
        other => Err(SessionError::UnknownPacket {
            id: other,
            state: ProtocolState::Login,
        }),
    }
}
