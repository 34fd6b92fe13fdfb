use std::io::Cursor;
use std::sync::Arc;

use mc_protocol::{chunk, Decode, Encode, Position, read_varint};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::event::{BulkChunkEntry, ChatEvent, MapEvent, MultiBlockChangeRecord};
use crate::framer::Frame;
use crate::packets::{
    self, ChatMessageClientbound, JoinGame, LoginDisconnect, PlayerPositionAndLookClientbound,
    PlayerPositionAndLookServerbound, PluginMessage, SpawnPosition,
};
use crate::session::{SessionContext, Writer};
use crate::state::ProtocolState;

pub async fn handle(ctx: &mut SessionContext, writer: &Arc<Writer>, frame: Frame) -> Result<()> {
    let mut cursor = Cursor::new(&frame.body[..]);
    match frame.packet_id {
        packets::play::KEEP_ALIVE => {
            // Clientbound and serverbound Keep-Alive share packet id 0x00 in
            // this protocol version, so the reply is the exact raw frame
            // bytes the server sent — no re-encoding needed.
            let id = read_varint(&mut cursor)?;
            debug!(id, "keep alive");
            writer.write_raw(&frame.raw).await?;
            Ok(())
        }
        packets::play::JOIN_GAME => {
            let join = JoinGame::decode(&mut cursor)?;
            info!(entity_id = join.entity_id, dimension = join.dimension, "join game");
            ctx.info.entity_id = Some(join.entity_id);
            Ok(())
        }
        packets::play::CHAT_MESSAGE => {
            let chat = ChatMessageClientbound::decode(&mut cursor)?;
            ctx.handlers.emit_chat(ChatEvent {
                json_data: chat.json_data,
                position: chat.position,
            });
            Ok(())
        }
        packets::play::SPAWN_POSITION => {
            let spawn = SpawnPosition::decode(&mut cursor)?;
            debug!(x = spawn.location.x, y = spawn.location.y, z = spawn.location.z, "spawn position");
            Ok(())
        }
        packets::play::PLAYER_POSITION_AND_LOOK => {
            let look = PlayerPositionAndLookClientbound::decode(&mut cursor)?;
            // This protocol version has no teleport-id handshake (that's
            // 1.9+): the client simply echoes the absolute position back
            // as confirmation.
            let ack = PlayerPositionAndLookServerbound {
                x: look.x,
                y: look.y,
                z: look.z,
                yaw: look.yaw,
                pitch: look.pitch,
                on_ground: true,
            };
            let mut data = Vec::new();
            ack.encode(&mut data)?;
            let threshold = ctx_threshold(ctx);
            writer
                .send_packet(packets::play::SB_PLAYER_POSITION_AND_LOOK, &data, threshold)
                .await?;
            Ok(())
        }
        packets::play::CHUNK_DATA => {
            let chunk_x = i32::decode(&mut cursor)?;
            let chunk_z = i32::decode(&mut cursor)?;
            let continuous = bool::decode(&mut cursor)?;
            let bit_mask = u16::decode(&mut cursor)?;
            let _size = read_varint(&mut cursor)?;
            // This protocol version's Chunk-Data has no trailing block-entity
            // array (that's added later) — the column consumes the whole body.
            let column = chunk::decode_chunk_column(&mut cursor, bit_mask, continuous, true)?;

            ctx.handlers.emit_map(MapEvent::ChunkData {
                chunk_x,
                chunk_z,
                column,
            });
            Ok(())
        }
        packets::play::MULTI_BLOCK_CHANGE => {
            let chunk_x = i32::decode(&mut cursor)?;
            let chunk_z = i32::decode(&mut cursor)?;
            let record_count = read_varint(&mut cursor)?;
            let mut records = Vec::with_capacity(record_count.max(0) as usize);
            for _ in 0..record_count.max(0) {
                let horizontal = u8::decode(&mut cursor)?;
                let x = (horizontal >> 4) & 0x0F;
                let z = horizontal & 0x0F;
                let y = u8::decode(&mut cursor)?;
                let block_state = read_varint(&mut cursor)?;
                records.push(MultiBlockChangeRecord { x, y, z, block_state });
            }
            ctx.handlers.emit_map(MapEvent::MultiBlockChange {
                chunk_x,
                chunk_z,
                records,
            });
            Ok(())
        }
        packets::play::BLOCK_CHANGE => {
            let location = Position::decode(&mut cursor)?;
            let block_state = read_varint(&mut cursor)?;
            ctx.handlers.emit_map(MapEvent::BlockChange { location, block_state });
            Ok(())
        }
        packets::play::BLOCK_ACTION => {
            let location = Position::decode(&mut cursor)?;
            let byte_1 = u8::decode(&mut cursor)?;
            let byte_2 = u8::decode(&mut cursor)?;
            let block_type = read_varint(&mut cursor)?;
            ctx.handlers.emit_map(MapEvent::BlockAction {
                location,
                byte_1,
                byte_2,
                block_type,
            });
            Ok(())
        }
        packets::play::BLOCK_BREAK_ANIMATION => {
            let entity_id = read_varint(&mut cursor)?;
            let location = Position::decode(&mut cursor)?;
            let destroy_stage = i8::decode(&mut cursor)?;
            ctx.handlers.emit_map(MapEvent::BlockBreakAnimation {
                entity_id,
                location,
                destroy_stage,
            });
            Ok(())
        }
        packets::play::CHUNK_BULK => {
            let sky_light_sent = bool::decode(&mut cursor)?;
            let column_count = read_varint(&mut cursor)?;
            let mut metas = Vec::with_capacity(column_count.max(0) as usize);
            for _ in 0..column_count.max(0) {
                let chunk_x = i32::decode(&mut cursor)?;
                let chunk_z = i32::decode(&mut cursor)?;
                let bit_mask = u16::decode(&mut cursor)?;
                metas.push((chunk_x, chunk_z, bit_mask));
            }
            let mut chunks = Vec::with_capacity(metas.len());
            for (chunk_x, chunk_z, bit_mask) in metas {
                let column = chunk::decode_chunk_column(&mut cursor, bit_mask, true, sky_light_sent)?;
                chunks.push(BulkChunkEntry {
                    chunk_x,
                    chunk_z,
                    column,
                });
            }
            ctx.handlers.emit_map(MapEvent::ChunkBulk { chunks });
            Ok(())
        }
        packets::play::PLUGIN_MESSAGE => {
            let message = PluginMessage::decode(&mut cursor)?;
            debug!(channel = %message.channel, "plugin message");
            if message.channel == "MC|Brand" {
                let brand = String::from_utf8_lossy(&message.data.0).to_string();
                ctx.info.host_brand = Some(brand);

                let mut out = Vec::new();
                "MC|Brand".to_string().encode(&mut out)?;
                "rust-client".encode(&mut out)?;
                let threshold = ctx_threshold(ctx);
                writer
                    .send_packet(packets::play::SB_PLUGIN_MESSAGE, &out, threshold)
                    .await?;
            }
            Ok(())
        }
        packets::play::DISCONNECT => {
            let disconnect = LoginDisconnect::decode(&mut cursor)?;
            Err(SessionError::Disconnected {
                reason: disconnect.reason,
            })
        }
        other if packets::play::KNOWN_UNSURFACED.contains(&other) => {
            debug!(id = other, "known, unsurfaced play packet");
            Ok(())
        }
        other => {
            warn!(id = other, "unknown play packet");
            Err(SessionError::UnknownPacket {
                id: other,
                state: ProtocolState::Play,
            })
        }
    }
}

fn ctx_threshold(ctx: &SessionContext) -> Option<i32> {
    ctx.info.compression_threshold
}
