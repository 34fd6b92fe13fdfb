//! Event surface: handler slots the process pump invokes synchronously as
//! it decodes packets worth surfacing to a caller.

use std::sync::{Arc, Mutex};

use mc_protocol::{ChunkColumn, Position};

use crate::state::ProtocolState;

#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub json_data: String,
    pub position: i8,
}

#[derive(Debug, Clone, Copy)]
pub struct StateEvent {
    pub from: ProtocolState,
    pub to: ProtocolState,
}

/// One record from a Multi-Block-Change packet: the block's position within
/// its chunk (x/z are 0..=15, relative to the chunk; y is absolute) and its
/// new block state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiBlockChangeRecord {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    pub block_state: i32,
}

/// One column from a Chunk-Bulk packet.
#[derive(Debug, Clone)]
pub struct BulkChunkEntry {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub column: ChunkColumn,
}

/// World/map updates surfaced through `on_map`, tagged by which of the six
/// packet kinds produced them rather than a generic `{kind, payload}` pair.
#[derive(Debug, Clone)]
pub enum MapEvent {
    ChunkData {
        chunk_x: i32,
        chunk_z: i32,
        column: ChunkColumn,
    },
    ChunkBulk {
        chunks: Vec<BulkChunkEntry>,
    },
    MultiBlockChange {
        chunk_x: i32,
        chunk_z: i32,
        records: Vec<MultiBlockChangeRecord>,
    },
    BlockChange {
        location: Position,
        block_state: i32,
    },
    BlockAction {
        location: Position,
        byte_1: u8,
        byte_2: u8,
        block_type: i32,
    },
    BlockBreakAnimation {
        entity_id: i32,
        location: Position,
        destroy_stage: i8,
    },
}

type HandlerSlot<T> = Arc<Mutex<Option<Box<dyn Fn(T) + Send>>>>;

/// Holds the three handler slots a [`crate::session::Session`] can invoke.
/// Cloning a `Handlers` shares the same underlying slots, so a handle set
/// up before `login_as` is called is visible to the process pump task.
#[derive(Clone)]
pub struct Handlers {
    pub(crate) on_chat: HandlerSlot<ChatEvent>,
    pub(crate) on_state: HandlerSlot<StateEvent>,
    pub(crate) on_map: HandlerSlot<MapEvent>,
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            on_chat: Arc::new(Mutex::new(None)),
            on_state: Arc::new(Mutex::new(None)),
            on_map: Arc::new(Mutex::new(None)),
        }
    }
}

impl Handlers {
    pub fn set_on_chat(&self, f: impl Fn(ChatEvent) + Send + 'static) {
        *self.on_chat.lock().unwrap() = Some(Box::new(f));
    }

    pub fn set_on_state(&self, f: impl Fn(StateEvent) + Send + 'static) {
        *self.on_state.lock().unwrap() = Some(Box::new(f));
    }

    pub fn set_on_map(&self, f: impl Fn(MapEvent) + Send + 'static) {
        *self.on_map.lock().unwrap() = Some(Box::new(f));
    }

    pub(crate) fn emit_chat(&self, event: ChatEvent) {
        if let Some(f) = self.on_chat.lock().unwrap().as_ref() {
            f(event);
        }
    }

    pub(crate) fn emit_state(&self, event: StateEvent) {
        if let Some(f) = self.on_state.lock().unwrap().as_ref() {
            f(event);
        }
    }

    pub(crate) fn emit_map(&self, event: MapEvent) {
        if let Some(f) = self.on_map.lock().unwrap().as_ref() {
            f(event);
        }
    }
}
