//! Entity metadata list encoding (protocol 47 scheme).
//!
//! Each entry is a single index byte: the low 5 bits are the metadata key,
//! the next 3 bits select the value's wire type. The list terminates with
//! the sentinel byte `0x7F`. This is the pre-1.9 scheme in
//! `examples/original_source/protocol/protocol_types.py::parse_entity_metadata`
//! — the newer varint-keyed/type-id scheme (left commented out in that same
//! source) is out of scope for protocol 47.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::slot::Slot;
use crate::{Decode, Encode, ProtocolError, Result};

const TERMINATOR: u8 = 0x7F;

#[derive(Debug, Clone, PartialEq)]
pub enum EntityMetadataValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Float(f32),
    String(String),
    Slot(Slot),
    Position { x: i32, y: i32, z: i32 },
    Rotation { pitch: f32, yaw: f32, roll: f32 },
}

impl EntityMetadataValue {
    fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => 0,
            Self::Short(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::String(_) => 4,
            Self::Slot(_) => 5,
            Self::Position { .. } => 6,
            Self::Rotation { .. } => 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetadataEntry {
    pub key: u8,
    pub value: EntityMetadataValue,
}

impl Encode for EntityMetadataEntry {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let index = ((self.value.type_id() & 0x7) << 5) | (self.key & 0x1F);
        writer.write_u8(index)?;
        match &self.value {
            EntityMetadataValue::Byte(v) => writer.write_i8(*v)?,
            EntityMetadataValue::Short(v) => writer.write_i16::<BigEndian>(*v)?,
            EntityMetadataValue::Int(v) => writer.write_i32::<BigEndian>(*v)?,
            EntityMetadataValue::Float(v) => writer.write_f32::<BigEndian>(*v)?,
            EntityMetadataValue::String(v) => v.as_str().encode(writer)?,
            EntityMetadataValue::Slot(v) => v.encode(writer)?,
            EntityMetadataValue::Position { x, y, z } => {
                writer.write_i32::<BigEndian>(*x)?;
                writer.write_i32::<BigEndian>(*y)?;
                writer.write_i32::<BigEndian>(*z)?;
            }
            EntityMetadataValue::Rotation { pitch, yaw, roll } => {
                writer.write_f32::<BigEndian>(*pitch)?;
                writer.write_f32::<BigEndian>(*yaw)?;
                writer.write_f32::<BigEndian>(*roll)?;
            }
        }
        Ok(())
    }
}

/// Decodes an entire metadata list up to and including the `0x7F` terminator.
pub fn decode_list<R: Read>(reader: &mut R) -> Result<Vec<EntityMetadataEntry>> {
    let mut entries = Vec::new();
    loop {
        let index = reader.read_u8()?;
        if index == TERMINATOR {
            return Ok(entries);
        }
        let value_type = (index >> 5) & 0x7;
        let key = index & 0x1F;
        let value = match value_type {
            0 => EntityMetadataValue::Byte(reader.read_i8()?),
            1 => EntityMetadataValue::Short(reader.read_i16::<BigEndian>()?),
            2 => EntityMetadataValue::Int(reader.read_i32::<BigEndian>()?),
            3 => EntityMetadataValue::Float(reader.read_f32::<BigEndian>()?),
            4 => EntityMetadataValue::String(String::decode(reader)?),
            5 => EntityMetadataValue::Slot(Slot::decode(reader)?),
            6 => EntityMetadataValue::Position {
                x: reader.read_i32::<BigEndian>()?,
                y: reader.read_i32::<BigEndian>()?,
                z: reader.read_i32::<BigEndian>()?,
            },
            7 => EntityMetadataValue::Rotation {
                pitch: reader.read_f32::<BigEndian>()?,
                yaw: reader.read_f32::<BigEndian>()?,
                roll: reader.read_f32::<BigEndian>()?,
            },
            other => {
                return Err(ProtocolError::MalformedEntityMetadata {
                    reason: format!("unknown value type {other}"),
                })
            }
        };
        entries.push(EntityMetadataEntry { key, value });
    }
}

pub fn encode_list<W: Write>(writer: &mut W, entries: &[EntityMetadataEntry]) -> Result<()> {
    for entry in entries {
        entry.encode(writer)?;
    }
    writer.write_u8(TERMINATOR)?;
    Ok(())
}
