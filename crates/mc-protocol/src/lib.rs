//! Wire codec for Minecraft protocol version 47 (1.8.x).
//!
//! This crate owns the bit-exact encoders and decoders for every primitive
//! and composite type carried on the wire: scalars, VarInt/VarLong, strings,
//! UUIDs, packed block positions, NBT tag trees, inventory slots, chunk
//! column block arrays, and entity-metadata lists. It knows nothing about
//! sockets, framing, or packet ids — that's `mc-client`.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

#[cfg(feature = "derive")]
pub use mc_protocol_derive::{Decode, Encode};

pub mod chunk;
pub mod entity_metadata;
pub mod nbt;
pub mod position;
pub mod slot;

pub use chunk::{BlockRecord, ChunkColumn, ChunkSection};
pub use entity_metadata::{EntityMetadataEntry, EntityMetadataValue};
pub use nbt::NbtTag;
pub use position::Position;
pub use slot::Slot;

/// String payloads longer than this are rejected as malformed (protocol cap).
pub const MAX_STRING_LEN: usize = 32767;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("VarInt/VarLong is malformed (too many continuation bytes, or buffer ended mid-value)")]
    MalformedVarInt,
    #[error("string is malformed: {reason}")]
    MalformedString { reason: String },
    #[error("string too long: {len} > {max}")]
    StringTooLong { len: usize, max: usize },
    #[error("NBT is malformed at offset {offset}: {reason}")]
    MalformedNbt { offset: u64, reason: String },
    #[error("entity metadata is malformed: {reason}")]
    MalformedEntityMetadata { reason: String },
    #[error("slot is malformed: {reason}")]
    MalformedSlot { reason: String },
    #[error("invalid enum variant: {0}")]
    InvalidEnumVariant(i32),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

pub trait Encode {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()>;
}

pub trait Decode<'a>: Sized {
    fn decode<R: Read>(reader: &mut R) -> Result<Self>;
}

/// Reads a byte, translating EOF into `MalformedVarInt` so every caller
/// sees the same failure mode for "not enough bytes" mid-continuation
/// (see spec §4.A — a truncated VarInt inside an already-complete frame is
/// a decode error, never a framing "need more data" signal; the framer
/// only ever calls this once a whole frame's bytes are already buffered).
fn read_continuation_byte<R: Read>(reader: &mut R) -> Result<u8> {
    reader.read_u8().map_err(|_| ProtocolError::MalformedVarInt)
}

/// Decodes a VarInt: 7-bit little-endian groups, continuation bit 0x80,
/// reinterpreted as a two's-complement 32-bit integer.
pub fn read_varint<R: Read>(reader: &mut R) -> Result<i32> {
    let mut result: i32 = 0;
    let mut shift = 0u32;
    loop {
        let byte = read_continuation_byte(reader)?;
        result |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err(ProtocolError::MalformedVarInt);
        }
    }
}

pub fn write_varint<W: Write>(writer: &mut W, mut value: i32) -> Result<()> {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u32) >> 7) as i32;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte)?;
        if value == 0 {
            return Ok(());
        }
    }
}

/// Byte length of `value` encoded as a VarInt; used by the framer to
/// compute length prefixes before writing.
pub fn varint_len(value: i32) -> usize {
    let mut v = value as u32;
    let mut len = 0;
    loop {
        len += 1;
        v >>= 7;
        if v == 0 {
            return len;
        }
    }
}

pub fn read_varlong<R: Read>(reader: &mut R) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = read_continuation_byte(reader)?;
        result |= ((byte & 0x7F) as i64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 70 {
            return Err(ProtocolError::MalformedVarInt);
        }
    }
}

pub fn write_varlong<W: Write>(writer: &mut W, mut value: i64) -> Result<()> {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u64) >> 7) as i64;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte)?;
        if value == 0 {
            return Ok(());
        }
    }
}

// --- Primitive scalar impls ---

impl Encode for bool {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(u8::from(*self))?;
        Ok(())
    }
}

impl Decode<'_> for bool {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u8()? != 0)
    }
}

impl Encode for u8 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)?;
        Ok(())
    }
}

impl Decode<'_> for u8 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u8()?)
    }
}

impl Encode for i8 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i8(*self)?;
        Ok(())
    }
}

impl Decode<'_> for i8 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i8()?)
    }
}

impl Encode for i16 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i16::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for i16 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i16::<BigEndian>()?)
    }
}

impl Encode for u16 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for u16 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u16::<BigEndian>()?)
    }
}

impl Encode for i32 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for i32 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i32::<BigEndian>()?)
    }
}

impl Encode for i64 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i64::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for i64 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i64::<BigEndian>()?)
    }
}

impl Encode for f32 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f32::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for f32 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_f32::<BigEndian>()?)
    }
}

impl Encode for f64 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f64::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for f64 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_f64::<BigEndian>()?)
    }
}

/// VarInt wrapper, for packet fields declared as VarInt in the protocol
/// tables (as opposed to raw `i32`, which is a fixed-width Int field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarInt(pub i32);

impl Encode for VarInt {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varint(writer, self.0)
    }
}

impl Decode<'_> for VarInt {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(VarInt(read_varint(reader)?))
    }
}

impl From<i32> for VarInt {
    fn from(v: i32) -> Self {
        VarInt(v)
    }
}

impl From<VarInt> for i32 {
    fn from(v: VarInt) -> Self {
        v.0
    }
}

/// VarLong wrapper, analogous to `VarInt` but for 64-bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarLong(pub i64);

impl Encode for VarLong {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varlong(writer, self.0)
    }
}

impl Decode<'_> for VarLong {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(VarLong(read_varlong(reader)?))
    }
}

// String / Chat / Identifier all share the VarInt-length + UTF-8 shape.
impl Encode for str {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(ProtocolError::StringTooLong {
                len: bytes.len(),
                max: MAX_STRING_LEN,
            });
        }
        write_varint(writer, bytes.len() as i32)?;
        writer.write_all(bytes)?;
        Ok(())
    }
}

impl Encode for String {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.as_str().encode(writer)
    }
}

impl Decode<'_> for String {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_varint(reader)?;
        if len < 0 || len as usize > MAX_STRING_LEN {
            return Err(ProtocolError::StringTooLong {
                len: len.max(0) as usize,
                max: MAX_STRING_LEN,
            });
        }
        let mut buf = vec![0u8; len as usize];
        reader.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| ProtocolError::MalformedString {
            reason: e.to_string(),
        })
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Some(v) => {
                true.encode(writer)?;
                v.encode(writer)
            }
            None => false.encode(writer),
        }
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Option<T> {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        if bool::decode(reader)? {
            Ok(Some(T::decode(reader)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varint(writer, self.len() as i32)?;
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Vec<T> {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_varint(reader)?;
        if len < 0 {
            return Err(ProtocolError::InvalidEnumVariant(len));
        }
        let len = len as usize;
        let mut vec = Vec::with_capacity(len.min(1 << 16));
        for _ in 0..len {
            vec.push(T::decode(reader)?);
        }
        Ok(vec)
    }
}

/// Player/entity UUID. Protocol 47 never asks the client to *emit* a real
/// UUID (Login Start only sends the nickname) — the encoder exists for
/// symmetry and tests, serializing as two big-endian 64-bit halves per
/// spec.md §9 rather than attempting the source's unimplemented UUID writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Uuid(pub u128);

impl Encode for Uuid {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<BigEndian>((self.0 >> 64) as u64)?;
        writer.write_u64::<BigEndian>(self.0 as u64)?;
        Ok(())
    }
}

impl Decode<'_> for Uuid {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let high = reader.read_u64::<BigEndian>()? as u128;
        let low = reader.read_u64::<BigEndian>()? as u128;
        Ok(Uuid((high << 64) | low))
    }
}

/// Rotation angle, 1/256ths of a full turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Angle(pub u8);

impl Encode for Angle {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.0)?;
        Ok(())
    }
}

impl Decode<'_> for Angle {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Angle(reader.read_u8()?))
    }
}

/// A VarInt-encoded block state id, used wherever the protocol tables list
/// a bare "VarInt" field that semantically identifies a block/item state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockState(pub i32);

impl Encode for BlockState {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varint(writer, self.0)
    }
}

impl Decode<'_> for BlockState {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(BlockState(read_varint(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip<T>(value: T, expected_bytes: &[u8])
    where
        T: Encode + for<'a> Decode<'a> + PartialEq + std::fmt::Debug + Copy,
    {
        let mut buf = Vec::new();
        value.encode(&mut buf).unwrap();
        assert_eq!(buf, expected_bytes);
        let mut cursor = Cursor::new(&buf);
        let decoded = T::decode(&mut cursor).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(cursor.position() as usize, buf.len());
    }

    #[test]
    fn varint_literal_cases() {
        for (value, bytes) in [
            (0i32, &[0x00][..]),
            (127, &[0x7F][..]),
            (128, &[0x80, 0x01][..]),
            (-1, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F][..]),
        ] {
            roundtrip(VarInt(value), bytes);
        }
    }

    #[test]
    fn varint_roundtrip_all_lengths() {
        for n in [0i32, 1, -1, i32::MAX, i32::MIN, 300, -300, 1 << 20] {
            let mut buf = Vec::new();
            write_varint(&mut buf, n).unwrap();
            assert_eq!(buf.len(), varint_len(n));
            assert!((1..=5).contains(&buf.len()));
            let mut cursor = Cursor::new(&buf);
            assert_eq!(read_varint(&mut cursor).unwrap(), n);
        }
    }

    #[test]
    fn varlong_roundtrip() {
        for n in [0i64, 1, -1, i64::MAX, i64::MIN, 1 << 40] {
            let mut buf = Vec::new();
            write_varlong(&mut buf, n).unwrap();
            assert!((1..=10).contains(&buf.len()));
            let mut cursor = Cursor::new(&buf);
            assert_eq!(read_varlong(&mut cursor).unwrap(), n);
        }
    }

    #[test]
    fn varint_too_long_is_malformed() {
        let bytes = [0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(
            read_varint(&mut cursor),
            Err(ProtocolError::MalformedVarInt)
        ));
    }

    #[test]
    fn varint_truncated_buffer_is_malformed() {
        let bytes = [0x80u8];
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(
            read_varint(&mut cursor),
            Err(ProtocolError::MalformedVarInt)
        ));
    }

    #[test]
    fn string_literal_case() {
        let s = "Herobrine".to_string();
        let mut buf = Vec::new();
        s.encode(&mut buf).unwrap();
        assert_eq!(
            buf,
            [0x09, 0x48, 0x65, 0x72, 0x6F, 0x62, 0x72, 0x69, 0x6E, 0x65]
        );
        let mut cursor = Cursor::new(&buf);
        assert_eq!(String::decode(&mut cursor).unwrap(), s);
    }

    #[test]
    fn string_invalid_utf8_is_malformed() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 2).unwrap();
        buf.extend_from_slice(&[0xFF, 0xFE]);
        let mut cursor = Cursor::new(&buf);
        assert!(matches!(
            String::decode(&mut cursor),
            Err(ProtocolError::MalformedString { .. })
        ));
    }

    #[test]
    fn option_roundtrip() {
        let mut buf = Vec::new();
        Some(42i32).encode(&mut buf).unwrap();
        let mut cursor = Cursor::new(&buf);
        assert_eq!(Option::<i32>::decode(&mut cursor).unwrap(), Some(42));

        let mut buf = Vec::new();
        None::<i32>.encode(&mut buf).unwrap();
        let mut cursor = Cursor::new(&buf);
        assert_eq!(Option::<i32>::decode(&mut cursor).unwrap(), None);
    }
}
