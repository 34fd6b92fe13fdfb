//! NBT (Named Binary Tag) serialization for Minecraft protocol.
//!
//! `NbtTag` is the single recursive representation used for both directions:
//! decoding follows `examples/original_source/protocol/protocol_types.py`'s
//! `parse_NBT_stream` (named root tag, anonymous list/compound children).
//! `NbtCompound`/`nbt!` remain as an ergonomic encode-side builder that
//! lowers into `NbtTag::Compound` — most callers constructing outbound NBT
//! (eg. Login plugin responses) never need to think about tag ids directly.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{ProtocolError, Result};

/// NBT tag type IDs
mod tag_type {
    pub const END: u8 = 0;
    pub const BYTE: u8 = 1;
    pub const SHORT: u8 = 2;
    pub const INT: u8 = 3;
    pub const LONG: u8 = 4;
    pub const FLOAT: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const BYTE_ARRAY: u8 = 7;
    pub const STRING: u8 = 8;
    pub const LIST: u8 = 9;
    pub const COMPOUND: u8 = 10;
    pub const INT_ARRAY: u8 = 11;
    pub const LONG_ARRAY: u8 = 12;
}

/// A fully decoded (or to-be-encoded) NBT tag payload, without the leading
/// type byte or name that only make sense in the context of a parent.
#[derive(Debug, Clone, PartialEq)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<NbtTag>),
    Compound(Vec<(String, NbtTag)>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtTag {
    fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => tag_type::BYTE,
            Self::Short(_) => tag_type::SHORT,
            Self::Int(_) => tag_type::INT,
            Self::Long(_) => tag_type::LONG,
            Self::Float(_) => tag_type::FLOAT,
            Self::Double(_) => tag_type::DOUBLE,
            Self::ByteArray(_) => tag_type::BYTE_ARRAY,
            Self::String(_) => tag_type::STRING,
            Self::List(_) => tag_type::LIST,
            Self::Compound(_) => tag_type::COMPOUND,
            Self::IntArray(_) => tag_type::INT_ARRAY,
            Self::LongArray(_) => tag_type::LONG_ARRAY,
        }
    }

    /// Encodes `self` as a full named tag: type byte, name, payload.
    pub fn encode_named<W: Write>(&self, writer: &mut W, name: &str) -> Result<()> {
        writer.write_u8(self.type_id())?;
        write_nbt_string(writer, name)?;
        self.encode_payload(writer)
    }

    /// Encodes just the payload — used for list elements and compound
    /// children, which carry no type byte / name of their own.
    pub fn encode_payload<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::Byte(v) => writer.write_i8(*v)?,
            Self::Short(v) => writer.write_i16::<BigEndian>(*v)?,
            Self::Int(v) => writer.write_i32::<BigEndian>(*v)?,
            Self::Long(v) => writer.write_i64::<BigEndian>(*v)?,
            Self::Float(v) => writer.write_f32::<BigEndian>(*v)?,
            Self::Double(v) => writer.write_f64::<BigEndian>(*v)?,
            Self::ByteArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for b in v {
                    writer.write_i8(*b)?;
                }
            }
            Self::String(v) => write_nbt_string(writer, v)?,
            Self::List(items) => {
                let elem_type = items.first().map_or(tag_type::END, NbtTag::type_id);
                writer.write_u8(elem_type)?;
                writer.write_i32::<BigEndian>(items.len() as i32)?;
                for item in items {
                    item.encode_payload(writer)?;
                }
            }
            Self::Compound(entries) => {
                for (name, value) in entries {
                    value.encode_named(writer, name)?;
                }
                writer.write_u8(tag_type::END)?;
            }
            Self::IntArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for i in v {
                    writer.write_i32::<BigEndian>(*i)?;
                }
            }
            Self::LongArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for l in v {
                    writer.write_i64::<BigEndian>(*l)?;
                }
            }
        }
        Ok(())
    }

    /// Decodes a full named tag (type byte, name, payload) — the shape of
    /// an NBT root or a compound's child entry.
    pub fn decode_named<R: Read>(reader: &mut R) -> Result<(String, NbtTag)> {
        let mut counting = CountingReader::new(reader);
        let tag_id = read_u8(&mut counting)?;
        if tag_id == tag_type::END {
            return Err(ProtocolError::MalformedNbt {
                offset: counting.offset,
                reason: "root tag may not be TAG_End".to_string(),
            });
        }
        decode_named_with_tag_id(&mut counting, tag_id)
    }

    /// Decodes just the payload for an already-known `tag_id`, used by
    /// `Slot` after its one-byte rewind onto the re-anchored type byte.
    pub fn decode_payload<R: Read>(reader: &mut R, tag_id: u8) -> Result<NbtTag> {
        let mut counting = CountingReader::new(reader);
        decode_payload_inner(&mut counting, tag_id)
    }
}

fn decode_named_with_tag_id<R: Read>(
    reader: &mut CountingReader<R>,
    tag_id: u8,
) -> Result<(String, NbtTag)> {
    let name = read_nbt_string(reader)?;
    let value = decode_payload_inner(reader, tag_id)?;
    Ok((name, value))
}

fn decode_payload_inner<R: Read>(reader: &mut CountingReader<R>, tag_id: u8) -> Result<NbtTag> {
    match tag_id {
        tag_type::BYTE => Ok(NbtTag::Byte(read_i8(reader)?)),
        tag_type::SHORT => Ok(NbtTag::Short(reader.read_i16::<BigEndian>().map_err(io_err(reader))?)),
        tag_type::INT => Ok(NbtTag::Int(reader.read_i32::<BigEndian>().map_err(io_err(reader))?)),
        tag_type::LONG => Ok(NbtTag::Long(reader.read_i64::<BigEndian>().map_err(io_err(reader))?)),
        tag_type::FLOAT => Ok(NbtTag::Float(reader.read_f32::<BigEndian>().map_err(io_err(reader))?)),
        tag_type::DOUBLE => Ok(NbtTag::Double(reader.read_f64::<BigEndian>().map_err(io_err(reader))?)),
        tag_type::BYTE_ARRAY => {
            let len = read_array_len(reader)?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(read_i8(reader)?);
            }
            Ok(NbtTag::ByteArray(out))
        }
        tag_type::STRING => Ok(NbtTag::String(read_nbt_string(reader)?)),
        tag_type::LIST => {
            let elem_type = read_u8(reader)?;
            let len = read_array_len(reader)?;
            let mut out = Vec::with_capacity(len);
            if elem_type != tag_type::END {
                for _ in 0..len {
                    out.push(decode_payload_inner(reader, elem_type)?);
                }
            }
            Ok(NbtTag::List(out))
        }
        tag_type::COMPOUND => {
            let mut entries = Vec::new();
            loop {
                let child_type = read_u8(reader)?;
                if child_type == tag_type::END {
                    break;
                }
                let (name, value) = decode_named_with_tag_id(reader, child_type)?;
                entries.push((name, value));
            }
            Ok(NbtTag::Compound(entries))
        }
        tag_type::INT_ARRAY => {
            let len = read_array_len(reader)?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(reader.read_i32::<BigEndian>().map_err(io_err(reader))?);
            }
            Ok(NbtTag::IntArray(out))
        }
        tag_type::LONG_ARRAY => {
            let len = read_array_len(reader)?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(reader.read_i64::<BigEndian>().map_err(io_err(reader))?);
            }
            Ok(NbtTag::LongArray(out))
        }
        other => Err(ProtocolError::MalformedNbt {
            offset: reader.offset,
            reason: format!("unknown tag type id {other}"),
        }),
    }
}

fn read_array_len<R: Read>(reader: &mut CountingReader<R>) -> Result<usize> {
    let len = reader.read_i32::<BigEndian>().map_err(io_err(reader))?;
    if len < 0 {
        return Err(ProtocolError::MalformedNbt {
            offset: reader.offset,
            reason: format!("negative array length {len}"),
        });
    }
    Ok(len as usize)
}

fn read_u8<R: Read>(reader: &mut CountingReader<R>) -> Result<u8> {
    reader.read_u8().map_err(io_err(reader))
}

fn read_i8<R: Read>(reader: &mut CountingReader<R>) -> Result<i8> {
    reader.read_i8().map_err(io_err(reader))
}

fn read_nbt_string<R: Read>(reader: &mut CountingReader<R>) -> Result<String> {
    let len = reader.read_u16::<BigEndian>().map_err(io_err(reader))? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(io_err(reader))?;
    String::from_utf8(buf).map_err(|e| ProtocolError::MalformedNbt {
        offset: reader.offset,
        reason: e.to_string(),
    })
}

fn write_nbt_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    writer.write_u16::<BigEndian>(bytes.len() as u16)?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Wraps a reader to track how many bytes have been consumed, so a parse
/// failure can be reported with the offset it occurred at.
struct CountingReader<'r, R> {
    inner: &'r mut R,
    offset: u64,
}

impl<'r, R: Read> CountingReader<'r, R> {
    fn new(inner: &'r mut R) -> Self {
        Self { inner, offset: 0 }
    }
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

fn io_err<R: Read>(reader: &CountingReader<R>) -> impl FnOnce(std::io::Error) -> ProtocolError + '_ {
    move |e| ProtocolError::MalformedNbt {
        offset: reader.offset,
        reason: e.to_string(),
    }
}

/// An ergonomic builder for outbound compound tags; lowers into
/// `NbtTag::Compound` via [`NbtCompound::into_tag`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtCompound {
    entries: Vec<(String, NbtTag)>,
}

impl NbtCompound {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<NbtTag>) {
        self.entries.push((key.into(), value.into()));
    }

    #[must_use]
    pub fn from_entries(entries: Vec<(String, NbtTag)>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn into_tag(self) -> NbtTag {
        NbtTag::Compound(self.entries)
    }

    /// Serializes to network NBT format (type byte + empty name + content).
    #[must_use]
    pub fn to_network_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        NbtTag::Compound(self.entries.clone())
            .encode_named(&mut buf, "")
            .expect("encoding into a Vec<u8> is infallible");
        buf
    }
}

impl From<bool> for NbtTag {
    fn from(v: bool) -> Self {
        Self::Byte(i8::from(v))
    }
}

impl From<i8> for NbtTag {
    fn from(v: i8) -> Self {
        Self::Byte(v)
    }
}

impl From<i16> for NbtTag {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<i32> for NbtTag {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for NbtTag {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for NbtTag {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for NbtTag {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for NbtTag {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for NbtTag {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NbtCompound> for NbtTag {
    fn from(v: NbtCompound) -> Self {
        v.into_tag()
    }
}

/// Builds an [`NbtCompound`] ergonomically.
///
/// # Example
/// ```
/// use mc_protocol::nbt;
///
/// let compound = nbt! {
///     "byte" => 1i8,
///     "int" => 42i32,
///     "string" => "hello",
///     "nested" => nbt! {
///         "inner" => true,
///     },
/// };
/// ```
#[macro_export]
macro_rules! nbt {
    () => {
        $crate::nbt::NbtCompound::new()
    };

    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut compound = $crate::nbt::NbtCompound::new();
        $(
            compound.insert($key, $value);
        )*
        compound
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn simple_compound_roundtrip() {
        let compound = nbt! {
            "byte" => 1i8,
            "int" => 42i32,
            "string" => "hello",
        };
        let bytes = compound.to_network_bytes();
        assert_eq!(bytes[0], tag_type::COMPOUND);

        let mut cursor = Cursor::new(&bytes);
        let (name, tag) = NbtTag::decode_named(&mut cursor).unwrap();
        assert_eq!(name, "");
        match tag {
            NbtTag::Compound(entries) => {
                assert_eq!(entries.len(), 3);
                assert_eq!(entries[0], ("byte".to_string(), NbtTag::Byte(1)));
                assert_eq!(entries[1], ("int".to_string(), NbtTag::Int(42)));
                assert_eq!(
                    entries[2],
                    ("string".to_string(), NbtTag::String("hello".to_string()))
                );
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn nested_compound_roundtrip() {
        let compound = nbt! {
            "outer" => nbt! {
                "inner" => 123i32,
            },
        };
        let bytes = compound.to_network_bytes();
        let mut cursor = Cursor::new(&bytes);
        let (_, tag) = NbtTag::decode_named(&mut cursor).unwrap();
        match tag {
            NbtTag::Compound(entries) => {
                assert_eq!(entries.len(), 1);
                match &entries[0].1 {
                    NbtTag::Compound(inner) => {
                        assert_eq!(inner[0], ("inner".to_string(), NbtTag::Int(123)));
                    }
                    other => panic!("expected nested compound, got {other:?}"),
                }
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn bool_as_byte() {
        let compound = nbt! { "flag" => true };
        let bytes = compound.to_network_bytes();
        let mut cursor = Cursor::new(&bytes);
        let (_, tag) = NbtTag::decode_named(&mut cursor).unwrap();
        assert_eq!(
            tag,
            NbtTag::Compound(vec![("flag".to_string(), NbtTag::Byte(1))])
        );
    }

    #[test]
    fn list_and_array_roundtrip() {
        let tag = NbtTag::Compound(vec![
            (
                "list".to_string(),
                NbtTag::List(vec![NbtTag::Int(1), NbtTag::Int(2), NbtTag::Int(3)]),
            ),
            ("ints".to_string(), NbtTag::IntArray(vec![1, -2, 3])),
            ("empty_list".to_string(), NbtTag::List(vec![])),
        ]);
        let mut buf = Vec::new();
        tag.encode_named(&mut buf, "root").unwrap();
        let mut cursor = Cursor::new(&buf);
        let (name, decoded) = NbtTag::decode_named(&mut cursor).unwrap();
        assert_eq!(name, "root");
        assert_eq!(decoded, tag);
    }

    #[test]
    fn truncated_stream_is_malformed_with_offset() {
        let bytes = [tag_type::COMPOUND, 0x00, 0x00, tag_type::INT, 0x00];
        let mut cursor = Cursor::new(&bytes[..]);
        let err = NbtTag::decode_named(&mut cursor).unwrap_err();
        match err {
            ProtocolError::MalformedNbt { offset, .. } => assert!(offset >= 3),
            other => panic!("expected MalformedNbt, got {other:?}"),
        }
    }

    #[test]
    fn root_end_tag_is_malformed() {
        let bytes = [tag_type::END];
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(
            NbtTag::decode_named(&mut cursor),
            Err(ProtocolError::MalformedNbt { .. })
        ));
    }
}
