//! Inventory slot encoding.
//!
//! A slot is either empty (`item_id == -1`) or present, in which case
//! `count`, `damage` and an optional NBT blob follow. The NBT blob is
//! guarded by a one-byte presence flag; when that byte is non-zero it is
//! *itself* the NBT tag-type byte, so decoding rewinds one byte before
//! handing off to [`NbtTag::decode_payload`] — mirroring the
//! `pointer - 1` re-anchor in the original Python `read_Slot`.

use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::nbt::NbtTag;
use crate::{Decode, Encode, ProtocolError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Empty,
    Present {
        item_id: i16,
        count: i8,
        damage: i16,
        nbt: Option<NbtTag>,
    },
}

const NBT_TAG_COMPOUND: u8 = 10;

impl Encode for Slot {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Slot::Empty => writer.write_i16::<BigEndian>(-1)?,
            Slot::Present {
                item_id,
                count,
                damage,
                nbt,
            } => {
                writer.write_i16::<BigEndian>(*item_id)?;
                writer.write_i8(*count)?;
                writer.write_i16::<BigEndian>(*damage)?;
                match nbt {
                    Some(tag) => tag.encode_named(writer, "")?,
                    None => writer.write_u8(0)?,
                }
            }
        }
        Ok(())
    }
}

impl Decode<'_> for Slot {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let item_id = reader.read_i16::<BigEndian>()?;
        if item_id == -1 {
            return Ok(Slot::Empty);
        }
        let count = reader.read_i8()?;
        let damage = reader.read_i16::<BigEndian>()?;
        let nbt_present = reader.read_u8()?;
        let nbt = if nbt_present == 0 {
            None
        } else {
            // `nbt_present` was the NBT tag-type byte; a compound is the
            // only legal root here.
            if nbt_present != NBT_TAG_COMPOUND {
                return Err(ProtocolError::MalformedSlot {
                    reason: format!("unexpected NBT root tag id {nbt_present}"),
                });
            }
            let (_, tag) = decode_named_with_known_tag_id(reader, nbt_present)?;
            Some(tag)
        };
        Ok(Slot::Present {
            item_id,
            count,
            damage,
            nbt,
        })
    }
}

/// Re-derives the `(name, NbtTag)` pair for a root whose type byte has
/// already been consumed, by reading the name then the payload directly
/// — equivalent to rewinding one byte and re-entering NBT parsing, without
/// requiring a seekable reader.
fn decode_named_with_known_tag_id<R: Read>(
    reader: &mut R,
    tag_id: u8,
) -> Result<(String, NbtTag)> {
    let mut name_len_buf = [0u8; 2];
    reader.read_exact(&mut name_len_buf)?;
    let name_len = u16::from_be_bytes(name_len_buf) as usize;
    let mut name_buf = vec![0u8; name_len];
    reader.read_exact(&mut name_buf)?;
    let name = String::from_utf8(name_buf).map_err(|e| ProtocolError::MalformedSlot {
        reason: format!("invalid NBT root name: {e}"),
    })?;
    let tag = NbtTag::decode_payload(reader, tag_id)?;
    Ok((name, tag))
}

/// Helper for callers that already have a length-prefixed frame in hand
/// and want to re-anchor a `Cursor` exactly one byte back before handing
/// off to generic NBT decoding — kept for parity with the source's
/// pointer-rewind approach when a seekable buffer is available.
pub fn rewind_and_decode_nbt(cursor: &mut Cursor<&[u8]>) -> Result<NbtTag> {
    let pos = cursor.position();
    cursor.set_position(pos.saturating_sub(1));
    let (_, tag) = NbtTag::decode_named(cursor)?;
    Ok(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_slot_roundtrip() {
        let mut buf = Vec::new();
        Slot::Empty.encode(&mut buf).unwrap();
        assert_eq!(buf, [0xFF, 0xFF]);
        let mut cursor = Cursor::new(&buf);
        assert_eq!(Slot::decode(&mut cursor).unwrap(), Slot::Empty);
    }

    #[test]
    fn present_slot_without_nbt_roundtrip() {
        let slot = Slot::Present {
            item_id: 1,
            count: 3,
            damage: 0,
            nbt: None,
        };
        let mut buf = Vec::new();
        slot.encode(&mut buf).unwrap();
        let mut cursor = Cursor::new(&buf);
        assert_eq!(Slot::decode(&mut cursor).unwrap(), slot);
    }

    #[test]
    fn present_slot_with_nbt_roundtrip() {
        let slot = Slot::Present {
            item_id: 278,
            count: 1,
            damage: 0,
            nbt: Some(NbtTag::Compound(vec![(
                "ench".to_string(),
                NbtTag::List(vec![]),
            )])),
        };
        let mut buf = Vec::new();
        slot.encode(&mut buf).unwrap();
        let mut cursor = Cursor::new(&buf);
        assert_eq!(Slot::decode(&mut cursor).unwrap(), slot);
    }
}
