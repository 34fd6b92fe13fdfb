//! Chunk column decoding (protocol 47 layout).
//!
//! A column is a vertical stack of up to 16 sections, selected by a
//! popcount-significant bit mask (one bit per section, low bit = y=0..15).
//! Each present section contributes 4096 little-endian `u16` block records,
//! 2048 bytes of packed block-light nibbles, and — for the overworld —
//! 2048 bytes of packed sky-light nibbles. An optional trailing 256-byte
//! biome array follows when the column is sent as part of a full chunk.
//! Mirrors `read_Chunk` in
//! `examples/original_source/protocol/protocol_47.py`.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::Result;

pub const SECTION_BLOCK_COUNT: usize = 4096;
pub const SECTION_HEIGHT: usize = 16;
pub const BIOME_COUNT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockRecord {
    pub block_id: u16,
    pub block_meta: u8,
}

impl BlockRecord {
    fn from_packed(packed: u16) -> Self {
        BlockRecord {
            block_id: packed >> 4,
            block_meta: (packed & 0xF) as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSection {
    /// `SECTION_BLOCK_COUNT` entries, y/z/x-major per the wire order.
    pub blocks: Vec<BlockRecord>,
    /// One expanded byte (0..=15) per block, not packed nibbles.
    pub block_light: Vec<u8>,
    /// Present only for overworld dimensions.
    pub sky_light: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkColumn {
    pub sections: Vec<ChunkSection>,
    pub biomes: Option<[u8; BIOME_COUNT]>,
}

fn expand_nibbles<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut packed = vec![0u8; SECTION_BLOCK_COUNT / 2];
    reader.read_exact(&mut packed)?;
    let mut out = Vec::with_capacity(SECTION_BLOCK_COUNT);
    for byte in packed {
        out.push(byte & 0x0F);
        out.push(byte >> 4);
    }
    Ok(out)
}

/// Decodes a chunk column given the section bit mask from the packet
/// header, whether this is a full/continuous chunk (controls whether a
/// biome array trails the sections), and whether sky light is present
/// (false for dimensions without a sky, eg. the Nether).
pub fn decode_chunk_column<R: Read>(
    reader: &mut R,
    bit_mask: u16,
    continuous: bool,
    sky_light: bool,
) -> Result<ChunkColumn> {
    let mut sections = Vec::with_capacity(bit_mask.count_ones() as usize);
    for y in 0..SECTION_HEIGHT {
        if bit_mask & (1 << y) == 0 {
            continue;
        }
        let mut blocks = Vec::with_capacity(SECTION_BLOCK_COUNT);
        for _ in 0..SECTION_BLOCK_COUNT {
            blocks.push(BlockRecord::from_packed(
                reader.read_u16::<LittleEndian>()?,
            ));
        }
        let block_light = expand_nibbles(reader)?;
        let section_sky_light = if sky_light {
            Some(expand_nibbles(reader)?)
        } else {
            None
        };
        sections.push(ChunkSection {
            blocks,
            block_light,
            sky_light: section_sky_light,
        });
    }

    let biomes = if continuous {
        let mut buf = [0u8; BIOME_COUNT];
        reader.read_exact(&mut buf)?;
        Some(buf)
    } else {
        None
    };

    Ok(ChunkColumn { sections, biomes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn single_section_bytes(sky_light: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        for i in 0..SECTION_BLOCK_COUNT {
            let packed = ((i as u16) << 4) | ((i as u16) & 0xF);
            buf.extend_from_slice(&packed.to_le_bytes());
        }
        buf.extend(std::iter::repeat(0xAB).take(SECTION_BLOCK_COUNT / 2));
        if sky_light {
            buf.extend(std::iter::repeat(0xCD).take(SECTION_BLOCK_COUNT / 2));
        }
        buf
    }

    #[test]
    fn decodes_single_section_with_sky_light_and_biomes() {
        let mut bytes = single_section_bytes(true);
        bytes.extend(std::iter::repeat(7u8).take(BIOME_COUNT));
        let mut cursor = Cursor::new(&bytes[..]);
        let column = decode_chunk_column(&mut cursor, 0b1, true, true).unwrap();
        assert_eq!(column.sections.len(), 1);
        let section = &column.sections[0];
        assert_eq!(section.blocks.len(), SECTION_BLOCK_COUNT);
        assert_eq!(section.block_light.len(), SECTION_BLOCK_COUNT);
        assert_eq!(section.sky_light.as_ref().unwrap().len(), SECTION_BLOCK_COUNT);
        assert_eq!(column.biomes.unwrap(), [7u8; BIOME_COUNT]);
    }

    #[test]
    fn no_sky_light_when_disabled() {
        let bytes = single_section_bytes(false);
        let mut cursor = Cursor::new(&bytes[..]);
        let column = decode_chunk_column(&mut cursor, 0b1, false, false).unwrap();
        assert!(column.sections[0].sky_light.is_none());
        assert!(column.biomes.is_none());
    }

    #[test]
    fn multiple_sections_from_bit_mask() {
        let mut bytes = Vec::new();
        for _ in 0..3 {
            bytes.extend(single_section_bytes(true));
        }
        let mut cursor = Cursor::new(&bytes[..]);
        // sections at y = 0, 2, 5
        let column = decode_chunk_column(&mut cursor, 0b10_0101, false, true).unwrap();
        assert_eq!(column.sections.len(), 3);
    }
}
