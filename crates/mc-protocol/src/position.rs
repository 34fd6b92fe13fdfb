//! Packed block position, protocol 47 layout.
//!
//! Unlike the newer `x(26) z(26) y(12)` packing, protocol 47 packs
//! `x(26) y(12) z(26)` high-to-low into a single `i64`.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{Decode, Encode, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i16,
    pub z: i32,
}

fn sign_extend(value: i64, bits: u32) -> i64 {
    let shift = 64 - bits;
    (value << shift) >> shift
}

impl Encode for Position {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let x = (self.x as i64) & 0x3FF_FFFF;
        let y = (self.y as i64) & 0xFFF;
        let z = (self.z as i64) & 0x3FF_FFFF;
        let packed = (x << 38) | (y << 26) | z;
        writer.write_i64::<BigEndian>(packed)?;
        Ok(())
    }
}

impl Decode<'_> for Position {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let packed = reader.read_i64::<BigEndian>()?;
        let x = sign_extend(packed >> 38, 26) as i32;
        let y = sign_extend((packed >> 26) & 0xFFF, 12) as i16;
        let z = sign_extend(packed & 0x3FF_FFFF, 26) as i32;
        Ok(Position { x, y, z })
    }
}
