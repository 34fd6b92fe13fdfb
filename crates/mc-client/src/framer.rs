//! Frame extraction and outbound frame construction.
//!
//! Frame-boundary detection is a raw byte scan for the VarInt length-prefix
//! terminator, deliberately kept separate from VarInt *decoding*: a buffer
//! that doesn't yet contain a complete length prefix (or a complete frame
//! body) is "not ready", not malformed. Once a frame's bytes are fully
//! present, handing them to `mc_protocol::read_varint` means any decode
//! failure from that point on is genuinely fatal.

use std::io::{Cursor, Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use mc_protocol::{read_varint, varint_len, write_varint};

use crate::error::{Result, SessionError};

/// The result of scanning an inbound buffer for one complete frame.
pub enum ScanResult {
    /// Not enough bytes buffered yet to know the frame's length, let alone
    /// its body.
    Incomplete,
    /// A full frame is present; `frame_len` is the length prefix plus body,
    /// i.e. how many leading bytes of the buffer to drain.
    Complete { frame_len: usize },
}

/// Scans `buf` for the VarInt length prefix and, if present, checks whether
/// the full body has arrived. The VarInt scan itself never fails here —
/// a prefix occupying more than 5 bytes without a terminator is reported
/// as `Incomplete` up to the 5-byte cap, past which framing gives up and
/// lets the caller treat it as corrupt (handled by `extract_frame`).
pub fn scan(buf: &[u8]) -> ScanResult {
    let mut value: i32 = 0;
    let mut shift = 0u32;
    for (i, &byte) in buf.iter().take(5).enumerate() {
        value |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            let prefix_len = i + 1;
            let body_len = value as usize;
            let frame_len = prefix_len + body_len;
            return if buf.len() >= frame_len {
                ScanResult::Complete { frame_len }
            } else {
                ScanResult::Incomplete
            };
        }
        shift += 7;
    }
    ScanResult::Incomplete
}

/// A decoded frame: its packet id, decompressed body (positioned after the
/// packet id), and the exact raw bytes the frame occupied on the wire
/// (length prefix included) — callers that must echo a frame byte-for-byte
/// (Keep-Alive) use the latter instead of re-encoding.
pub struct Frame {
    pub packet_id: i32,
    pub body: Vec<u8>,
    pub raw: Vec<u8>,
}

/// Drains one complete frame out of `buf` (as already confirmed by `scan`)
/// and decodes its packet id, unwrapping compression if `threshold` is set.
pub fn extract_frame(buf: &mut Vec<u8>, frame_len: usize, threshold: Option<i32>) -> Result<Frame> {
    let raw: Vec<u8> = buf.drain(..frame_len).collect();
    let mut cursor = Cursor::new(&raw[..]);
    let declared_len = read_varint(&mut cursor)?;
    if declared_len < 0 {
        return Err(SessionError::Protocol(mc_protocol::ProtocolError::MalformedVarInt));
    }
    let prefix_len = cursor.position() as usize;
    let mut payload = &raw[prefix_len..];

    let (packet_id, body) = if threshold.is_some() {
        let mut payload_cursor = Cursor::new(payload);
        let uncompressed_size = read_varint(&mut payload_cursor)?;
        let consumed = payload_cursor.position() as usize;
        payload = &payload[consumed..];
        if uncompressed_size == 0 {
            let mut body_cursor = Cursor::new(payload);
            let packet_id = read_varint(&mut body_cursor)?;
            let start = body_cursor.position() as usize;
            (packet_id, payload[start..].to_vec())
        } else {
            let mut decoder = ZlibDecoder::new(payload);
            let mut decompressed = Vec::with_capacity(uncompressed_size as usize);
            decoder.read_to_end(&mut decompressed)?;
            let mut body_cursor = Cursor::new(&decompressed[..]);
            let packet_id = read_varint(&mut body_cursor)?;
            let start = body_cursor.position() as usize;
            (packet_id, decompressed[start..].to_vec())
        }
    } else {
        let mut body_cursor = Cursor::new(payload);
        let packet_id = read_varint(&mut body_cursor)?;
        let start = body_cursor.position() as usize;
        (packet_id, payload[start..].to_vec())
    };

    Ok(Frame {
        packet_id,
        body,
        raw,
    })
}

/// Builds an outbound frame (length prefix + body), compressing when the
/// uncompressed `packet_id + data` would meet or exceed `threshold`.
///
/// The source's send path computes the outer length as
/// `len(packet) + len(uncompressed_length_varint)` where `packet` already
/// *contains* the uncompressed-length varint — double-counting it. This
/// implementation uses the correct formula: the outer length is the byte
/// length of the data-length VarInt plus the byte length of whatever
/// follows it (the compressed blob, or the literal packet-id+data when
/// under threshold).
pub fn build_frame(packet_id: i32, data: &[u8], threshold: Option<i32>) -> Result<Vec<u8>> {
    let mut packet_id_bytes = Vec::new();
    write_varint(&mut packet_id_bytes, packet_id)?;

    let mut out = Vec::new();

    match threshold {
        Some(threshold) => {
            let uncompressed_len = packet_id_bytes.len() + data.len();
            if uncompressed_len >= threshold.max(0) as usize {
                let mut uncompressed = packet_id_bytes;
                uncompressed.extend_from_slice(data);
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&uncompressed)?;
                let compressed = encoder.finish()?;

                let mut data_length_bytes = Vec::new();
                write_varint(&mut data_length_bytes, uncompressed_len as i32)?;

                let frame_len = data_length_bytes.len() + compressed.len();
                write_varint(&mut out, frame_len as i32)?;
                out.extend_from_slice(&data_length_bytes);
                out.extend_from_slice(&compressed);
            } else {
                let frame_len = varint_len(0) + packet_id_bytes.len() + data.len();
                write_varint(&mut out, frame_len as i32)?;
                write_varint(&mut out, 0)?;
                out.extend_from_slice(&packet_id_bytes);
                out.extend_from_slice(data);
            }
        }
        None => {
            let frame_len = packet_id_bytes.len() + data.len();
            write_varint(&mut out, frame_len as i32)?;
            out.extend_from_slice(&packet_id_bytes);
            out.extend_from_slice(data);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_reports_incomplete_for_partial_body() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 10).unwrap();
        buf.extend_from_slice(&[0u8; 3]);
        assert!(matches!(scan(&buf), ScanResult::Incomplete));
    }

    #[test]
    fn scan_reports_incomplete_for_partial_length_prefix() {
        let buf = [0x80u8];
        assert!(matches!(scan(&buf), ScanResult::Incomplete));
    }

    #[test]
    fn scan_reports_complete_once_body_arrives() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 3).unwrap();
        buf.extend_from_slice(&[1, 2, 3]);
        match scan(&buf) {
            ScanResult::Complete { frame_len } => assert_eq!(frame_len, buf.len()),
            ScanResult::Incomplete => panic!("expected Complete"),
        }
    }

    #[test]
    fn roundtrip_uncompressed() {
        let frame = build_frame(0x05, &[1, 2, 3], None).unwrap();
        let mut buf = frame.clone();
        let frame_len = match scan(&buf) {
            ScanResult::Complete { frame_len } => frame_len,
            ScanResult::Incomplete => panic!("expected Complete"),
        };
        let decoded = extract_frame(&mut buf, frame_len, None).unwrap();
        assert_eq!(decoded.packet_id, 0x05);
        assert_eq!(decoded.body, vec![1, 2, 3]);
        assert_eq!(decoded.raw, frame);
    }

    #[test]
    fn roundtrip_compressed_above_threshold() {
        let data = vec![0xAB; 500];
        let frame = build_frame(0x21, &data, Some(64)).unwrap();
        let mut buf = frame.clone();
        let frame_len = match scan(&buf) {
            ScanResult::Complete { frame_len } => frame_len,
            ScanResult::Incomplete => panic!("expected Complete"),
        };
        let decoded = extract_frame(&mut buf, frame_len, Some(64)).unwrap();
        assert_eq!(decoded.packet_id, 0x21);
        assert_eq!(decoded.body, data);
    }

    #[test]
    fn roundtrip_compressed_below_threshold_stays_literal() {
        let data = vec![1, 2, 3];
        let frame = build_frame(0x00, &data, Some(256)).unwrap();
        let mut buf = frame.clone();
        let frame_len = match scan(&buf) {
            ScanResult::Complete { frame_len } => frame_len,
            ScanResult::Incomplete => panic!("expected Complete"),
        };
        let decoded = extract_frame(&mut buf, frame_len, Some(256)).unwrap();
        assert_eq!(decoded.packet_id, 0x00);
        assert_eq!(decoded.body, data);
    }

    #[test]
    fn keep_alive_echo_uses_raw_bytes_byte_identical() {
        let data = {
            let mut d = Vec::new();
            mc_protocol::write_varint(&mut d, 123456).unwrap();
            d
        };
        let frame = build_frame(0x00, &data, Some(256)).unwrap();
        let mut buf = frame.clone();
        let frame_len = match scan(&buf) {
            ScanResult::Complete { frame_len } => frame_len,
            ScanResult::Incomplete => panic!("expected Complete"),
        };
        let decoded = extract_frame(&mut buf, frame_len, Some(256)).unwrap();
        assert_eq!(decoded.raw, frame);
    }
}
