// src/core/protocol/frame.rs

//! Implements the length-prefixed binary frame format and its `tokio_util` codec.
//!
//! Every frame starts with a fixed 7-byte big-endian header:
//!
//! ```text
//! +--------+--------+--------+--------+--------+--------+--------+------------+
//! |   body length   | flags  |    packet id    |  packet index   | payload... |
//! +--------+--------+--------+--------+--------+--------+--------+------------+
//! ```
//!
//! The body length counts everything after the length field itself, so it is
//! always `payload.len() + 5`.

use crate::core::AnchorageError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Size of the fixed header, including the length field.
pub const HEADER_LEN: usize = 7;
/// Width of the leading body-length field.
pub const LENGTH_FIELD_LEN: usize = 2;
/// Smallest legal body length: the header bytes that follow the length field.
pub const MIN_BODY_LEN: usize = HEADER_LEN - LENGTH_FIELD_LEN;
/// Largest payload whose body length still fits in the 16-bit length field.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - MIN_BODY_LEN;
/// Largest frame the wire format can express.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize + LENGTH_FIELD_LEN;

/// One complete message on the wire. The payload is opaque to the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_id: u16,
    pub packet_index: u16,
    pub flags: u8,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(packet_id: u16, packet_index: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            packet_id,
            packet_index,
            flags: 0,
            payload: payload.into(),
        }
    }

    /// Total number of bytes this frame occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}

/// Result of a single [`decode`] attempt over a byte slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A full frame was available. The `usize` is how many bytes it consumed.
    Frame(Frame, usize),
    /// The slice holds only part of a frame; call again once more bytes arrive.
    NeedMoreData,
}

#[derive(Debug, Clone, Copy)]
struct Header {
    body_len: usize,
    flags: u8,
    packet_id: u16,
    packet_index: u16,
}

impl Header {
    fn frame_len(&self) -> usize {
        self.body_len + LENGTH_FIELD_LEN
    }
}

/// Reads the body length as soon as two bytes are available and validates it
/// before the rest of the frame arrives, so a bad prefix fails fast.
fn peek_frame_len(buf: &[u8], max_frame_bytes: usize) -> Result<Option<usize>, AnchorageError> {
    if buf.len() < LENGTH_FIELD_LEN {
        return Ok(None);
    }
    let body_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
    if body_len < MIN_BODY_LEN {
        return Err(AnchorageError::Framing(format!(
            "body length {body_len} is shorter than the {MIN_BODY_LEN}-byte header"
        )));
    }
    let frame_len = body_len + LENGTH_FIELD_LEN;
    if frame_len > max_frame_bytes {
        return Err(AnchorageError::Framing(format!(
            "frame of {frame_len} bytes exceeds the {max_frame_bytes}-byte limit"
        )));
    }
    Ok(Some(frame_len))
}

fn read_header(buf: &[u8], max_frame_bytes: usize) -> Result<Option<Header>, AnchorageError> {
    let Some(frame_len) = peek_frame_len(buf, max_frame_bytes)? else {
        return Ok(None);
    };
    if buf.len() < frame_len {
        return Ok(None);
    }
    Ok(Some(Header {
        body_len: frame_len - LENGTH_FIELD_LEN,
        flags: buf[2],
        packet_id: u16::from_be_bytes([buf[3], buf[4]]),
        packet_index: u16::from_be_bytes([buf[5], buf[6]]),
    }))
}

/// Attempts to decode one frame from the front of `buf` without consuming it.
pub fn decode(buf: &[u8]) -> Result<Decoded, AnchorageError> {
    decode_with_limit(buf, MAX_FRAME_LEN)
}

/// Like [`decode`], rejecting frames longer than `max_frame_bytes` as framing errors.
pub fn decode_with_limit(buf: &[u8], max_frame_bytes: usize) -> Result<Decoded, AnchorageError> {
    match read_header(buf, max_frame_bytes)? {
        None => Ok(Decoded::NeedMoreData),
        Some(header) => {
            let frame_len = header.frame_len();
            let frame = Frame {
                packet_id: header.packet_id,
                packet_index: header.packet_index,
                flags: header.flags,
                payload: Bytes::copy_from_slice(&buf[HEADER_LEN..frame_len]),
            };
            Ok(Decoded::Frame(frame, frame_len))
        }
    }
}

/// Appends one encoded frame to `dst` and returns the number of bytes written.
/// Nothing is appended when the payload is too large for the length field.
pub fn encode_into(
    packet_id: u16,
    packet_index: u16,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<usize, AnchorageError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(AnchorageError::Encode(format!(
            "payload of {} bytes exceeds the {MAX_PAYLOAD_LEN}-byte maximum",
            payload.len()
        )));
    }
    let body_len = (payload.len() + MIN_BODY_LEN) as u16;
    dst.reserve(HEADER_LEN + payload.len());
    dst.put_u16(body_len);
    dst.put_u8(0);
    dst.put_u16(packet_id);
    dst.put_u16(packet_index);
    dst.extend_from_slice(payload);
    Ok(HEADER_LEN + payload.len())
}

/// Encodes a single frame into a fresh buffer.
pub fn encode(packet_id: u16, packet_index: u16, payload: &[u8]) -> Result<Bytes, AnchorageError> {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    encode_into(packet_id, packet_index, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// A `tokio_util` codec for reading and writing frames on a byte stream.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_bytes: usize,
}

impl FrameCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes: max_frame_bytes.clamp(HEADER_LEN, MAX_FRAME_LEN),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_LEN)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = AnchorageError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame_len) = peek_frame_len(&src[..], self.max_frame_bytes)? else {
            return Ok(None);
        };
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let mut raw = src.split_to(frame_len).freeze();
        raw.advance(LENGTH_FIELD_LEN);
        let flags = raw.get_u8();
        let packet_id = raw.get_u16();
        let packet_index = raw.get_u16();
        Ok(Some(Frame {
            packet_id,
            packet_index,
            flags,
            payload: raw,
        }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = AnchorageError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_into(item.packet_id, item.packet_index, &item.payload, dst)?;
        Ok(())
    }
}

