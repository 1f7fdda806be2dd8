//! Binary frame protocol with length-prefixed messages
//!
//! Frame format:
//! ```text
//! +---------+---------------+------------------+
//! | type    | length        | payload          |
//! | (1 byte)| (4 bytes, BE) | (variable, JSON) |
//! +---------+---------------+------------------+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::{self, Cursor};

/// Frame header size: 1 byte type + 4 bytes length
pub const FRAME_HEADER_SIZE: usize = 5;

/// Maximum frame payload size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Frame types for every event carried on the sync stream
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    // Handshake (0x00 - 0x0F)
    Hello = 0x00,
    HelloAck = 0x01,
    Goodbye = 0x08,

    // Client -> Server mutations (0x10 - 0x2F)
    Increment = 0x10,
    Decrement = 0x11,
    SendMessage = 0x12,

    // Server -> Client state events (0x30 - 0x4F)
    NumberChange = 0x30,
    Message = 0x31,
    OldMessages = 0x32,
    UserNew = 0x33,
    UserMe = 0x34,
    UserLeft = 0x35,
}

impl FrameType {
    /// Convert from u8, returns None for unknown types
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(FrameType::Hello),
            0x01 => Some(FrameType::HelloAck),
            0x08 => Some(FrameType::Goodbye),

            0x10 => Some(FrameType::Increment),
            0x11 => Some(FrameType::Decrement),
            0x12 => Some(FrameType::SendMessage),

            0x30 => Some(FrameType::NumberChange),
            0x31 => Some(FrameType::Message),
            0x32 => Some(FrameType::OldMessages),
            0x33 => Some(FrameType::UserNew),
            0x34 => Some(FrameType::UserMe),
            0x35 => Some(FrameType::UserLeft),
            _ => None,
        }
    }

    /// Event name as seen by clients
    pub fn event_name(&self) -> &'static str {
        match self {
            FrameType::Hello => "hello",
            FrameType::HelloAck => "hello:ack",
            FrameType::Goodbye => "goodbye",
            FrameType::Increment => "increment",
            FrameType::Decrement => "decrement",
            FrameType::SendMessage => "message",
            FrameType::NumberChange => "number:change",
            FrameType::Message => "message",
            FrameType::OldMessages => "old messages",
            FrameType::UserNew => "user:new",
            FrameType::UserMe => "user:me",
            FrameType::UserLeft => "user:left",
        }
    }

    /// Check if this frame type is a server state event
    pub fn is_state_event(&self) -> bool {
        let val = *self as u8;
        (0x30..0x50).contains(&val)
    }
}

/// A single protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame with the given type and payload
    pub fn new(frame_type: FrameType, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            payload: payload.into(),
        }
    }

    /// Create an empty frame (no payload)
    pub fn empty(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            payload: Bytes::new(),
        }
    }

    /// Get the total encoded size of this frame
    pub fn encoded_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }

    /// Encode this frame into a buffer.
    ///
    /// Fails without writing anything when the payload exceeds
    /// [`MAX_FRAME_SIZE`], since no peer would accept the frame.
    pub fn encode(&self, buf: &mut BytesMut) -> io::Result<()> {
        check_payload_len(self.payload.len())?;

        buf.reserve(self.encoded_size());
        buf.put_u8(self.frame_type as u8);
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        Ok(())
    }

    /// Encode this frame into a new Bytes
    pub fn encode_to_bytes(&self) -> io::Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Try to decode a frame from a buffer
    /// Returns Ok(Some(frame)) if successful, Ok(None) if more data needed
    pub fn decode(buf: &mut BytesMut) -> io::Result<Option<Frame>> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        // Peek at the header without consuming
        let mut cursor = Cursor::new(&buf[..]);
        let frame_type_byte = cursor.get_u8();
        let payload_len = cursor.get_u32() as usize;

        let frame_type = parse_frame_type(frame_type_byte)?;
        check_payload_len(payload_len)?;

        let total_size = FRAME_HEADER_SIZE + payload_len;
        if buf.len() < total_size {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE);
        let payload = buf.split_to(payload_len).freeze();

        Ok(Some(Frame {
            frame_type,
            payload,
        }))
    }

    /// Decode a single frame from a complete buffer (no streaming)
    pub fn decode_complete(data: &[u8]) -> io::Result<Frame> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Incomplete frame header",
            ));
        }

        let frame_type = parse_frame_type(data[0])?;
        let payload_len = u32::from_be_bytes([data[1], data[2], data[3], data[4]]) as usize;
        check_payload_len(payload_len)?;

        let expected_len = FRAME_HEADER_SIZE + payload_len;
        if data.len() < expected_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Incomplete frame: expected {} bytes, got {}",
                    expected_len,
                    data.len()
                ),
            ));
        }

        let payload = Bytes::copy_from_slice(&data[FRAME_HEADER_SIZE..expected_len]);

        Ok(Frame {
            frame_type,
            payload,
        })
    }
}

fn parse_frame_type(byte: u8) -> io::Result<FrameType> {
    FrameType::from_u8(byte).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Unknown frame type: 0x{:02X}", byte),
        )
    })
}

fn check_payload_len(payload_len: usize) -> io::Result<()> {
    if payload_len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame payload too large: {} bytes (max: {})",
                payload_len, MAX_FRAME_SIZE
            ),
        ));
    }
    Ok(())
}

/// Streaming frame decoder fed from a QUIC receive stream
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: BytesMut,
}

impl FrameCodec {
    /// Create a new frame codec
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Feed data into the codec
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame
    pub fn decode_next(&mut self) -> io::Result<Option<Frame>> {
        Frame::decode(&mut self.buffer)
    }

    /// Get the current buffer length
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}
