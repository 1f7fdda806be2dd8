//! Frame I/O over QUIC streams
//!
//! Both the server's connection handler and the client speak the same
//! length-prefixed frames on a single bidirectional stream.

use quinn::{RecvStream, SendStream};

use crate::error::Result;
use crate::protocol::frame::{Frame, FrameCodec};

/// Read size per stream poll
const READ_CHUNK: usize = 4096;

/// Read the next complete frame.
///
/// Frames already buffered in `codec` are returned before the stream is
/// polled again. Returns `Ok(None)` once the peer finishes the stream.
pub async fn read_frame(recv: &mut RecvStream, codec: &mut FrameCodec) -> Result<Option<Frame>> {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        if let Some(frame) = codec.decode_next()? {
            return Ok(Some(frame));
        }

        match recv.read(&mut buf).await? {
            Some(n) => codec.feed(&buf[..n]),
            None => return Ok(None),
        }
    }
}

/// Write one frame to the stream. Oversized frames are refused before any
/// byte is written.
pub async fn write_frame(send: &mut SendStream, frame: &Frame) -> Result<()> {
    send.write_all(&frame.encode_to_bytes()?).await?;
    Ok(())
}
