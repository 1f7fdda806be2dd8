//! Protocol layer for the sync stream
//!
//! This module provides:
//! - Binary frame encoding/decoding
//! - Message type definitions
//! - Codec traits and the client/server event enums

pub mod codec;
pub mod frame;
pub mod messages;

pub use codec::{ClientCommand, Decodable, Encodable, ServerMessage, decode, encode};
pub use frame::{FRAME_HEADER_SIZE, Frame, FrameCodec, FrameType, MAX_FRAME_SIZE};
pub use messages::*;
