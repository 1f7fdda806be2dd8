//! Codec for encoding/decoding protocol messages to/from frames
//!
//! This module provides the bridge between typed messages and binary frames.

use super::frame::{Frame, FrameType};
use super::messages::*;
use bytes::Bytes;
use std::io::{self, Error as IoError, ErrorKind};

/// Trait for messages that can be encoded to frames
pub trait Encodable {
    /// Get the frame type for this message
    fn frame_type(&self) -> FrameType;

    /// Encode the message payload to bytes
    fn encode_payload(&self) -> io::Result<Bytes>;

    /// Encode the complete frame
    fn encode_frame(&self) -> io::Result<Frame> {
        Ok(Frame::new(self.frame_type(), self.encode_payload()?))
    }
}

/// Trait for messages that can be decoded from frames
pub trait Decodable: Sized {
    /// Expected frame type for this message
    fn expected_frame_type() -> FrameType;

    /// Decode the message from a payload
    fn decode_payload(payload: &[u8]) -> io::Result<Self>;

    /// Decode from a complete frame, validating the frame type
    fn decode_frame(frame: &Frame) -> io::Result<Self> {
        if frame.frame_type != Self::expected_frame_type() {
            return Err(IoError::new(
                ErrorKind::InvalidData,
                format!(
                    "Expected frame type {:?}, got {:?}",
                    Self::expected_frame_type(),
                    frame.frame_type
                ),
            ));
        }
        Self::decode_payload(&frame.payload)
    }
}

/// Parse a JSON payload. An empty payload reads as `{}`.
fn from_json<T: serde::de::DeserializeOwned>(payload: &[u8]) -> io::Result<T> {
    let payload: &[u8] = if payload.is_empty() {
        b"{}".as_slice()
    } else {
        payload
    };
    serde_json::from_slice(payload).map_err(|e| IoError::new(ErrorKind::InvalidData, e))
}

/// Helper macro to implement Encodable and Decodable for a message type
macro_rules! impl_codec {
    ($type:ty, $frame_type:expr) => {
        impl Encodable for $type {
            fn frame_type(&self) -> FrameType {
                $frame_type
            }

            fn encode_payload(&self) -> io::Result<Bytes> {
                serde_json::to_vec(self)
                    .map(Bytes::from)
                    .map_err(|e| IoError::new(ErrorKind::InvalidData, e))
            }
        }

        impl Decodable for $type {
            fn expected_frame_type() -> FrameType {
                $frame_type
            }

            fn decode_payload(payload: &[u8]) -> io::Result<Self> {
                from_json(payload)
            }
        }
    };
}

// Handshake
impl_codec!(Hello, FrameType::Hello);
impl_codec!(HelloAck, FrameType::HelloAck);
impl_codec!(Goodbye, FrameType::Goodbye);

// Mutations
impl_codec!(Increment, FrameType::Increment);
impl_codec!(Decrement, FrameType::Decrement);
impl_codec!(SendMessage, FrameType::SendMessage);

// State events
impl_codec!(NumberChange, FrameType::NumberChange);
impl_codec!(ChatMessage, FrameType::Message);
impl_codec!(OldMessages, FrameType::OldMessages);
impl_codec!(UserNew, FrameType::UserNew);
impl_codec!(UserMe, FrameType::UserMe);
impl_codec!(UserLeft, FrameType::UserLeft);

/// Frames a client may send on the sync stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Hello(Hello),
    Goodbye(Goodbye),
    Increment,
    Decrement,
    SendMessage(SendMessage),
}

impl ClientCommand {
    /// Decode a frame into a client command
    pub fn decode(frame: &Frame) -> io::Result<Self> {
        let payload = &frame.payload;

        match frame.frame_type {
            FrameType::Hello => Ok(Self::Hello(from_json(payload)?)),
            FrameType::Goodbye => Ok(Self::Goodbye(from_json(payload)?)),
            FrameType::Increment => {
                from_json::<Increment>(payload)?;
                Ok(Self::Increment)
            }
            FrameType::Decrement => {
                from_json::<Decrement>(payload)?;
                Ok(Self::Decrement)
            }
            FrameType::SendMessage => Ok(Self::SendMessage(from_json(payload)?)),
            other => Err(IoError::new(
                ErrorKind::InvalidData,
                format!("{:?} is not a client frame", other),
            )),
        }
    }

    /// Encode this command into a frame
    pub fn encode_frame(&self) -> io::Result<Frame> {
        match self {
            Self::Hello(m) => m.encode_frame(),
            Self::Goodbye(m) => m.encode_frame(),
            Self::Increment => Increment {}.encode_frame(),
            Self::Decrement => Decrement {}.encode_frame(),
            Self::SendMessage(m) => m.encode_frame(),
        }
    }

    /// Get the frame type of this command
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Hello(_) => FrameType::Hello,
            Self::Goodbye(_) => FrameType::Goodbye,
            Self::Increment => FrameType::Increment,
            Self::Decrement => FrameType::Decrement,
            Self::SendMessage(_) => FrameType::SendMessage,
        }
    }
}

/// State events the server pushes to sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    NumberChange(i64),
    Message(ChatMessage),
    OldMessages(Vec<ChatMessage>),
    UserNew(String),
    UserMe(String),
    UserLeft(String),
}

impl ServerMessage {
    /// Decode a frame into a server event
    pub fn decode(frame: &Frame) -> io::Result<Self> {
        let payload = &frame.payload;

        match frame.frame_type {
            FrameType::NumberChange => {
                Ok(Self::NumberChange(from_json::<NumberChange>(payload)?.value))
            }
            FrameType::Message => Ok(Self::Message(from_json(payload)?)),
            FrameType::OldMessages => Ok(Self::OldMessages(
                from_json::<OldMessages>(payload)?.messages,
            )),
            FrameType::UserNew => Ok(Self::UserNew(from_json::<UserNew>(payload)?.name)),
            FrameType::UserMe => Ok(Self::UserMe(from_json::<UserMe>(payload)?.name)),
            FrameType::UserLeft => Ok(Self::UserLeft(from_json::<UserLeft>(payload)?.name)),
            other => Err(IoError::new(
                ErrorKind::InvalidData,
                format!("{:?} is not a server event frame", other),
            )),
        }
    }

    /// Encode this event into a frame
    pub fn encode_frame(&self) -> io::Result<Frame> {
        match self {
            Self::NumberChange(value) => NumberChange { value: *value }.encode_frame(),
            Self::Message(m) => m.encode_frame(),
            Self::OldMessages(messages) => OldMessages {
                messages: messages.clone(),
            }
            .encode_frame(),
            Self::UserNew(name) => UserNew { name: name.clone() }.encode_frame(),
            Self::UserMe(name) => UserMe { name: name.clone() }.encode_frame(),
            Self::UserLeft(name) => UserLeft { name: name.clone() }.encode_frame(),
        }
    }

    /// Get the frame type of this event
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::NumberChange(_) => FrameType::NumberChange,
            Self::Message(_) => FrameType::Message,
            Self::OldMessages(_) => FrameType::OldMessages,
            Self::UserNew(_) => FrameType::UserNew,
            Self::UserMe(_) => FrameType::UserMe,
            Self::UserLeft(_) => FrameType::UserLeft,
        }
    }

    /// Event name as seen by clients
    pub fn event_name(&self) -> &'static str {
        self.frame_type().event_name()
    }
}

/// Encode a message directly to bytes (convenience function)
pub fn encode<T: Encodable>(msg: &T) -> io::Result<Bytes> {
    msg.encode_frame()?.encode_to_bytes()
}

/// Decode a frame to a specific message type (convenience function)
pub fn decode<T: Decodable>(frame: &Frame) -> io::Result<T> {
    T::decode_frame(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_frame() {
        let original = SendMessage::new("alice", "hi");

        let frame = original.encode_frame().unwrap();
        assert_eq!(frame.frame_type, FrameType::SendMessage);

        let decoded = SendMessage::decode_frame(&frame).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_client_command_decode() {
        let frame = ClientCommand::Increment.encode_frame().unwrap();
        assert_eq!(frame.frame_type, FrameType::Increment);
        assert_eq!(ClientCommand::decode(&frame).unwrap(), ClientCommand::Increment);

        // Bare frames without a payload are accepted for counter steps
        let frame = Frame::empty(FrameType::Decrement);
        assert_eq!(ClientCommand::decode(&frame).unwrap(), ClientCommand::Decrement);
    }

    #[test]
    fn test_client_command_rejects_server_frames() {
        let frame = ServerMessage::NumberChange(3).encode_frame().unwrap();
        assert!(ClientCommand::decode(&frame).is_err());
    }

    #[test]
    fn test_malformed_payload() {
        let frame = Frame::new(FrameType::SendMessage, "not json");
        assert!(ClientCommand::decode(&frame).is_err());

        let frame = Frame::new(FrameType::SendMessage, r#"{"text":42}"#);
        assert!(ClientCommand::decode(&frame).is_err());
    }

    #[test]
    fn test_server_message_payload_shape() {
        let frame = ServerMessage::NumberChange(-4).encode_frame().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(json["value"], -4);

        let frame = ServerMessage::OldMessages(vec![ChatMessage::new("alice", "hi")])
            .encode_frame()
            .unwrap();
        assert_eq!(frame.frame_type, FrameType::OldMessages);
        let json: serde_json::Value = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(json["messages"][0]["authorName"], "alice");

        let decoded = ServerMessage::decode(&frame).unwrap();
        assert_eq!(
            decoded,
            ServerMessage::OldMessages(vec![ChatMessage::new("alice", "hi")])
        );
    }

    #[test]
    fn test_wrong_frame_type() {
        let frame = UserMe {
            name: "Whiskers".to_string(),
        }
        .encode_frame()
        .unwrap();

        assert!(UserNew::decode_frame(&frame).is_err());
        assert_eq!(decode::<UserMe>(&frame).unwrap().name, "Whiskers");
    }

    #[test]
    fn test_encode_helper() {
        let bytes = encode(&Hello::default()).unwrap();
        let frame = Frame::decode_complete(&bytes).unwrap();
        assert_eq!(frame.frame_type, FrameType::Hello);
        assert_eq!(
            ClientCommand::decode(&frame).unwrap(),
            ClientCommand::Hello(Hello::default())
        );
    }
}
