//! Protocol message types for the sync stream
//!
//! All message payloads that can be serialized/deserialized within frames.
//! Payloads are JSON with camelCase field names.

use serde::{Deserialize, Serialize};

/// Protocol version spoken by this crate
pub const PROTOCOL_VERSION: u32 = 1;

// =============================================================================
// Handshake (0x00 - 0x0F)
// =============================================================================

/// Initial handshake from client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    /// Protocol version
    pub version: u32,
}

impl Default for Hello {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
        }
    }
}

/// Server response to Hello
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloAck {
    /// Server protocol version
    pub version: u32,
    /// Session ID assigned to this connection
    pub session_id: String,
}

/// Graceful disconnect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goodbye {
    /// Reason for disconnect
    #[serde(default)]
    pub reason: String,
}

// =============================================================================
// Mutations (0x10 - 0x2F) - Client -> Server
// =============================================================================

/// Bump the shared counter by one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Increment {}

/// Lower the shared counter by one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decrement {}

/// Append a line to the chat log
///
/// Both fields may be missing on the wire. A missing or empty `text` is
/// dropped by the server; a missing `author_name` falls back to the sender's
/// display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl SendMessage {
    pub fn new(author_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author_name: Some(author_name.into()),
            text: Some(text.into()),
        }
    }
}

// =============================================================================
// State events (0x30 - 0x4F) - Server -> Client
// =============================================================================

/// New absolute value of the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberChange {
    pub value: i64,
}

/// One line of the chat log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub author_name: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(author_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author_name: author_name.into(),
            text: text.into(),
        }
    }
}

/// Chat history replayed to a newly admitted session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OldMessages {
    pub messages: Vec<ChatMessage>,
}

/// Another participant joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNew {
    pub name: String,
}

/// Name assigned to the receiving session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMe {
    pub name: String,
}

/// A participant disconnected (only sent when departures are announced)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLeft {
    pub name: String,
}
