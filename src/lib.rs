//! Real-time shared counter and chat log over QUIC
//!
//! Every connected client sees the same counter value and the same
//! append-only chat history. Clients send mutation requests; the server
//! applies them one at a time and broadcasts the resulting state to everyone.
//! A client that joins late is caught up with the current counter and the
//! full history before it sees any live event.

pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod names;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod view;

pub use client::{ClientConfig, ClientEvent, SyncClient};
pub use config::ServerConfig;
pub use error::{Result, SyncError};
pub use protocol::{ChatMessage, ClientCommand, ServerMessage};
pub use server::SyncServer;
pub use view::ClientView;

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since UNIX epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
