//! Per-connection handler
//!
//! Each QUIC connection carries one bidirectional sync stream opened by the
//! client. The handler performs the hello handshake, registers the session
//! with the hub, then runs two halves until either ends: a read loop that
//! turns client frames into hub events, and a writer that drains the
//! session's outbound queue onto the stream.

use std::net::SocketAddr;

use quinn::{Connection, RecvStream, SendStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::protocol::codec::{ClientCommand, Encodable, ServerMessage};
use crate::protocol::frame::{Frame, FrameCodec};
use crate::protocol::messages::{HelloAck, PROTOCOL_VERSION};
use crate::server::hub::HubHandle;
use crate::server::registry::ConnectionHandle;
use crate::server::router::InboundEvent;
use crate::transport::{read_frame, write_frame};

/// Outcome of handling one client frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Handler for a single client connection
pub struct ConnectionHandler {
    connection: Connection,
    hub: HubHandle,
    session_id: String,
}

impl ConnectionHandler {
    /// Create a handler for an established connection
    pub fn new(connection: Connection, hub: HubHandle) -> Self {
        Self {
            connection,
            hub,
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Connection handle used by the hub
    pub fn handle(&self) -> ConnectionHandle {
        self.connection.stable_id()
    }

    /// Get the remote address
    pub fn remote_address(&self) -> SocketAddr {
        self.connection.remote_address()
    }

    /// Run the connection to completion
    pub async fn run(self) -> Result<()> {
        let handle = self.handle();
        let addr = self.remote_address();
        debug!("New connection {} from {}", handle, addr);

        let (mut send, mut recv) = self.connection.accept_bi().await.map_err(|e| {
            SyncError::connection(format!("Failed to accept sync stream: {}", e))
        })?;

        let mut codec = FrameCodec::new();
        self.handshake(&mut send, &mut recv, &mut codec).await?;

        let (outbound, rx) = mpsc::unbounded_channel();
        self.hub.connect(handle, outbound)?;

        let mut writer = tokio::spawn(write_loop(send, rx));

        let result = tokio::select! {
            result = self.read_loop(handle, &mut recv, &mut codec) => result,
            result = &mut writer => match result {
                Ok(written) => written,
                Err(e) => Err(SyncError::internal(format!("Writer task failed: {}", e))),
            },
        };

        // Hub sends after this point have no receiver and are dropped
        if let Err(e) = self.hub.disconnect(handle) {
            warn!("Could not report disconnect of {}: {}", handle, e);
        }
        writer.abort();
        self.connection.close(0u32.into(), b"bye");

        match &result {
            Ok(()) => debug!("Connection {} from {} closed", handle, addr),
            Err(e) => debug!("Connection {} from {} closed: {}", handle, addr, e),
        }
        result
    }

    /// Wait for hello and answer with hello:ack
    async fn handshake(
        &self,
        send: &mut SendStream,
        recv: &mut RecvStream,
        codec: &mut FrameCodec,
    ) -> Result<()> {
        let frame = read_frame(recv, codec)
            .await?
            .ok_or_else(|| SyncError::connection("Stream closed before hello"))?;

        let hello = match ClientCommand::decode(&frame) {
            Ok(ClientCommand::Hello(hello)) => hello,
            Ok(other) => {
                return Err(SyncError::protocol(format!(
                    "Expected hello, got {:?}",
                    other.frame_type()
                )));
            }
            Err(e) => return Err(SyncError::protocol(format!("Invalid hello: {}", e))),
        };

        if hello.version != PROTOCOL_VERSION {
            debug!(
                "Client speaks v{}, answering with v{}",
                hello.version, PROTOCOL_VERSION
            );
        }

        let ack = HelloAck {
            version: PROTOCOL_VERSION,
            session_id: self.session_id.clone(),
        };
        write_frame(send, &ack.encode_frame()?).await?;
        debug!("Sent hello:ack for session {}", self.session_id);
        Ok(())
    }

    /// Read client frames until goodbye or end of stream
    async fn read_loop(
        &self,
        handle: ConnectionHandle,
        recv: &mut RecvStream,
        codec: &mut FrameCodec,
    ) -> Result<()> {
        while let Some(frame) = read_frame(recv, codec).await? {
            if self.handle_frame(handle, &frame)? == Flow::Stop {
                return Ok(());
            }
        }

        debug!(
            "Sync stream finished by {} ({} bytes left unparsed)",
            handle,
            codec.buffered_len()
        );
        Ok(())
    }

    /// Handle one post-handshake frame
    fn handle_frame(&self, handle: ConnectionHandle, frame: &Frame) -> Result<Flow> {
        if frame.frame_type.is_state_event() {
            warn!(
                "Ignoring server-only {} frame from {}",
                frame.frame_type.event_name(),
                handle
            );
            return Ok(Flow::Continue);
        }

        let command = match ClientCommand::decode(frame) {
            Ok(command) => command,
            Err(e) => {
                warn!(
                    "Dropping malformed {} frame from {}: {}",
                    frame.frame_type.event_name(),
                    handle,
                    e
                );
                return Ok(Flow::Continue);
            }
        };

        match command {
            ClientCommand::Hello(_) => {
                debug!("Ignoring repeated hello from {}", handle);
            }
            ClientCommand::Goodbye(goodbye) => {
                info!("Client {} said goodbye: {}", handle, goodbye.reason);
                return Ok(Flow::Stop);
            }
            ClientCommand::Increment => self.hub.dispatch(handle, InboundEvent::Increment)?,
            ClientCommand::Decrement => self.hub.dispatch(handle, InboundEvent::Decrement)?,
            ClientCommand::SendMessage(msg) => self.hub.dispatch(
                handle,
                InboundEvent::Message {
                    author_name: msg.author_name,
                    text: msg.text,
                },
            )?,
        }

        Ok(Flow::Continue)
    }
}

/// Drain the session's outbound queue onto the sync stream
async fn write_loop(
    mut send: SendStream,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) -> Result<()> {
    while let Some(msg) = rx.recv().await {
        let bytes = match msg.encode_frame().and_then(|frame| frame.encode_to_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Dropping unencodable {} event: {}", msg.event_name(), e);
                continue;
            }
        };
        send.write_all(&bytes).await?;
    }

    let _ = send.finish();
    Ok(())
}
