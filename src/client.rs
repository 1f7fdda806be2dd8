//! QUIC sync client
//!
//! Opens the sync stream, performs the hello handshake, and turns every
//! server frame into a [`ClientEvent`] on an unbounded channel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quinn::crypto::rustls::QuicClientConfig;
use quinn::{ClientConfig as QuinnClientConfig, Connection, Endpoint, RecvStream, SendStream};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_ALPN, DEFAULT_PORT};
use crate::error::{Result, SyncError};
use crate::protocol::codec::{ClientCommand, Decodable, Encodable, ServerMessage};
use crate::protocol::frame::FrameCodec;
use crate::protocol::messages::{Goodbye, Hello, HelloAck, SendMessage};
use crate::transport::{read_frame, write_frame};

/// Sync client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server address to connect to
    pub server_addr: SocketAddr,
    /// Client bind address (use 0.0.0.0:0 for auto)
    pub bind_addr: SocketAddr,
    /// TLS server name
    pub server_name: String,
    /// Handshake timeout
    pub connect_timeout: Duration,
    /// QUIC keep-alive interval
    pub keep_alive: Duration,
    /// ALPN protocol
    pub alpn: Vec<u8>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            server_name: "localhost".to_string(),
            connect_timeout: Duration::from_secs(10),
            keep_alive: Duration::from_secs(30),
            alpn: DEFAULT_ALPN.to_vec(),
        }
    }
}

impl ClientConfig {
    /// Config for a server at `server_addr`
    pub fn for_server(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            ..Self::default()
        }
    }
}

/// Events that the client can receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Handshake completed
    Connected { session_id: String },
    /// State event from the server
    Received(ServerMessage),
    /// Sync stream ended
    Disconnected(String),
}

/// QUIC sync client
pub struct SyncClient {
    config: ClientConfig,
    endpoint: Option<Endpoint>,
    connection: Option<Connection>,
    send: Option<Mutex<SendStream>>,
    session_id: Option<String>,
}

impl SyncClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            endpoint: None,
            connection: None,
            send: None,
            session_id: None,
        }
    }

    /// Connect and complete the handshake
    pub async fn connect(&mut self) -> Result<mpsc::UnboundedReceiver<ClientEvent>> {
        info!("Connecting to sync server at {}", self.config.server_addr);

        let client_config = self.configure_client()?;

        let mut endpoint = Endpoint::client(self.config.bind_addr)
            .map_err(|e| SyncError::network(format!("Failed to create endpoint: {}", e)))?;
        endpoint.set_default_client_config(client_config);

        let connecting = endpoint.connect(self.config.server_addr, &self.config.server_name)?;
        let connection = tokio::time::timeout(self.config.connect_timeout, connecting)
            .await
            .map_err(|_| SyncError::timeout("Connection timeout"))??;

        let (mut send, mut recv) = connection.open_bi().await?;
        write_frame(&mut send, &Hello::default().encode_frame()?).await?;

        let mut codec = FrameCodec::new();
        let ack = tokio::time::timeout(
            self.config.connect_timeout,
            read_hello_ack(&mut recv, &mut codec),
        )
        .await
        .map_err(|_| SyncError::timeout("No hello:ack from server"))??;

        debug!("Handshake done, session {} (v{})", ack.session_id, ack.version);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let _ = event_tx.send(ClientEvent::Connected {
            session_id: ack.session_id.clone(),
        });
        tokio::spawn(receive_loop(recv, codec, event_tx));

        self.endpoint = Some(endpoint);
        self.connection = Some(connection);
        self.send = Some(Mutex::new(send));
        self.session_id = Some(ack.session_id);

        Ok(event_rx)
    }

    /// Configure the QUIC client
    fn configure_client(&self) -> Result<QuinnClientConfig> {
        let mut crypto = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_protocol_versions(&[&rustls::version::TLS13])?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
        .with_no_client_auth();

        crypto.alpn_protocols = vec![self.config.alpn.clone()];

        let quic = QuicClientConfig::try_from(crypto)
            .map_err(|e| SyncError::config(format!("Failed to create QUIC config: {}", e)))?;

        let mut transport_config = quinn::TransportConfig::default();
        transport_config.keep_alive_interval(Some(self.config.keep_alive));

        let mut client_config = QuinnClientConfig::new(Arc::new(quic));
        client_config.transport_config(Arc::new(transport_config));
        Ok(client_config)
    }

    /// Send a command on the sync stream
    pub async fn send(&self, command: &ClientCommand) -> Result<()> {
        let bytes = command.encode_frame()?.encode_to_bytes()?;
        self.send_raw(&bytes).await
    }

    /// Write bytes to the sync stream as-is. Callers are responsible for
    /// framing.
    pub async fn send_raw(&self, bytes: &[u8]) -> Result<()> {
        let send = self
            .send
            .as_ref()
            .ok_or_else(|| SyncError::connection("Not connected to server"))?;

        send.lock().await.write_all(bytes).await?;
        Ok(())
    }

    /// Ask the server to raise the counter
    pub async fn increment(&self) -> Result<()> {
        self.send(&ClientCommand::Increment).await
    }

    /// Ask the server to lower the counter
    pub async fn decrement(&self) -> Result<()> {
        self.send(&ClientCommand::Decrement).await
    }

    /// Post a chat line. Empty text is not sent; returns whether it was.
    pub async fn send_message(
        &self,
        author_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<bool> {
        let text = text.into();
        if text.is_empty() {
            return Ok(false);
        }

        self.send(&ClientCommand::SendMessage(SendMessage::new(author_name, text)))
            .await?;
        Ok(true)
    }

    /// Say goodbye and close the connection
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(send) = self.send.take() {
            let mut send = send.into_inner();
            let goodbye = Goodbye {
                reason: "Client disconnect".to_string(),
            };
            if let Err(e) = write_frame(&mut send, &goodbye.encode_frame()?).await {
                debug!("Could not send goodbye: {}", e);
            }
            let _ = send.finish();
        }

        if let Some(connection) = self.connection.take() {
            connection.close(0u32.into(), b"Client disconnect");
            info!("Disconnected from sync server");
        }

        if let Some(endpoint) = self.endpoint.take() {
            endpoint.close(0u32.into(), b"Client shutdown");
        }

        self.session_id = None;
        Ok(())
    }

    /// Check if connected to server
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|conn| conn.close_reason().is_none())
    }

    /// Session ID from the server's hello:ack
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// Read frames until the server's hello:ack
async fn read_hello_ack(recv: &mut RecvStream, codec: &mut FrameCodec) -> Result<HelloAck> {
    let frame = read_frame(recv, codec)
        .await?
        .ok_or_else(|| SyncError::connection("Stream closed before hello:ack"))?;

    HelloAck::decode_frame(&frame)
        .map_err(|e| SyncError::protocol(format!("Invalid hello:ack: {}", e)))
}

/// Forward server frames as client events until the stream ends
async fn receive_loop(
    mut recv: RecvStream,
    mut codec: FrameCodec,
    event_tx: mpsc::UnboundedSender<ClientEvent>,
) {
    let reason = loop {
        match read_frame(&mut recv, &mut codec).await {
            Ok(Some(frame)) => match ServerMessage::decode(&frame) {
                Ok(msg) => {
                    if event_tx.send(ClientEvent::Received(msg)).is_err() {
                        return;
                    }
                }
                Err(e) => warn!("Dropping malformed server frame: {}", e),
            },
            Ok(None) => break "Stream closed by server".to_string(),
            Err(e) => break e.to_string(),
        }
    };

    debug!("Receiver stopped: {}", reason);
    let _ = event_tx.send(ClientEvent::Disconnected(reason));
}

/// Certificate verifier that accepts any server certificate (development only)
#[derive(Debug)]
struct AcceptAnyCertificate;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.server_addr.port(), 8888);
        assert_eq!(config.bind_addr.port(), 0);
        assert_eq!(config.server_name, "localhost");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_client_creation() {
        let addr = SocketAddr::from(([127, 0, 0, 1], 9000));
        let client = SyncClient::new(ClientConfig::for_server(addr));

        assert_eq!(client.config.server_addr, addr);
        assert!(client.session_id().is_none());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_client_disconnect() {
        let mut client = SyncClient::new(ClientConfig::default());

        // Test disconnect when not connected
        assert!(client.disconnect().await.is_ok());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let client = SyncClient::new(ClientConfig::default());
        assert!(client.increment().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_message_is_not_sent() {
        // Skipped before the connection is even consulted
        let client = SyncClient::new(ClientConfig::default());
        assert!(!client.send_message("alice", "").await.unwrap());
    }
}
