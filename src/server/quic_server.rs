//! QUIC sync server
//!
//! Owns the endpoint and the hub. Every accepted connection gets its own
//! [`ConnectionHandler`] task, and all of them feed the same hub.

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::Endpoint;
use quinn::crypto::rustls::QuicServerConfig;
use rcgen::CertifiedKey;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, SyncError};
use crate::server::connection_handler::ConnectionHandler;
use crate::server::hub::{Hub, HubHandle};

/// Counter and chat sync server
pub struct SyncServer {
    config: ServerConfig,
    endpoint: Endpoint,
    hub: HubHandle,
    hub_task: JoinHandle<()>,
}

impl SyncServer {
    /// Bind the QUIC endpoint and start the hub
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let hub = Hub::new(config.announce_departures);
        Self::bind_with_hub(config, hub)
    }

    /// Bind around a pre-built hub
    pub fn bind_with_hub(config: ServerConfig, hub: Hub) -> Result<Self> {
        let server_config = build_quic_config(&config)?;

        let endpoint = Endpoint::server(server_config, config.bind_addr)
            .map_err(|e| SyncError::network(format!("Failed to create endpoint: {}", e)))?;

        let (hub, hub_task) = hub.spawn();
        info!("Server listening on {}", endpoint.local_addr()?);

        Ok(Self {
            config,
            endpoint,
            hub,
            hub_task,
        })
    }

    /// Address the endpoint is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.endpoint.local_addr()?)
    }

    /// Handle to the hub queue
    pub fn hub(&self) -> HubHandle {
        self.hub.clone()
    }

    /// Accept connections until the endpoint is closed
    pub async fn run(&self) -> Result<()> {
        info!("server is ready on {}", self.local_addr()?);

        while let Some(incoming) = self.endpoint.accept().await {
            let hub = self.hub.clone();
            tokio::spawn(async move {
                let connection = match incoming.await {
                    Ok(connection) => connection,
                    Err(e) => {
                        debug!("Handshake failed: {}", e);
                        return;
                    }
                };

                if let Err(e) = ConnectionHandler::new(connection, hub).run().await {
                    warn!("Connection ended with error: {}", e);
                }
            });
        }

        warn!("Endpoint stopped accepting connections");
        Ok(())
    }

    /// Get server statistics
    pub async fn get_stats(&self) -> Result<ServerStats> {
        let hub = self.hub.stats().await?;
        Ok(ServerStats {
            sessions: hub.sessions,
            counter: hub.counter,
            history_len: hub.history_len,
            bind_address: self.local_addr().unwrap_or(self.config.bind_addr),
        })
    }

    /// Close the endpoint and every open connection
    pub fn shutdown(&self) {
        self.endpoint.close(0u32.into(), b"Server shutdown");
        info!("Server shutdown complete");
    }
}

impl Drop for SyncServer {
    fn drop(&mut self) {
        self.hub_task.abort();
    }
}

/// Server statistics
#[derive(Debug, Clone)]
pub struct ServerStats {
    pub sessions: usize,
    pub counter: i64,
    pub history_len: usize,
    pub bind_address: SocketAddr,
}

/// Self-signed TLS 1.3 config with the sync ALPN and the idle timeout
pub(crate) fn build_quic_config(config: &ServerConfig) -> Result<quinn::ServerConfig> {
    let CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;

    let cert_der = cert.der().clone();
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let mut tls = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_protocol_versions(&[&rustls::version::TLS13])?
    .with_no_client_auth()
    .with_single_cert(vec![cert_der], key_der)?;

    tls.alpn_protocols = vec![config.alpn.clone()];
    tls.max_early_data_size = 0;

    let crypto = QuicServerConfig::try_from(tls)
        .map_err(|e| SyncError::config(format!("Failed to create QUIC config: {}", e)))?;

    let idle_timeout = quinn::IdleTimeout::try_from(config.idle_timeout)
        .map_err(|e| SyncError::config(format!("Invalid idle timeout: {}", e)))?;

    // One client-opened bidirectional sync stream per connection
    let mut transport_config = quinn::TransportConfig::default();
    transport_config.max_concurrent_bidi_streams(1u32.into());
    transport_config.max_concurrent_uni_streams(0u32.into());
    transport_config.max_idle_timeout(Some(idle_timeout));

    let mut server_config = quinn::ServerConfig::with_crypto(Arc::new(crypto));
    server_config.transport_config(Arc::new(transport_config));
    Ok(server_config)
}
