//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default port shared by the QUIC endpoint (UDP) and the liveness probe (TCP)
pub const DEFAULT_PORT: u16 = 8888;

/// ALPN protocol identifier negotiated by server and client
pub const DEFAULT_ALPN: &[u8] = b"tally";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// QUIC endpoint address
    pub bind_addr: SocketAddr,
    /// Liveness probe address
    pub http_addr: SocketAddr,
    /// Connection idle timeout
    pub idle_timeout: Duration,
    /// Broadcast `user:left` when a session disconnects
    pub announce_departures: bool,
    /// ALPN protocol
    pub alpn: Vec<u8>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            http_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            idle_timeout: Duration::from_secs(300),
            announce_departures: false,
            alpn: DEFAULT_ALPN.to_vec(),
        }
    }
}

impl ServerConfig {
    /// Loopback config on ephemeral ports
    pub fn local() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            http_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8888);
        assert_eq!(config.http_addr.port(), 8888);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert!(!config.announce_departures);
        assert_eq!(config.alpn, b"tally");
    }

    #[test]
    fn test_local_config() {
        let config = ServerConfig::local();
        assert!(config.bind_addr.ip().is_loopback());
        assert_eq!(config.bind_addr.port(), 0);
    }
}
