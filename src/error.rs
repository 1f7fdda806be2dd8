//! Error handling for the sync server and client

use std::fmt;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Sync server error types
///
/// None of these ever reach a connected client: the sync protocol has no error
/// channel. They describe failures of the process itself (binding, TLS,
/// transport I/O) and are logged or returned to the embedding code.
#[derive(Debug, Clone)]
pub enum SyncError {
    /// Network-related errors
    Network(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Protocol errors
    Protocol(String),
    /// Connection errors
    Connection(String),
    /// Configuration error
    Config(String),
    /// Timeout error
    Timeout(String),
    /// Server internal error
    Internal(String),
}

impl SyncError {
    /// Get error code for this error type
    pub fn code(&self) -> u32 {
        match self {
            SyncError::Network(_) => 1000,
            SyncError::Serialization(_) => 1001,
            SyncError::Protocol(_) => 1003,
            SyncError::Connection(_) => 1004,
            SyncError::Config(_) => 1010,
            SyncError::Timeout(_) => 1011,
            SyncError::Internal(_) => 1009,
        }
    }

    /// Get human-readable error message
    pub fn message(&self) -> &str {
        match self {
            SyncError::Network(msg) => msg,
            SyncError::Serialization(msg) => msg,
            SyncError::Protocol(msg) => msg,
            SyncError::Connection(msg) => msg,
            SyncError::Config(msg) => msg,
            SyncError::Timeout(msg) => msg,
            SyncError::Internal(msg) => msg,
        }
    }

    /// Create a network error
    pub fn network<T: Into<String>>(msg: T) -> Self {
        SyncError::Network(msg.into())
    }

    /// Create a protocol error
    pub fn protocol<T: Into<String>>(msg: T) -> Self {
        SyncError::Protocol(msg.into())
    }

    /// Create a connection error
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        SyncError::Connection(msg.into())
    }

    /// Create a configuration error
    pub fn config<T: Into<String>>(msg: T) -> Self {
        SyncError::Config(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        SyncError::Timeout(msg.into())
    }

    /// Create an internal error
    pub fn internal<T: Into<String>>(msg: T) -> Self {
        SyncError::Internal(msg.into())
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Network(msg) => write!(f, "Network error: {}", msg),
            SyncError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            SyncError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            SyncError::Connection(msg) => write!(f, "Connection error: {}", msg),
            SyncError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SyncError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            SyncError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                SyncError::Protocol(format!("Frame error: {}", err))
            }
            _ => SyncError::Network(format!("IO error: {}", err)),
        }
    }
}

impl From<quinn::ConnectError> for SyncError {
    fn from(err: quinn::ConnectError) -> Self {
        SyncError::Connection(format!("QUIC connection error: {}", err))
    }
}

impl From<quinn::ConnectionError> for SyncError {
    fn from(err: quinn::ConnectionError) -> Self {
        SyncError::Connection(format!("QUIC connection error: {}", err))
    }
}

impl From<quinn::ReadError> for SyncError {
    fn from(err: quinn::ReadError) -> Self {
        SyncError::Network(format!("QUIC read error: {}", err))
    }
}

impl From<quinn::WriteError> for SyncError {
    fn from(err: quinn::WriteError) -> Self {
        SyncError::Network(format!("QUIC write error: {}", err))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<rustls::Error> for SyncError {
    fn from(err: rustls::Error) -> Self {
        SyncError::Config(format!("TLS error: {}", err))
    }
}

impl From<rcgen::Error> for SyncError {
    fn from(err: rcgen::Error) -> Self {
        SyncError::Config(format!("Certificate error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_messages() {
        let err = SyncError::timeout("connect took too long");
        assert_eq!(err.code(), 1011);
        assert_eq!(err.message(), "connect took too long");
        assert_eq!(err.to_string(), "Timeout: connect took too long");
    }

    #[test]
    fn test_io_error_mapping() {
        let frame_err = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad frame");
        assert!(matches!(SyncError::from(frame_err), SyncError::Protocol(_)));

        let net_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(SyncError::from(net_err), SyncError::Network(_)));
    }

    #[test]
    fn test_json_error_mapping() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = SyncError::from(json_err);
        assert_eq!(err.code(), 1001);
    }
}
