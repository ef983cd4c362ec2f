use rustls::{ClientConfig as RustlsClientConfig, ServerConfig as RustlsConfig};
use std::sync::Arc;
use std::time::Duration;

/// Which side of the handshake a `Connection` is playing. Fixed for the
/// lifetime of the connection; governs whether outbound frames are masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub web_socket_config: WebSocketConfig,
    pub tls_config: Option<Arc<RustlsConfig>>,
    /// Subprotocols this server is willing to speak, in preference order.
    /// The first one also present in the client's `Sec-WebSocket-Protocol`
    /// request header is echoed back; no further negotiation happens.
    pub subprotocols: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub web_socket_config: WebSocketConfig,
    pub tls_config: Option<Arc<RustlsClientConfig>>,
    /// Subprotocols offered to the server via `Sec-WebSocket-Protocol`.
    pub subprotocols: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub max_frame_size: usize,
    pub max_message_size: usize,
    /// Bound on how long the handshake read/write may take before the
    /// attempt is abandoned.
    pub handshake_timeout: Duration,
    /// Bound on how long `Connection::close` waits for the peer's
    /// answering Close frame before dropping the stream anyway.
    pub close_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig {
            max_message_size: 64 << 20,
            max_frame_size: 16 << 20,
            handshake_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(5),
        }
    }
}
