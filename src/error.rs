use httparse::Error as HttpParseError;
use pki_types::InvalidDnsNameError;
use std::io;
use thiserror::Error;
use url::ParseError;

/// Every failure surface the crate can produce, from framing up through the
/// handshake. Kept as one flat enum rather than nested per-module errors so
/// callers have a single `match` to write against.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    // Handshake errors
    #[error("invalid handshake request line")]
    InvalidHTTPHandshake,

    #[error("Connection: Upgrade header missing in the request")]
    NoConnectionHeaderPresent,

    #[error("Upgrade: websocket header missing in the request")]
    NoUpgradeHeaderPresent,

    #[error("Host header missing in the request")]
    NoHostHeaderPresent,

    #[error("Sec-WebSocket-Version must be 13")]
    UnsupportedVersion,

    #[error("Couldn't find Sec-WebSocket-Key header in the request")]
    NoSecWebsocketKey,

    #[error("Server didn't upgrade the connection")]
    NoUpgrade,

    #[error("Server didn't send a valid Sec-WebSocket-Accept key")]
    InvalidAcceptKey,

    // Framing errors
    #[error("RSV not zero")]
    RsvNotZero,

    #[error("Control frames must not be fragmented")]
    ControlFrameFragmented,

    #[error("Control frame payload must not exceed 125 bytes")]
    ControlFramePayloadTooLarge,

    #[error("Max frame size reached")]
    MaxFrameSize,

    #[error("Max message size reached")]
    MaxMessageSize,

    // Fragmentation errors
    #[error("Data frame received while a fragmented message is already in progress")]
    InvalidFrameFragmentation,

    #[error("Continuation frame received with no fragmented message in progress")]
    InvalidContinuationFrame,

    #[error("Invalid or reserved opcode")]
    InvalidOpcode,

    #[error("masked frame from a server, or unmasked frame from a client")]
    InvalidMaskState,

    #[error("Text payload is not valid UTF-8")]
    InvalidUtf8,

    // HTTP / URL errors
    #[error("{source}")]
    URLParseError {
        #[from]
        source: ParseError,
    },

    #[error("Invalid scheme in WebSocket URL")]
    InvalidSchemeURL,

    #[error("URL has no host")]
    URLNoHost,

    #[error("{source}")]
    HttpParseError {
        #[from]
        source: HttpParseError,
    },

    #[error("{source}")]
    DomainError {
        #[from]
        source: InvalidDnsNameError,
    },
}

impl Error {
    /// Whether this error represents a peer protocol violation that the
    /// caller should answer with a Close frame before tearing the
    /// connection down.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Error::RsvNotZero
                | Error::ControlFrameFragmented
                | Error::ControlFramePayloadTooLarge
                | Error::InvalidFrameFragmentation
                | Error::InvalidContinuationFrame
                | Error::InvalidOpcode
                | Error::InvalidMaskState
        )
    }

    /// The close status code a caller should send in response to this
    /// error, if any.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Error::InvalidUtf8 => Some(1007),
            Error::MaxFrameSize | Error::MaxMessageSize => Some(1009),
            _ if self.is_protocol_violation() => Some(1002),
            _ => None,
        }
    }
}
