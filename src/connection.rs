use crate::config::{Role, WebSocketConfig};
use crate::error::Error;
use crate::frame::OpCode;
use crate::message::Message;
use crate::read::{self, ReceiveState};
use crate::split::{WSReader, WSWriter};
use crate::stream::SocketFlowStream;
use crate::write::Writer;
use log::{debug, warn};
use std::sync::Arc;
use tokio::io::{split, ReadHalf};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;

/// One upgraded WebSocket connection: an owned byte stream plus the role and
/// receive state needed to frame it. This is the crate's single public
/// entry point for sending and receiving application messages once the
/// handshake has completed.
pub struct Connection {
    read_half: ReadHalf<SocketFlowStream>,
    writer: Writer<tokio::io::WriteHalf<SocketFlowStream>>,
    role: Role,
    state: ReceiveState,
    config: WebSocketConfig,
}

impl Connection {
    pub(crate) fn new(stream: SocketFlowStream, role: Role, config: WebSocketConfig) -> Self {
        let (read_half, write_half) = split(stream);
        Self {
            read_half,
            writer: Writer::new(write_half, role),
            role,
            state: ReceiveState::new(),
            config,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Reads frames until one complete application message is ready. Ping
    /// and Pong are surfaced to the caller rather than answered
    /// automatically — this crate carries no automatic ping scheduling
    /// (out of scope per the Non-goals), so replying to a Ping is the
    /// caller's responsibility.
    pub async fn receive_message(&mut self) -> Result<Message, Error> {
        read::receive_message(&mut self.read_half, &mut self.state, &self.config, self.role).await
    }

    /// Sends `message`, fragmenting Text/Binary payloads larger than
    /// `config.max_frame_size` across multiple frames with a Continuation
    /// opcode on every frame but the first.
    pub async fn send_message(&mut self, message: Message) -> Result<(), Error> {
        if message.as_binary().len() > self.config.max_message_size {
            return Err(Error::MaxMessageSize);
        }
        let frames = message.into_frames(self.config.max_frame_size)?;
        self.writer.write_frames(&frames).await
    }

    pub async fn send_ping(&mut self, payload: Vec<u8>) -> Result<(), Error> {
        self.writer.write_control(OpCode::Ping, payload).await
    }

    pub async fn send_pong(&mut self, payload: Vec<u8>) -> Result<(), Error> {
        self.writer.write_control(OpCode::Pong, payload).await
    }

    /// Sends a Close frame, then keeps reading frames (bounded by
    /// `config.close_timeout`) until the peer's own Close is observed or the
    /// timeout elapses, then drops the stream. A library that sends Close
    /// and immediately drops the socket risks the peer never seeing its
    /// last outbound bytes flushed, so this waits for the peer's answer.
    pub async fn close(&mut self, code: u16, reason: impl Into<String>) -> Result<(), Error> {
        self.send_message(Message::Close {
            code,
            reason: reason.into(),
        })
        .await?;

        let drain = async {
            loop {
                match self.receive_message().await {
                    Ok(Message::Close { .. }) => return,
                    Ok(_) => continue,
                    Err(_) => return,
                }
            }
        };

        if timeout(self.config.close_timeout, drain).await.is_err() {
            warn!("close handshake timed out waiting for peer Close");
        } else {
            debug!("close handshake completed");
        }

        Ok(())
    }

    /// Drops the stream immediately without sending anything. The
    /// consuming-`self` signature is the idiomatic Rust way to say "this
    /// connection is never used again" — there is no separate buffer-clear
    /// step since `ReceiveState` lives inside `self` and is dropped with it.
    pub fn deinit(self) {}

    /// Splits into independent read/write halves for the common pattern of
    /// one task reading while another holds the writer. Ordering of writes
    /// across tasks sharing the `WSWriter` is left to the caller, typically
    /// by wrapping it in an `Arc<Mutex<_>>`.
    pub fn split(self) -> (WSReader, WSWriter) {
        let (tx, rx) = mpsc::channel(128);
        let mut read_half = self.read_half;
        let mut state = self.state;
        let config = self.config.clone();
        let role = self.role;

        tokio::spawn(async move {
            loop {
                match read::receive_message(&mut read_half, &mut state, &config, role).await {
                    Ok(message) => {
                        if tx.send(Ok(message)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                }
            }
        });

        let writer = Arc::new(Mutex::new(self.writer));
        (
            WSReader::new(ReceiverStream::new(rx)),
            WSWriter::new(writer, self.config),
        )
    }
}
