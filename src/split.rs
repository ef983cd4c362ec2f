use crate::config::WebSocketConfig;
use crate::error::Error;
use crate::frame::OpCode;
use crate::message::Message;
use crate::stream::SocketFlowStream;
use crate::write::Writer;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::WriteHalf;
use tokio::sync::Mutex;
use tokio_stream::wrappers::ReceiverStream;

type ConnectionWriter = Writer<WriteHalf<SocketFlowStream>>;

/// The read half produced by `Connection::split`. Implements `Stream` so
/// callers can `while let Some(msg) = reader.next().await` instead of
/// polling a channel directly.
pub struct WSReader {
    read_rx: ReceiverStream<Result<Message, Error>>,
}

impl WSReader {
    pub(crate) fn new(read_rx: ReceiverStream<Result<Message, Error>>) -> Self {
        Self { read_rx }
    }
}

impl Stream for WSReader {
    type Item = Result<Message, Error>;
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.read_rx).poll_next(cx)
    }
}

/// The write half produced by `Connection::split`. Cheaply `Clone`-able by
/// wrapping in `Arc<Mutex<_>>` at the call site for the common pattern of
/// sharing a writer across tasks (the crate itself never does this
/// internally; ordering across concurrent writers is the caller's
/// responsibility).
pub struct WSWriter {
    writer: Arc<Mutex<ConnectionWriter>>,
    config: WebSocketConfig,
}

impl WSWriter {
    pub(crate) fn new(writer: Arc<Mutex<ConnectionWriter>>, config: WebSocketConfig) -> Self {
        Self { writer, config }
    }

    pub async fn send_message(&mut self, message: Message) -> Result<(), Error> {
        if message.as_binary().len() > self.config.max_message_size {
            return Err(Error::MaxMessageSize);
        }
        let frames = message.into_frames(self.config.max_frame_size)?;
        self.writer.lock().await.write_frames(&frames).await
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), Error> {
        self.send_message(Message::Text(text.into())).await
    }

    pub async fn send_binary(&mut self, data: Vec<u8>) -> Result<(), Error> {
        self.send_message(Message::Binary(data)).await
    }

    pub async fn send_ping(&mut self, payload: Vec<u8>) -> Result<(), Error> {
        self.writer.lock().await.write_control(OpCode::Ping, payload).await
    }

    pub async fn send_pong(&mut self, payload: Vec<u8>) -> Result<(), Error> {
        self.writer.lock().await.write_control(OpCode::Pong, payload).await
    }

    /// Sends a Close frame. Unlike `Connection::close`, this does not wait
    /// for the peer's answering Close — the split halves no longer share a
    /// single owner that could drive that drain loop, so completing the
    /// handshake, if wanted, is left to whichever task owns `WSReader`.
    pub async fn close(&mut self, code: u16, reason: impl Into<String>) -> Result<(), Error> {
        self.send_message(Message::Close {
            code,
            reason: reason.into(),
        })
        .await
    }
}
