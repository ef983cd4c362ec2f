use crate::config::{Role, WebSocketConfig};
use crate::error::Error;
use crate::frame::{Frame, OpCode};
use crate::message::Message;
use log::{trace, warn};
use tokio::io::AsyncRead;

/// Tracks whether a fragmented Text/Binary message is in progress. Replaces
/// the four loose fields (`is_initial_frame`, `is_fragmented`,
/// `initial_opcode`, `payload_buffer`) a naive port would carry with a
/// single enum, so "fragmented with no initial opcode" is simply
/// unrepresentable.
pub(crate) enum ReceiveState {
    Idle,
    Reassembling { initial_opcode: OpCode, buffer: Vec<u8> },
}

impl ReceiveState {
    pub fn new() -> Self {
        ReceiveState::Idle
    }
}

/// Reads and reassembles frames off `reader` until one complete `Message` is
/// ready, mutating `state` as fragments arrive. Control frames interleaved
/// mid-reassembly are surfaced immediately and never disturb `state`.
pub(crate) async fn receive_message<R: AsyncRead + Unpin>(
    reader: &mut R,
    state: &mut ReceiveState,
    config: &WebSocketConfig,
    role: Role,
) -> Result<Message, Error> {
    let expect_masked = role == Role::Server;
    loop {
        let frame = Frame::read(reader, config.max_frame_size, expect_masked).await?;
        trace!("received frame: opcode={:?} fin={} len={}", frame.opcode, frame.fin, frame.payload.len());

        if frame.opcode.is_control() {
            return Message::from_control_frame(frame);
        }

        match (&mut *state, frame.opcode) {
            (ReceiveState::Idle, OpCode::Continuation) => {
                warn!("continuation frame received with no fragmented message in progress");
                return Err(Error::InvalidContinuationFrame);
            }
            (ReceiveState::Idle, _) if frame.fin => {
                return Message::from_data_frame(frame.opcode, frame.payload);
            }
            (ReceiveState::Idle, _) => {
                *state = ReceiveState::Reassembling {
                    initial_opcode: frame.opcode,
                    buffer: frame.payload,
                };
            }
            (ReceiveState::Reassembling { .. }, OpCode::Continuation) => {
                let ReceiveState::Reassembling { initial_opcode, buffer } = state else {
                    unreachable!()
                };
                buffer.extend_from_slice(&frame.payload);
                if buffer.len() > config.max_message_size {
                    return Err(Error::MaxMessageSize);
                }
                if frame.fin {
                    let opcode = *initial_opcode;
                    let ReceiveState::Reassembling { buffer, .. } =
                        std::mem::replace(state, ReceiveState::Idle)
                    else {
                        unreachable!()
                    };
                    return Message::from_data_frame(opcode, buffer);
                }
            }
            (ReceiveState::Reassembling { .. }, _) => {
                warn!("data frame received while a fragmented message is already in progress");
                return Err(Error::InvalidFrameFragmentation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebSocketConfig;
    use tokio::io::duplex;

    async fn write_frame<W: tokio::io::AsyncWrite + Unpin>(writer: &mut W, fin: bool, opcode: OpCode, payload: &[u8]) {
        Frame::new(fin, opcode, payload.to_vec()).write(writer, None).await.unwrap();
    }

    #[tokio::test]
    async fn single_frame_text_message() {
        let (mut client, mut server) = duplex(4096);
        write_frame(&mut client, true, OpCode::Text, b"hello").await;

        let mut state = ReceiveState::new();
        let msg = receive_message(&mut server, &mut state, &WebSocketConfig::default(), Role::Client).await.unwrap();
        assert_eq!(msg, Message::Text("hello".to_string()));
    }

    #[tokio::test]
    async fn fragmented_message_reassembles_across_many_continuations() {
        let (mut client, mut server) = duplex(4096);
        write_frame(&mut client, false, OpCode::Text, b"ab").await;
        write_frame(&mut client, false, OpCode::Continuation, b"cd").await;
        write_frame(&mut client, false, OpCode::Continuation, b"ef").await;
        write_frame(&mut client, true, OpCode::Continuation, b"gh").await;

        let mut state = ReceiveState::new();
        let msg = receive_message(&mut server, &mut state, &WebSocketConfig::default(), Role::Client).await.unwrap();
        assert_eq!(msg, Message::Text("abcdefgh".to_string()));
    }

    #[tokio::test]
    async fn ping_interleaved_mid_reassembly_does_not_disturb_state() {
        let (mut client, mut server) = duplex(4096);
        write_frame(&mut client, false, OpCode::Text, b"ab").await;
        write_frame(&mut client, true, OpCode::Ping, b"are-you-there").await;
        write_frame(&mut client, true, OpCode::Continuation, b"cd").await;

        let mut state = ReceiveState::new();
        let ping = receive_message(&mut server, &mut state, &WebSocketConfig::default(), Role::Client).await.unwrap();
        assert_eq!(ping, Message::Ping(b"are-you-there".to_vec()));
        assert!(matches!(state, ReceiveState::Reassembling { .. }));

        let text = receive_message(&mut server, &mut state, &WebSocketConfig::default(), Role::Client).await.unwrap();
        assert_eq!(text, Message::Text("abcd".to_string()));
        assert!(matches!(state, ReceiveState::Idle));
    }

    #[tokio::test]
    async fn continuation_with_no_message_in_progress_is_rejected() {
        let (mut client, mut server) = duplex(4096);
        write_frame(&mut client, true, OpCode::Continuation, b"orphan").await;

        let mut state = ReceiveState::new();
        let err = receive_message(&mut server, &mut state, &WebSocketConfig::default(), Role::Client).await.unwrap_err();
        assert!(matches!(err, Error::InvalidContinuationFrame));
    }

    #[tokio::test]
    async fn new_data_frame_while_reassembling_is_rejected() {
        let (mut client, mut server) = duplex(4096);
        write_frame(&mut client, false, OpCode::Text, b"ab").await;
        write_frame(&mut client, true, OpCode::Binary, b"cd").await;

        let mut state = ReceiveState::new();
        let err = receive_message(&mut server, &mut state, &WebSocketConfig::default(), Role::Client).await.unwrap_err();
        assert!(matches!(err, Error::InvalidFrameFragmentation));
    }

    #[tokio::test]
    async fn server_role_rejects_unmasked_client_frame() {
        let (mut client, mut server) = duplex(4096);
        write_frame(&mut client, true, OpCode::Text, b"hello").await;

        let mut state = ReceiveState::new();
        let err = receive_message(&mut server, &mut state, &WebSocketConfig::default(), Role::Server).await.unwrap_err();
        assert!(matches!(err, Error::InvalidMaskState));
    }

    #[tokio::test]
    async fn server_role_accepts_masked_client_frame() {
        let (mut client, mut server) = duplex(4096);
        Frame::new(true, OpCode::Text, b"hello".to_vec())
            .write(&mut client, Some([0x11, 0x22, 0x33, 0x44]))
            .await
            .unwrap();

        let mut state = ReceiveState::new();
        let msg = receive_message(&mut server, &mut state, &WebSocketConfig::default(), Role::Server).await.unwrap();
        assert_eq!(msg, Message::Text("hello".to_string()));
    }
}
