use crate::config::Role;
use crate::error::Error;
use crate::frame::{Frame, OpCode};
use crate::mask;
use tokio::io::AsyncWrite;

/// The write half of a connection. Masks outbound frames when `role` is
/// `Role::Client`, per RFC 6455 — servers must never mask, clients always
/// must. Generic over the underlying writer so it can be driven by either a
/// `SocketFlowStream` half or, in tests, a `tokio::io::duplex` half.
pub(crate) struct Writer<W> {
    write_half: W,
    role: Role,
}

impl<W: AsyncWrite + Unpin> Writer<W> {
    pub fn new(write_half: W, role: Role) -> Self {
        Self { write_half, role }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        let mask_key = match self.role {
            Role::Client => Some(mask::generate_mask_key()),
            Role::Server => None,
        };
        frame.write(&mut self.write_half, mask_key).await
    }

    pub async fn write_frames(&mut self, frames: &[Frame]) -> Result<(), Error> {
        for frame in frames {
            self.write_frame(frame).await?;
        }
        Ok(())
    }

    /// Sends a Ping or Pong frame. Rejects payloads over 125 bytes up front
    /// rather than relying on the caller to respect the control-frame size
    /// limit.
    pub async fn write_control(&mut self, opcode: OpCode, payload: Vec<u8>) -> Result<(), Error> {
        if payload.len() > 125 {
            return Err(Error::ControlFramePayloadTooLarge);
        }
        self.write_frame(&Frame::new(true, opcode, payload)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn server_writes_are_never_masked() {
        let (mut peer, server_side) = duplex(4096);
        let mut writer = Writer::new(server_side, Role::Server);
        writer
            .write_frame(&Frame::new(true, OpCode::Text, b"hi".to_vec()))
            .await
            .unwrap();
        drop(writer);

        let mut buf = [0u8; 2];
        tokio::io::AsyncReadExt::read_exact(&mut peer, &mut buf).await.unwrap();
        assert_eq!(buf[1] & 0b1000_0000, 0);
    }

    #[tokio::test]
    async fn client_writes_are_always_masked() {
        let (mut peer, client_side) = duplex(4096);
        let mut writer = Writer::new(client_side, Role::Client);
        writer
            .write_frame(&Frame::new(true, OpCode::Text, b"hi".to_vec()))
            .await
            .unwrap();
        drop(writer);

        let mut buf = [0u8; 2];
        tokio::io::AsyncReadExt::read_exact(&mut peer, &mut buf).await.unwrap();
        assert_ne!(buf[1] & 0b1000_0000, 0);
    }

    #[tokio::test]
    async fn write_control_rejects_oversized_payload() {
        let (_peer, server_side) = duplex(4096);
        let mut writer = Writer::new(server_side, Role::Server);
        let err = writer.write_control(OpCode::Ping, vec![0u8; 126]).await.unwrap_err();
        assert!(matches!(err, Error::ControlFramePayloadTooLarge));
    }
}
