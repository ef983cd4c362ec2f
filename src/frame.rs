use crate::error::Error;
use crate::mask;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest possible payload this crate will buffer for a single frame.
/// The wire format allows up to 2^63-1 bytes; we cap it far below that so a
/// hostile peer can't force an unbounded allocation before any size limit
/// from `WebSocketConfig` even gets consulted.
pub const MAX_PAYLOAD_SIZE: u64 = 1 << 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    pub fn as_u8(&self) -> u8 {
        match self {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Error> {
        match byte {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            _ => Err(Error::InvalidOpcode),
        }
    }
}

/// Parsed form of a single frame's metadata, decoded ahead of its payload.
#[derive(Debug, Clone)]
pub(crate) struct FrameHeader {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: OpCode,
    pub masked: bool,
    pub payload_len: u64,
    pub mask: Option<[u8; 4]>,
}

impl FrameHeader {
    /// Reads the 2-byte base header, any extended length, and any masking
    /// key off `reader`. Does not read the payload itself.
    pub async fn decode<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, Error> {
        let mut base = [0u8; 2];
        reader.read_exact(&mut base).await?;

        let fin = (base[0] & 0b1000_0000) != 0;
        let rsv1 = (base[0] & 0b0100_0000) != 0;
        let rsv2 = (base[0] & 0b0010_0000) != 0;
        let rsv3 = (base[0] & 0b0001_0000) != 0;
        let opcode = OpCode::try_from(base[0] & 0b0000_1111)?;

        if rsv1 || rsv2 || rsv3 {
            return Err(Error::RsvNotZero);
        }

        if !fin && opcode.is_control() {
            return Err(Error::ControlFrameFragmented);
        }

        let masked = (base[1] & 0b1000_0000) != 0;
        let len7 = base[1] & 0b0111_1111;

        if len7 > 125 && opcode.is_control() {
            return Err(Error::ControlFramePayloadTooLarge);
        }

        let payload_len = match len7 {
            126 => {
                let mut ext = [0u8; 2];
                reader.read_exact(&mut ext).await?;
                u16::from_be_bytes(ext) as u64
            }
            127 => {
                let mut ext = [0u8; 8];
                reader.read_exact(&mut ext).await?;
                u64::from_be_bytes(ext)
            }
            n => n as u64,
        };

        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(Error::MaxFrameSize);
        }

        let mask = if masked {
            let mut key = [0u8; 4];
            reader.read_exact(&mut key).await?;
            Some(key)
        } else {
            None
        };

        Ok(FrameHeader {
            fin,
            rsv1,
            rsv2,
            rsv3,
            opcode,
            masked,
            payload_len,
            mask,
        })
    }

    /// Builds the 2/4/10-byte header prefix, plus masking key if `mask` is
    /// `Some`, for a frame carrying `payload_len` bytes. Uses the shortest
    /// length encoding legal for the given size.
    pub fn encode(fin: bool, opcode: OpCode, mask: Option<[u8; 4]>, payload_len: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(14);
        let first_byte = ((fin as u8) << 7) | opcode.as_u8();
        out.push(first_byte);

        let mask_bit: u8 = if mask.is_some() { 0b1000_0000 } else { 0 };

        if payload_len <= 125 {
            out.push(mask_bit | payload_len as u8);
        } else if payload_len <= 0xFFFF {
            out.push(mask_bit | 126);
            out.extend_from_slice(&(payload_len as u16).to_be_bytes());
        } else {
            out.push(mask_bit | 127);
            out.extend_from_slice(&payload_len.to_be_bytes());
        }

        if let Some(key) = mask {
            out.extend_from_slice(&key);
        }

        out
    }
}

/// A single wire frame: header metadata plus its (already unmasked) payload.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self { fin, opcode, payload }
    }

    /// Reads one complete frame (header + payload) off `reader`, unmasking
    /// the payload in place if the header carried a mask. `expect_masked`
    /// is the mask state this role must see on every inbound frame (a
    /// server must see masked client frames, a client must see unmasked
    /// server frames); a mismatch is a protocol error, checked right after
    /// the header decode and before any payload is read, so a violating
    /// peer can't force allocation of an attacker-chosen-length buffer.
    pub async fn read<R: AsyncRead + Unpin>(
        reader: &mut R,
        max_frame_size: usize,
        expect_masked: bool,
    ) -> Result<Self, Error> {
        let header = FrameHeader::decode(reader).await?;

        if header.masked != expect_masked {
            return Err(Error::InvalidMaskState);
        }

        if header.payload_len > max_frame_size as u64 {
            return Err(Error::MaxFrameSize);
        }

        let mut payload = vec![0u8; header.payload_len as usize];
        reader.read_exact(&mut payload).await?;

        if let Some(key) = header.mask {
            mask::apply_mask(key, &mut payload);
        }

        Ok(Frame::new(header.fin, header.opcode, payload))
    }

    /// Serializes and writes this frame to `writer`. When `mask_key` is
    /// `Some` (client role), the payload is masked into a fresh copy before
    /// writing — the caller's original buffer is never mutated.
    pub async fn write<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        mask_key: Option<[u8; 4]>,
    ) -> Result<(), Error> {
        let header = FrameHeader::encode(self.fin, self.opcode, mask_key, self.payload.len() as u64);
        writer.write_all(&header).await?;

        match mask_key {
            Some(key) => {
                let mut masked = self.payload.clone();
                mask::apply_mask(key, &mut masked);
                writer.write_all(&masked).await?;
            }
            None => {
                writer.write_all(&self.payload).await?;
            }
        }

        Ok(())
    }
}
