use crate::error::Error;
use crate::frame::{Frame, OpCode};

/// An application-level WebSocket message: either a complete Text/Binary
/// payload reassembled from one or more frames, or a control message
/// (Close/Ping/Pong, which are never fragmented on the wire).
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    Close { code: u16, reason: String },
    Ping(Vec<u8>),
    Pong(Vec<u8>),
}

impl Message {
    pub(crate) fn opcode(&self) -> OpCode {
        match self {
            Message::Text(_) => OpCode::Text,
            Message::Binary(_) => OpCode::Binary,
            Message::Close { .. } => OpCode::Close,
            Message::Ping(_) => OpCode::Ping,
            Message::Pong(_) => OpCode::Pong,
        }
    }

    /// Returns the payload as bytes, regardless of variant. Text messages
    /// are re-encoded as UTF-8; Close is encoded as its wire payload.
    pub fn as_binary(&self) -> Vec<u8> {
        match self {
            Message::Text(text) => text.as_bytes().to_vec(),
            Message::Binary(data) => data.clone(),
            Message::Close { code, reason } => Message::close_payload(*code, reason),
            Message::Ping(data) | Message::Pong(data) => data.clone(),
        }
    }

    /// Builds the Close payload: a big-endian 16-bit code followed by an
    /// optional UTF-8 reason.
    pub(crate) fn close_payload(code: u16, reason: &str) -> Vec<u8> {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        payload
    }

    /// Converts a reassembled data frame into a `Message`. Only ever called
    /// with `Text`/`Binary` frames — control frames go through
    /// `from_control_frame` instead.
    pub(crate) fn from_data_frame(opcode: OpCode, payload: Vec<u8>) -> Result<Self, Error> {
        match opcode {
            OpCode::Text => Ok(Message::Text(
                String::from_utf8(payload).map_err(|_| Error::InvalidUtf8)?,
            )),
            OpCode::Binary => Ok(Message::Binary(payload)),
            _ => Err(Error::InvalidOpcode),
        }
    }

    pub(crate) fn from_control_frame(frame: Frame) -> Result<Self, Error> {
        match frame.opcode {
            OpCode::Close => {
                if frame.payload.is_empty() {
                    return Ok(Message::Close {
                        code: 1000,
                        reason: String::new(),
                    });
                }
                if frame.payload.len() < 2 {
                    return Err(Error::InvalidOpcode);
                }
                let code = u16::from_be_bytes([frame.payload[0], frame.payload[1]]);
                let reason = String::from_utf8(frame.payload[2..].to_vec())
                    .map_err(|_| Error::InvalidUtf8)?;
                Ok(Message::Close { code, reason })
            }
            OpCode::Ping => Ok(Message::Ping(frame.payload)),
            OpCode::Pong => Ok(Message::Pong(frame.payload)),
            _ => Err(Error::InvalidOpcode),
        }
    }

    /// Splits this message into a sequence of frames no larger than
    /// `max_frame_size` bytes each. Text/Binary messages larger than one
    /// frame are fragmented with a Continuation opcode on every frame but
    /// the first; Close/Ping/Pong are never fragmented, and are rejected
    /// up front if their payload would exceed the 125-byte control-frame
    /// limit rather than being serialized into an invalid frame.
    pub(crate) fn into_frames(self, max_frame_size: usize) -> Result<Vec<Frame>, Error> {
        let opcode = self.opcode();

        let payload = match self {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(data) => data,
            Message::Close { code, reason } => Message::close_payload(code, &reason),
            Message::Ping(data) | Message::Pong(data) => data,
        };

        if opcode.is_control() {
            if payload.len() > 125 {
                return Err(Error::ControlFramePayloadTooLarge);
            }
            return Ok(vec![Frame::new(true, opcode, payload)]);
        }

        if payload.is_empty() {
            return Ok(vec![Frame::new(true, opcode, payload)]);
        }

        let mut frames: Vec<Frame> = Vec::new();
        for chunk in payload.chunks(max_frame_size) {
            let chunk_opcode = if frames.is_empty() { opcode } else { OpCode::Continuation };
            frames.push(Frame::new(false, chunk_opcode, chunk.to_vec()));
        }
        if let Some(last) = frames.last_mut() {
            last.fin = true;
        }
        Ok(frames)
    }
}
