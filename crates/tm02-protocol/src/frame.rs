//! Frame encoding/decoding utilities.
//!
//! Every message on the wire is wrapped in the same frame:
//!
//! ```text
//! offset 0        HEAD (0xAA)
//! offset 1        command
//! offset 2        payload length N
//! offset 3..3+N   payload
//! offset 3+N      CRC16 low byte
//! offset 4+N      CRC16 high byte
//! offset 5+N      TAIL (0x55)
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::constants::*;
use crate::crc::{crc16_update, CRC16_INIT};
use crate::error::ProtocolError;
use crate::types::StatusCode;

/// One protocol message: a command code and up to 255 payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: u8,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a frame, rejecting payloads that do not fit the length byte.
    pub fn new(command: u8, payload: impl Into<Vec<u8>>) -> Result<Self, ProtocolError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLong {
                max: MAX_PAYLOAD_LEN,
                actual: payload.len(),
            });
        }
        Ok(Frame { command, payload })
    }

    /// Create a frame with no payload.
    pub fn empty(command: u8) -> Self {
        Frame {
            command,
            payload: Vec::new(),
        }
    }

    /// Create a generic ACK frame answering `command` with `status`.
    pub fn ack(command: u8, status: StatusCode) -> Self {
        Frame {
            command: CMD_ACK,
            payload: vec![command, status.into()],
        }
    }

    /// The command (or response) code.
    pub fn command(&self) -> u8 {
        self.command
    }

    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the frame, returning its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Checksum of this frame (`cmd ++ len ++ payload`).
    pub fn checksum(&self) -> u16 {
        checksum(self.command, &self.payload)
    }

    /// Encode the frame for transmission.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FRAME_OVERHEAD + self.payload.len());
        buf.push(FRAME_HEAD);
        buf.push(self.command);
        buf.push(self.payload.len() as u8);
        buf.extend_from_slice(&self.payload);
        buf.put_u16_le(self.checksum());
        buf.push(FRAME_TAIL);
        buf
    }

    /// Decode exactly one complete frame.
    ///
    /// The slice must hold the whole frame and nothing else; resynchronising
    /// on a byte stream is [`FrameCodec`]'s job.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < FRAME_OVERHEAD {
            return Err(ProtocolError::FrameTooShort {
                expected: FRAME_OVERHEAD,
                actual: data.len(),
            });
        }

        let last = data[data.len() - 1];
        if data[0] != FRAME_HEAD {
            return Err(ProtocolError::BadHead(data[0]));
        }
        if last != FRAME_TAIL {
            return Err(ProtocolError::BadTail(last));
        }

        let command = data[1];
        let declared = data[2] as usize;
        if data.len() != FRAME_OVERHEAD + declared {
            return Err(ProtocolError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        let payload = &data[3..3 + declared];
        let received = u16::from_le_bytes([data[3 + declared], data[4 + declared]]);
        let computed = checksum(command, payload);
        if received != computed {
            return Err(ProtocolError::CrcMismatch { received, computed });
        }

        Ok(Frame {
            command,
            payload: payload.to_vec(),
        })
    }
}

fn checksum(command: u8, payload: &[u8]) -> u16 {
    let crc = crc16_update(CRC16_INIT, &[command, payload.len() as u8]);
    crc16_update(crc, payload)
}

/// A streaming decoder that pulls frames out of a raw byte stream.
///
/// Bytes are pushed as they arrive; [`FrameCodec::decode`] hands back one
/// frame at a time once it is complete, skipping any bytes that cannot be
/// the start of a frame.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl FrameCodec {
    /// Create a new frame codec.
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(MAX_FRAME_LEN * 2),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame from the buffer.
    ///
    /// Returns `None` if more data is needed, `Some(Ok(frame))` for a valid
    /// frame and `Some(Err(_))` when a complete span was rejected. A rejected
    /// span only loses its head byte, since that head may have been a stray
    /// 0xAA with the real frame starting inside the span. While the span at
    /// the head is still incomplete, a complete valid frame at a later head
    /// byte is taken instead of waiting for the rest of the span.
    pub fn decode(&mut self) -> Option<Result<Frame, ProtocolError>> {
        // Scan for the head byte, discarding any preceding garbage
        let skip = self
            .buffer
            .iter()
            .position(|&b| b == FRAME_HEAD)
            .unwrap_or(self.buffer.len());
        if skip > 0 {
            log::trace!("discarding {} bytes before frame head", skip);
            self.buffer.advance(skip);
        }

        match complete_span(&self.buffer) {
            Some(frame_len) => match Frame::decode(&self.buffer[..frame_len]) {
                Ok(frame) => {
                    self.buffer.advance(frame_len);
                    Some(Ok(frame))
                }
                Err(err) => {
                    self.buffer.advance(1);
                    Some(Err(err))
                }
            },
            None => {
                let start = self.later_frame_start()?;
                log::debug!(
                    "skipping {} bytes of incomplete span for a later frame",
                    start
                );
                self.buffer.advance(start);
                self.decode()
            }
        }
    }

    /// Offset of the first head byte after the current one that begins a
    /// complete, valid frame.
    fn later_frame_start(&self) -> Option<usize> {
        self.buffer
            .iter()
            .enumerate()
            .skip(1)
            .filter(|&(_, &b)| b == FRAME_HEAD)
            .map(|(i, _)| i)
            .find(|&i| {
                let rest = &self.buffer[i..];
                complete_span(rest).is_some_and(|len| Frame::decode(&rest[..len]).is_ok())
            })
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Length of the span starting at `buf[0]`, if all of it has arrived.
fn complete_span(buf: &[u8]) -> Option<usize> {
    if buf.len() < FRAME_OVERHEAD {
        return None;
    }
    let frame_len = FRAME_OVERHEAD + buf[2] as usize;
    (buf.len() >= frame_len).then_some(frame_len)
}
