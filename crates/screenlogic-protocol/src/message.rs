//! Message envelope: 8-byte header plus payload in one buffer.
//!
//! Header layout (little-endian):
//!   [0..2] sequence id
//!   [2..4] message code
//!   [4..8] payload size

use std::fmt;

use bytes::BytesMut;

use crate::codes::{error_for_code, MsgCode};
use crate::{ProtocolError, Result};

/// Header size in bytes.
pub const HEADER_SIZE: usize = 8;

/// A complete message. Always at least `HEADER_SIZE` bytes long.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    buf: BytesMut,
}

impl Message {
    /// Build a message whose payload is a copy of `payload`.
    pub fn new(id: u16, code: u16, payload: &[u8]) -> Self {
        let mut msg = Self::empty(id, code, payload.len() as u32);
        msg.payload_mut().copy_from_slice(payload);
        msg
    }

    /// Build a message with a zero-filled payload of `size` bytes, ready to be
    /// filled in place through `payload_mut`.
    pub fn empty(id: u16, code: u16, size: u32) -> Self {
        let mut msg = Self {
            buf: BytesMut::zeroed(HEADER_SIZE + size as usize),
        };
        msg.set_id(id);
        msg.set_code(code);
        msg.set_size(size);
        msg
    }

    /// Wrap received bytes. Anything shorter than a header is rejected.
    pub fn from_bytes(buf: BytesMut) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(ProtocolError::InvalidResponse(format!(
                "message too small: ({} < {HEADER_SIZE})",
                buf.len()
            )));
        }
        Ok(Self { buf })
    }

    pub fn id(&self) -> u16 {
        u16::from_le_bytes([self.buf[0], self.buf[1]])
    }

    pub fn code(&self) -> u16 {
        u16::from_le_bytes([self.buf[2], self.buf[3]])
    }

    /// Declared payload size from the header.
    pub fn size(&self) -> u32 {
        u32::from_le_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buf[HEADER_SIZE..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[HEADER_SIZE..]
    }

    pub fn set_id(&mut self, id: u16) {
        self.buf[0..2].copy_from_slice(&id.to_le_bytes());
    }

    pub fn set_code(&mut self, code: u16) {
        self.buf[2..4].copy_from_slice(&code.to_le_bytes());
    }

    pub fn set_size(&mut self, size: u32) {
        self.buf[4..8].copy_from_slice(&size.to_le_bytes());
    }

    /// The whole message, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Length on the wire, header included.
    pub fn wire_len(&self) -> usize {
        self.buf.len()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id())
            .field("code", &self.code())
            .field("size", &self.size())
            .finish()
    }
}

/// Whether `m` answers request `id`/`code`.
///
/// A controller error code is surfaced as `Err` regardless of id, so the
/// caller never retries it.
pub fn is_response(m: &Message, id: u16, code: MsgCode) -> Result<bool> {
    if let Some(err) = error_for_code(m.code()) {
        return Err(err);
    }
    Ok(m.code() == code.response_code() && m.id() == id)
}

/// Check that `m` is the successful response to request `id`/`code`.
pub fn validate_response(m: &Message, id: u16, code: MsgCode) -> Result<()> {
    if m.wire_len() < HEADER_SIZE {
        return Err(ProtocolError::InvalidResponse(format!(
            "message too small: ({} < {HEADER_SIZE})",
            m.wire_len()
        )));
    }
    if m.code() == code.response_code() {
        return Ok(());
    }
    if m.id() != id {
        return Err(ProtocolError::UnexpectedResponseId {
            expected: id,
            got: m.id(),
        });
    }
    if let Some(err) = error_for_code(m.code()) {
        return Err(err);
    }
    Err(ProtocolError::UnexpectedResponseCode {
        expected: code.response_code(),
        got: m.code(),
    })
}
