//! Header-delimited codec for controller TCP streams.
//!
//! Wire format: 8-byte header (id u16 LE, code u16 LE, size u32 LE) followed
//! by `size` payload bytes. There are no other frame delimiters.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::message::{Message, HEADER_SIZE};
use crate::ProtocolError;

/// Maximum payload size: 1 MB (config responses are a few KB).
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Offset of the payload size within the header.
const SIZE_OFFSET: usize = 4;

/// Codec for framing `Message` values over a byte stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageCodec;

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Need at least the header
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        // Peek at the payload size
        let size = u32::from_le_bytes([
            src[SIZE_OFFSET],
            src[SIZE_OFFSET + 1],
            src[SIZE_OFFSET + 2],
            src[SIZE_OFFSET + 3],
        ]) as usize;

        if size > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        // Check if we have the full message
        let total = HEADER_SIZE + size;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total);
        Message::from_bytes(frame).map(Some)
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload().len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: item.payload().len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}
