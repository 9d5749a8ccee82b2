//! Field-level wire primitives.
//!
//! Integers are little-endian. Variable-length fields are a u32 length
//! followed by the data:
//!   high bit clear: UTF-8/ASCII byte count, data zero-padded to 4 bytes
//!   high bit set:   low 31 bits / 2 = UTF-16LE code units, no padding
//!
//! Encoding writes through any `BufMut` (a `&mut [u8]` over a pre-sized
//! payload works, and panics on overflow). Decoding goes through `Reader`,
//! which short-circuits: the first short read marks it failed, and every
//! later read returns a zero value without touching the buffer. Callers
//! decode a whole record and check once.

use bytes::BufMut;

use crate::{ProtocolError, Result};

/// High bit of a string length marks UTF-16 content.
pub const UTF16_FLAG: u32 = 0x8000_0000;

/// Round `n` up to the next multiple of 4.
pub const fn round_to_4(n: usize) -> usize {
    (n + 3) & !3
}

/// Encoded size of a byte blob: length word plus padded data.
pub const fn bytes_size(len: usize) -> usize {
    4 + round_to_4(len)
}

/// Encoded size of a UTF-8 string field.
pub fn string_size(s: &str) -> usize {
    bytes_size(s.len())
}

/// Append a length-prefixed, zero-padded byte blob.
///
/// The length word carries the padded size, matching what the controller
/// expects for requests.
pub fn put_bytes<B: BufMut>(dst: &mut B, data: &[u8]) {
    let size = round_to_4(data.len());
    dst.put_u32_le(size as u32);
    dst.put_slice(data);
    dst.put_bytes(0, size - data.len());
}

/// Append a length-prefixed, zero-padded UTF-8 string.
pub fn put_string<B: BufMut>(dst: &mut B, s: &str) {
    put_bytes(dst, s.as_bytes());
}

/// Append a UTF-16LE string with the high-bit length flag and no padding.
pub fn put_utf16_string<B: BufMut>(dst: &mut B, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    dst.put_u32_le(UTF16_FLAG | (units.len() as u32 * 2));
    for unit in units {
        dst.put_u16_le(unit);
    }
}

/// Short-circuiting cursor over a payload.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    ok: bool,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, ok: true }
    }

    /// Whether every read so far succeeded.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.buf
    }

    fn fail(&mut self) {
        self.ok = false;
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if !self.ok || self.buf.len() < n {
            self.fail();
            return None;
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Some(head)
    }

    fn take_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(b) = self.take(N) {
            out.copy_from_slice(b);
        }
        out
    }

    pub fn u8(&mut self) -> u8 {
        self.take_array::<1>()[0]
    }

    /// Read `N` consecutive bytes in one step.
    pub fn u8s<const N: usize>(&mut self) -> [u8; N] {
        self.take_array::<N>()
    }

    pub fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take_array())
    }

    pub fn i16(&mut self) -> i16 {
        i16::from_le_bytes(self.take_array())
    }

    pub fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take_array())
    }

    pub fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take_array())
    }

    /// Read `N` u16 values; fails as a whole if fewer than `2 * N` bytes remain.
    pub fn u16s<const N: usize>(&mut self) -> [u16; N] {
        let mut out = [0u16; N];
        if let Some(b) = self.take(2 * N) {
            for (v, chunk) in out.iter_mut().zip(b.chunks_exact(2)) {
                *v = u16::from_le_bytes([chunk[0], chunk[1]]);
            }
        }
        out
    }

    /// Read `N` u32 values; fails as a whole if fewer than `4 * N` bytes remain.
    pub fn u32s<const N: usize>(&mut self) -> [u32; N] {
        let mut out = [0u32; N];
        if let Some(b) = self.take(4 * N) {
            for (v, chunk) in out.iter_mut().zip(b.chunks_exact(4)) {
                *v = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
        }
        out
    }

    /// Read `N` i32 values; fails as a whole if fewer than `4 * N` bytes remain.
    pub fn i32s<const N: usize>(&mut self) -> [i32; N] {
        self.u32s::<N>().map(|v| v as i32)
    }

    pub fn skip(&mut self, n: usize) {
        self.take(n);
    }

    /// Read a length-prefixed string.
    ///
    /// UTF-8 strings consume their padding and drop trailing NULs (requests
    /// carry the padded length). UTF-16 strings consume no padding.
    pub fn string(&mut self) -> String {
        if !self.ok || self.buf.len() < 4 {
            self.fail();
            return String::new();
        }
        let len = u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        let body = &self.buf[4..];

        if len & UTF16_FLAG == 0 {
            let n = len as usize;
            let padded = round_to_4(n);
            if body.len() < padded {
                self.fail();
                return String::new();
            }
            let text = String::from_utf8_lossy(&body[..n])
                .trim_end_matches('\0')
                .to_string();
            self.buf = &body[padded..];
            return text;
        }

        let units = ((len & !UTF16_FLAG) / 2) as usize;
        let n = units * 2;
        if body.len() < n {
            self.fail();
            return String::new();
        }
        let code_units: Vec<u16> = body[..n]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        self.buf = &body[n..];
        String::from_utf16_lossy(&code_units)
    }

    /// Fail with `InvalidResponse` if any read came up short.
    pub fn check(&self, context: &str) -> Result<()> {
        if !self.ok {
            return Err(ProtocolError::InvalidResponse(format!(
                "{context}: message too small"
            )));
        }
        Ok(())
    }

    /// Like `check`, but also rejects unconsumed trailing bytes.
    pub fn finish(self, context: &str) -> Result<()> {
        self.check(context)?;
        if !self.buf.is_empty() {
            tracing::debug!(
                context,
                trailing = %hex::encode(self.buf),
                "unconsumed payload bytes"
            );
            return Err(ProtocolError::InvalidResponse(format!(
                "{context}: spurious data ({} trailing bytes)",
                self.buf.len()
            )));
        }
        Ok(())
    }
}
