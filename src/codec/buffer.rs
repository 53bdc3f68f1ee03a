//! Binary buffer primitives
//!
//! `ByteReader` walks a borrowed byte slice; writers are plain `Vec<u8>`
//! extended through the `put_*` helpers. Multi-byte integers are
//! little-endian. Varints are base-128 with a continuation bit and are
//! capped at 32 bits.

use std::io::Read;

use super::errors::{CodecError, CodecResult};

/// Maximum number of bytes a 32-bit varint may occupy.
const MAX_VARINT_LEN: usize = 5;

/// Appends a base-128 varint.
pub fn put_varint(buf: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Appends a varint length prefix followed by the bytes.
pub fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_varint(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

/// Appends a varint length prefix followed by UTF-8 bytes.
pub fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

/// Folds one varint byte into the accumulated value.
///
/// Returns `Some(value)` once the terminating byte was seen.
fn fold_varint(acc: &mut u32, index: usize, byte: u8) -> CodecResult<Option<u32>> {
    if index >= MAX_VARINT_LEN {
        return Err(CodecError::VarintOverflow);
    }
    let shift = 7 * index as u32;
    let bits = u32::from(byte & 0x7f);
    // Fifth byte may only contribute the top four bits.
    if index == MAX_VARINT_LEN - 1 && bits > 0x0f {
        return Err(CodecError::VarintOverflow);
    }
    *acc |= bits << shift;
    if byte & 0x80 == 0 {
        Ok(Some(*acc))
    } else {
        Ok(None)
    }
}

/// Reads a varint from a stream.
///
/// Returns `Ok(None)` on a clean end of stream before the first byte.
pub fn read_varint<R: Read>(reader: &mut R, context: &'static str) -> CodecResult<Option<u32>> {
    let mut acc = 0u32;
    let mut index = 0usize;
    loop {
        let mut byte = [0u8; 1];
        let n = reader
            .read(&mut byte)
            .map_err(|e| CodecError::Decompress(e.to_string()))?;
        if n == 0 {
            return if index == 0 {
                Ok(None)
            } else {
                Err(CodecError::UnexpectedEof(context))
            };
        }
        if let Some(value) = fold_varint(&mut acc, index, byte[0])? {
            return Ok(Some(value));
        }
        index += 1;
    }
}

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset into the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Takes the next `n` bytes.
    pub fn take(&mut self, n: usize, context: &'static str) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof(context));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self, context: &'static str) -> CodecResult<u8> {
        Ok(self.take(1, context)?[0])
    }

    pub fn u32_le(&mut self, context: &'static str) -> CodecResult<u32> {
        let b = self.take(4, context)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64_le(&mut self, context: &'static str) -> CodecResult<u64> {
        let b = self.take(8, context)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn i64_le(&mut self, context: &'static str) -> CodecResult<i64> {
        Ok(self.u64_le(context)? as i64)
    }

    pub fn f64_le(&mut self, context: &'static str) -> CodecResult<f64> {
        Ok(f64::from_bits(self.u64_le(context)?))
    }

    /// Reads a 32-bit varint.
    pub fn varint(&mut self, context: &'static str) -> CodecResult<u32> {
        let mut acc = 0u32;
        let mut index = 0usize;
        loop {
            let byte = self.u8(context)?;
            if let Some(value) = fold_varint(&mut acc, index, byte)? {
                return Ok(value);
            }
            index += 1;
        }
    }

    /// Reads a varint length prefix and that many bytes.
    pub fn bytes(&mut self, context: &'static str) -> CodecResult<&'a [u8]> {
        let len = self.varint(context)? as usize;
        self.take(len, context)
    }

    /// Reads a varint length prefixed UTF-8 string.
    pub fn str(&mut self, context: &'static str) -> CodecResult<&'a str> {
        let raw = self.bytes(context)?;
        std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8(context))
    }

    /// Fails if any bytes remain.
    pub fn finish(&self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}
