//! Codec error types
//!
//! Every variant is a format error: the bytes or text being decoded do not
//! describe a valid value. None of these are retried.

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Format errors raised while encoding or decoding persisted bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A character outside the transport alphabet (control characters included)
    #[error("invalid transport character {found:?} at offset {offset}")]
    InvalidCharacter { offset: usize, found: char },

    /// The final transport group is too short to carry a byte
    #[error("truncated final transport group of {len} character(s)")]
    TruncatedGroup { len: usize },

    /// The zero-group escape appeared inside a partially read group
    #[error("escape marker inside a transport group at offset {offset}")]
    InvalidEscape { offset: usize },

    /// A five character group decodes to more than 32 bits
    #[error("transport group at offset {offset} overflows 32 bits")]
    GroupOverflow { offset: usize },

    /// A varint continued past 32 bits
    #[error("varint overflows 32 bits")]
    VarintOverflow,

    /// Input ended in the middle of a field
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    /// Unknown value or key tag byte
    #[error("unknown tag 0x{tag:02x} while reading {context}")]
    UnknownTag { tag: u8, context: &'static str },

    /// A string field is not valid UTF-8
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Lists and maps nested past the decoder's limit
    #[error("value nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    /// Timestamp seconds/nanos out of range
    #[error("timestamp out of range")]
    InvalidTimestamp,

    /// Bytes remained after a self-delimited value was fully read
    #[error("{0} trailing byte(s) after value")]
    TrailingBytes(usize),

    /// Block compressor failure
    #[error("compression failed: {0}")]
    Compress(String),

    /// Block decompressor failure (bad frame, block checksum, ...)
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// Content checksum mismatch with the strict checksum policy
    #[error("content checksum mismatch in compressed frame")]
    ContentChecksum,
}
