//! Byte-level codecs shared by every persisted format
//!
//! - `buffer`: byte reader, little-endian integers, 32-bit varints
//! - `transport`: base-85 printable text encoding for string slots
//! - `compress`: LZ4 frame compression
//! - `checksum`: CRC32 record checksums

mod buffer;
mod checksum;
mod compress;
mod errors;
pub mod transport;

pub use buffer::{put_bytes, put_str, put_varint, read_varint, ByteReader};
pub use checksum::{compute_checksum, verify_checksum};
pub use compress::{compress, decompress, ChecksumPolicy, FrameSink};
pub use errors::{CodecError, CodecResult};
