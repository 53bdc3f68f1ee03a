//! Block codec: LZ4 frame compression
//!
//! Frames carry the standard LZ4 frame layout (magic, frame descriptor,
//! blocks, end mark) with xxh32 block checksums and a content checksum.
//!
//! # Content checksum policy
//!
//! A block checksum mismatch is always a format error. A content checksum
//! mismatch is governed by [`ChecksumPolicy`]: `Strict` fails the decode,
//! `Lenient` logs a warning and keeps the bytes already produced (every
//! block has passed its own checksum by then).

use std::io::{Read, Write};

use lz4_flex::frame::{BlockSize, FrameDecoder, FrameEncoder, FrameInfo};
use serde::{Deserialize, Serialize};

use super::errors::{CodecError, CodecResult};

/// What to do when a frame's content checksum does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Fail the decode.
    #[default]
    Strict,
    /// Log and accept the decoded bytes.
    Lenient,
}

fn frame_info() -> FrameInfo {
    FrameInfo::new()
        .block_size(BlockSize::Max64KB)
        .block_checksums(true)
        .content_checksum(true)
}

/// Streaming compressor writing one LZ4 frame into `W`.
pub struct FrameSink<W: Write> {
    encoder: FrameEncoder<W>,
    written: u64,
}

impl<W: Write> FrameSink<W> {
    /// Start a frame on top of `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            encoder: FrameEncoder::with_frame_info(frame_info(), inner),
            written: 0,
        }
    }

    /// Feed uncompressed bytes.
    pub fn write_all(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.encoder
            .write_all(bytes)
            .map_err(|e| CodecError::Compress(e.to_string()))?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Uncompressed bytes fed so far.
    pub fn uncompressed_len(&self) -> u64 {
        self.written
    }

    /// Write the end mark and content checksum, returning the sink.
    pub fn finish(self) -> CodecResult<W> {
        self.encoder
            .finish()
            .map_err(|e| CodecError::Compress(e.to_string()))
    }
}

/// Compresses a whole buffer into a single frame.
pub fn compress(bytes: &[u8]) -> CodecResult<Vec<u8>> {
    let mut sink = FrameSink::new(Vec::with_capacity(bytes.len() / 2 + 32));
    sink.write_all(bytes)?;
    sink.finish()
}

/// Decompresses every frame in `bytes`.
pub fn decompress(bytes: &[u8], policy: ChecksumPolicy) -> CodecResult<Vec<u8>> {
    let mut decoder = FrameDecoder::new(bytes);
    let mut out = Vec::with_capacity(bytes.len() * 2);

    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(e) if is_content_checksum_error(&e) => match policy {
            ChecksumPolicy::Strict => Err(CodecError::ContentChecksum),
            ChecksumPolicy::Lenient => {
                tracing::warn!(
                    decoded_bytes = out.len(),
                    "content checksum mismatch tolerated by lenient policy"
                );
                Ok(out)
            }
        },
        Err(e) => Err(CodecError::Decompress(e.to_string())),
    }
}

fn is_content_checksum_error(err: &std::io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<lz4_flex::frame::Error>())
        .map(|inner| matches!(inner, lz4_flex::frame::Error::ContentChecksumError))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LZ4_MAGIC: [u8; 4] = [0x04, 0x22, 0x4d, 0x18];

    #[test]
    fn test_frame_starts_with_lz4_magic() {
        let framed = compress(b"hello").unwrap();
        assert_eq!(&framed[..4], &LZ4_MAGIC);
    }

    #[test]
    fn test_empty_input_roundtrip() {
        let framed = compress(&[]).unwrap();
        assert_eq!(decompress(&framed, ChecksumPolicy::Strict).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_large_repetitive_input_shrinks() {
        let data: Vec<u8> = b"row-payload-".iter().cycle().take(200_000).copied().collect();
        let framed = compress(&data).unwrap();
        assert!(framed.len() < data.len() / 4);
        assert_eq!(decompress(&framed, ChecksumPolicy::Strict).unwrap(), data);
    }

    #[test]
    fn test_streaming_sink_matches_length() {
        let mut sink = FrameSink::new(Vec::new());
        sink.write_all(b"abc").unwrap();
        sink.write_all(b"def").unwrap();
        assert_eq!(sink.uncompressed_len(), 6);
        let framed = sink.finish().unwrap();
        assert_eq!(decompress(&framed, ChecksumPolicy::Strict).unwrap(), b"abcdef");
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = decompress(b"definitely not a frame", ChecksumPolicy::Lenient);
        assert!(matches!(result, Err(CodecError::Decompress(_))));
    }

    #[test]
    fn test_content_checksum_policy() {
        let mut framed = compress(b"checksummed content").unwrap();
        // Last four bytes are the content checksum.
        let n = framed.len();
        framed[n - 1] ^= 0xff;

        assert_eq!(
            decompress(&framed, ChecksumPolicy::Strict),
            Err(CodecError::ContentChecksum)
        );
        assert_eq!(
            decompress(&framed, ChecksumPolicy::Lenient).unwrap(),
            b"checksummed content"
        );
    }
}
