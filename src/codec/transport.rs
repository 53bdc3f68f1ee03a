//! Printable transport codec
//!
//! Slot values are strings, so every persisted byte sequence passes through
//! a base-85 text encoding before it reaches a slot:
//!
//! - Bytes are taken four at a time as a big-endian `u32` and written as
//!   five digits in the alphabet `'!'..='u'`.
//! - A full group of four zero bytes is written as the single escape `'z'`.
//! - A final group of `n < 4` bytes is zero padded and only its first
//!   `n + 1` digits are written.
//!
//! Decoding rejects any character outside the alphabet (control characters
//! and whitespace included), an escape inside a partial group, a one-digit
//! final group, and five-digit groups whose value exceeds 32 bits.

use super::errors::{CodecError, CodecResult};

const BASE: u32 = 85;
const FIRST: u8 = b'!';
const LAST: u8 = b'u';
const ZERO_GROUP: u8 = b'z';

/// Encodes bytes into printable text.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() / 4 * 5 + 5);
    let mut chunks = bytes.chunks_exact(4);

    for group in &mut chunks {
        let value = u32::from_be_bytes([group[0], group[1], group[2], group[3]]);
        if value == 0 {
            out.push(ZERO_GROUP as char);
        } else {
            push_digits(&mut out, value, 5);
        }
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut padded = [0u8; 4];
        padded[..tail.len()].copy_from_slice(tail);
        push_digits(&mut out, u32::from_be_bytes(padded), tail.len() + 1);
    }

    out
}

fn push_digits(out: &mut String, mut value: u32, keep: usize) {
    let mut digits = [0u8; 5];
    for slot in digits.iter_mut().rev() {
        *slot = (value % BASE) as u8 + FIRST;
        value /= BASE;
    }
    for &d in &digits[..keep] {
        out.push(d as char);
    }
}

/// Decodes printable text back into bytes.
pub fn decode(text: &str) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() / 5 * 4 + 4);
    let mut group = [0u8; 5];
    let mut filled = 0usize;
    let mut group_start = 0usize;

    for (offset, ch) in text.char_indices() {
        let byte = match u8::try_from(ch) {
            Ok(b) => b,
            Err(_) => return Err(CodecError::InvalidCharacter { offset, found: ch }),
        };

        if byte == ZERO_GROUP {
            if filled != 0 {
                return Err(CodecError::InvalidEscape { offset });
            }
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }

        if !(FIRST..=LAST).contains(&byte) {
            return Err(CodecError::InvalidCharacter { offset, found: ch });
        }

        if filled == 0 {
            group_start = offset;
        }
        group[filled] = byte - FIRST;
        filled += 1;

        if filled == 5 {
            let value = group_value(&group, group_start)?;
            out.extend_from_slice(&value.to_be_bytes());
            filled = 0;
        }
    }

    match filled {
        0 => {}
        1 => return Err(CodecError::TruncatedGroup { len: 1 }),
        n => {
            // Pad with the highest digit so truncation rounds back down.
            for slot in group.iter_mut().skip(n) {
                *slot = LAST - FIRST;
            }
            let value = group_value(&group, group_start)?;
            out.extend_from_slice(&value.to_be_bytes()[..n - 1]);
        }
    }

    Ok(out)
}

fn group_value(digits: &[u8; 5], offset: usize) -> CodecResult<u32> {
    let mut acc: u64 = 0;
    for &d in digits {
        acc = acc * u64::from(BASE) + u64::from(d);
    }
    u32::try_from(acc).map_err(|_| CodecError::GroupOverflow { offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_zero_group_escape() {
        assert_eq!(encode(&[0, 0, 0, 0]), "z");
        assert_eq!(decode("zz").unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn test_partial_zero_group_is_not_escaped() {
        let text = encode(&[0, 0]);
        assert_eq!(text, "!!!");
        assert_eq!(decode(&text).unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_known_vector() {
        // "Man " -> 9jqo^ in classic base-85
        assert_eq!(encode(b"Man "), "9jqo^");
        assert_eq!(decode("9jqo^").unwrap(), b"Man ".to_vec());
    }

    #[test]
    fn test_all_tail_lengths_roundtrip() {
        let data: Vec<u8> = (0u8..=255).collect();
        for len in 0..12 {
            let slice = &data[250 - len..250];
            let text = encode(slice);
            assert_eq!(decode(&text).unwrap(), slice, "len {}", len);
        }
    }

    #[test]
    fn test_output_is_printable() {
        let data: Vec<u8> = (0u8..=255).cycle().take(1024).collect();
        let text = encode(&data);
        assert!(text.bytes().all(|b| (b'!'..=b'z').contains(&b)));
    }

    #[test]
    fn test_control_character_rejected() {
        let err = decode("9jq\no^").unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidCharacter {
                offset: 3,
                found: '\n'
            }
        );
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(matches!(
            decode("9jqé"),
            Err(CodecError::InvalidCharacter { found: 'é', .. })
        ));
    }

    #[test]
    fn test_truncated_final_group() {
        assert_eq!(
            decode("9jqo^9").unwrap_err(),
            CodecError::TruncatedGroup { len: 1 }
        );
    }

    #[test]
    fn test_escape_inside_group() {
        assert_eq!(
            decode("9jz").unwrap_err(),
            CodecError::InvalidEscape { offset: 2 }
        );
    }

    #[test]
    fn test_group_overflow() {
        assert_eq!(
            decode("uuuuu").unwrap_err(),
            CodecError::GroupOverflow { offset: 0 }
        );
    }
}
