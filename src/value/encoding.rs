//! Row binary encoding
//!
//! A row is encoded as its key followed by its value. Both are tag-prefixed
//! and self-delimiting, and the encoding is deterministic: map entries are
//! written in key order.
//!
//! Value tags:
//!
//! | tag  | variant   | body                                   |
//! |------|-----------|----------------------------------------|
//! | 0x00 | Null      | -                                      |
//! | 0x01 | false     | -                                      |
//! | 0x02 | true      | -                                      |
//! | 0x03 | Number    | f64 LE                                 |
//! | 0x04 | String    | varint len, UTF-8                      |
//! | 0x05 | Bytes     | varint len, bytes                      |
//! | 0x06 | List      | varint count, values                   |
//! | 0x07 | Map       | varint count, (varint len key, value)* |
//! | 0x08 | Timestamp | i64 LE seconds, u32 LE nanoseconds     |
//!
//! Keys are a varint part count followed by parts tagged 0x10 (bool, one
//! byte), 0x11 (i64 LE) or 0x12 (string).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::types::{Key, KeyPart, Value};
use crate::codec::{put_bytes, put_str, put_varint, ByteReader, CodecError, CodecResult};

const TAG_NULL: u8 = 0x00;
const TAG_FALSE: u8 = 0x01;
const TAG_TRUE: u8 = 0x02;
const TAG_NUMBER: u8 = 0x03;
const TAG_STRING: u8 = 0x04;
const TAG_BYTES: u8 = 0x05;
const TAG_LIST: u8 = 0x06;
const TAG_MAP: u8 = 0x07;
const TAG_TIMESTAMP: u8 = 0x08;

const TAG_KEY_BOOL: u8 = 0x10;
const TAG_KEY_INT: u8 = 0x11;
const TAG_KEY_STR: u8 = 0x12;

/// Appends the encoding of `value`.
pub fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Bool(false) => buf.push(TAG_FALSE),
        Value::Bool(true) => buf.push(TAG_TRUE),
        Value::Number(n) => {
            buf.push(TAG_NUMBER);
            buf.extend_from_slice(&n.to_bits().to_le_bytes());
        }
        Value::String(s) => {
            buf.push(TAG_STRING);
            put_str(buf, s);
        }
        Value::Bytes(b) => {
            buf.push(TAG_BYTES);
            put_bytes(buf, b);
        }
        Value::List(items) => {
            buf.push(TAG_LIST);
            put_varint(buf, items.len() as u32);
            for item in items {
                write_value(buf, item);
            }
        }
        Value::Map(entries) => {
            buf.push(TAG_MAP);
            put_varint(buf, entries.len() as u32);
            for (k, v) in entries {
                put_str(buf, k);
                write_value(buf, v);
            }
        }
        Value::Timestamp(t) => {
            buf.push(TAG_TIMESTAMP);
            buf.extend_from_slice(&t.timestamp().to_le_bytes());
            buf.extend_from_slice(&t.timestamp_subsec_nanos().to_le_bytes());
        }
    }
}

/// Deepest list/map nesting accepted when decoding.
pub const MAX_NESTING: usize = 128;

/// Reads one value.
pub fn read_value(reader: &mut ByteReader<'_>) -> CodecResult<Value> {
    read_nested(reader, 0)
}

fn read_nested(reader: &mut ByteReader<'_>, depth: usize) -> CodecResult<Value> {
    let tag = reader.u8("value tag")?;
    let value = match tag {
        TAG_NULL => Value::Null,
        TAG_FALSE => Value::Bool(false),
        TAG_TRUE => Value::Bool(true),
        TAG_NUMBER => Value::Number(reader.f64_le("number")?),
        TAG_STRING => Value::String(reader.str("string")?.to_string()),
        TAG_BYTES => Value::Bytes(reader.bytes("bytes")?.to_vec()),
        TAG_LIST | TAG_MAP if depth >= MAX_NESTING => {
            return Err(CodecError::NestingTooDeep(MAX_NESTING));
        }
        TAG_LIST => {
            let count = reader.varint("list length")? as usize;
            // Every element takes at least one byte.
            let mut items = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                items.push(read_nested(reader, depth + 1)?);
            }
            Value::List(items)
        }
        TAG_MAP => {
            let count = reader.varint("map length")?;
            let mut entries = BTreeMap::new();
            for _ in 0..count {
                let field = reader.str("map key")?.to_string();
                let value = read_nested(reader, depth + 1)?;
                entries.insert(field, value);
            }
            Value::Map(entries)
        }
        TAG_TIMESTAMP => {
            let secs = reader.i64_le("timestamp seconds")?;
            let nanos = reader.u32_le("timestamp nanos")?;
            let t = DateTime::<Utc>::from_timestamp(secs, nanos)
                .ok_or(CodecError::InvalidTimestamp)?;
            Value::Timestamp(t)
        }
        other => {
            return Err(CodecError::UnknownTag {
                tag: other,
                context: "value",
            })
        }
    };
    Ok(value)
}

/// Appends the encoding of `key`.
pub fn write_key(buf: &mut Vec<u8>, key: &Key) {
    put_varint(buf, key.parts().len() as u32);
    for part in key.parts() {
        match part {
            KeyPart::Bool(b) => {
                buf.push(TAG_KEY_BOOL);
                buf.push(u8::from(*b));
            }
            KeyPart::Int(i) => {
                buf.push(TAG_KEY_INT);
                buf.extend_from_slice(&i.to_le_bytes());
            }
            KeyPart::Str(s) => {
                buf.push(TAG_KEY_STR);
                put_str(buf, s);
            }
        }
    }
}

/// Reads one key.
pub fn read_key(reader: &mut ByteReader<'_>) -> CodecResult<Key> {
    let count = reader.varint("key length")? as usize;
    let mut parts = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        let part = match reader.u8("key part tag")? {
            TAG_KEY_BOOL => KeyPart::Bool(reader.u8("key bool")? != 0),
            TAG_KEY_INT => KeyPart::Int(reader.i64_le("key int")?),
            TAG_KEY_STR => KeyPart::Str(reader.str("key string")?.to_string()),
            other => {
                return Err(CodecError::UnknownTag {
                    tag: other,
                    context: "key part",
                })
            }
        };
        parts.push(part);
    }
    Ok(Key::new(parts))
}

/// Encodes a key on its own (used by WAL deletion records).
pub fn encode_key(key: &Key) -> Vec<u8> {
    let mut buf = Vec::new();
    write_key(&mut buf, key);
    buf
}

/// Decodes a key that must span all of `bytes`.
pub fn decode_key(bytes: &[u8]) -> CodecResult<Key> {
    let mut reader = ByteReader::new(bytes);
    let key = read_key(&mut reader)?;
    reader.finish()?;
    Ok(key)
}

/// Encodes a row as key then value.
pub fn encode_row(key: &Key, value: &Value) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32);
    write_key(&mut buf, key);
    write_value(&mut buf, value);
    buf
}

/// Decodes a row that must span all of `bytes`.
pub fn decode_row(bytes: &[u8]) -> CodecResult<(Key, Value)> {
    let mut reader = ByteReader::new(bytes);
    let key = read_key(&mut reader)?;
    let value = read_value(&mut reader)?;
    reader.finish()?;
    Ok((key, value))
}
