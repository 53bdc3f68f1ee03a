//! Row payload vocabulary
//!
//! - `Value`: the closed sum type of storable payloads
//! - `Key` / `KeyPart`: ordered row keys
//! - `Row`: table id, key and payload
//! - row binary encoding (deterministic, self-delimiting)
//! - `Storable`: typed conversion used by table handles

mod encoding;
mod storable;
mod types;

pub use encoding::{
    decode_key, decode_row, encode_key, encode_row, read_key, read_value, write_key, write_value,
    MAX_NESTING,
};
pub use storable::{ConversionError, Json, Storable};
pub use types::{Key, KeyPart, Row, Value};
