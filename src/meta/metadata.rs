//! Root metadata
//!
//! Owns the schema version history and both side pairs. Serialised into one
//! printable string small enough for a single slot:
//!
//! ```text
//! 'META' | 0x01 | registry | txn high water (u64 LE)
//!        | parts: active side tag | PartsMeta A | PartsMeta B
//!        | wal:   active side tag | WalMeta A   | WalMeta B
//!        | CRC32 of everything above (u32 LE)
//! ```
//!
//! Descriptors are a pair of varints (schema version, chunk count).

use serde::Serialize;

use super::errors::{MetaError, MetaResult};
use super::side::{Side, SidePair};
use crate::codec::{compute_checksum, put_varint, transport, ByteReader};
use crate::schema::{SchemaRegistry, SchemaResult, VersionDecl};

const META_MAGIC: &[u8; 4] = b"META";
const META_FORMAT_VERSION: u8 = 0x01;

/// Row-store snapshot descriptor for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartsMeta {
    /// Schema version the snapshot was written with
    pub version: u32,
    /// Number of string chunks holding the snapshot text
    pub chunks: u32,
}

/// Write-ahead log descriptor for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalMeta {
    pub version: u32,
    pub chunks: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    registry: SchemaRegistry,
    parts: SidePair<PartsMeta>,
    wal: SidePair<WalMeta>,
    txn_high_water: u64,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new schema version. Fails if `num` was declared before.
    pub fn version(&mut self, num: u32) -> SchemaResult<VersionDecl<'_>> {
        self.registry.version(num)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    pub fn active_parts(&self) -> &PartsMeta {
        self.parts.active()
    }

    pub fn inactive_parts(&self) -> &PartsMeta {
        self.parts.inactive()
    }

    pub fn inactive_parts_mut(&mut self) -> &mut PartsMeta {
        self.parts.inactive_mut()
    }

    pub fn active_wal(&self) -> &WalMeta {
        self.wal.active()
    }

    pub fn inactive_wal(&self) -> &WalMeta {
        self.wal.inactive()
    }

    pub fn inactive_wal_mut(&mut self) -> &mut WalMeta {
        self.wal.inactive_mut()
    }

    pub fn parts_side(&self) -> Side {
        self.parts.active_side()
    }

    pub fn wal_side(&self) -> Side {
        self.wal.active_side()
    }

    pub fn parts(&self) -> &SidePair<PartsMeta> {
        &self.parts
    }

    pub fn wal(&self) -> &SidePair<WalMeta> {
        &self.wal
    }

    /// Flips the active parts side.
    ///
    /// Call only once the inactive side has been completely written.
    pub fn switch_parts(&mut self) {
        self.parts.switch();
    }

    /// Flips the active WAL side.
    ///
    /// Call only once the inactive side has been completely written.
    pub fn switch_wal(&mut self) {
        self.wal.switch();
    }

    /// Highest transaction id known to be persisted.
    pub fn txn_high_water(&self) -> u64 {
        self.txn_high_water
    }

    pub(crate) fn raise_txn_high_water(&mut self, id: u64) {
        self.txn_high_water = self.txn_high_water.max(id);
    }

    pub fn serialise(&self) -> String {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(META_MAGIC);
        buf.push(META_FORMAT_VERSION);
        self.registry.encode(&mut buf);
        buf.extend_from_slice(&self.txn_high_water.to_le_bytes());

        buf.push(self.parts.active_side().tag());
        for side in [Side::A, Side::B] {
            let parts = self.parts.get(side);
            put_varint(&mut buf, parts.version);
            put_varint(&mut buf, parts.chunks);
        }
        buf.push(self.wal.active_side().tag());
        for side in [Side::A, Side::B] {
            let wal = self.wal.get(side);
            put_varint(&mut buf, wal.version);
            put_varint(&mut buf, wal.chunks);
        }

        let checksum = compute_checksum(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        transport::encode(&buf)
    }

    pub fn deserialise(text: &str) -> MetaResult<Self> {
        let bytes = transport::decode(text)?;
        if bytes.len() < META_MAGIC.len() + 1 + 4 || &bytes[..4] != META_MAGIC {
            return Err(MetaError::BadMagic);
        }
        if bytes[4] != META_FORMAT_VERSION {
            return Err(MetaError::UnsupportedVersion(bytes[4]));
        }

        let (body, trailer) = bytes.split_at(bytes.len() - 4);
        let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let computed = compute_checksum(body);
        if stored != computed {
            return Err(MetaError::ChecksumMismatch { stored, computed });
        }

        let mut reader = ByteReader::new(&body[5..]);
        let registry = SchemaRegistry::decode(&mut reader)?;
        let txn_high_water = reader.u64_le("txn high water")?;

        let parts_active = Side::from_tag(reader.u8("parts side")?)?;
        let parts_a = PartsMeta {
            version: reader.varint("parts version")?,
            chunks: reader.varint("parts chunks")?,
        };
        let parts_b = PartsMeta {
            version: reader.varint("parts version")?,
            chunks: reader.varint("parts chunks")?,
        };
        let wal_active = Side::from_tag(reader.u8("wal side")?)?;
        let wal_a = WalMeta {
            version: reader.varint("wal version")?,
            chunks: reader.varint("wal chunks")?,
        };
        let wal_b = WalMeta {
            version: reader.varint("wal version")?,
            chunks: reader.varint("wal chunks")?,
        };
        reader.finish()?;

        Ok(Self {
            registry,
            parts: SidePair::new(parts_a, parts_b, parts_active),
            wal: SidePair::new(wal_a, wal_b, wal_active),
            txn_high_water,
        })
    }
}
