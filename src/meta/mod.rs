//! Root metadata and side switching
//!
//! Metadata is the single root record. It tracks the schema version history
//! and, for row-store parts and the WAL independently, which of two sides is
//! active. A side only becomes active after it has been fully written; the
//! flip becomes durable when the metadata blob itself is written.

mod errors;
mod metadata;
mod side;

pub use errors::{MetaError, MetaResult};
pub use metadata::{Metadata, PartsMeta, WalMeta};
pub use side::{Side, SidePair};
