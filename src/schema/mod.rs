//! Schema and version registry
//!
//! Each database version number declares the tables it stores and their
//! index definitions. Versions are immutable once declared.

mod errors;
mod registry;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use registry::{SchemaRegistry, VersionDecl};
pub use types::{IndexDef, Schema, TableDef};
