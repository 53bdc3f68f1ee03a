//! Schema error types
//!
//! All schema errors are programmer errors raised synchronously at
//! declaration or lookup time, except `UnknownVersion` met while loading
//! persisted state, which the database reports as corruption.

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// `version(n)` called for an already declared `n`
    #[error("schema version {0} is already declared")]
    DuplicateVersion(u32),

    /// A schema was attached twice to the same version
    #[error("schema version {0} already has a schema attached")]
    SchemaAlreadyAttached(u32),

    /// A version number that was never declared
    #[error("schema version {0} is not declared")]
    UnknownVersion(u32),

    /// A declared version has no schema attached
    #[error("schema version {0} has no schema attached")]
    MissingSchema(u32),

    /// No version with an attached schema exists
    #[error("no schema version has been declared")]
    NoVersions,

    /// A table id absent from the schema in force
    #[error("table {table:?} is not declared in schema version {version}")]
    UnknownTable { table: String, version: u32 },

    /// Code declares a version differently from what was persisted
    #[error("schema version {0} differs from the persisted declaration")]
    Conflict(u32),
}
