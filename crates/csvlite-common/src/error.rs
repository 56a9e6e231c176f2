//! Error types shared across csvlite crates

use thiserror::Error;

/// Result type alias for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while building a schema or parsing type tags
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown column type '{0}'. Valid types: TEXT, INTEGER, REAL, NUMERIC, BOOLEAN, BINARY_IMAGE")]
    UnknownType(String),

    #[error("Schema has no columns")]
    Empty,

    #[error("Column {position} has an empty name")]
    EmptyColumnName { position: usize },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Expected {expected} column types, got {actual}")]
    TypeCountMismatch { expected: usize, actual: usize },
}
