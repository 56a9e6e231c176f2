//! Error types for ingestion
//!
//! Errors come in two tiers. [`RowError`] describes why a single row was
//! rejected; it never escapes the pipeline and ends up in the rejected
//! partition. [`IngestError`] aborts a whole run.

use crate::pipeline::RunState;
use csvlite_common::SchemaError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Which coercion rule a field failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionErrorKind {
    #[error("not a valid real number")]
    RealParse,

    #[error("not a valid integer")]
    IntegerParse,

    #[error("expected 'true' or 'false'")]
    BooleanFormat,

    #[error("missing 'png;base64,' marker or invalid base64 payload")]
    Base64Decode,
}

/// A field that could not be converted to its column's declared type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("column '{column}': {kind} (value '{raw}')")]
pub struct TypeCoercionError {
    pub kind: CoercionErrorKind,
    pub column: String,
    pub raw: String,
}

/// Reason a row was routed to the rejected partition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("expected {expected} fields, found {actual}")]
    FieldCountMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Coercion(#[from] TypeCoercionError),

    #[error("insert rejected: {0}")]
    SinkConstraint(String),

    #[error("line is not valid UTF-8 (first bad byte at offset {valid_up_to})")]
    InvalidEncoding { valid_up_to: usize },
}

/// Errors reported by a [`TableSink`](crate::sink::TableSink)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The target table exists; the run must not touch it
    #[error("table '{0}' already exists")]
    SchemaConflict(String),

    /// The store cannot be opened or has become unusable
    #[error("table store unavailable: {0}")]
    Connection(String),

    /// A single insert was refused; only the row is affected
    #[error("{0}")]
    Constraint(String),

    /// DDL or transaction control failed
    #[error("statement failed: {0}")]
    Statement(String),

    #[error("no table has been created on this sink")]
    NoTable,
}

/// Errors raised while resolving column types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no type configured for column '{0}'")]
    Unmapped(String),

    #[error("type selection was cancelled")]
    Cancelled,

    #[error("type resolution failed: {0}")]
    Failed(String),
}

/// Run-level failure; the run is aborted and no artifacts are written
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot open source file '{}': {source}", path.display())]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read source at line {line}: {source}")]
    SourceRead {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("run cancelled after {after_rows} rows")]
    Cancelled { after_rows: u64 },

    #[error("failed to write '{}': {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid run state transition {from} -> {to}")]
    InvalidTransition { from: RunState, to: RunState },
}

impl IngestError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for failures of the source or the table store, as opposed to
    /// configuration or user input problems detected before ingesting
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            IngestError::SourceOpen { .. }
                | IngestError::SourceRead { .. }
                | IngestError::Sink(SinkError::Connection(_))
                | IngestError::Sink(SinkError::Statement(_))
                | IngestError::Artifact { .. }
        )
    }
}
