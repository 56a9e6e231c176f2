//! Table sinks
//!
//! A sink is the typed-insert destination of one run. The pipeline creates the
//! table, inserts one row at a time, then commits or rolls back. Everything a
//! sink does between `create_table` and `commit` belongs to one transaction.
//!
//! - [`SqliteSink`]: `<table>.db` on disk through `rusqlite`
//! - [`MemorySink`]: keeps rows in memory, used for dry runs and tests

pub mod memory;
pub mod sqlite;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;

use crate::coerce::CoercedValue;
use crate::error::SinkError;
use csvlite_common::Schema;

/// Result type alias for sink operations
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Typed table destination for one ingestion run
pub trait TableSink {
    /// Whether `name` already exists in the store
    fn contains_table(&self, name: &str) -> SinkResult<bool>;

    /// Start a transaction and create `name` with the given columns.
    ///
    /// Fails with [`SinkError::SchemaConflict`] when the table exists.
    fn create_table(&mut self, name: &str, schema: &Schema) -> SinkResult<()>;

    /// Insert one row, one value per schema column.
    ///
    /// [`SinkError::Constraint`] only rejects this row; any other error is
    /// fatal for the run.
    fn insert(&mut self, values: &[CoercedValue]) -> SinkResult<()>;

    /// Make the table and its rows durable
    fn commit(&mut self) -> SinkResult<()>;

    /// Discard the table and everything inserted since `create_table`
    fn rollback(&mut self) -> SinkResult<()>;
}

/// Quote an identifier for use in SQL, doubling embedded quotes
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
