//! csvlite Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads a delimited text file into a typed SQLite table, splitting the rows
//! into an accepted partition (inserted) and a rejected partition (written to
//! a `<table>-bad.csv` file), and recording counters in `<table>.log`.
//!
//! # Components
//!
//! - [`tokenizer`]: splits one line into fields, honoring quoted spans
//! - [`coerce`]: converts a field into a typed value for its declared column type
//! - [`pipeline`]: per-row accept/reject loop and the run state machine
//! - [`convert`]: one complete file-to-table run, including the idempotency guard
//! - [`sink`]: the table sink abstraction with SQLite and in-memory backends
//! - [`resolver`]: column-type resolution capability
//! - [`artifacts`]: bad-rows and stats files written after commit
//!
//! # Example
//!
//! ```no_run
//! use csvlite_common::TypeTag;
//! use csvlite_ingest::{Converter, IngestConfig, UniformResolver};
//!
//! fn main() -> Result<(), csvlite_ingest::IngestError> {
//!     let config = IngestConfig::new("data/sales.csv", "out");
//!     let converter = Converter::new(config)?;
//!     let outcome = converter.convert(&mut UniformResolver::new(TypeTag::Text))?;
//!     println!("{:?}", outcome.stats());
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod coerce;
pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod sink;
pub mod tokenizer;

// Re-export commonly used types
pub use artifacts::ArtifactPaths;
pub use coerce::CoercedValue;
pub use config::IngestConfig;
pub use convert::{Converter, RunOutcome, RunSummary};
pub use error::{IngestError, ResolveError, Result, RowError, SinkError};
pub use pipeline::{IngestionPipeline, IngestionReport, RejectedRow, RunState, TableCreation};
pub use resolver::{MappingResolver, TypeResolver, UniformResolver};
pub use sink::{MemorySink, SqliteSink, TableSink};
pub use tokenizer::{BlankFieldRule, LineEdges, Tokenizer, TokenizerOptions};
pub use tokio_util::sync::CancellationToken;
