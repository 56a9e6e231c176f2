//! csvlite Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the csvlite workspace.
//!
//! # Overview
//!
//! - **Types**: column type tags, schemas, and ingestion counters
//! - **Logging**: `tracing` subscriber configuration shared by every binary
//! - **Errors**: schema and type-tag validation errors
//!
//! # Example
//!
//! ```
//! use csvlite_common::types::{ColumnDefinition, Schema, TypeTag};
//!
//! let schema = Schema::new(vec![
//!     ColumnDefinition::new("name", TypeTag::Text),
//!     ColumnDefinition::new("price", TypeTag::Real),
//! ])
//! .unwrap();
//! assert_eq!(schema.len(), 2);
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SchemaError};
pub use types::{ColumnDefinition, IngestionStats, Schema, TypeTag};
