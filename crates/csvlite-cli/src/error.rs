//! Error types for csvlite CLI
//!
//! User-facing errors with actionable messages, and the exit code each one
//! maps to.

use csvlite_ingest::{IngestError, ResolveError};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code for invalid input or configuration
pub const EXIT_USAGE: i32 = 2;

/// Exit code for a run stopped by Ctrl-C
pub const EXIT_INTERRUPTED: i32 = 130;

/// Errors reported by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// Types file exists but its content is unusable
    #[error("Invalid types file '{path}': {message}. Expected a YAML mapping such as 'columns: {{ price: REAL }}'.")]
    InvalidTypesFile { path: String, message: String },

    /// Column types cannot be determined
    #[error("No column types: {0}")]
    NoTypes(String),

    /// Conversion failed
    #[error("Conversion failed: {0}")]
    Ingest(#[from] IngestError),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables.")]
    Config(String),

    /// The blocking conversion task panicked or was dropped
    #[error("Conversion task failed: {0}")]
    Task(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// YAML parsing failed
    #[error("Failed to parse YAML: {0}. Check the file syntax at the indicated line/column.")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization failed
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing column types error
    pub fn no_types(msg: impl Into<String>) -> Self {
        Self::NoTypes(msg.into())
    }

    /// Create an invalid types file error
    pub fn invalid_types_file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTypesFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Process exit code: 2 for bad input, 130 for interruption, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Ingest(IngestError::Cancelled { .. })
            | CliError::Ingest(IngestError::Resolve(ResolveError::Cancelled)) => EXIT_INTERRUPTED,
            CliError::Ingest(e) if e.is_io_failure() => 1,
            CliError::Ingest(
                IngestError::Config(_)
                | IngestError::InvalidHeader(_)
                | IngestError::Schema(_)
                | IngestError::Resolve(_),
            ) => EXIT_USAGE,
            CliError::FileNotFound(_)
            | CliError::InvalidTypesFile { .. }
            | CliError::NoTypes(_)
            | CliError::Config(_)
            | CliError::YamlParse(_) => EXIT_USAGE,
            _ => 1,
        }
    }
}
