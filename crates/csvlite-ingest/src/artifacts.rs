//! Run artifacts
//!
//! A finalized run leaves three files next to each other, all named after the
//! table: the database, the rejected rows and the counters.

use crate::error::{IngestError, Result};
use crate::pipeline::RejectedRow;
use crate::tokenizer::TokenizerOptions;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use csvlite_common::IngestionStats;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output file locations for one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    /// `<table>.db`
    pub database: PathBuf,
    /// `<table>-bad.csv`
    pub rejected: PathBuf,
    /// `<table>.log`
    pub stats: PathBuf,
}

impl ArtifactPaths {
    pub fn new(directory: &Path, table: &str) -> Self {
        Self {
            database: directory.join(format!("{table}.db")),
            rejected: directory.join(format!("{table}-bad.csv")),
            stats: directory.join(format!("{table}.log")),
        }
    }
}

/// Write the rejected rows, one per line, with the source's delimiter.
///
/// Fields containing the delimiter are wrapped in the quote character so the
/// file tokenizes back to the same fields.
pub fn write_rejected_rows(
    path: &Path,
    rows: &[RejectedRow],
    options: &TokenizerOptions,
) -> Result<()> {
    let artifact_error = |source: std::io::Error| IngestError::Artifact {
        path: path.to_path_buf(),
        source,
    };

    // Both characters are validated as ASCII with the rest of the config
    let delimiter = u8::try_from(options.delimiter)
        .map_err(|_| IngestError::config("delimiter must be ASCII"))?;
    let quote = u8::try_from(options.quote)
        .map_err(|_| IngestError::config("quote character must be ASCII"))?;

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote(quote)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_path(path)
        .map_err(|e| artifact_error(e.into()))?;

    for row in rows {
        writer
            .write_record(&row.fields)
            .map_err(|e| artifact_error(e.into()))?;
    }
    writer.flush().map_err(artifact_error)?;

    debug!(path = %path.display(), rows = rows.len(), "Wrote rejected rows");
    Ok(())
}

/// The three counter lines of the stats file
pub fn format_stats(stats: &IngestionStats) -> String {
    format!(
        "Number of records received: {}\nNumber of records successfully inserted: {}\nNumber of records failed: {}\n",
        stats.received, stats.accepted, stats.rejected
    )
}

pub fn write_stats(path: &Path, stats: &IngestionStats) -> Result<()> {
    std::fs::write(path, format_stats(stats)).map_err(|source| IngestError::Artifact {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), "Wrote stats");
    Ok(())
}
