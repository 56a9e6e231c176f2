//! File-to-table conversion
//!
//! [`Converter`] runs the whole protocol for one source file: read the header,
//! skip if the table already exists, resolve the column types, create the
//! table, ingest, commit, then write the rejected rows and the counters.

use crate::artifacts::{self, ArtifactPaths};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::pipeline::{IngestionPipeline, RejectedRow, TableCreation};
use crate::resolver::TypeResolver;
use crate::sink::{MemorySink, SqliteSink, TableSink};
use crate::tokenizer::Tokenizer;
use csvlite_common::{IngestionStats, Schema};
use std::fs::File;
use std::io::{BufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub table: String,
    pub schema: Schema,
    pub stats: IngestionStats,
    pub rejected: Vec<RejectedRow>,
    /// None when artifact writing is disabled
    pub artifacts: Option<ArtifactPaths>,
}

/// Outcome of [`Converter::convert`]
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The table already existed; nothing was read, inserted or written
    Skipped { table: String },
    Completed(RunSummary),
}

impl RunOutcome {
    pub fn table(&self) -> &str {
        match self {
            RunOutcome::Skipped { table } => table,
            RunOutcome::Completed(summary) => &summary.table,
        }
    }

    pub fn stats(&self) -> Option<&IngestionStats> {
        match self {
            RunOutcome::Skipped { .. } => None,
            RunOutcome::Completed(summary) => Some(&summary.stats),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RunOutcome::Skipped { .. })
    }
}

/// Loads one delimited file into one table
#[derive(Debug, Clone)]
pub struct Converter {
    config: IngestConfig,
    cancel: CancellationToken,
}

impl Converter {
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Convert into `<target>/<table>.db`, creating the directory if needed
    pub fn convert(&self, resolver: &mut dyn TypeResolver) -> Result<RunOutcome> {
        let lines = self.open_source()?;

        let directory = &self.config.target_directory;
        std::fs::create_dir_all(directory).map_err(|source| IngestError::Artifact {
            path: directory.clone(),
            source,
        })?;

        let mut sink = SqliteSink::open(&self.config.database_path()?)?;
        self.run(lines, &mut sink, resolver)
    }

    /// Convert into a caller-provided sink
    pub fn convert_into(
        &self,
        sink: &mut dyn TableSink,
        resolver: &mut dyn TypeResolver,
    ) -> Result<RunOutcome> {
        let lines = self.open_source()?;
        self.run(lines, sink, resolver)
    }

    /// Run in memory without touching the target directory.
    ///
    /// An existing `<target>/<table>.db` is only read: when it already holds
    /// the table, the outcome is the same skip a real run would report.
    pub fn dry_run(&self, resolver: &mut dyn TypeResolver) -> Result<RunOutcome> {
        let lines = self.open_source()?;

        let database = self.config.database_path()?;
        if database.is_file() {
            let table = self.config.table_name()?;
            if SqliteSink::open(&database)?.contains_table(&table)? {
                info!(table = %table, "Table already exists, skipping");
                return Ok(RunOutcome::Skipped { table });
            }
        }

        self.run(lines, &mut MemorySink::new(), resolver)
    }

    /// Raw lines of the source; decoding happens per row in the pipeline
    fn open_source(&self) -> Result<impl Iterator<Item = std::io::Result<Vec<u8>>>> {
        let path = &self.config.source_path;
        let file = File::open(path).map_err(|source| IngestError::SourceOpen {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "Reading source");
        Ok(BufReader::new(file)
            .split(b'\n')
            .map(|line| line.map(strip_carriage_return)))
    }

    fn run<I>(
        &self,
        mut lines: I,
        sink: &mut dyn TableSink,
        resolver: &mut dyn TypeResolver,
    ) -> Result<RunOutcome>
    where
        I: Iterator<Item = std::io::Result<Vec<u8>>>,
    {
        let table = self.config.table_name()?;
        let span = info_span!("convert", table = %table);
        let _enter = span.enter();

        let mut pipeline = IngestionPipeline::new(Tokenizer::new(self.config.tokenizer.clone()))
            .with_cancellation(self.cancel.clone());

        let header = match lines.next() {
            Some(Ok(line)) => String::from_utf8(line).map_err(|_| {
                IngestError::InvalidHeader("header line is not valid UTF-8".to_string())
            })?,
            Some(Err(source)) => return Err(IngestError::SourceRead { line: 1, source }),
            None => {
                return Err(IngestError::InvalidHeader(
                    "source file is empty".to_string(),
                ))
            },
        };
        let columns = pipeline.parse_header(&header)?;

        if sink.contains_table(&table)? {
            info!("Table already exists, skipping");
            pipeline.abort()?;
            return Ok(RunOutcome::Skipped { table });
        }

        let schema = pipeline.resolve_schema(&columns, resolver)?;
        if pipeline.create_table(sink, &table, &schema)? == TableCreation::AlreadyExists {
            return Ok(RunOutcome::Skipped { table });
        }

        let report = pipeline.run(lines, &schema, sink)?;

        let artifacts = if self.config.write_artifacts {
            let paths = self.config.artifact_paths()?;
            if let Err(e) = self.write_artifacts(&paths, &report.rejected, &report.stats) {
                warn!(error = %e, "Table committed but artifacts could not be written");
                pipeline.abort()?;
                return Err(e);
            }
            Some(paths)
        } else {
            None
        };

        pipeline.finalize()?;
        info!(
            received = report.stats.received,
            accepted = report.stats.accepted,
            rejected = report.stats.rejected,
            "Conversion complete"
        );

        Ok(RunOutcome::Completed(RunSummary {
            table,
            schema,
            stats: report.stats,
            rejected: report.rejected,
            artifacts,
        }))
    }

    fn write_artifacts(
        &self,
        paths: &ArtifactPaths,
        rejected: &[RejectedRow],
        stats: &IngestionStats,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.config.target_directory).map_err(|source| {
            IngestError::Artifact {
                path: self.config.target_directory.clone(),
                source,
            }
        })?;

        artifacts::write_rejected_rows(&paths.rejected, rejected, &self.config.tokenizer)?;
        artifacts::write_stats(&paths.stats, stats)
    }
}

fn strip_carriage_return(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}
