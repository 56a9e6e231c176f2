//! Ingestion pipeline
//!
//! Drives one run through its states:
//!
//! ```text
//! Initialized -> SchemaResolved -> TableCreated -> Ingesting -> Committed -> Finalized
//! ```
//!
//! Any state that is not terminal may move to `Aborted`.
//!
//! Every data line is decoded, tokenized, checked against the schema width,
//! coerced, and inserted. Any per-row failure, including a line that is not
//! valid UTF-8, sends the row to the rejected partition and the run carries on. Source read errors, broken sinks and cancellation
//! abort the run and roll the table back.

use crate::coerce::coerce_row;
use crate::error::{IngestError, Result, RowError, SinkError};
use crate::resolver::TypeResolver;
use crate::sink::TableSink;
use crate::tokenizer::Tokenizer;
use csvlite_common::{IngestionStats, Schema, TypeTag};
use serde::Serialize;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Byte order mark some editors put at the start of the header line
const UTF8_BOM: char = '\u{feff}';

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Initialized,
    SchemaResolved,
    TableCreated,
    Ingesting,
    Committed,
    Finalized,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Finalized | RunState::Aborted)
    }

    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;

        match (self, next) {
            (Initialized, SchemaResolved)
            | (SchemaResolved, TableCreated)
            | (TableCreated, Ingesting)
            | (Ingesting, Committed)
            | (Committed, Finalized) => true,
            (from, Aborted) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Initialized => "initialized",
            RunState::SchemaResolved => "schema_resolved",
            RunState::TableCreated => "table_created",
            RunState::Ingesting => "ingesting",
            RunState::Committed => "committed",
            RunState::Finalized => "finalized",
            RunState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A data row that was not inserted
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// Line number in the source file, the header being line 1
    pub line: u64,
    /// Fields as produced by the tokenizer
    pub fields: Vec<String>,
    pub reason: RowError,
}

/// Counters and rejected rows of a committed run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReport {
    pub stats: IngestionStats,
    pub rejected: Vec<RejectedRow>,
}

impl IngestionReport {
    fn reject(&mut self, line: u64, fields: Vec<String>, reason: RowError) {
        warn!(line, reason = %reason, "Row rejected");
        self.stats.record_rejected();
        self.rejected.push(RejectedRow {
            line,
            fields,
            reason,
        });
    }
}

/// Result of asking the sink for the target table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCreation {
    Created,
    /// The table was there already; the run is over and nothing was changed
    AlreadyExists,
}

enum RowFailure {
    Reject(RowError),
    Fatal(SinkError),
}

/// Sequential accept/reject loop for one table
#[derive(Debug)]
pub struct IngestionPipeline {
    tokenizer: Tokenizer,
    cancel: CancellationToken,
    state: RunState,
}

impl IngestionPipeline {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            cancel: CancellationToken::new(),
            state: RunState::Initialized,
        }
    }

    /// Abort the run at the next row once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    fn advance(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(IngestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
        Ok(())
    }

    /// Split the header line into column names.
    ///
    /// Names are trimmed and must be unique and non-empty.
    pub fn parse_header(&self, line: &str) -> Result<Vec<String>> {
        let line = line.strip_prefix(UTF8_BOM).unwrap_or(line);
        if line.trim().is_empty() {
            return Err(IngestError::InvalidHeader("header line is empty".to_string()));
        }

        let names: Vec<String> = line
            .split(self.tokenizer.options().delimiter)
            .map(|name| name.trim().to_string())
            .collect();

        Schema::from_parts(&names, &vec![TypeTag::Text; names.len()])?;
        Ok(names)
    }

    /// Ask `resolver` for the column types and build the schema
    pub fn resolve_schema(
        &mut self,
        columns: &[String],
        resolver: &mut dyn TypeResolver,
    ) -> Result<Schema> {
        if !self.state.can_transition_to(RunState::SchemaResolved) {
            return Err(IngestError::InvalidTransition {
                from: self.state,
                to: RunState::SchemaResolved,
            });
        }

        let resolved = resolver
            .resolve(columns)
            .map_err(IngestError::from)
            .and_then(|types| Schema::from_parts(columns, &types).map_err(IngestError::from));

        match resolved {
            Ok(schema) => {
                self.advance(RunState::SchemaResolved)?;
                Ok(schema)
            },
            Err(e) => {
                self.state = RunState::Aborted;
                Err(e)
            },
        }
    }

    /// Create the target table, or report that it already exists
    pub fn create_table(
        &mut self,
        sink: &mut dyn TableSink,
        name: &str,
        schema: &Schema,
    ) -> Result<TableCreation> {
        if !self.state.can_transition_to(RunState::TableCreated) {
            return Err(IngestError::InvalidTransition {
                from: self.state,
                to: RunState::TableCreated,
            });
        }

        match sink.create_table(name, schema) {
            Ok(()) => {
                self.advance(RunState::TableCreated)?;
                Ok(TableCreation::Created)
            },
            Err(SinkError::SchemaConflict(table)) => {
                info!(table = %table, "Table already exists, nothing to do");
                self.advance(RunState::Aborted)?;
                Ok(TableCreation::AlreadyExists)
            },
            Err(e) => {
                self.state = RunState::Aborted;
                Err(e.into())
            },
        }
    }

    /// Ingest the data lines (everything after the header) and commit.
    ///
    /// Lines are raw bytes without their terminator; `String` lines work too.
    /// On a fatal error the sink is rolled back before the error is returned.
    pub fn run<I, L>(
        &mut self,
        lines: I,
        schema: &Schema,
        sink: &mut dyn TableSink,
    ) -> Result<IngestionReport>
    where
        I: IntoIterator<Item = std::io::Result<L>>,
        L: Into<Vec<u8>>,
    {
        self.advance(RunState::Ingesting)?;
        let mut report = IngestionReport::default();

        for (index, line) in lines.into_iter().enumerate() {
            let line_number = index as u64 + 2;

            if self.cancel.is_cancelled() {
                let after_rows = report.stats.received;
                return Err(self.fail(sink, IngestError::Cancelled { after_rows }));
            }

            let line = match line {
                Ok(line) => line,
                Err(source) => {
                    let err = IngestError::SourceRead {
                        line: line_number,
                        source,
                    };
                    return Err(self.fail(sink, err));
                },
            };

            report.stats.record_received();
            let line = match String::from_utf8(line.into()) {
                Ok(line) => line,
                Err(e) => {
                    let fields = self.tokenizer.tokenize(&String::from_utf8_lossy(e.as_bytes()));
                    let reason = RowError::InvalidEncoding {
                        valid_up_to: e.utf8_error().valid_up_to(),
                    };
                    report.reject(line_number, fields, reason);
                    continue;
                },
            };
            let fields = self.tokenizer.tokenize(&line);

            match ingest_row(&fields, schema, sink) {
                Ok(()) => report.stats.record_accepted(),
                Err(RowFailure::Reject(reason)) => report.reject(line_number, fields, reason),
                Err(RowFailure::Fatal(e)) => return Err(self.fail(sink, e.into())),
            }
        }

        if self.cancel.is_cancelled() {
            let after_rows = report.stats.received;
            return Err(self.fail(sink, IngestError::Cancelled { after_rows }));
        }

        if let Err(e) = sink.commit() {
            return Err(self.fail(sink, e.into()));
        }
        self.advance(RunState::Committed)?;

        debug_assert!(report.stats.is_balanced());
        info!(
            received = report.stats.received,
            accepted = report.stats.accepted,
            rejected = report.stats.rejected,
            "Rows committed"
        );

        Ok(report)
    }

    /// Mark a committed run as complete
    pub fn finalize(&mut self) -> Result<()> {
        self.advance(RunState::Finalized)
    }

    /// Give up on the run without touching the sink
    pub fn abort(&mut self) -> Result<()> {
        self.advance(RunState::Aborted)
    }

    fn fail(&mut self, sink: &mut dyn TableSink, err: IngestError) -> IngestError {
        if matches!(self.state, RunState::TableCreated | RunState::Ingesting) {
            if let Err(rollback) = sink.rollback() {
                warn!(error = %rollback, "Rollback after failure did not complete");
            }
        }

        warn!(state = %self.state, error = %err, "Run aborted");
        self.state = RunState::Aborted;
        err
    }
}

fn ingest_row(
    fields: &[String],
    schema: &Schema,
    sink: &mut dyn TableSink,
) -> std::result::Result<(), RowFailure> {
    if fields.len() != schema.len() {
        return Err(RowFailure::Reject(RowError::FieldCountMismatch {
            expected: schema.len(),
            actual: fields.len(),
        }));
    }

    let values = coerce_row(fields, schema).map_err(|e| RowFailure::Reject(e.into()))?;

    match sink.insert(&values) {
        Ok(()) => Ok(()),
        Err(SinkError::Constraint(msg)) => Err(RowFailure::Reject(RowError::SinkConstraint(msg))),
        Err(e) => Err(RowFailure::Fatal(e)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coerce::CoercedValue;
    use crate::error::{CoercionErrorKind, TypeCoercionError};
    use crate::resolver::{MappingResolver, UniformResolver};
    use crate::sink::MemorySink;
    use csvlite_common::SchemaError;

    fn lines(raw: &[&str]) -> Vec<std::io::Result<String>> {
        raw.iter().map(|l| Ok(l.to_string())).collect()
    }

    fn ready(
        sink: &mut MemorySink,
        header: &str,
        resolver: &mut dyn TypeResolver,
    ) -> (IngestionPipeline, Schema) {
        let mut pipeline = IngestionPipeline::new(Tokenizer::default());
        let columns = pipeline.parse_header(header).unwrap();
        let schema = pipeline.resolve_schema(&columns, resolver).unwrap();
        assert_eq!(
            pipeline.create_table(sink, "items", &schema).unwrap(),
            TableCreation::Created
        );
        (pipeline, schema)
    }

    #[test]
    fn test_state_transitions() {
        assert!(RunState::Initialized.can_transition_to(RunState::SchemaResolved));
        assert!(RunState::Initialized.can_transition_to(RunState::Aborted));
        assert!(RunState::Ingesting.can_transition_to(RunState::Aborted));
        assert!(!RunState::Initialized.can_transition_to(RunState::Ingesting));
        assert!(!RunState::Finalized.can_transition_to(RunState::Aborted));
        assert!(!RunState::Aborted.can_transition_to(RunState::Initialized));
        assert_eq!(RunState::SchemaResolved.to_string(), "schema_resolved");
    }

    #[test]
    fn test_parse_header() {
        let pipeline = IngestionPipeline::new(Tokenizer::default());
        assert_eq!(
            pipeline.parse_header("\u{feff}name, price ,qty").unwrap(),
            vec!["name", "price", "qty"]
        );
        assert!(matches!(
            pipeline.parse_header("   "),
            Err(IngestError::InvalidHeader(_))
        ));
        assert!(matches!(
            pipeline.parse_header("a,,b"),
            Err(IngestError::Schema(SchemaError::EmptyColumnName { position: 2 }))
        ));
        assert!(matches!(
            pipeline.parse_header("a,A"),
            Err(IngestError::Schema(SchemaError::DuplicateColumn(_)))
        ));
    }

    #[test]
    fn test_accept_and_reject() {
        let mut sink = MemorySink::new();
        let mut resolver = MappingResolver::new()
            .with_type("price", TypeTag::Real)
            .with_default(TypeTag::Text);
        let (mut pipeline, schema) = ready(&mut sink, "name,price", &mut resolver);

        let report = pipeline
            .run(
                lines(&["apple,$1.50", "pear", "plum,cheap", "\"fig, dried\",2"]),
                &schema,
                &mut sink,
            )
            .unwrap();

        assert_eq!(report.stats.received, 4);
        assert_eq!(report.stats.accepted, 2);
        assert_eq!(report.stats.rejected, 2);
        assert!(report.stats.is_balanced());
        assert_eq!(pipeline.state(), RunState::Committed);

        assert_eq!(report.rejected[0].line, 3);
        assert_eq!(report.rejected[0].fields, vec!["pear"]);
        assert_eq!(
            report.rejected[0].reason,
            RowError::FieldCountMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(
            report.rejected[1].reason,
            RowError::Coercion(TypeCoercionError {
                kind: CoercionErrorKind::RealParse,
                column: "price".to_string(),
                raw: "cheap".to_string(),
            })
        );

        let rows = sink.rows("items").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            vec![CoercedValue::Text("fig, dried".into()), CoercedValue::Real(2.0)]
        );

        pipeline.finalize().unwrap();
        assert_eq!(pipeline.state(), RunState::Finalized);
    }

    #[test]
    fn test_sink_constraint_rejects_row() {
        let mut sink = MemorySink::new()
            .reject_rows_matching(|row| row[0] == CoercedValue::Text("dup".into()));
        let (mut pipeline, schema) = ready(&mut sink, "key", &mut UniformResolver::new(TypeTag::Text));

        let report = pipeline
            .run(lines(&["a", "dup", "b"]), &schema, &mut sink)
            .unwrap();

        assert_eq!(report.stats.accepted, 2);
        assert_eq!(report.stats.rejected, 1);
        assert!(matches!(report.rejected[0].reason, RowError::SinkConstraint(_)));
    }

    #[test]
    fn test_undecodable_line_is_rejected() {
        let mut sink = MemorySink::new();
        let (mut pipeline, schema) = ready(&mut sink, "a", &mut UniformResolver::new(TypeTag::Text));

        let input: Vec<std::io::Result<Vec<u8>>> = vec![
            Ok(b"alpha".to_vec()),
            Ok(b"caf\xE9".to_vec()),
            Ok(b"beta".to_vec()),
        ];
        let report = pipeline.run(input, &schema, &mut sink).unwrap();

        assert_eq!(report.stats.accepted, 2);
        assert_eq!(report.stats.rejected, 1);
        assert_eq!(report.rejected[0].line, 3);
        assert_eq!(report.rejected[0].fields, vec!["caf\u{FFFD}"]);
        assert_eq!(
            report.rejected[0].reason,
            RowError::InvalidEncoding { valid_up_to: 3 }
        );
        assert_eq!(pipeline.state(), RunState::Committed);
        assert_eq!(sink.rows("items").unwrap().len(), 2);
    }

    #[test]
    fn test_read_error_aborts_and_rolls_back() {
        let mut sink = MemorySink::new();
        let (mut pipeline, schema) = ready(&mut sink, "a", &mut UniformResolver::new(TypeTag::Text));

        let input = vec![
            Ok("x".to_string()),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "device went away")),
        ];
        let err = pipeline.run(input, &schema, &mut sink).unwrap_err();

        assert!(matches!(err, IngestError::SourceRead { line: 3, .. }));
        assert!(err.is_io_failure());
        assert_eq!(pipeline.state(), RunState::Aborted);
        assert!(!sink.contains_table("items").unwrap());
    }

    #[test]
    fn test_cancellation_aborts_before_first_row() {
        let token = CancellationToken::new();
        let mut sink = MemorySink::new();
        let mut pipeline = IngestionPipeline::new(Tokenizer::default()).with_cancellation(token.clone());
        let columns = pipeline.parse_header("a").unwrap();
        let schema = pipeline
            .resolve_schema(&columns, &mut UniformResolver::new(TypeTag::Text))
            .unwrap();
        pipeline.create_table(&mut sink, "items", &schema).unwrap();

        token.cancel();
        let err = pipeline
            .run(lines(&["1", "2"]), &schema, &mut sink)
            .unwrap_err();

        assert!(matches!(err, IngestError::Cancelled { after_rows: 0 }));
        assert!(!sink.contains_table("items").unwrap());
    }

    #[test]
    fn test_existing_table_aborts_without_changes() {
        let schema = Schema::from_parts(&["a".to_string()], &[TypeTag::Text]).unwrap();
        let mut sink = MemorySink::new().with_existing_table("items", schema.clone());
        let mut pipeline = IngestionPipeline::new(Tokenizer::default());
        pipeline
            .resolve_schema(&["a".to_string()], &mut UniformResolver::new(TypeTag::Text))
            .unwrap();

        assert_eq!(
            pipeline.create_table(&mut sink, "items", &schema).unwrap(),
            TableCreation::AlreadyExists
        );
        assert_eq!(pipeline.state(), RunState::Aborted);
        assert!(sink.rows("items").unwrap().is_empty());
    }

    #[test]
    fn test_resolver_type_count_mismatch() {
        let mut pipeline = IngestionPipeline::new(Tokenizer::default());
        let mut resolver = |_: &[String]| -> std::result::Result<Vec<TypeTag>, crate::error::ResolveError> {
            Ok(vec![TypeTag::Text])
        };

        let err = pipeline
            .resolve_schema(&["a".to_string(), "b".to_string()], &mut resolver)
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Schema(SchemaError::TypeCountMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert_eq!(pipeline.state(), RunState::Aborted);
    }

    #[test]
    fn test_run_requires_table() {
        let schema = Schema::from_parts(&["a".to_string()], &[TypeTag::Text]).unwrap();
        let mut pipeline = IngestionPipeline::new(Tokenizer::default());

        let err = pipeline
            .run(lines(&["1"]), &schema, &mut MemorySink::new())
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::InvalidTransition {
                from: RunState::Initialized,
                to: RunState::Ingesting
            }
        ));
    }
}
