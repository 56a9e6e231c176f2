//! SQLite table sink

use super::{quote_identifier, SinkResult, TableSink};
use crate::coerce::CoercedValue;
use crate::error::SinkError;
use csvlite_common::Schema;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode};
use std::path::Path;
use tracing::{debug, info, warn};

impl ToSql for CoercedValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CoercedValue::Null => ToSqlOutput::Owned(Value::Null),
            CoercedValue::Integer(value) => ToSqlOutput::Owned(Value::Integer(*value)),
            CoercedValue::Real(value) => ToSqlOutput::Owned(Value::Real(*value)),
            CoercedValue::Boolean(value) => ToSqlOutput::Owned(Value::Integer(i64::from(*value))),
            CoercedValue::Bytes(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
            CoercedValue::Text(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
        })
    }
}

#[derive(Debug)]
struct ActiveTable {
    name: String,
    columns: usize,
    insert_sql: String,
}

/// Sink writing into one SQLite database file.
///
/// The connection stays in autocommit mode until `create_table`, which opens
/// the transaction that `commit` or `rollback` ends.
#[derive(Debug)]
pub struct SqliteSink {
    conn: Connection,
    table: Option<ActiveTable>,
    in_transaction: bool,
}

impl SqliteSink {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path) -> SinkResult<Self> {
        if path.exists() {
            info!(path = %path.display(), "Opening existing database");
        } else {
            info!(path = %path.display(), "Creating new database");
        }

        let conn = Connection::open(path).map_err(|e| {
            SinkError::Connection(format!("failed to open '{}': {}", path.display(), e))
        })?;

        Self::from_connection(conn)
    }

    /// In-memory database, gone when the sink is dropped
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SinkError::Connection(format!("failed to open in-memory database: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> SinkResult<Self> {
        // Opening is lazy; touch the schema so a non-database file fails here
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| SinkError::Connection(e.to_string()))?;

        Ok(Self {
            conn,
            table: None,
            in_transaction: false,
        })
    }

    /// Number of rows currently visible in `table`
    pub fn row_count(&self, table: &str) -> SinkResult<u64> {
        let sql = format!("SELECT count(*) FROM {}", quote_identifier(table));
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|count| count.max(0) as u64)
            .map_err(statement_error)
    }

    fn end_transaction(&mut self, sql: &str) -> SinkResult<()> {
        if !self.in_transaction {
            return Err(SinkError::NoTable);
        }

        let result = self.conn.execute_batch(sql).map_err(statement_error);
        self.in_transaction = false;
        self.table = None;
        result
    }
}

impl TableSink for SqliteSink {
    fn contains_table(&self, name: &str) -> SinkResult<bool> {
        self.conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE)",
                [name],
                |row| row.get::<_, bool>(0),
            )
            .map_err(statement_error)
    }

    fn create_table(&mut self, name: &str, schema: &Schema) -> SinkResult<()> {
        if self.in_transaction {
            return Err(SinkError::Statement(
                "a table is already being loaded on this sink".to_string(),
            ));
        }
        if self.contains_table(name)? {
            return Err(SinkError::SchemaConflict(name.to_string()));
        }

        let mut definitions = Vec::with_capacity(schema.len() + 1);
        if !schema.names().any(|column| column.eq_ignore_ascii_case("id")) {
            definitions.push("\"id\" INTEGER PRIMARY KEY".to_string());
        }
        definitions.extend(schema.columns().iter().map(|column| {
            format!(
                "{} {}",
                quote_identifier(&column.name),
                column.declared_type.sql_type()
            )
        }));

        let table = quote_identifier(name);
        let ddl = format!("CREATE TABLE {} ({})", table, definitions.join(", "));
        debug!(sql = %ddl, "Creating table");

        self.conn.execute_batch("BEGIN").map_err(statement_error)?;
        self.in_transaction = true;

        if let Err(e) = self.conn.execute(&ddl, []) {
            self.in_transaction = false;
            if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                warn!(table = name, error = %rollback, "Rollback after failed CREATE TABLE failed");
            }
            return Err(statement_error(e));
        }

        let columns: Vec<String> = schema.names().map(quote_identifier).collect();
        let placeholders = vec!["?"; schema.len()].join(", ");
        self.table = Some(ActiveTable {
            name: name.to_string(),
            columns: schema.len(),
            insert_sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders
            ),
        });

        info!(table = name, columns = schema.len(), "Table created");
        Ok(())
    }

    fn insert(&mut self, values: &[CoercedValue]) -> SinkResult<()> {
        let table = self.table.as_ref().ok_or(SinkError::NoTable)?;
        if values.len() != table.columns {
            return Err(SinkError::Constraint(format!(
                "expected {} values for '{}', got {}",
                table.columns,
                table.name,
                values.len()
            )));
        }

        let mut stmt = self
            .conn
            .prepare_cached(&table.insert_sql)
            .map_err(insert_error)?;
        stmt.execute(params_from_iter(values.iter()))
            .map_err(insert_error)?;

        Ok(())
    }

    fn commit(&mut self) -> SinkResult<()> {
        self.end_transaction("COMMIT")
    }

    fn rollback(&mut self) -> SinkResult<()> {
        self.end_transaction("ROLLBACK")
    }
}

fn is_connection_failure(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::SystemIoFailure
            | ErrorCode::DiskFull
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::NotADatabase
            | ErrorCode::ReadOnly
            | ErrorCode::CannotOpen
            | ErrorCode::PermissionDenied
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::OutOfMemory
    )
}

/// DDL and transaction control: the store or the statement is broken
fn statement_error(err: rusqlite::Error) -> SinkError {
    match err.sqlite_error_code() {
        Some(code) if is_connection_failure(code) => SinkError::Connection(err.to_string()),
        _ => SinkError::Statement(err.to_string()),
    }
}

/// Inserts: anything short of a broken store only rejects the row
fn insert_error(err: rusqlite::Error) -> SinkError {
    match err.sqlite_error_code() {
        Some(code) if is_connection_failure(code) => SinkError::Connection(err.to_string()),
        _ => SinkError::Constraint(err.to_string()),
    }
}
