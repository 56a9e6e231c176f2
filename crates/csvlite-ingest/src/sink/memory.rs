//! In-memory table sink

use super::{SinkResult, TableSink};
use crate::coerce::CoercedValue;
use crate::error::SinkError;
use csvlite_common::Schema;
use std::collections::BTreeMap;

type RowFilter = Box<dyn Fn(&[CoercedValue]) -> bool + Send>;

#[derive(Debug, Clone, PartialEq)]
struct StoredTable {
    schema: Schema,
    rows: Vec<Vec<CoercedValue>>,
}

/// Sink that keeps committed tables in a map.
///
/// Behaves like [`SqliteSink`](super::SqliteSink) for conflicts, arity and
/// rollback, which makes it the backend for dry runs.
#[derive(Default)]
pub struct MemorySink {
    committed: BTreeMap<String, StoredTable>,
    pending: Option<(String, StoredTable)>,
    reject: Option<RowFilter>,
}

impl std::fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySink")
            .field("committed", &self.committed)
            .field("pending", &self.pending)
            .field("reject", &self.reject.is_some())
            .finish()
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse inserts for which `filter` returns true, as a store constraint would
    pub fn reject_rows_matching<F>(mut self, filter: F) -> Self
    where
        F: Fn(&[CoercedValue]) -> bool + Send + 'static,
    {
        self.reject = Some(Box::new(filter));
        self
    }

    /// Pretend `name` already exists, with no rows
    pub fn with_existing_table(mut self, name: &str, schema: Schema) -> Self {
        self.committed.insert(
            name.to_lowercase(),
            StoredTable {
                schema,
                rows: Vec::new(),
            },
        );
        self
    }

    /// Committed rows of `name`
    pub fn rows(&self, name: &str) -> Option<&[Vec<CoercedValue>]> {
        self.committed
            .get(&name.to_lowercase())
            .map(|table| table.rows.as_slice())
    }

    /// Committed schema of `name`
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.committed
            .get(&name.to_lowercase())
            .map(|table| &table.schema)
    }
}

impl TableSink for MemorySink {
    fn contains_table(&self, name: &str) -> SinkResult<bool> {
        Ok(self.committed.contains_key(&name.to_lowercase()))
    }

    fn create_table(&mut self, name: &str, schema: &Schema) -> SinkResult<()> {
        if self.pending.is_some() {
            return Err(SinkError::Statement(
                "a table is already being loaded on this sink".to_string(),
            ));
        }
        if self.contains_table(name)? {
            return Err(SinkError::SchemaConflict(name.to_string()));
        }

        self.pending = Some((
            name.to_lowercase(),
            StoredTable {
                schema: schema.clone(),
                rows: Vec::new(),
            },
        ));
        Ok(())
    }

    fn insert(&mut self, values: &[CoercedValue]) -> SinkResult<()> {
        let (name, table) = self.pending.as_mut().ok_or(SinkError::NoTable)?;
        if values.len() != table.schema.len() {
            return Err(SinkError::Constraint(format!(
                "expected {} values for '{}', got {}",
                table.schema.len(),
                name,
                values.len()
            )));
        }
        if self.reject.as_ref().is_some_and(|reject| reject(values)) {
            return Err(SinkError::Constraint("row refused by filter".to_string()));
        }

        table.rows.push(values.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> SinkResult<()> {
        let (name, table) = self.pending.take().ok_or(SinkError::NoTable)?;
        self.committed.insert(name, table);
        Ok(())
    }

    fn rollback(&mut self) -> SinkResult<()> {
        self.pending.take().map(|_| ()).ok_or(SinkError::NoTable)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use csvlite_common::{ColumnDefinition, TypeTag};

    fn schema() -> Schema {
        Schema::new(vec![ColumnDefinition::new("n", TypeTag::Integer)]).unwrap()
    }

    #[test]
    fn test_commit_makes_rows_visible() {
        let mut sink = MemorySink::new();
        sink.create_table("t", &schema()).unwrap();
        sink.insert(&[CoercedValue::Integer(1)]).unwrap();
        assert!(sink.rows("t").is_none());

        sink.commit().unwrap();
        assert_eq!(sink.rows("T").unwrap(), &[vec![CoercedValue::Integer(1)]]);
        assert_eq!(sink.schema("t"), Some(&schema()));
    }

    #[test]
    fn test_rollback_leaves_nothing() {
        let mut sink = MemorySink::new();
        sink.create_table("t", &schema()).unwrap();
        sink.insert(&[CoercedValue::Integer(1)]).unwrap();
        sink.rollback().unwrap();

        assert!(!sink.contains_table("t").unwrap());
        assert_eq!(sink.commit(), Err(SinkError::NoTable));
    }

    #[test]
    fn test_existing_table_conflicts() {
        let mut sink = MemorySink::new().with_existing_table("t", schema());
        assert!(sink.contains_table("t").unwrap());
        assert_eq!(
            sink.create_table("t", &schema()),
            Err(SinkError::SchemaConflict("t".to_string()))
        );
    }

    #[test]
    fn test_reject_filter() {
        let mut sink = MemorySink::new()
            .reject_rows_matching(|row| row.first() == Some(&CoercedValue::Integer(13)));
        sink.create_table("t", &schema()).unwrap();

        assert!(sink.insert(&[CoercedValue::Integer(12)]).is_ok());
        assert!(matches!(
            sink.insert(&[CoercedValue::Integer(13)]),
            Err(SinkError::Constraint(_))
        ));
        assert!(matches!(
            sink.insert(&[CoercedValue::Integer(1), CoercedValue::Null]),
            Err(SinkError::Constraint(_))
        ));
    }
}
