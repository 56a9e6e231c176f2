//! Common types used across csvlite

use crate::error::{Result, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Declared type of a column.
///
/// The tag decides how raw text fields are coerced before insertion and which
/// SQL type the column gets when the table is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeTag {
    /// Free text, stored verbatim
    #[default]
    Text,
    /// 64-bit signed integer
    Integer,
    /// Double precision float, parsed leniently (currency symbols are dropped)
    Real,
    /// Bound as text; the store's numeric affinity converts it
    Numeric,
    /// `true` / `false`, case-insensitive
    Boolean,
    /// Base64 PNG payload following a `png;base64,` marker, stored as bytes
    #[serde(alias = "PNG64")]
    BinaryImage,
}

impl TypeTag {
    /// All tags, in the order they are offered to users
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Text,
        TypeTag::Integer,
        TypeTag::Real,
        TypeTag::Numeric,
        TypeTag::Boolean,
        TypeTag::BinaryImage,
    ];

    /// Canonical name of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Text => "TEXT",
            TypeTag::Integer => "INTEGER",
            TypeTag::Real => "REAL",
            TypeTag::Numeric => "NUMERIC",
            TypeTag::Boolean => "BOOLEAN",
            TypeTag::BinaryImage => "BINARY_IMAGE",
        }
    }

    /// Column type used in `CREATE TABLE`
    pub fn sql_type(&self) -> &'static str {
        match self {
            TypeTag::BinaryImage => "BLOB",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TypeTag {
    type Err = SchemaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TEXT" => Ok(TypeTag::Text),
            "INTEGER" | "INT" => Ok(TypeTag::Integer),
            "REAL" => Ok(TypeTag::Real),
            "NUMERIC" => Ok(TypeTag::Numeric),
            "BOOLEAN" | "BOOL" => Ok(TypeTag::Boolean),
            "BINARY_IMAGE" | "PNG64" | "BLOB" | "IMAGE" => Ok(TypeTag::BinaryImage),
            _ => Err(SchemaError::UnknownType(s.to_string())),
        }
    }
}

/// A named column with its declared type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name as read from the header line
    pub name: String,

    /// Declared type, fixed once the table exists
    pub declared_type: TypeTag,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, declared_type: TypeTag) -> Self {
        Self {
            name: name.into(),
            declared_type,
        }
    }
}

/// Ordered, validated set of columns for one table.
///
/// A schema cannot be modified after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    columns: Vec<ColumnDefinition>,
}

impl Schema {
    /// Build a schema, rejecting empty or duplicate column names.
    ///
    /// Names are compared case-insensitively since SQLite identifiers are.
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self> {
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(SchemaError::EmptyColumnName {
                    position: position + 1,
                });
            }
            if !seen.insert(column.name.to_lowercase()) {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
        }

        Ok(Self { columns })
    }

    /// Pair column names with resolved types
    pub fn from_parts(names: &[String], types: &[TypeTag]) -> Result<Self> {
        if names.len() != types.len() {
            return Err(SchemaError::TypeCountMismatch {
                expected: names.len(),
                actual: types.len(),
            });
        }

        let columns = names
            .iter()
            .zip(types)
            .map(|(name, tag)| ColumnDefinition::new(name.clone(), *tag))
            .collect();

        Self::new(columns)
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Counters accumulated over one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStats {
    /// Data lines read (header excluded)
    pub received: u64,

    /// Rows inserted into the table
    pub accepted: u64,

    /// Rows routed to the bad-rows file
    pub rejected: u64,
}

impl IngestionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&mut self) {
        self.received += 1;
    }

    pub fn record_accepted(&mut self) {
        self.accepted += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    /// `received == accepted + rejected`
    pub fn is_balanced(&self) -> bool {
        self.received == self.accepted + self.rejected
    }
}
