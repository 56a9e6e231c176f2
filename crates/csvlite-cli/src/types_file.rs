//! Column types file (YAML)
//!
//! ```yaml
//! default: TEXT
//! columns:
//!   price: REAL
//!   paid: boolean
//!   thumbnail: PNG64
//! ```
//!
//! Type names are case-insensitive and accept the aliases `TypeTag` parses.

use crate::error::{CliError, Result};
use csvlite_common::TypeTag;
use csvlite_ingest::MappingResolver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed types file, type names still unvalidated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypesFile {
    /// Type for columns not listed under `columns`
    #[serde(default)]
    pub default: Option<String>,

    /// Column name to type name
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl TypesFile {
    /// Load types file from path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CliError::FileNotFound(path.display().to_string())
            } else {
                CliError::Io(e)
            }
        })?;
        Self::parse(&content)
            .map_err(|e| CliError::invalid_types_file(path.display().to_string(), e.to_string()))
    }

    /// Parse types file content
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document deserializes as null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Build the resolver, with `fallback` used when the file has no default
    pub fn into_resolver(self, origin: &Path, fallback: Option<TypeTag>) -> Result<MappingResolver> {
        let parse = |name: &str| {
            name.parse::<TypeTag>()
                .map_err(|e| CliError::invalid_types_file(origin.display().to_string(), e.to_string()))
        };

        let mut resolver = MappingResolver::new();
        for (column, type_name) in &self.columns {
            resolver.insert(column, parse(type_name)?);
        }

        match self.default.as_deref() {
            Some(name) => Ok(resolver.with_default(parse(name)?)),
            None => match fallback {
                Some(tag) => Ok(resolver.with_default(tag)),
                None => Ok(resolver),
            },
        }
    }
}
