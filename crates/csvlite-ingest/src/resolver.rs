//! Column type resolution
//!
//! A run asks a [`TypeResolver`] once for the declared types of the header's
//! columns. The answer is authoritative: the schema is built from it and never
//! changes afterwards.

use crate::error::ResolveError;
use csvlite_common::TypeTag;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Maps column names to declared types, one type per name, in order
pub trait TypeResolver {
    fn resolve(&mut self, columns: &[String]) -> Result<Vec<TypeTag>, ResolveError>;
}

impl<F> TypeResolver for F
where
    F: FnMut(&[String]) -> Result<Vec<TypeTag>, ResolveError>,
{
    fn resolve(&mut self, columns: &[String]) -> Result<Vec<TypeTag>, ResolveError> {
        self(columns)
    }
}

/// Gives every column the same type
#[derive(Debug, Clone, Copy)]
pub struct UniformResolver {
    tag: TypeTag,
}

impl UniformResolver {
    pub fn new(tag: TypeTag) -> Self {
        Self { tag }
    }
}

impl TypeResolver for UniformResolver {
    fn resolve(&mut self, columns: &[String]) -> Result<Vec<TypeTag>, ResolveError> {
        Ok(vec![self.tag; columns.len()])
    }
}

/// Looks columns up by name (case-insensitive), falling back to a default.
///
/// Without a default, a column missing from the map is an error.
#[derive(Debug, Clone, Default)]
pub struct MappingResolver {
    types: HashMap<String, TypeTag>,
    default: Option<TypeTag>,
}

impl MappingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, tag: TypeTag) -> Self {
        self.default = Some(tag);
        self
    }

    pub fn with_type(mut self, column: impl AsRef<str>, tag: TypeTag) -> Self {
        self.insert(column, tag);
        self
    }

    pub fn insert(&mut self, column: impl AsRef<str>, tag: TypeTag) {
        self.types.insert(column.as_ref().trim().to_lowercase(), tag);
    }

    pub fn default_type(&self) -> Option<TypeTag> {
        self.default
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeResolver for MappingResolver {
    fn resolve(&mut self, columns: &[String]) -> Result<Vec<TypeTag>, ResolveError> {
        let mut resolved = Vec::with_capacity(columns.len());
        for column in columns {
            match self.types.get(&column.to_lowercase()).copied().or(self.default) {
                Some(tag) => {
                    debug!(column = %column, declared_type = %tag, "Resolved column type");
                    resolved.push(tag);
                },
                None => return Err(ResolveError::Unmapped(column.clone())),
            }
        }

        let header: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
        for name in self.types.keys().filter(|name| !header.contains(name)) {
            warn!(column = %name, "Type mapping names a column missing from the header");
        }

        Ok(resolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_uniform() {
        let mut resolver = UniformResolver::new(TypeTag::Real);
        assert_eq!(
            resolver.resolve(&names(&["a", "b"])).unwrap(),
            vec![TypeTag::Real, TypeTag::Real]
        );
    }

    #[test]
    fn test_mapping_is_case_insensitive() {
        let mut resolver = MappingResolver::new()
            .with_type("Price", TypeTag::Real)
            .with_type(" paid ", TypeTag::Boolean);

        assert_eq!(
            resolver.resolve(&names(&["PRICE", "Paid"])).unwrap(),
            vec![TypeTag::Real, TypeTag::Boolean]
        );
    }

    #[test]
    fn test_mapping_default() {
        let mut resolver = MappingResolver::new()
            .with_type("qty", TypeTag::Integer)
            .with_default(TypeTag::Text);

        assert_eq!(
            resolver.resolve(&names(&["name", "qty"])).unwrap(),
            vec![TypeTag::Text, TypeTag::Integer]
        );
    }

    #[test]
    fn test_mapping_without_default_fails_on_unknown_column() {
        let mut resolver = MappingResolver::new().with_type("qty", TypeTag::Integer);
        assert_eq!(
            resolver.resolve(&names(&["qty", "name"])),
            Err(ResolveError::Unmapped("name".to_string()))
        );
    }

    #[test]
    fn test_closure_resolver() {
        let mut calls = 0;
        let mut resolver = |columns: &[String]| -> Result<Vec<TypeTag>, ResolveError> {
            calls += 1;
            Ok(vec![TypeTag::Integer; columns.len()])
        };

        assert_eq!(resolver.resolve(&names(&["x"])).unwrap(), vec![TypeTag::Integer]);
        drop(resolver);
        assert_eq!(calls, 1);
    }
}
