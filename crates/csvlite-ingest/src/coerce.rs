//! Field coercion
//!
//! Converts raw text fields into typed values according to the declared type
//! of their column. An empty field is NULL for every type. Every other
//! failure is reported as a named [`CoercionErrorKind`] and no value is
//! produced for the row.

use crate::error::{CoercionErrorKind, TypeCoercionError};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use csvlite_common::{ColumnDefinition, Schema, TypeTag};

/// Marker that must precede the base64 payload of a BINARY_IMAGE field
pub const PNG_BASE64_MARKER: &str = "png;base64,";

/// Standard alphabet, padding optional
const IMAGE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A typed value ready to be bound to one column of an insert
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Bytes(Vec<u8>),
    Text(String),
}

/// Coerce one field to `tag`
pub fn coerce(raw: &str, tag: TypeTag) -> Result<CoercedValue, CoercionErrorKind> {
    if raw.is_empty() {
        return Ok(CoercedValue::Null);
    }

    match tag {
        TypeTag::Real => parse_real(raw),
        TypeTag::Boolean => parse_boolean(raw),
        TypeTag::BinaryImage => decode_image(raw),
        TypeTag::Integer => raw
            .trim()
            .parse::<i64>()
            .map(CoercedValue::Integer)
            .map_err(|_| CoercionErrorKind::IntegerParse),
        TypeTag::Text | TypeTag::Numeric => Ok(CoercedValue::Text(raw.to_string())),
    }
}

/// Coerce one field for `column`, attaching the column name to failures
pub fn coerce_field(
    raw: &str,
    column: &ColumnDefinition,
) -> Result<CoercedValue, TypeCoercionError> {
    coerce(raw, column.declared_type).map_err(|kind| TypeCoercionError {
        kind,
        column: column.name.clone(),
        raw: raw.to_string(),
    })
}

/// Coerce a whole row, stopping at the first failing field.
///
/// The caller must have checked that `fields` has one entry per column.
pub fn coerce_row(
    fields: &[String],
    schema: &Schema,
) -> Result<Vec<CoercedValue>, TypeCoercionError> {
    fields
        .iter()
        .zip(schema.columns())
        .map(|(raw, column)| coerce_field(raw, column))
        .collect()
}

/// Keep only digits, `.` and `-` (drops currency symbols, thousands
/// separators, units) and parse what is left
fn parse_real(raw: &str) -> Result<CoercedValue, CoercionErrorKind> {
    let numeric: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    numeric
        .parse::<f64>()
        .map(CoercedValue::Real)
        .map_err(|_| CoercionErrorKind::RealParse)
}

fn parse_boolean(raw: &str) -> Result<CoercedValue, CoercionErrorKind> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(CoercedValue::Boolean(true))
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(CoercedValue::Boolean(false))
    } else {
        Err(CoercionErrorKind::BooleanFormat)
    }
}

fn decode_image(raw: &str) -> Result<CoercedValue, CoercionErrorKind> {
    let Some(start) = raw.find(PNG_BASE64_MARKER) else {
        return Err(CoercionErrorKind::Base64Decode);
    };

    IMAGE_ENGINE
        .decode(&raw[start + PNG_BASE64_MARKER.len()..])
        .map(CoercedValue::Bytes)
        .map_err(|_| CoercionErrorKind::Base64Decode)
}
