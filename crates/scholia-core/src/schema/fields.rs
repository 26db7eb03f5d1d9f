//! Named views over a concept's positional attribute list.
//!
//! Stored nodes only know an ordered list of attribute ids. A
//! `ConceptFields` implementation gives that list field names once, so
//! callers never index into it by position.

use crate::primitives::Value;
use crate::types::{Result, ScholiaError};

/// A record with named fields laid over a concept's attribute list.
///
/// One record type may serve several concepts with the same layout.
pub trait ConceptFields: Sized {
    /// Field names, in the concept's declared attribute order.
    const FIELDS: &'static [&'static str];

    /// Flatten into positional values, in `FIELDS` order.
    fn into_values(self) -> Vec<Value>;

    /// Rebuild from positional values, in `FIELDS` order.
    fn from_values(values: &[Value]) -> Result<Self>;
}

fn field_error(index: usize, field: &str, expected: &str) -> ScholiaError {
    ScholiaError::Decode(format!(
        "field '{}' (position {}) is not {}",
        field, index, expected
    ))
}

/// Text at `index`; missing, void, or non-text values are errors.
pub fn required_text(values: &[Value], index: usize, field: &str) -> Result<String> {
    match values.get(index) {
        Some(Value::Text(s)) => Ok(s.clone()),
        _ => Err(field_error(index, field, "text")),
    }
}

/// Text at `index`, `None` when missing or void.
pub fn optional_text(values: &[Value], index: usize, field: &str) -> Result<Option<String>> {
    match values.get(index) {
        None | Some(Value::Void) => Ok(None),
        Some(Value::Text(s)) => Ok(Some(s.clone())),
        Some(_) => Err(field_error(index, field, "text")),
    }
}

/// Number at `index`, `None` when missing or void.
pub fn optional_number(values: &[Value], index: usize, field: &str) -> Result<Option<f64>> {
    match values.get(index) {
        None | Some(Value::Void) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(*n)),
        Some(_) => Err(field_error(index, field, "a number")),
    }
}
