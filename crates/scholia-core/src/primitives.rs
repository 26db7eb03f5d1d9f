//! # Primitive Value Codecs
//!
//! Scalar value kinds used by Attribute definitions, and the fixed
//! separators every `to_record` projection relies on.
//!
//! Each kind encodes an in-memory [`Value`] to the string stored in the
//! `attribute.raw` column and decodes it back:
//!
//! | kind      | encode                | decode                          |
//! |-----------|-----------------------|---------------------------------|
//! | `number`  | shortest decimal      | finite `f64`, else `Decode`     |
//! | `string`  | identity              | identity                        |
//! | `boolean` | `"true"` / `"false"`  | exactly those literals          |
//! | `void`    | `""`                  | only `""`                       |

use crate::types::{Id, Result, ScholiaError};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// SERIALIZATION SEPARATORS
// =============================================================================

/// Separator for id sequences (`Concept` args, `attr` columns) and for the
/// two halves of `Attribute` / rel endpoint args.
pub const ID_LIST_SEPARATOR: char = '/';

/// Separates rel endpoints from the rel's attribute list: `from/to!a@b`.
pub const REL_ARGS_SEPARATOR: char = '!';

/// Separator between attribute ids inside rel args.
pub const REL_ATTR_SEPARATOR: char = '@';

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for typenames.
pub const MAX_TYPENAME_LENGTH: usize = 256;

/// Maximum length for node and rel names.
///
/// Rel names embed two 64-character ids plus a verb, so this leaves room.
pub const MAX_NAME_LENGTH: usize = 4096;

// =============================================================================
// VALUES
// =============================================================================

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
    Void,
}

impl Value {
    /// Create a text value.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// The kind this value belongs to.
    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Number(_) => PrimitiveKind::Number,
            Self::Text(_) => PrimitiveKind::String,
            Self::Boolean(_) => PrimitiveKind::Boolean,
            Self::Void => PrimitiveKind::Void,
        }
    }

    /// Borrow the text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the numeric payload, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

// =============================================================================
// PRIMITIVE KINDS
// =============================================================================

/// The scalar kinds an Attribute may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Number,
    String,
    Boolean,
    Void,
}

impl PrimitiveKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 4] = [Self::Number, Self::String, Self::Boolean, Self::Void];

    /// The typename under which this kind is stored as a `primitive` type.
    #[must_use]
    pub const fn typename(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Void => "void",
        }
    }

    /// Resolve a kind from its typename.
    pub fn from_typename(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.typename() == name)
            .ok_or_else(|| ScholiaError::InvalidType(format!("unknown primitive '{}'", name)))
    }

    /// Encode a value of this kind to its raw string form.
    pub fn encode(self, value: &Value) -> Result<String> {
        match (self, value) {
            (Self::Number, Value::Number(n)) => {
                if n.is_finite() {
                    Ok(n.to_string())
                } else {
                    Err(ScholiaError::Decode(format!(
                        "number value {} is not finite",
                        n
                    )))
                }
            }
            (Self::String, Value::Text(s)) => Ok(s.clone()),
            (Self::Boolean, Value::Boolean(b)) => Ok(if *b { "true" } else { "false" }.to_string()),
            (Self::Void, Value::Void) => Ok(String::new()),
            (kind, other) => Err(ScholiaError::Decode(format!(
                "cannot encode {:?} value as {}",
                other.kind(),
                kind
            ))),
        }
    }

    /// Decode a raw string into a value of this kind.
    pub fn decode(self, raw: &str) -> Result<Value> {
        match self {
            Self::Number => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Number)
                .ok_or_else(|| ScholiaError::Decode(format!("'{}' is not a finite number", raw))),
            Self::String => Ok(Value::Text(raw.to_string())),
            Self::Boolean => match raw {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(ScholiaError::Decode(format!("'{}' is not a boolean", raw))),
            },
            Self::Void => {
                if raw.is_empty() {
                    Ok(Value::Void)
                } else {
                    Err(ScholiaError::Decode(format!(
                        "void value must be empty, got '{}'",
                        raw
                    )))
                }
            }
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.typename())
    }
}

// =============================================================================
// ID SEQUENCES
// =============================================================================

/// Encode an ordered id list as a single column value.
#[must_use]
pub fn encode_ids(ids: &[Id], separator: char) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(id.as_str());
    }
    out
}

/// Decode a column value produced by [`encode_ids`]. The empty string is
/// the empty list.
#[must_use]
pub fn decode_ids(raw: &str, separator: char) -> Vec<Id> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(separator).map(Id::new).collect()
}

/// Validate a typename or record name against a length limit.
pub(crate) fn validate_name(name: &str, max: usize, what: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ScholiaError::InvalidType(format!("{} must not be empty", what)));
    }
    if name.len() > max {
        return Err(ScholiaError::InvalidType(format!(
            "{} exceeds {} bytes",
            what, max
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(ScholiaError::InvalidType(format!(
            "{} contains control characters",
            what
        )));
    }
    Ok(())
}
