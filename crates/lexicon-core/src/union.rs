//! Union discriminator resolution
//!
//! A closed union requires each value to be an object whose `$type` names one
//! of the union's refs exactly. An open union accepts any member, including
//! types this engine has never seen, so no member is ever selected.

use crate::types::{json_type_name, UnionType};
use serde_json::Value;
use thiserror::Error;

/// Discriminator field of union members
pub const TYPE_FIELD: &str = "$type";

/// Errors from union resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnionError {
    /// A closed union member must be an object
    #[error("Expected object for union member, got {actual}")]
    InvalidType {
        /// JSON shape of the value
        actual: &'static str,
    },

    /// The discriminator is missing or not allowed
    #[error("Invalid union value: {0}")]
    InvalidValue(String),
}

/// Select the union member that `value` belongs to
///
/// Returns `Ok(None)` for open unions and `Ok(Some($type))` for closed ones.
pub fn resolve(value: &Value, union: &UnionType) -> Result<Option<String>, UnionError> {
    if !union.closed {
        return Ok(None);
    }

    let obj = value.as_object().ok_or(UnionError::InvalidType {
        actual: json_type_name(value),
    })?;

    let type_name = match obj.get(TYPE_FIELD) {
        None => return Err(UnionError::InvalidValue("missing $type".to_string())),
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(UnionError::InvalidValue(format!(
                "$type must be a string, got {}",
                json_type_name(other)
            )))
        }
    };

    if union.refs.iter().any(|r| r == type_name) {
        Ok(Some(type_name.clone()))
    } else {
        Err(UnionError::InvalidValue(format!(
            "type not in union: {}",
            type_name
        )))
    }
}

/// Whether `value` resolves to `expected` in a closed union
pub fn matches(value: &Value, expected: &str, union: &UnionType) -> bool {
    matches!(resolve(value, union), Ok(Some(t)) if t == expected)
}

/// Read the `$type` discriminator without checking membership
pub fn extract_type(value: &Value) -> Option<&str> {
    value.get(TYPE_FIELD)?.as_str()
}
