//! Field constraints for Lexicon type definitions
//!
//! Constraint values are copied verbatim from the schema. They are not
//! cross-checked at parse time (a `minLength` larger than `maxLength` is
//! accepted here and simply makes every value fail validation).

use serde::{Deserialize, Serialize};

/// Constraints for string fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StringConstraints {
    /// Maximum length in UTF-8 bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Minimum length in UTF-8 bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum length in Unicode grapheme clusters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_graphemes: Option<usize>,

    /// Minimum length in Unicode grapheme clusters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_graphemes: Option<usize>,

    /// Allowed values (closed set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#enum: Option<Vec<String>>,

    /// Constant value (field must always have this value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#const: Option<String>,

    /// Default value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Known values (open set, not enforced)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_values: Option<Vec<String>>,
}

/// Constraints for integer fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IntegerConstraints {
    /// Maximum value (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,

    /// Minimum value (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,

    /// Allowed values (closed set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#enum: Option<Vec<i64>>,

    /// Constant value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#const: Option<i64>,

    /// Default value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<i64>,
}

/// Constraints for boolean fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BooleanConstraints {
    /// Constant value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#const: Option<bool>,

    /// Default value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
}

/// Constraints for array fields
///
/// Published lexicons spell these `minLength`/`maxLength`; both spellings are
/// accepted and serialized back as `minItems`/`maxItems`. When a schema uses
/// both spellings for the same bound, `minItems`/`maxItems` win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", from = "RawArrayConstraints")]
pub struct ArrayConstraints {
    /// Maximum number of items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    /// Minimum number of items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArrayConstraints {
    max_items: Option<usize>,
    max_length: Option<usize>,
    min_items: Option<usize>,
    min_length: Option<usize>,
}

impl From<RawArrayConstraints> for ArrayConstraints {
    fn from(raw: RawArrayConstraints) -> Self {
        Self {
            max_items: raw.max_items.or(raw.max_length),
            min_items: raw.min_items.or(raw.min_length),
        }
    }
}

/// Constraints for blob fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BlobConstraints {
    /// Accepted MIME types (`image/*` and `*/*` wildcards allowed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<Vec<String>>,

    /// Maximum size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

/// Constraints for bytes fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BytesConstraints {
    /// Maximum decoded length in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Minimum decoded length in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
}
