//! Validation violations and reports

use crate::union::UnionError;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// A single rule violated by a value
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Violation {
    /// Value has the wrong JSON shape
    #[error("Expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected shape
        expected: &'static str,
        /// Actual shape
        actual: &'static str,
    },

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingRequiredField {
        /// The field name
        field: String,
    },

    /// Field not declared by the schema
    #[error("Unknown field: {field}")]
    UnknownField {
        /// The field name
        field: String,
    },

    /// String is too long
    #[error("String exceeds maximum length: {actual} > {max}")]
    StringTooLong {
        /// Actual length
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// String is too short
    #[error("String is shorter than minimum length: {actual} < {min}")]
    StringTooShort {
        /// Actual length
        actual: usize,
        /// Minimum required length
        min: usize,
    },

    /// String has too many graphemes
    #[error("String exceeds maximum graphemes: {actual} > {max}")]
    TooManyGraphemes {
        /// Actual grapheme count
        actual: usize,
        /// Maximum allowed graphemes
        max: usize,
    },

    /// String has too few graphemes
    #[error("String has fewer than minimum graphemes: {actual} < {min}")]
    TooFewGraphemes {
        /// Actual grapheme count
        actual: usize,
        /// Minimum required graphemes
        min: usize,
    },

    /// Value not in enum
    #[error("Value {value} not in allowed enum values")]
    NotInEnum {
        /// The value that was provided
        value: Value,
        /// The allowed values
        allowed: Value,
    },

    /// Value does not match constant
    #[error("Value {actual} does not match required constant {expected}")]
    ConstMismatch {
        /// The value that was provided
        actual: Value,
        /// The expected constant value
        expected: Value,
    },

    /// Invalid string format
    #[error("Invalid {format} format: {value}")]
    InvalidFormat {
        /// The format that was expected
        format: String,
        /// The value that failed validation
        value: String,
    },

    /// Integer below minimum
    #[error("Integer {value} is less than minimum {min}")]
    IntegerTooSmall {
        /// The value that was provided
        value: i64,
        /// Minimum allowed value
        min: i64,
    },

    /// Integer above maximum
    #[error("Integer {value} is greater than maximum {max}")]
    IntegerTooLarge {
        /// The value that was provided
        value: i64,
        /// Maximum allowed value
        max: i64,
    },

    /// Integer does not fit in a signed 64-bit value
    #[error("Integer {value} is out of range")]
    IntegerOutOfRange {
        /// The value that was provided
        value: String,
    },

    /// Array has too many items
    #[error("Array has too many items: {actual} > {max}")]
    ArrayTooLong {
        /// Actual length
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Array has too few items
    #[error("Array has too few items: {actual} < {min}")]
    ArrayTooShort {
        /// Actual length
        actual: usize,
        /// Minimum required length
        min: usize,
    },

    /// Decoded bytes are too long
    #[error("Bytes exceed maximum length: {actual} > {max}")]
    BytesTooLong {
        /// Actual decoded length
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Decoded bytes are too short
    #[error("Bytes are shorter than minimum length: {actual} < {min}")]
    BytesTooShort {
        /// Actual decoded length
        actual: usize,
        /// Minimum required length
        min: usize,
    },

    /// Malformed `{"$bytes": ...}` value
    #[error("Invalid bytes: {0}")]
    InvalidBytes(String),

    /// Malformed `{"$link": ...}` value
    #[error("Invalid cid-link: {0}")]
    InvalidCidLink(String),

    /// Malformed blob reference
    #[error("Invalid blob: {0}")]
    InvalidBlob(String),

    /// Blob size exceeds maximum
    #[error("Blob size {actual} exceeds maximum {max}")]
    BlobTooLarge {
        /// Actual size in bytes
        actual: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// Blob MIME type not accepted
    #[error("Blob MIME type '{mime_type}' not in accepted types")]
    BlobMimeTypeNotAccepted {
        /// The MIME type
        mime_type: String,
        /// The accepted patterns
        accept: Vec<String>,
    },

    /// Union discriminator problem
    #[error(transparent)]
    Union(#[from] UnionError),
}

impl Violation {
    /// Name of the schema keyword that was violated
    pub fn rule(&self) -> &'static str {
        match self {
            Violation::TypeMismatch { .. } => "type",
            Violation::MissingRequiredField { .. } => "required",
            Violation::UnknownField { .. } => "unknownField",
            Violation::StringTooLong { .. } | Violation::BytesTooLong { .. } => "maxLength",
            Violation::StringTooShort { .. } | Violation::BytesTooShort { .. } => "minLength",
            Violation::TooManyGraphemes { .. } => "maxGraphemes",
            Violation::TooFewGraphemes { .. } => "minGraphemes",
            Violation::NotInEnum { .. } => "enum",
            Violation::ConstMismatch { .. } => "const",
            Violation::InvalidFormat { .. } => "format",
            Violation::IntegerTooSmall { .. } => "minimum",
            Violation::IntegerTooLarge { .. } => "maximum",
            Violation::IntegerOutOfRange { .. } => "integer",
            Violation::ArrayTooLong { .. } => "maxItems",
            Violation::ArrayTooShort { .. } => "minItems",
            Violation::InvalidBytes(_) => "bytes",
            Violation::InvalidCidLink(_) => "cid-link",
            Violation::InvalidBlob(_) => "blob",
            Violation::BlobTooLarge { .. } => "maxSize",
            Violation::BlobMimeTypeNotAccepted { .. } => "accept",
            Violation::Union(_) => "union",
        }
    }

    /// What the schema asked for, when it is a single value
    pub fn expected(&self) -> Option<Value> {
        match self {
            Violation::TypeMismatch { expected, .. } => Some(json!(expected)),
            Violation::StringTooLong { max, .. }
            | Violation::TooManyGraphemes { max, .. }
            | Violation::ArrayTooLong { max, .. }
            | Violation::BytesTooLong { max, .. } => Some(json!(max)),
            Violation::StringTooShort { min, .. }
            | Violation::TooFewGraphemes { min, .. }
            | Violation::ArrayTooShort { min, .. }
            | Violation::BytesTooShort { min, .. } => Some(json!(min)),
            Violation::NotInEnum { allowed, .. } => Some(allowed.clone()),
            Violation::ConstMismatch { expected, .. } => Some(expected.clone()),
            Violation::InvalidFormat { format, .. } => Some(json!(format)),
            Violation::IntegerTooSmall { min, .. } => Some(json!(min)),
            Violation::IntegerTooLarge { max, .. } => Some(json!(max)),
            Violation::BlobTooLarge { max, .. } => Some(json!(max)),
            Violation::BlobMimeTypeNotAccepted { accept, .. } => Some(json!(accept)),
            _ => None,
        }
    }

    /// What the value actually had
    pub fn actual(&self) -> Option<Value> {
        match self {
            Violation::TypeMismatch { actual, .. } => Some(json!(actual)),
            Violation::StringTooLong { actual, .. }
            | Violation::StringTooShort { actual, .. }
            | Violation::TooManyGraphemes { actual, .. }
            | Violation::TooFewGraphemes { actual, .. }
            | Violation::ArrayTooLong { actual, .. }
            | Violation::ArrayTooShort { actual, .. }
            | Violation::BytesTooLong { actual, .. }
            | Violation::BytesTooShort { actual, .. } => Some(json!(actual)),
            Violation::NotInEnum { value, .. } => Some(value.clone()),
            Violation::ConstMismatch { actual, .. } => Some(actual.clone()),
            Violation::InvalidFormat { value, .. } => Some(json!(value)),
            Violation::IntegerOutOfRange { value } => Some(json!(value)),
            Violation::IntegerTooSmall { value, .. } | Violation::IntegerTooLarge { value, .. } => {
                Some(json!(value))
            }
            Violation::BlobTooLarge { actual, .. } => Some(json!(actual)),
            Violation::BlobMimeTypeNotAccepted { mime_type, .. } => Some(json!(mime_type)),
            _ => None,
        }
    }
}

/// A violation located at a field path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Where the violation occurred (`text`, `embed.images[0].alt`, or `$`)
    pub field_path: String,

    /// Human readable message
    pub message: String,

    /// Violated schema keyword
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,

    /// What the schema asked for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,

    /// What the value had
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,

    /// Extra details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, Value>>,
}

impl ValidationError {
    /// Locate a violation at `field_path`
    pub fn from_violation(field_path: impl Into<String>, violation: &Violation) -> Self {
        Self {
            field_path: field_path.into(),
            message: violation.to_string(),
            rule: Some(violation.rule().to_string()),
            expected: violation.expected(),
            actual: violation.actual(),
            context: None,
        }
    }

    /// Attach a context entry
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }
}

/// All violations found in one validation call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Create an empty (valid) report
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no violations were found
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All violations, in discovery order
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no violations were found
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Violations at exactly `field_path`
    pub fn errors_at<'a>(&'a self, field_path: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors.iter().filter(move |e| e.field_path == field_path)
    }

    /// Record a violation at `field_path`
    pub fn push(&mut self, field_path: impl Into<String>, violation: &Violation) {
        self.errors
            .push(ValidationError::from_violation(field_path, violation));
    }

    /// Record a pre-built error
    pub fn push_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Messages grouped by field path
    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in self.errors {
            map.entry(error.field_path).or_default().push(error.message);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_rules() {
        let v = Violation::StringTooLong { actual: 12, max: 10 };
        assert_eq!(v.rule(), "maxLength");
        assert_eq!(v.expected(), Some(json!(10)));
        assert_eq!(v.actual(), Some(json!(12)));
        assert_eq!(v.to_string(), "String exceeds maximum length: 12 > 10");

        let v = Violation::MissingRequiredField {
            field: "name".to_string(),
        };
        assert_eq!(v.rule(), "required");
        assert_eq!(v.expected(), None);
    }

    #[test]
    fn test_union_violation() {
        let v = Violation::from(UnionError::InvalidValue("missing $type".to_string()));
        assert_eq!(v.rule(), "union");
        assert!(v.to_string().contains("missing $type"));
    }

    #[test]
    fn test_report_map_groups_by_path() {
        let mut report = ValidationReport::new();
        assert!(report.is_valid());

        report.push("text", &Violation::StringTooLong { actual: 20, max: 10 });
        report.push("text", &Violation::TooManyGraphemes { actual: 20, max: 10 });
        report.push(
            "tags[1]",
            &Violation::TypeMismatch {
                expected: "string",
                actual: "integer",
            },
        );

        assert!(!report.is_valid());
        assert_eq!(report.len(), 3);
        assert_eq!(report.errors_at("text").count(), 2);

        let map = report.into_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["text"].len(), 2);
        assert_eq!(map["tags[1]"], vec!["Expected string, got integer"]);
    }

    #[test]
    fn test_error_serializes_camel_case() {
        let error = ValidationError::from_violation(
            "age",
            &Violation::IntegerTooSmall { value: -5, min: 0 },
        )
        .with_context("mode", json!("strict"));

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["fieldPath"], "age");
        assert_eq!(json["rule"], "minimum");
        assert_eq!(json["expected"], 0);
        assert_eq!(json["actual"], -5);
        assert_eq!(json["context"]["mode"], "strict");
    }
}
