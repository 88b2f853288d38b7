//! Data validation against Lexicon schemas
//!
//! A [`Validator`] checks a JSON value against the `main` definition of a
//! [`SchemaDocument`], which must be a record or an object. How much is
//! checked depends on the [`ValidationMode`]:
//!
//! | mode | required fields | unknown top-level fields | constraints |
//! |---|---|---|---|
//! | strict | enforced | rejected (`$`-prefixed keys exempt) | enforced |
//! | optimistic | enforced | allowed | enforced |
//! | lenient | skipped | allowed | skipped |
//!
//! Field-level problems are collected into a [`ValidationReport`]; only
//! problems with the schema itself (no usable `main`, an unresolvable
//! reference) are returned as errors.
//!
//! # Example
//!
//! ```rust
//! use lexicon_core::{NullSchemaSource, SchemaDocument, ValidationMode, Validator};
//! use serde_json::json;
//!
//! let doc = SchemaDocument::from_raw(
//!     json!({
//!         "lexicon": 1,
//!         "id": "com.example.person",
//!         "defs": {
//!             "main": {
//!                 "type": "object",
//!                 "required": ["name"],
//!                 "properties": {
//!                     "name": { "type": "string" },
//!                     "age": { "type": "integer", "minimum": 0 }
//!                 }
//!             }
//!         }
//!     }),
//!     None,
//! )
//! .unwrap();
//!
//! let data = json!({ "name": "x", "age": 5, "extra": 1 });
//! assert!(!Validator::new(NullSchemaSource).validate(&data, &doc));
//! assert!(Validator::with_mode(NullSchemaSource, ValidationMode::Optimistic).validate(&data, &doc));
//! ```

mod checks;
mod report;
mod walker;

pub use checks::{mime_matches, BlobRef};
pub use report::{ValidationError, ValidationReport, Violation};
pub use walker::ROOT_PATH;

use crate::definition::Definition;
use crate::document::{SchemaDocument, MAIN_DEF};
use crate::nsid::Nsid;
use crate::resolver::{Resolver, ResolverConfig};
use crate::source::SchemaSource;
use crate::types::{json_type_name, ObjectType, TypeDefinition};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use walker::Walker;

/// How strictly data is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Everything is enforced and unknown top-level fields are rejected
    #[default]
    Strict,

    /// Like strict, but unknown fields are allowed
    Optimistic,

    /// Only the shape of declared fields is checked
    Lenient,
}

impl ValidationMode {
    /// Whether `required` is enforced
    pub fn enforces_required(&self) -> bool {
        !matches!(self, ValidationMode::Lenient)
    }

    /// Whether undeclared top-level fields are allowed
    pub fn allows_unknown_fields(&self) -> bool {
        !matches!(self, ValidationMode::Strict)
    }

    /// Whether value constraints (lengths, ranges, formats, ...) are enforced
    pub fn enforces_constraints(&self) -> bool {
        !matches!(self, ValidationMode::Lenient)
    }

    /// The mode's name
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Strict => "strict",
            ValidationMode::Optimistic => "optimistic",
            ValidationMode::Lenient => "lenient",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "optimistic" => Ok(ValidationMode::Optimistic),
            "lenient" => Ok(ValidationMode::Lenient),
            other => Err(format!("unknown validation mode '{}'", other)),
        }
    }
}

/// Validator settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Strictness
    pub mode: ValidationMode,

    /// Settings for the underlying resolver
    pub resolver: ResolverConfig,
}

impl ValidatorConfig {
    /// Set the strictness
    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the resolver settings
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }
}

/// The schema cannot be used for validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The document has no `main` definition
    #[error("Invalid schema {0}: no main definition")]
    MissingMain(String),

    /// `main` is neither a record nor an object
    #[error("Invalid schema {nsid}: main definition is a {found}, expected record or object")]
    UnsupportedMain {
        /// Document id
        nsid: String,
        /// Kind of the main definition
        found: &'static str,
    },
}

/// Validates data against schema documents
pub struct Validator<S> {
    resolver: Resolver<S>,
    mode: ValidationMode,
}

impl<S: SchemaSource> Validator<S> {
    /// Create a strict validator
    pub fn new(source: S) -> Self {
        Self::from_config(source, ValidatorConfig::default())
    }

    /// Create a validator with the given strictness
    pub fn with_mode(source: S, mode: ValidationMode) -> Self {
        Self::from_config(source, ValidatorConfig::default().with_mode(mode))
    }

    /// Create a validator from settings
    pub fn from_config(source: S, config: ValidatorConfig) -> Self {
        Self {
            resolver: Resolver::with_config(source, config.resolver),
            mode: config.mode,
        }
    }

    /// The strictness of this validator
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// The resolver used for `ref` fields
    pub fn resolver(&self) -> &Resolver<S> {
        &self.resolver
    }

    /// Whether `data` is valid against `doc`
    ///
    /// Any failure, including an unusable schema, yields `false`.
    pub fn validate(&self, data: &Value, doc: &SchemaDocument) -> bool {
        match self.validate_report(data, doc) {
            Ok(report) => report.is_valid(),
            Err(e) => {
                tracing::debug!("Validation against {} failed: {}", doc.id, e);
                false
            }
        }
    }

    /// Error messages grouped by field path; an empty map means valid
    pub fn validate_with_errors(
        &self,
        data: &Value,
        doc: &SchemaDocument,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        Ok(self.validate_report(data, doc)?.into_map())
    }

    /// Structured validation result
    pub fn validate_report(&self, data: &Value, doc: &SchemaDocument) -> Result<ValidationReport> {
        let main = main_object(doc)?;
        let mut walker = Walker::new(&self.resolver, doc, self.mode);

        let walked = match data.as_object() {
            Some(obj) => walker.walk_object(obj, &main, "", true),
            None => {
                walker.push(
                    ROOT_PATH,
                    Violation::TypeMismatch {
                        expected: "object",
                        actual: json_type_name(data),
                    },
                );
                Ok(())
            }
        };

        let report = walker.finish();
        if let Err(e) = walked {
            tracing::warn!("Schema {} has an unresolvable reference: {}", doc.id, e);
            return Err(e.into());
        }
        Ok(report)
    }

    /// Whether `value` is valid for the top-level field `name`
    ///
    /// An undeclared field is valid unless the mode is strict.
    pub fn validate_field(&self, value: &Value, name: &str, doc: &SchemaDocument) -> bool {
        let main = match main_object(doc) {
            Ok(main) => main,
            Err(e) => {
                tracing::debug!("Field validation against {} failed: {}", doc.id, e);
                return false;
            }
        };

        let Some(def) = main.properties.get(name) else {
            return self.mode.allows_unknown_fields();
        };
        if value.is_null() && main.is_nullable(name) {
            return true;
        }

        let mut walker = Walker::new(&self.resolver, doc, self.mode);
        let walked = walker.walk(value, def, name);
        let report = walker.finish();
        walked.is_ok() && report.is_valid()
    }

    /// Load the document for `nsid` through the source and validate against it
    pub fn validate_by_nsid(&self, data: &Value, nsid: &Nsid) -> Result<ValidationReport> {
        let raw = self.resolver.source().load(nsid)?;
        let doc = SchemaDocument::from_raw(raw, Some(nsid.as_str()))?;
        self.validate_report(data, &doc)
    }
}

impl<S> fmt::Debug for Validator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("mode", &self.mode)
            .field("resolver", &self.resolver)
            .finish()
    }
}

/// The object that top-level data is validated against
fn main_object(doc: &SchemaDocument) -> Result<ObjectType> {
    match doc.parse_definition(MAIN_DEF)? {
        Some(Definition::Record(record)) => Ok(record.record),
        Some(Definition::Type(TypeDefinition::Object(object))) => Ok(object),
        Some(other) => {
            tracing::warn!(
                "Schema {} main definition is a {}, cannot validate",
                doc.id,
                other.kind().as_str()
            );
            Err(SchemaError::UnsupportedMain {
                nsid: doc.id.to_string(),
                found: other.kind().as_str(),
            }
            .into())
        }
        None => Err(SchemaError::MissingMain(doc.id.to_string()).into()),
    }
}
