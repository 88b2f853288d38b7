//! Lexicon schema resolution and validation engine
//!
//! This crate implements the core of the AT Protocol Lexicon schema system:
//! parsing raw schema documents into a typed model, resolving local and
//! cross-document references with cycle detection and memoization, resolving
//! union discriminators, and validating data under three strictness modes.
//!
//! Reference: <https://atproto.com/specs/lexicon>
//!
//! The engine performs no I/O of its own. Documents referenced from other
//! documents are obtained through a [`SchemaSource`], which callers inject.
//!
//! # Example
//!
//! ```rust
//! use lexicon_core::{MemorySchemaSource, SchemaDocument, Validator};
//! use serde_json::json;
//!
//! let doc = SchemaDocument::from_raw(
//!     json!({
//!         "lexicon": 1,
//!         "id": "app.test.post",
//!         "defs": {
//!             "main": {
//!                 "type": "record",
//!                 "record": {
//!                     "type": "object",
//!                     "required": ["text"],
//!                     "properties": {
//!                         "text": { "type": "string", "maxLength": 10 }
//!                     }
//!                 }
//!             }
//!         }
//!     }),
//!     None,
//! )
//! .unwrap();
//!
//! let validator = Validator::new(MemorySchemaSource::new());
//! assert!(validator.validate(&json!({ "text": "hello" }), &doc));
//!
//! let errors = validator
//!     .validate_with_errors(&json!({ "text": "this is too long" }), &doc)
//!     .unwrap();
//! assert!(errors.contains_key("text"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constraints;
pub mod definition;
pub mod document;
pub mod formats;
pub mod nsid;
pub mod parser;
pub mod resolver;
pub mod source;
pub mod types;
pub mod union;
pub mod validation;

pub use constraints::*;
pub use definition::{
    BodyDef, Definition, DefinitionKind, ParamsDef, ProcedureDef, QueryDef, RecordDef, RecordKey,
    SubscriptionDef, TokenDef, XrpcErrorDef,
};
pub use document::SchemaDocument;
pub use formats::StringFormat;
pub use nsid::{Nsid, NsidError};
pub use parser::{parse_definition, parse_type, ParseError};
pub use resolver::{RefTarget, ResolutionContext, ResolutionError, Resolver, ResolverConfig};
pub use source::{
    DirectorySchemaSource, MemorySchemaSource, NullSchemaSource, SchemaSource, SourceError,
};
pub use types::*;
pub use union::UnionError;
pub use validation::{
    SchemaError, ValidationError, ValidationMode, ValidationReport, Validator, ValidatorConfig,
    Violation,
};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the engine
///
/// Field-level validation failures are never represented here; they are
/// collected into a [`ValidationReport`]. This type covers failures that make
/// a schema unusable or a reference unresolvable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed NSID
    #[error(transparent)]
    Nsid(#[from] NsidError),

    /// Malformed schema document or definition
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Reference resolution failure
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Schema source failure
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Schema cannot be validated against
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = Error::from(SourceError::NotFound("com.example.missing".to_string()));
        assert!(err.to_string().contains("com.example.missing"));

        let err = Error::from(NsidError::Empty);
        assert!(err.to_string().contains("empty"));
    }
}
