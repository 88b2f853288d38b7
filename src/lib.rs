//! Lexicon engine
//!
//! Re-exports the synchronous schema engine from `lexicon-core` and the
//! optional remote discovery source as [`discovery`].
//!
//! ```rust
//! use lexicon_engine::{MemorySchemaSource, SchemaDocument, Validator};
//! use serde_json::json;
//!
//! let doc = SchemaDocument::from_raw(
//!     json!({
//!         "lexicon": 1,
//!         "id": "com.example.greeting",
//!         "defs": {
//!             "main": {
//!                 "type": "object",
//!                 "required": ["text"],
//!                 "properties": { "text": { "type": "string", "maxLength": 16 } }
//!             }
//!         }
//!     }),
//!     None,
//! )
//! .unwrap();
//!
//! let validator = Validator::new(MemorySchemaSource::new());
//! assert!(validator.validate(&json!({ "text": "hi" }), &doc));
//! assert!(!validator.validate(&json!({ "text": "far too long for this field" }), &doc));
//! ```

pub use lexicon_core::*;
pub use lexicon_discovery as discovery;
