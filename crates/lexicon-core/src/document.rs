//! Lexicon schema documents
//!
//! Reference: <https://atproto.com/specs/lexicon>
//!
//! # Example
//!
//! ```json
//! {
//!   "lexicon": 1,
//!   "id": "com.example.getRecord",
//!   "description": "Get a record by URI",
//!   "defs": {
//!     "main": {
//!       "type": "query",
//!       "parameters": { ... },
//!       "output": { ... }
//!     }
//!   }
//! }
//! ```
//!
//! Definitions are kept raw and parsed on demand, so a document with one
//! unusual definition can still be used for the others.

use crate::definition::Definition;
use crate::nsid::Nsid;
use crate::parser::{self, ParseError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported `lexicon` language version
pub const LEXICON_VERSION: i64 = 1;

/// Name of the primary definition
pub const MAIN_DEF: &str = "main";

/// A parsed Lexicon schema document
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    /// Lexicon language version (always 1)
    pub version: i64,

    /// Identifier of this document
    pub id: Nsid,

    /// Revision number
    pub revision: Option<u64>,

    /// Optional description
    pub description: Option<String>,

    /// Named definitions, unparsed
    pub defs: Map<String, Value>,

    /// Where the document came from (file path, URL, ...)
    pub source_label: Option<String>,
}

impl SchemaDocument {
    /// Create an empty document
    pub fn new(id: Nsid) -> Self {
        Self {
            version: LEXICON_VERSION,
            id,
            revision: None,
            description: None,
            defs: Map::new(),
            source_label: None,
        }
    }

    /// Add a raw definition to the document
    pub fn with_def(mut self, name: impl Into<String>, def: Value) -> Self {
        self.defs.insert(name.into(), def);
        self
    }

    /// Build a document from its raw JSON form
    ///
    /// Fails with [`ParseError::MissingField`] when `lexicon`, `id` or `defs`
    /// is absent, [`ParseError::UnsupportedVersion`] when `lexicon` is not 1,
    /// and [`ParseError::InvalidNsid`] when `id` is malformed.
    pub fn from_raw(raw: Value, source_label: Option<&str>) -> Result<Self> {
        let Value::Object(mut obj) = raw else {
            return Err(ParseError::malformed(
                "document",
                "document must be a JSON object",
            ));
        };

        let version = obj
            .get("lexicon")
            .ok_or_else(|| ParseError::MissingField("lexicon".to_string()))?;
        if version.as_i64() != Some(LEXICON_VERSION) {
            return Err(ParseError::UnsupportedVersion {
                found: version.clone(),
            });
        }

        let id = match obj.get("id") {
            Some(Value::String(id)) => Nsid::parse(id)?,
            Some(_) => return Err(ParseError::malformed("document", "id must be a string")),
            None => return Err(ParseError::MissingField("id".to_string())),
        };

        let defs = match obj.remove("defs") {
            Some(Value::Object(defs)) => defs,
            Some(_) => return Err(ParseError::malformed("document", "defs must be an object")),
            None => return Err(ParseError::MissingField("defs".to_string())),
        };

        let revision = match obj.get("revision") {
            None => None,
            Some(value) => Some(value.as_u64().ok_or_else(|| {
                ParseError::malformed("document", "revision must be a non-negative integer")
            })?),
        };

        let description = match obj.get("description") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(ParseError::malformed(
                    "document",
                    "description must be a string",
                ))
            }
        };

        Ok(Self {
            version: LEXICON_VERSION,
            id,
            revision,
            description,
            defs,
            source_label: source_label.map(str::to_string),
        })
    }

    /// Parse a document from a JSON string
    ///
    /// # Examples
    ///
    /// ```
    /// use lexicon_core::SchemaDocument;
    ///
    /// let json = r#"{
    ///   "lexicon": 1,
    ///   "id": "com.example.test",
    ///   "defs": {
    ///     "main": {
    ///       "type": "token"
    ///     }
    ///   }
    /// }"#;
    ///
    /// let doc = SchemaDocument::from_json(json).unwrap();
    /// assert_eq!(doc.id.as_str(), "com.example.test");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(json)?;
        Self::from_raw(raw, None)
    }

    /// Parse a document from a JSON file
    ///
    /// The file path becomes the document's source label.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let raw: Value = serde_json::from_str(&json)?;
        Self::from_raw(raw, Some(&path.display().to_string()))
    }

    /// The raw JSON form of this document
    pub fn to_raw(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("lexicon".to_string(), Value::from(self.version));
        obj.insert("id".to_string(), Value::from(self.id.as_str()));
        if let Some(revision) = self.revision {
            obj.insert("revision".to_string(), Value::from(revision));
        }
        if let Some(description) = &self.description {
            obj.insert("description".to_string(), Value::from(description.as_str()));
        }
        obj.insert("defs".to_string(), Value::Object(self.defs.clone()));
        Value::Object(obj)
    }

    /// Get a raw definition by name
    pub fn get_definition(&self, name: &str) -> Option<&Value> {
        self.defs.get(name)
    }

    /// Whether a definition exists
    pub fn has_definition(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Get the main definition (if it exists)
    pub fn get_main_definition(&self) -> Option<&Value> {
        self.get_definition(MAIN_DEF)
    }

    /// Names of all definitions
    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    /// Parse a named definition
    pub fn parse_definition(&self, name: &str) -> Result<Option<Definition>> {
        self.get_definition(name)
            .map(parser::parse_definition)
            .transpose()
    }

    fn main_type(&self) -> Option<&str> {
        self.get_main_definition()?.get("type")?.as_str()
    }

    /// Whether the main definition is a record
    pub fn is_record(&self) -> bool {
        self.main_type() == Some("record")
    }

    /// Whether the main definition is a query
    pub fn is_query(&self) -> bool {
        self.main_type() == Some("query")
    }

    /// Whether the main definition is a procedure
    pub fn is_procedure(&self) -> bool {
        self.main_type() == Some("procedure")
    }

    /// Whether the main definition is a subscription
    pub fn is_subscription(&self) -> bool {
        self.main_type() == Some("subscription")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefinitionKind;
    use serde_json::json;
    use std::io::Write;

    fn post_doc() -> Value {
        json!({
            "lexicon": 1,
            "id": "app.bsky.feed.post",
            "revision": 2,
            "description": "A post",
            "defs": {
                "main": {
                    "type": "record",
                    "key": "tid",
                    "record": {
                        "type": "object",
                        "required": ["text"],
                        "properties": { "text": { "type": "string" } }
                    }
                },
                "entity": { "type": "object", "properties": {} }
            }
        })
    }

    #[test]
    fn test_from_raw() {
        let doc = SchemaDocument::from_raw(post_doc(), Some("memory")).unwrap();
        assert_eq!(doc.id.as_str(), "app.bsky.feed.post");
        assert_eq!(doc.revision, Some(2));
        assert_eq!(doc.source_label.as_deref(), Some("memory"));
        assert!(doc.has_definition("entity"));
        assert!(!doc.has_definition("missing"));
        assert_eq!(doc.get_main_definition(), doc.get_definition("main"));

        let mut names: Vec<_> = doc.definition_names().collect();
        names.sort();
        assert_eq!(names, vec!["entity", "main"]);
    }

    #[test]
    fn test_round_trip() {
        let raw = post_doc();
        let doc = SchemaDocument::from_raw(raw.clone(), None).unwrap();
        assert_eq!(doc.to_raw(), raw);

        let minimal = json!({ "lexicon": 1, "id": "a.b.c", "defs": {} });
        let doc = SchemaDocument::from_raw(minimal.clone(), None).unwrap();
        assert_eq!(doc.to_raw(), minimal);
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            (json!({ "id": "a.b.c", "defs": {} }), "lexicon"),
            (json!({ "lexicon": 1, "defs": {} }), "id"),
            (json!({ "lexicon": 1, "id": "a.b.c" }), "defs"),
        ];
        for (raw, field) in cases {
            match SchemaDocument::from_raw(raw, None) {
                Err(ParseError::MissingField(f)) => assert_eq!(f, field),
                other => panic!("expected MissingField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unsupported_version() {
        let result = SchemaDocument::from_raw(json!({ "lexicon": 2, "id": "a.b.c", "defs": {} }), None);
        assert!(matches!(
            result,
            Err(ParseError::UnsupportedVersion { found }) if found == json!(2)
        ));

        let result =
            SchemaDocument::from_raw(json!({ "lexicon": "1", "id": "a.b.c", "defs": {} }), None);
        assert!(matches!(result, Err(ParseError::UnsupportedVersion { .. })));
    }

    #[test]
    fn test_invalid_id_and_shape() {
        let result = SchemaDocument::from_raw(json!({ "lexicon": 1, "id": "a.b", "defs": {} }), None);
        assert!(matches!(result, Err(ParseError::InvalidNsid(_))));

        let result = SchemaDocument::from_raw(json!({ "lexicon": 1, "id": "a.b.c", "defs": [] }), None);
        assert!(matches!(result, Err(ParseError::MalformedDefinition { .. })));

        let result = SchemaDocument::from_raw(json!([1, 2, 3]), None);
        assert!(matches!(result, Err(ParseError::MalformedDefinition { .. })));
    }

    #[test]
    fn test_kind_predicates() {
        let doc = SchemaDocument::from_raw(post_doc(), None).unwrap();
        assert!(doc.is_record());
        assert!(!doc.is_query());
        assert!(!doc.is_procedure());
        assert!(!doc.is_subscription());

        let doc = SchemaDocument::new(Nsid::parse("com.example.getThing").unwrap())
            .with_def("main", json!({ "type": "query" }));
        assert!(doc.is_query());

        let empty = SchemaDocument::new(Nsid::parse("com.example.empty").unwrap());
        assert!(!empty.is_record());
        assert!(!empty.is_query());
        assert!(!empty.is_procedure());
        assert!(!empty.is_subscription());
    }

    #[test]
    fn test_parse_definition() {
        let doc = SchemaDocument::from_raw(post_doc(), None).unwrap();
        let main = doc.parse_definition("main").unwrap().unwrap();
        assert_eq!(main.kind(), DefinitionKind::Record);
        assert!(doc.parse_definition("missing").unwrap().is_none());
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            SchemaDocument::from_json("{ not json"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", post_doc()).unwrap();

        let doc = SchemaDocument::from_file(file.path()).unwrap();
        assert_eq!(doc.id.as_str(), "app.bsky.feed.post");
        assert_eq!(
            doc.source_label.as_deref(),
            Some(file.path().display().to_string().as_str())
        );

        assert!(matches!(
            SchemaDocument::from_file("/nonexistent/lexicon.json"),
            Err(ParseError::Io(_))
        ));
    }
}
