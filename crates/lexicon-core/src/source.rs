//! Schema sources
//!
//! The resolver never performs I/O itself. When a reference points into
//! another document it asks a [`SchemaSource`] for that document's raw JSON.
//!
//! # Example
//!
//! ```rust
//! use lexicon_core::{MemorySchemaSource, Nsid, SchemaSource};
//! use serde_json::json;
//!
//! let source = MemorySchemaSource::new();
//! source
//!     .insert_raw(json!({ "lexicon": 1, "id": "com.example.foo", "defs": {} }))
//!     .unwrap();
//!
//! assert!(source.contains(&Nsid::parse("com.example.foo").unwrap()));
//! ```

use crate::document::SchemaDocument;
use crate::nsid::Nsid;
use crate::parser::ParseError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by schema sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// No document is known for this NSID
    #[error("Schema not found: {0}")]
    NotFound(String),

    /// Reading a schema file failed
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A schema file is not valid JSON
    #[error("Invalid JSON in {path}: {source}")]
    InvalidJson {
        /// File that could not be parsed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// A remote source failed
    #[error("Remote source error: {0}")]
    Remote(String),
}

/// Provider of raw schema documents
#[cfg_attr(test, mockall::automock)]
pub trait SchemaSource: Send + Sync {
    /// Load the raw JSON document for `nsid`
    ///
    /// Returns [`SourceError::NotFound`] when the source has no such document.
    fn load(&self, nsid: &Nsid) -> Result<Value, SourceError>;
}

impl<T: SchemaSource + ?Sized> SchemaSource for &T {
    fn load(&self, nsid: &Nsid) -> Result<Value, SourceError> {
        (**self).load(nsid)
    }
}

impl<T: SchemaSource + ?Sized> SchemaSource for Arc<T> {
    fn load(&self, nsid: &Nsid) -> Result<Value, SourceError> {
        (**self).load(nsid)
    }
}

impl<T: SchemaSource + ?Sized> SchemaSource for Box<T> {
    fn load(&self, nsid: &Nsid) -> Result<Value, SourceError> {
        (**self).load(nsid)
    }
}

/// Source that knows no documents
///
/// Useful when only local (`#name`) references are expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSchemaSource;

impl SchemaSource for NullSchemaSource {
    fn load(&self, nsid: &Nsid) -> Result<Value, SourceError> {
        Err(SourceError::NotFound(nsid.to_string()))
    }
}

/// In-memory registry of schema documents
///
/// Registering a document with an NSID that is already present replaces it.
#[derive(Debug, Default)]
pub struct MemorySchemaSource {
    schemas: RwLock<HashMap<Nsid, Value>>,
}

impl MemorySchemaSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed document
    pub fn register(&self, doc: &SchemaDocument) {
        self.schemas.write().insert(doc.id.clone(), doc.to_raw());
    }

    /// Register a raw document, checking that it parses
    pub fn insert_raw(&self, raw: Value) -> Result<Nsid, ParseError> {
        let doc = SchemaDocument::from_raw(raw.clone(), None)?;
        self.schemas.write().insert(doc.id.clone(), raw);
        Ok(doc.id)
    }

    /// Check if a document is registered
    pub fn contains(&self, nsid: &Nsid) -> bool {
        self.schemas.read().contains_key(nsid)
    }

    /// Get a copy of a raw document
    pub fn get(&self, nsid: &Nsid) -> Option<Value> {
        self.schemas.read().get(nsid).cloned()
    }

    /// Remove a document
    pub fn unregister(&self, nsid: &Nsid) -> Option<Value> {
        self.schemas.write().remove(nsid)
    }

    /// Number of registered documents
    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    /// Whether no documents are registered
    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }

    /// Remove all documents
    pub fn clear(&self) {
        self.schemas.write().clear();
    }

    /// NSIDs of all registered documents, sorted
    pub fn nsids(&self) -> Vec<Nsid> {
        let mut nsids: Vec<Nsid> = self.schemas.read().keys().cloned().collect();
        nsids.sort();
        nsids
    }
}

impl SchemaSource for MemorySchemaSource {
    fn load(&self, nsid: &Nsid) -> Result<Value, SourceError> {
        self.get(nsid)
            .ok_or_else(|| SourceError::NotFound(nsid.to_string()))
    }
}

/// Reads documents from a directory tree
///
/// `com.example.foo` is looked up as `<root>/com/example/foo.json` (the
/// layout of published lexicon repositories), then as
/// `<root>/com.example.foo.json`.
#[derive(Debug, Clone)]
pub struct DirectorySchemaSource {
    root: PathBuf,
}

impl DirectorySchemaSource {
    /// Create a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, nsid: &Nsid) -> [PathBuf; 2] {
        let mut nested = self.root.clone();
        for segment in nsid.segments() {
            nested.push(segment);
        }
        nested.set_extension("json");

        [nested, self.root.join(format!("{}.json", nsid))]
    }
}

impl SchemaSource for DirectorySchemaSource {
    fn load(&self, nsid: &Nsid) -> Result<Value, SourceError> {
        let Some(path) = self.candidates(nsid).into_iter().find(|p| p.is_file()) else {
            return Err(SourceError::NotFound(nsid.to_string()));
        };

        tracing::debug!("Loading schema {} from {}", nsid, path.display());

        let json = std::fs::read_to_string(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SourceError::InvalidJson { path, source })
    }
}
