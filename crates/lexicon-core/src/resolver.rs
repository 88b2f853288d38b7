//! Reference resolution for Lexicon schemas
//!
//! References take two forms:
//! - Local: `#defName` names a definition in the referring document
//! - External: `nsid#defName` (or bare `nsid`, meaning `nsid#main`) names a
//!   definition in another document, which is loaded through the
//!   [`SchemaSource`]
//!
//! Resolution state lives in a [`ResolutionContext`]: a memo of resolved
//! references and the chain of references currently being resolved. A
//! reference that reappears on its own chain is a cycle.
//!
//! # Example
//!
//! ```rust
//! use lexicon_core::{NullSchemaSource, Resolver, SchemaDocument, TypeKind};
//! use serde_json::json;
//!
//! let doc = SchemaDocument::from_raw(
//!     json!({
//!         "lexicon": 1,
//!         "id": "com.example.post",
//!         "defs": {
//!             "main": { "type": "object", "properties": {} },
//!             "label": { "type": "string", "maxLength": 64 }
//!         }
//!     }),
//!     None,
//! )
//! .unwrap();
//!
//! let resolver = Resolver::new(NullSchemaSource);
//! let def = resolver.resolve_reference("#label", &doc).unwrap();
//! assert_eq!(def.kind(), TypeKind::String);
//! ```

use crate::definition::Definition;
use crate::document::{SchemaDocument, MAIN_DEF};
use crate::nsid::Nsid;
use crate::parser::{self, ParseError};
use crate::source::{SchemaSource, SourceError};
use crate::types::TypeDefinition;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during reference resolution
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The reference does not name an existing, usable definition
    #[error("Unresolvable reference '{reference}': {reason}")]
    UnresolvableReference {
        /// The reference as written
        reference: String,
        /// Why it could not be resolved
        reason: String,
    },

    /// The reference is already being resolved further up the chain
    #[error("Circular reference detected: {}", .chain.join(" -> "))]
    CircularReference {
        /// The reference that closed the cycle
        reference: String,
        /// The resolution chain, ending with `reference`
        chain: Vec<String>,
    },

    /// Reference resolution depth exceeded
    #[error("Reference resolution depth exceeded (max: {max}, path: {path})")]
    DepthExceeded {
        /// Maximum allowed depth
        max: usize,
        /// Resolution path
        path: String,
    },

    /// A referenced definition or document failed to parse
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The schema source failed
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ResolutionError {
    fn unresolvable(reference: &str, reason: impl Into<String>) -> Self {
        ResolutionError::UnresolvableReference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, ResolutionError>;

/// Default maximum length of a resolution chain
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Resolver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum number of nested references followed in one resolution
    pub max_depth: usize,
}

impl ResolverConfig {
    /// Set the maximum resolution depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A parsed reference string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// `#name`
    Local(String),

    /// `nsid#name` or `nsid`
    External {
        /// Target document
        nsid: Nsid,
        /// Target definition
        def: String,
    },
}

impl RefTarget {
    /// Parse a reference, splitting on the first `#`
    ///
    /// # Examples
    ///
    /// ```
    /// use lexicon_core::RefTarget;
    ///
    /// let target = RefTarget::parse("com.atproto.repo.strongRef").unwrap();
    /// assert!(matches!(target, RefTarget::External { def, .. } if def == "main"));
    ///
    /// let target = RefTarget::parse("#view").unwrap();
    /// assert_eq!(target, RefTarget::Local("view".to_string()));
    /// ```
    pub fn parse(reference: &str) -> Result<Self> {
        let (nsid_part, def) = match reference.split_once('#') {
            Some((nsid_part, def)) => (nsid_part, def),
            None => (reference, MAIN_DEF),
        };

        if def.is_empty() {
            return Err(ResolutionError::unresolvable(
                reference,
                "definition name cannot be empty",
            ));
        }

        if nsid_part.is_empty() {
            return Ok(RefTarget::Local(def.to_string()));
        }

        let nsid = Nsid::parse(nsid_part)
            .map_err(|e| ResolutionError::unresolvable(reference, e.to_string()))?;
        Ok(RefTarget::External {
            nsid,
            def: def.to_string(),
        })
    }
}

type CacheKey = (Nsid, String);

fn key_label((doc, reference): &CacheKey) -> String {
    if reference.starts_with('#') {
        format!("{}{}", doc, reference)
    } else {
        reference.clone()
    }
}

/// Per-resolution state: a memo of resolved references and the in-progress chain
///
/// Keys are `(document id, reference string)`, so the same `#name` in two
/// documents never collides.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    cache: HashMap<CacheKey, TypeDefinition>,
    chain: Vec<CacheKey>,
}

impl ResolutionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a memoized resolution
    pub fn cached(&self, doc_id: &Nsid, reference: &str) -> Option<&TypeDefinition> {
        self.cache.get(&(doc_id.clone(), reference.to_string()))
    }

    /// Number of memoized resolutions
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// References currently being resolved, outermost first
    pub fn chain(&self) -> Vec<String> {
        self.chain.iter().map(key_label).collect()
    }

    /// Current chain length
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Drop all memoized resolutions
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Reset the in-progress chain
    pub fn clear_chain(&mut self) {
        self.chain.clear();
    }
}

/// Resolves references against schema documents
///
/// The resolver keeps a shared memo across calls to
/// [`Resolver::resolve_reference`]; the lock is never held while the source
/// is consulted.
pub struct Resolver<S> {
    source: S,
    config: ResolverConfig,
    shared: Mutex<HashMap<CacheKey, TypeDefinition>>,
}

impl<S: SchemaSource> Resolver<S> {
    /// Create a resolver with default settings
    pub fn new(source: S) -> Self {
        Self::with_config(source, ResolverConfig::default())
    }

    /// Create a resolver with custom settings
    pub fn with_config(source: S, config: ResolverConfig) -> Self {
        Self {
            source,
            config,
            shared: Mutex::new(HashMap::new()),
        }
    }

    /// The schema source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The resolver settings
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Drop the shared memo
    pub fn clear_cache(&self) {
        self.shared.lock().clear();
    }

    /// Number of entries in the shared memo
    pub fn cache_len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Resolve `reference` as it appears in `doc`, using the shared memo
    pub fn resolve_reference(&self, reference: &str, doc: &SchemaDocument) -> Result<TypeDefinition> {
        let mut ctx = self.checkout_context();
        let result = self.resolve_reference_in(reference, doc, &mut ctx);
        self.checkin_context(ctx);
        result
    }

    /// Resolve `reference` as it appears in `doc`, using a caller-owned context
    ///
    /// A definition that is itself a `ref` is followed against the document
    /// that defines it, on the same chain. The chain is restored on both
    /// success and failure.
    pub fn resolve_reference_in(
        &self,
        reference: &str,
        doc: &SchemaDocument,
        ctx: &mut ResolutionContext,
    ) -> Result<TypeDefinition> {
        let key = (doc.id.clone(), reference.to_string());

        if let Some(hit) = ctx.cache.get(&key) {
            tracing::debug!("Resolution cache hit for {}", key_label(&key));
            return Ok(hit.clone());
        }

        if ctx.chain.contains(&key) {
            let mut chain = ctx.chain();
            chain.push(key_label(&key));
            tracing::warn!("Circular reference detected: {}", chain.join(" -> "));
            return Err(ResolutionError::CircularReference {
                reference: reference.to_string(),
                chain,
            });
        }

        if ctx.chain.len() >= self.config.max_depth {
            tracing::warn!(
                "Reference resolution depth exceeded at {} (max {})",
                key_label(&key),
                self.config.max_depth
            );
            return Err(ResolutionError::DepthExceeded {
                max: self.config.max_depth,
                path: ctx.chain().join(" -> "),
            });
        }

        ctx.chain.push(key.clone());
        let result = self.resolve_uncached(reference, doc, ctx);
        ctx.chain.pop();

        let def = result?;
        ctx.cache.insert(key, def.clone());
        Ok(def)
    }

    /// Resolve every reference used by every definition of `doc`
    pub fn check_document(&self, doc: &SchemaDocument) -> Result<()> {
        let mut ctx = self.checkout_context();
        let result = self.check_document_in(doc, &mut ctx);
        self.checkin_context(ctx);
        result
    }

    fn check_document_in(&self, doc: &SchemaDocument, ctx: &mut ResolutionContext) -> Result<()> {
        for name in doc.definition_names() {
            let Some(def) = doc.parse_definition(name)? else {
                continue;
            };
            let mut refs = Vec::new();
            def.collect_refs(&mut refs);
            for reference in refs {
                self.resolve_reference_in(reference, doc, ctx)?;
            }
        }
        Ok(())
    }

    pub(crate) fn checkout_context(&self) -> ResolutionContext {
        ResolutionContext {
            cache: self.shared.lock().clone(),
            chain: Vec::new(),
        }
    }

    pub(crate) fn checkin_context(&self, ctx: ResolutionContext) {
        self.shared.lock().extend(ctx.cache);
    }

    fn resolve_uncached(
        &self,
        reference: &str,
        doc: &SchemaDocument,
        ctx: &mut ResolutionContext,
    ) -> Result<TypeDefinition> {
        match RefTarget::parse(reference)? {
            RefTarget::Local(name) => {
                let def = lookup(reference, doc, &name)?;
                self.follow(def, doc, ctx)
            }
            RefTarget::External { nsid, def: name } if nsid == doc.id => {
                let def = lookup(reference, doc, &name)?;
                self.follow(def, doc, ctx)
            }
            RefTarget::External { nsid, def: name } => {
                tracing::debug!("Loading schema {} for reference {}", nsid, reference);
                let raw = self.source.load(&nsid)?;
                let foreign = SchemaDocument::from_raw(raw, Some(nsid.as_str()))?;
                if foreign.id != nsid {
                    return Err(ResolutionError::unresolvable(
                        reference,
                        format!("source returned document '{}'", foreign.id),
                    ));
                }

                let mut def = lookup(reference, &foreign, &name)?;
                def.qualify_local_refs(&foreign.id);
                self.follow(def, &foreign, ctx)
            }
        }
    }

    fn follow(
        &self,
        def: TypeDefinition,
        doc: &SchemaDocument,
        ctx: &mut ResolutionContext,
    ) -> Result<TypeDefinition> {
        match def {
            TypeDefinition::Ref(r) => self.resolve_reference_in(&r.target, doc, ctx),
            other => Ok(other),
        }
    }
}

/// Find and parse definition `name` of `doc` as a field type
///
/// A record resolves to its record object; other top-level kinds cannot be
/// used where a type is expected.
fn lookup(reference: &str, doc: &SchemaDocument, name: &str) -> Result<TypeDefinition> {
    let raw = doc.get_definition(name).ok_or_else(|| {
        ResolutionError::unresolvable(
            reference,
            format!("definition '{}' not found in schema '{}'", name, doc.id),
        )
    })?;

    match parser::parse_definition(raw)? {
        Definition::Type(def) => Ok(def),
        Definition::Record(record) => Ok(TypeDefinition::Object(record.record)),
        other => Err(ResolutionError::unresolvable(
            reference,
            format!("'{}' is a {}, not a field type", name, other.kind().as_str()),
        )),
    }
}

impl<S> std::fmt::Debug for Resolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .field("cached", &self.shared.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySchemaSource, MockSchemaSource, NullSchemaSource};
    use crate::types::TypeKind;
    use serde_json::{json, Value};

    fn doc(raw: Value) -> SchemaDocument {
        SchemaDocument::from_raw(raw, None).unwrap()
    }

    fn post_doc() -> SchemaDocument {
        doc(json!({
            "lexicon": 1,
            "id": "com.example.post",
            "defs": {
                "main": {
                    "type": "record",
                    "record": {
                        "type": "object",
                        "properties": {
                            "subject": { "type": "ref", "ref": "com.atproto.repo.strongRef" },
                            "label": { "type": "ref", "ref": "#label" }
                        }
                    }
                },
                "label": { "type": "string", "maxLength": 64 },
                "alias": { "type": "ref", "ref": "#label" },
                "token": { "type": "token" }
            }
        }))
    }

    fn strong_ref() -> Value {
        json!({
            "lexicon": 1,
            "id": "com.atproto.repo.strongRef",
            "defs": {
                "main": {
                    "type": "object",
                    "required": ["uri", "cid"],
                    "properties": {
                        "uri": { "type": "string", "format": "at-uri" },
                        "cid": { "type": "ref", "ref": "#cid" }
                    }
                },
                "cid": { "type": "string", "format": "cid" }
            }
        })
    }

    #[test]
    fn test_parse_ref_target() {
        assert_eq!(
            RefTarget::parse("#main").unwrap(),
            RefTarget::Local("main".to_string())
        );
        assert_eq!(
            RefTarget::parse("com.atproto.repo.strongRef#main").unwrap(),
            RefTarget::External {
                nsid: Nsid::parse("com.atproto.repo.strongRef").unwrap(),
                def: "main".to_string()
            }
        );
        assert!(matches!(
            RefTarget::parse("com.example.x#"),
            Err(ResolutionError::UnresolvableReference { .. })
        ));
        assert!(matches!(
            RefTarget::parse("not-an-nsid#foo"),
            Err(ResolutionError::UnresolvableReference { .. })
        ));
    }

    #[test]
    fn test_first_hash_splits() {
        let target = RefTarget::parse("com.example.x#a#b").unwrap();
        assert!(matches!(target, RefTarget::External { def, .. } if def == "a#b"));
    }

    #[test]
    fn test_resolve_local() {
        let resolver = Resolver::new(NullSchemaSource);
        let def = resolver.resolve_reference("#label", &post_doc()).unwrap();
        assert_eq!(def.kind(), TypeKind::String);
    }

    #[test]
    fn test_resolve_local_missing() {
        let resolver = Resolver::new(NullSchemaSource);
        let result = resolver.resolve_reference("#nope", &post_doc());
        assert!(matches!(
            result,
            Err(ResolutionError::UnresolvableReference { reference, .. }) if reference == "#nope"
        ));
    }

    #[test]
    fn test_resolve_ref_chain() {
        let resolver = Resolver::new(NullSchemaSource);
        let def = resolver.resolve_reference("#alias", &post_doc()).unwrap();
        assert_eq!(def.kind(), TypeKind::String);
    }

    #[test]
    fn test_resolve_token_is_unresolvable() {
        let resolver = Resolver::new(NullSchemaSource);
        assert!(matches!(
            resolver.resolve_reference("#token", &post_doc()),
            Err(ResolutionError::UnresolvableReference { .. })
        ));
    }

    #[test]
    fn test_resolve_external() {
        let source = MemorySchemaSource::new();
        source.insert_raw(strong_ref()).unwrap();
        let resolver = Resolver::new(source);

        let def = resolver
            .resolve_reference("com.atproto.repo.strongRef", &post_doc())
            .unwrap();
        let TypeDefinition::Object(object) = def else {
            panic!("expected object");
        };

        // Local refs of the foreign document are qualified
        let TypeDefinition::Ref(cid) = &object.properties["cid"] else {
            panic!("expected ref");
        };
        assert_eq!(cid.target, "com.atproto.repo.strongRef#cid");

        let resolved = resolver.resolve_reference(&cid.target, &post_doc()).unwrap();
        assert_eq!(resolved.kind(), TypeKind::String);
    }

    #[test]
    fn test_external_not_found() {
        let resolver = Resolver::new(NullSchemaSource);
        let result = resolver.resolve_reference("com.example.missing#main", &post_doc());
        assert!(matches!(
            result,
            Err(ResolutionError::Source(SourceError::NotFound(_)))
        ));
    }

    #[test]
    fn test_external_definition_missing() {
        let source = MemorySchemaSource::new();
        source.insert_raw(strong_ref()).unwrap();
        let resolver = Resolver::new(source);

        let result = resolver.resolve_reference("com.atproto.repo.strongRef#nope", &post_doc());
        assert!(matches!(
            result,
            Err(ResolutionError::UnresolvableReference { .. })
        ));
    }

    #[test]
    fn test_mismatched_document_id() {
        let mut source = MockSchemaSource::new();
        source
            .expect_load()
            .returning(|_| Ok(json!({ "lexicon": 1, "id": "com.example.other", "defs": {} })));
        let resolver = Resolver::new(source);

        let result = resolver.resolve_reference("com.example.wanted#main", &post_doc());
        assert!(matches!(
            result,
            Err(ResolutionError::UnresolvableReference { .. })
        ));
    }

    #[test]
    fn test_memoization_skips_source() {
        let mut source = MockSchemaSource::new();
        source
            .expect_load()
            .times(1)
            .returning(|_| Ok(strong_ref()));
        let resolver = Resolver::new(source);

        let first = resolver
            .resolve_reference("com.atproto.repo.strongRef#main", &post_doc())
            .unwrap();
        let second = resolver
            .resolve_reference("com.atproto.repo.strongRef#main", &post_doc())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_clear_cache_reloads() {
        let mut source = MockSchemaSource::new();
        source
            .expect_load()
            .times(2)
            .returning(|_| Ok(strong_ref()));
        let resolver = Resolver::new(source);

        resolver
            .resolve_reference("com.atproto.repo.strongRef", &post_doc())
            .unwrap();
        assert!(resolver.cache_len() > 0);
        resolver.clear_cache();
        assert_eq!(resolver.cache_len(), 0);
        resolver
            .resolve_reference("com.atproto.repo.strongRef", &post_doc())
            .unwrap();
    }

    #[test]
    fn test_circular_reference() {
        let cyclic = doc(json!({
            "lexicon": 1,
            "id": "com.example.cycle",
            "defs": {
                "a": { "type": "ref", "ref": "#b" },
                "b": { "type": "ref", "ref": "#a" }
            }
        }));
        let resolver = Resolver::new(NullSchemaSource);
        let mut ctx = ResolutionContext::new();

        match resolver.resolve_reference_in("#a", &cyclic, &mut ctx) {
            Err(ResolutionError::CircularReference { reference, chain }) => {
                assert_eq!(reference, "#a");
                assert_eq!(
                    chain,
                    vec![
                        "com.example.cycle#a",
                        "com.example.cycle#b",
                        "com.example.cycle#a"
                    ]
                );
            }
            other => panic!("expected circular reference, got {other:?}"),
        }

        // The chain is unwound after failure
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.cache_len(), 0);
    }

    #[test]
    fn test_resolution_after_cycle_is_independent() {
        let cyclic = doc(json!({
            "lexicon": 1,
            "id": "com.example.cycle",
            "defs": {
                "a": { "type": "ref", "ref": "#b" },
                "b": { "type": "ref", "ref": "#a" },
                "c": { "type": "integer" }
            }
        }));
        let resolver = Resolver::new(NullSchemaSource);
        let mut ctx = ResolutionContext::new();

        assert!(resolver.resolve_reference_in("#a", &cyclic, &mut ctx).is_err());
        let def = resolver.resolve_reference_in("#c", &cyclic, &mut ctx).unwrap();
        assert_eq!(def.kind(), TypeKind::Integer);
        assert!(ctx.cached(&cyclic.id, "#c").is_some());
    }

    #[test]
    fn test_cross_document_cycle() {
        let source = MemorySchemaSource::new();
        source
            .insert_raw(json!({
                "lexicon": 1,
                "id": "com.example.left",
                "defs": { "main": { "type": "ref", "ref": "com.example.right" } }
            }))
            .unwrap();
        source
            .insert_raw(json!({
                "lexicon": 1,
                "id": "com.example.right",
                "defs": { "main": { "type": "ref", "ref": "com.example.left" } }
            }))
            .unwrap();
        let resolver = Resolver::new(source);

        let result = resolver.resolve_reference("com.example.left", &post_doc());
        assert!(matches!(
            result,
            Err(ResolutionError::CircularReference { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let mut defs = serde_json::Map::new();
        for i in 0..10 {
            defs.insert(format!("d{}", i), json!({ "type": "ref", "ref": format!("#d{}", i + 1) }));
        }
        defs.insert("d10".to_string(), json!({ "type": "boolean" }));
        let deep = doc(json!({ "lexicon": 1, "id": "com.example.deep", "defs": defs }));

        let shallow = Resolver::with_config(NullSchemaSource, ResolverConfig::default().with_max_depth(5));
        assert!(matches!(
            shallow.resolve_reference("#d0", &deep),
            Err(ResolutionError::DepthExceeded { max: 5, .. })
        ));

        let resolver = Resolver::new(NullSchemaSource);
        let def = resolver.resolve_reference("#d0", &deep).unwrap();
        assert_eq!(def.kind(), TypeKind::Boolean);
    }

    #[test]
    fn test_same_name_in_two_documents() {
        let source = MemorySchemaSource::new();
        source
            .insert_raw(json!({
                "lexicon": 1,
                "id": "com.example.other",
                "defs": {
                    "main": { "type": "ref", "ref": "#label" },
                    "label": { "type": "integer" }
                }
            }))
            .unwrap();
        let resolver = Resolver::new(source);
        let post = post_doc();

        let local = resolver.resolve_reference("#label", &post).unwrap();
        let foreign = resolver.resolve_reference("com.example.other", &post).unwrap();
        assert_eq!(local.kind(), TypeKind::String);
        assert_eq!(foreign.kind(), TypeKind::Integer);
    }

    #[test]
    fn test_check_document() {
        let source = MemorySchemaSource::new();
        source.insert_raw(strong_ref()).unwrap();
        let resolver = Resolver::new(source);
        assert!(resolver.check_document(&post_doc()).is_ok());

        let resolver = Resolver::new(NullSchemaSource);
        assert!(resolver.check_document(&post_doc()).is_err());
    }
}
