//! Lexicon type definitions
//!
//! [`TypeDefinition`] is the closed set of field types a Lexicon can declare:
//! seven primitive leaves and five complex types. Parsing from raw JSON goes
//! through [`crate::parser`], which dispatches on the `type` discriminator;
//! the serde derives here are used for serialization and for decoding the
//! individual variant bodies.

use super::constraints::*;
use super::formats::StringFormat;
use super::nsid::Nsid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discriminator of a [`TypeDefinition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// `null`
    Null,
    /// `boolean`
    Boolean,
    /// `integer`
    Integer,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// `cid-link`
    CidLink,
    /// `unknown`
    Unknown,
    /// `object`
    Object,
    /// `array`
    Array,
    /// `union`
    Union,
    /// `ref`
    Ref,
    /// `blob`
    Blob,
}

impl TypeKind {
    /// Every type kind, primitives first
    pub const ALL: [TypeKind; 12] = [
        TypeKind::Null,
        TypeKind::Boolean,
        TypeKind::Integer,
        TypeKind::String,
        TypeKind::Bytes,
        TypeKind::CidLink,
        TypeKind::Unknown,
        TypeKind::Object,
        TypeKind::Array,
        TypeKind::Union,
        TypeKind::Ref,
        TypeKind::Blob,
    ];

    /// The `type` literal used in schemas
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Null => "null",
            TypeKind::Boolean => "boolean",
            TypeKind::Integer => "integer",
            TypeKind::String => "string",
            TypeKind::Bytes => "bytes",
            TypeKind::CidLink => "cid-link",
            TypeKind::Unknown => "unknown",
            TypeKind::Object => "object",
            TypeKind::Array => "array",
            TypeKind::Union => "union",
            TypeKind::Ref => "ref",
            TypeKind::Blob => "blob",
        }
    }

    /// Look up a kind by its `type` literal
    pub fn from_name(name: &str) -> Option<Self> {
        TypeKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether this is one of the seven primitive leaf types
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeKind::Null
                | TypeKind::Boolean
                | TypeKind::Integer
                | TypeKind::String
                | TypeKind::Bytes
                | TypeKind::CidLink
                | TypeKind::Unknown
        )
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Null type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NullType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Boolean type with constraints
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BooleanType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Constraints
    #[serde(flatten)]
    pub constraints: BooleanConstraints,
}

/// Integer type with constraints
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntegerType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Constraints
    #[serde(flatten)]
    pub constraints: IntegerConstraints,
}

/// String type with optional format and constraints
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StringType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Format name as written in the schema
    ///
    /// Kept as a string so that formats this engine does not know still
    /// round-trip; see [`StringType::string_format`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Constraints
    #[serde(flatten)]
    pub constraints: StringConstraints,
}

impl StringType {
    /// The recognized format, if any
    pub fn string_format(&self) -> Option<StringFormat> {
        self.format.as_deref().and_then(StringFormat::from_name)
    }
}

/// Bytes type (`{"$bytes": "<base64>"}` in JSON)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BytesType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Constraints
    #[serde(flatten)]
    pub constraints: BytesConstraints,
}

/// CID link type (`{"$link": "<cid>"}` in JSON)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CidLinkType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Unknown type (accepts any value)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnknownType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Object type with properties
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared properties
    pub properties: BTreeMap<String, TypeDefinition>,

    /// Required property names
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Property names that may be explicitly `null`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nullable: Vec<String>,
}

impl ObjectType {
    /// Whether `name` is listed as required
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Whether `name` may be explicitly `null`
    pub fn is_nullable(&self, name: &str) -> bool {
        self.nullable.iter().any(|n| n == name)
    }
}

/// Array type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Schema for array items
    pub items: Box<TypeDefinition>,

    /// Constraints
    #[serde(flatten)]
    pub constraints: ArrayConstraints,
}

/// Union type (one of several referenced types)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnionType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Member references, unresolved
    #[serde(default)]
    pub refs: Vec<String>,

    /// Whether `$type` must name one of `refs`
    #[serde(default)]
    pub closed: bool,
}

/// Reference to another definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Reference string (`#name` or `nsid#name`)
    #[serde(rename = "ref")]
    pub target: String,
}

impl RefType {
    /// Create a reference to `target`
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            description: None,
            target: target.into(),
        }
    }

    /// Check if this is a local reference (starts with #)
    pub fn is_local(&self) -> bool {
        self.target.starts_with('#')
    }
}

/// Blob type (binary data with metadata)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlobType {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Constraints
    #[serde(flatten)]
    pub constraints: BlobConstraints,
}

/// All possible Lexicon field types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TypeDefinition {
    /// Null type
    Null(NullType),

    /// Boolean type
    Boolean(BooleanType),

    /// Integer type
    Integer(IntegerType),

    /// String type
    String(StringType),

    /// Bytes type
    Bytes(BytesType),

    /// CID link type
    CidLink(CidLinkType),

    /// Unknown type
    Unknown(UnknownType),

    /// Object type
    Object(ObjectType),

    /// Array type
    Array(ArrayType),

    /// Union type
    Union(UnionType),

    /// Reference to another definition
    Ref(RefType),

    /// Blob type
    Blob(BlobType),
}

impl TypeDefinition {
    /// The discriminator of this definition
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDefinition::Null(_) => TypeKind::Null,
            TypeDefinition::Boolean(_) => TypeKind::Boolean,
            TypeDefinition::Integer(_) => TypeKind::Integer,
            TypeDefinition::String(_) => TypeKind::String,
            TypeDefinition::Bytes(_) => TypeKind::Bytes,
            TypeDefinition::CidLink(_) => TypeKind::CidLink,
            TypeDefinition::Unknown(_) => TypeKind::Unknown,
            TypeDefinition::Object(_) => TypeKind::Object,
            TypeDefinition::Array(_) => TypeKind::Array,
            TypeDefinition::Union(_) => TypeKind::Union,
            TypeDefinition::Ref(_) => TypeKind::Ref,
            TypeDefinition::Blob(_) => TypeKind::Blob,
        }
    }

    /// The `type` literal of this definition
    pub fn type_name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Optional description
    pub fn description(&self) -> Option<&str> {
        match self {
            TypeDefinition::Null(t) => t.description.as_deref(),
            TypeDefinition::Boolean(t) => t.description.as_deref(),
            TypeDefinition::Integer(t) => t.description.as_deref(),
            TypeDefinition::String(t) => t.description.as_deref(),
            TypeDefinition::Bytes(t) => t.description.as_deref(),
            TypeDefinition::CidLink(t) => t.description.as_deref(),
            TypeDefinition::Unknown(t) => t.description.as_deref(),
            TypeDefinition::Object(t) => t.description.as_deref(),
            TypeDefinition::Array(t) => t.description.as_deref(),
            TypeDefinition::Union(t) => t.description.as_deref(),
            TypeDefinition::Ref(t) => t.description.as_deref(),
            TypeDefinition::Blob(t) => t.description.as_deref(),
        }
    }

    /// Rewrite local references (`#name`) to absolute ones (`nsid#name`)
    ///
    /// Applied to definitions taken from a foreign document so that they stay
    /// resolvable from the document that referenced them.
    pub fn qualify_local_refs(&mut self, nsid: &Nsid) {
        let qualify = |reference: &mut String| {
            if reference.starts_with('#') {
                *reference = format!("{}{}", nsid, reference);
            }
        };

        match self {
            TypeDefinition::Ref(r) => qualify(&mut r.target),
            TypeDefinition::Union(u) => u.refs.iter_mut().for_each(qualify),
            TypeDefinition::Array(a) => a.items.qualify_local_refs(nsid),
            TypeDefinition::Object(o) => o
                .properties
                .values_mut()
                .for_each(|prop| prop.qualify_local_refs(nsid)),
            _ => {}
        }
    }

    /// Collect every `ref` target reachable without resolution
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeDefinition::Ref(r) => out.push(&r.target),
            TypeDefinition::Array(a) => a.items.collect_refs(out),
            TypeDefinition::Object(o) => o.properties.values().for_each(|p| p.collect_refs(out)),
            _ => {}
        }
    }
}

/// Name of the JSON shape of a value, as used in type-mismatch messages
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
