//! Top-level Lexicon definitions
//!
//! A document's `defs` map holds either primary definitions (record, query,
//! procedure, subscription), tokens, parameter sets, or reusable field types.
//! [`crate::parser::parse_definition`] turns a raw entry into a [`Definition`].

use super::types::{ObjectType, TypeDefinition, TypeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Record key type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordKey {
    /// Timestamp Identifier (TID)
    Tid,

    /// NSID-shaped key
    Nsid,

    /// Any valid record key
    Any,

    /// A single fixed key, e.g. `literal:self`
    Literal(String),
}

impl FromStr for RecordKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tid" => Ok(RecordKey::Tid),
            "nsid" => Ok(RecordKey::Nsid),
            "any" => Ok(RecordKey::Any),
            other => match other.strip_prefix("literal:") {
                Some(value) if !value.is_empty() => Ok(RecordKey::Literal(value.to_string())),
                _ => Err(format!("unsupported record key type '{}'", other)),
            },
        }
    }
}

impl TryFrom<String> for RecordKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordKey> for String {
    fn from(key: RecordKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Tid => f.write_str("tid"),
            RecordKey::Nsid => f.write_str("nsid"),
            RecordKey::Any => f.write_str("any"),
            RecordKey::Literal(value) => write!(f, "literal:{}", value),
        }
    }
}

/// Record definition (storable in a repository)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDef {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Record key type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<RecordKey>,

    /// Record schema
    pub record: ObjectType,
}

/// Query parameters (HTTP query string params)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParamsDef {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parameter definitions
    pub properties: BTreeMap<String, TypeDefinition>,

    /// Required parameter names
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// XRPC input/output body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyDef {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// MIME type, e.g. `application/json`
    pub encoding: String,

    /// Schema for the body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<TypeDefinition>,
}

/// Named XRPC error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrpcErrorDef {
    /// Error name
    pub name: String,

    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Query definition (HTTP GET endpoint)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QueryDef {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Query parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamsDef>,

    /// Output body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<BodyDef>,

    /// Possible errors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<XrpcErrorDef>,
}

/// Procedure definition (HTTP POST endpoint)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProcedureDef {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Query parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamsDef>,

    /// Input body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<BodyDef>,

    /// Output body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<BodyDef>,

    /// Possible errors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<XrpcErrorDef>,
}

/// Subscription definition (WebSocket event stream)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SubscriptionDef {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Query parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamsDef>,

    /// Message schema, usually a union
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<TypeDefinition>,

    /// Possible errors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<XrpcErrorDef>,
}

/// Token (named symbolic value with no data representation)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenDef {
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Any entry of a document's `defs` map
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Definition {
    /// Record definition
    Record(RecordDef),

    /// Query definition
    Query(QueryDef),

    /// Procedure definition
    Procedure(ProcedureDef),

    /// Subscription definition
    Subscription(SubscriptionDef),

    /// Token
    Token(TokenDef),

    /// Standalone parameter set
    Params(ParamsDef),

    /// Reusable field type
    Type(TypeDefinition),
}

impl Definition {
    /// The kind of this definition
    pub fn kind(&self) -> DefinitionKind {
        match self {
            Definition::Record(_) => DefinitionKind::Record,
            Definition::Query(_) => DefinitionKind::Query,
            Definition::Procedure(_) => DefinitionKind::Procedure,
            Definition::Subscription(_) => DefinitionKind::Subscription,
            Definition::Token(_) => DefinitionKind::Token,
            Definition::Params(_) => DefinitionKind::Params,
            Definition::Type(t) => DefinitionKind::Type(t.kind()),
        }
    }

    /// Whether this is a primary definition (only allowed as `main`)
    pub fn is_primary(&self) -> bool {
        matches!(
            self,
            Definition::Record(_)
                | Definition::Query(_)
                | Definition::Procedure(_)
                | Definition::Subscription(_)
        )
    }

    /// Collect every `ref` target used by this definition's schemas
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        let params_refs = |params: &'a Option<ParamsDef>, out: &mut Vec<&'a str>| {
            if let Some(params) = params {
                params.properties.values().for_each(|p| p.collect_refs(out));
            }
        };
        let body_refs = |body: &'a Option<BodyDef>, out: &mut Vec<&'a str>| {
            if let Some(schema) = body.as_ref().and_then(|b| b.schema.as_ref()) {
                schema.collect_refs(out);
            }
        };

        match self {
            Definition::Record(r) => r.record.properties.values().for_each(|p| p.collect_refs(out)),
            Definition::Query(q) => {
                params_refs(&q.parameters, out);
                body_refs(&q.output, out);
            }
            Definition::Procedure(p) => {
                params_refs(&p.parameters, out);
                body_refs(&p.input, out);
                body_refs(&p.output, out);
            }
            Definition::Subscription(s) => {
                params_refs(&s.parameters, out);
                if let Some(message) = &s.message {
                    message.collect_refs(out);
                }
            }
            Definition::Params(p) => p.properties.values().for_each(|t| t.collect_refs(out)),
            Definition::Type(t) => t.collect_refs(out),
            Definition::Token(_) => {}
        }
    }
}

/// Discriminator of a [`Definition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    /// `record`
    Record,
    /// `query`
    Query,
    /// `procedure`
    Procedure,
    /// `subscription`
    Subscription,
    /// `token`
    Token,
    /// `params`
    Params,
    /// One of the field types
    Type(TypeKind),
}

impl DefinitionKind {
    /// Look up a kind by its `type` literal
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "record" => Some(DefinitionKind::Record),
            "query" => Some(DefinitionKind::Query),
            "procedure" => Some(DefinitionKind::Procedure),
            "subscription" => Some(DefinitionKind::Subscription),
            "token" => Some(DefinitionKind::Token),
            "params" => Some(DefinitionKind::Params),
            other => TypeKind::from_name(other).map(DefinitionKind::Type),
        }
    }

    /// The `type` literal of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Record => "record",
            DefinitionKind::Query => "query",
            DefinitionKind::Procedure => "procedure",
            DefinitionKind::Subscription => "subscription",
            DefinitionKind::Token => "token",
            DefinitionKind::Params => "params",
            DefinitionKind::Type(kind) => kind.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_parse() {
        assert_eq!("tid".parse::<RecordKey>(), Ok(RecordKey::Tid));
        assert_eq!("any".parse::<RecordKey>(), Ok(RecordKey::Any));
        assert_eq!(
            "literal:self".parse::<RecordKey>(),
            Ok(RecordKey::Literal("self".to_string()))
        );
        assert!("literal:".parse::<RecordKey>().is_err());
        assert!("bogus".parse::<RecordKey>().is_err());
    }

    #[test]
    fn test_record_key_serde() {
        let json = serde_json::to_string(&RecordKey::Tid).unwrap();
        assert_eq!(json, "\"tid\"");

        let key: RecordKey = serde_json::from_str("\"literal:self\"").unwrap();
        assert_eq!(key.to_string(), "literal:self");
    }

    #[test]
    fn test_definition_kind_names() {
        assert_eq!(DefinitionKind::from_name("record"), Some(DefinitionKind::Record));
        assert_eq!(
            DefinitionKind::from_name("string"),
            Some(DefinitionKind::Type(TypeKind::String))
        );
        assert_eq!(DefinitionKind::from_name("bogus"), None);
        assert_eq!(DefinitionKind::Type(TypeKind::CidLink).as_str(), "cid-link");
    }

    #[test]
    fn test_primary_definitions() {
        let record = Definition::Record(RecordDef {
            description: None,
            key: Some(RecordKey::Tid),
            record: ObjectType::default(),
        });
        assert!(record.is_primary());
        assert_eq!(record.kind(), DefinitionKind::Record);

        let token = Definition::Token(TokenDef::default());
        assert!(!token.is_primary());
    }
}
