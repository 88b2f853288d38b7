//! Parsing raw JSON definitions into the typed model
//!
//! Dispatch is driven by the `type` discriminator. The primitive parser owns
//! the seven leaf types and the complex parser owns object, array, union, ref
//! and blob; the two name sets are disjoint. [`parse_type`] tries both,
//! [`parse_definition`] additionally recognizes the top-level definition
//! kinds (record, query, procedure, subscription, token, params).

pub mod complex;
pub mod primitive;

use crate::definition::{
    BodyDef, Definition, ParamsDef, ProcedureDef, QueryDef, RecordDef, RecordKey, SubscriptionDef,
    TokenDef, XrpcErrorDef,
};
use crate::nsid::NsidError;
use crate::types::{TypeDefinition, TypeKind};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while parsing documents and definitions
#[derive(Debug, Error)]
pub enum ParseError {
    /// A required field is absent
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// The `lexicon` version is not 1
    #[error("Unsupported lexicon version: expected 1, got {found}")]
    UnsupportedVersion {
        /// The value found in the document
        found: Value,
    },

    /// `type` is absent or not handled by the parser that saw it
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// The definition has the wrong shape
    #[error("Malformed {type_name} definition: {reason}")]
    MalformedDefinition {
        /// The `type` being parsed (or `document`)
        type_name: String,
        /// What is wrong
        reason: String,
    },

    /// Invalid document id
    #[error("Invalid NSID: {0}")]
    InvalidNsid(#[from] NsidError),

    /// Invalid JSON syntax
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// IO error reading a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    pub(crate) fn malformed(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::MalformedDefinition {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for parse operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Read the `type` discriminator of a raw definition
pub(crate) fn type_of(def: &Value) -> Result<&str> {
    let obj = def
        .as_object()
        .ok_or_else(|| ParseError::UnknownType(format!("<{}>", crate::types::json_type_name(def))))?;

    match obj.get("type") {
        Some(Value::String(name)) => Ok(name),
        Some(other) => Err(ParseError::UnknownType(other.to_string())),
        None => Err(ParseError::UnknownType("<missing>".to_string())),
    }
}

/// Decode a variant body with serde, reporting shape errors against `type_name`
pub(crate) fn decode<T: DeserializeOwned>(type_name: &str, def: &Value) -> Result<T> {
    T::deserialize(def).map_err(|e| ParseError::malformed(type_name, e.to_string()))
}

/// Parse any field type, primitive or complex
pub fn parse_type(def: &Value) -> Result<TypeDefinition> {
    let type_name = type_of(def)?;
    match TypeKind::from_name(type_name) {
        Some(kind) if kind.is_primitive() => primitive::parse(def),
        Some(_) => complex::parse(def),
        None => Err(ParseError::UnknownType(type_name.to_string())),
    }
}

/// Parse any entry of a document's `defs` map
pub fn parse_definition(def: &Value) -> Result<Definition> {
    let type_name = type_of(def)?;

    match type_name {
        "record" => parse_record(def).map(Definition::Record),
        "query" => parse_query(def).map(Definition::Query),
        "procedure" => parse_procedure(def).map(Definition::Procedure),
        "subscription" => parse_subscription(def).map(Definition::Subscription),
        "token" => decode::<TokenDef>("token", def).map(Definition::Token),
        "params" => parse_params(def).map(Definition::Params),
        _ => parse_type(def).map(Definition::Type),
    }
}

fn fields<'a>(type_name: &str, def: &'a Value) -> Result<&'a Map<String, Value>> {
    def.as_object()
        .ok_or_else(|| ParseError::malformed(type_name, "definition must be an object"))
}

fn description(type_name: &str, obj: &Map<String, Value>) -> Result<Option<String>> {
    match obj.get("description") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ParseError::malformed(type_name, "description must be a string")),
    }
}

fn optional<T: DeserializeOwned>(
    type_name: &str,
    obj: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>> {
    obj.get(key)
        .map(|value| decode(type_name, value))
        .transpose()
}

fn parse_record(def: &Value) -> Result<RecordDef> {
    let obj = fields("record", def)?;

    let key = match obj.get("key") {
        None => None,
        Some(Value::String(s)) => Some(
            s.parse::<RecordKey>()
                .map_err(|reason| ParseError::malformed("record", reason))?,
        ),
        Some(_) => return Err(ParseError::malformed("record", "key must be a string")),
    };

    let record = obj
        .get("record")
        .ok_or_else(|| ParseError::MissingField("record".to_string()))?;
    let record = match complex::parse(record)? {
        TypeDefinition::Object(object) => object,
        other => {
            return Err(ParseError::malformed(
                "record",
                format!("record schema must be an object, got {}", other.type_name()),
            ))
        }
    };

    Ok(RecordDef {
        description: description("record", obj)?,
        key,
        record,
    })
}

fn parse_params(def: &Value) -> Result<ParamsDef> {
    let obj = fields("params", def)?;

    let mut params = ParamsDef {
        description: description("params", obj)?,
        required: optional("params", obj, "required")?.unwrap_or_default(),
        ..Default::default()
    };

    if let Some(properties) = obj.get("properties") {
        let properties = properties
            .as_object()
            .ok_or_else(|| ParseError::malformed("params", "properties must be an object"))?;
        for (name, prop) in properties {
            params.properties.insert(name.clone(), parse_type(prop)?);
        }
    }

    Ok(params)
}

fn parse_body(type_name: &str, obj: &Map<String, Value>, key: &str) -> Result<Option<BodyDef>> {
    let Some(body) = obj.get(key) else {
        return Ok(None);
    };
    let body_obj = body
        .as_object()
        .ok_or_else(|| ParseError::malformed(type_name, format!("{} must be an object", key)))?;

    let encoding = match body_obj.get("encoding") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ParseError::malformed(type_name, "encoding must be a string")),
        None => return Err(ParseError::MissingField(format!("{}.encoding", key))),
    };

    Ok(Some(BodyDef {
        description: description(type_name, body_obj)?,
        encoding,
        schema: body_obj.get("schema").map(parse_type).transpose()?,
    }))
}

fn parse_parameters(type_name: &str, obj: &Map<String, Value>) -> Result<Option<ParamsDef>> {
    match obj.get("parameters") {
        None => Ok(None),
        Some(params) => {
            if type_of(params)? != "params" {
                return Err(ParseError::malformed(
                    type_name,
                    "parameters must have type 'params'",
                ));
            }
            parse_params(params).map(Some)
        }
    }
}

fn parse_errors(type_name: &str, obj: &Map<String, Value>) -> Result<Vec<XrpcErrorDef>> {
    Ok(optional(type_name, obj, "errors")?.unwrap_or_default())
}

fn parse_query(def: &Value) -> Result<QueryDef> {
    let obj = fields("query", def)?;
    Ok(QueryDef {
        description: description("query", obj)?,
        parameters: parse_parameters("query", obj)?,
        output: parse_body("query", obj, "output")?,
        errors: parse_errors("query", obj)?,
    })
}

fn parse_procedure(def: &Value) -> Result<ProcedureDef> {
    let obj = fields("procedure", def)?;
    Ok(ProcedureDef {
        description: description("procedure", obj)?,
        parameters: parse_parameters("procedure", obj)?,
        input: parse_body("procedure", obj, "input")?,
        output: parse_body("procedure", obj, "output")?,
        errors: parse_errors("procedure", obj)?,
    })
}

fn parse_subscription(def: &Value) -> Result<SubscriptionDef> {
    let obj = fields("subscription", def)?;

    // message is wrapped as `{ "schema": <type> }`
    let message = match obj.get("message") {
        None => None,
        Some(message) => match message.get("schema") {
            Some(schema) => Some(parse_type(schema)?),
            None => return Err(ParseError::MissingField("message.schema".to_string())),
        },
    };

    Ok(SubscriptionDef {
        description: description("subscription", obj)?,
        parameters: parse_parameters("subscription", obj)?,
        message,
        errors: parse_errors("subscription", obj)?,
    })
}
