//! Parser for the seven primitive (leaf) types

use super::{decode, type_of, ParseError, Result};
use crate::types::{
    BooleanType, BytesType, CidLinkType, IntegerType, NullType, StringType, TypeDefinition,
    TypeKind, UnknownType,
};
use serde_json::Value;

/// Whether `type_name` is handled by this parser
pub fn is_primitive(type_name: &str) -> bool {
    TypeKind::from_name(type_name).is_some_and(|kind| kind.is_primitive())
}

/// Parse a primitive definition
///
/// Constraint keys are copied as written; their values are not
/// cross-checked against each other.
pub fn parse(def: &Value) -> Result<TypeDefinition> {
    let type_name = type_of(def)?;

    let parsed = match type_name {
        "null" => TypeDefinition::Null(decode::<NullType>(type_name, def)?),
        "boolean" => TypeDefinition::Boolean(decode::<BooleanType>(type_name, def)?),
        "integer" => TypeDefinition::Integer(decode::<IntegerType>(type_name, def)?),
        "string" => TypeDefinition::String(decode::<StringType>(type_name, def)?),
        "bytes" => TypeDefinition::Bytes(decode::<BytesType>(type_name, def)?),
        "cid-link" => TypeDefinition::CidLink(decode::<CidLinkType>(type_name, def)?),
        "unknown" => TypeDefinition::Unknown(decode::<UnknownType>(type_name, def)?),
        other => return Err(ParseError::UnknownType(other.to_string())),
    };

    Ok(parsed)
}
