//! Parser for object, array, union, ref and blob types
//!
//! Nested definitions (object properties, array items) go back through
//! [`super::parse_type`], so a property may be a leaf or another complex type.
//! References are captured verbatim; nothing is resolved here.

use super::{decode, parse_type, type_of, ParseError, Result};
use crate::constraints::ArrayConstraints;
use crate::types::{ArrayType, BlobType, ObjectType, RefType, TypeDefinition, UnionType};
use serde_json::{Map, Value};

/// Type names handled by this parser
pub const COMPLEX_TYPES: [&str; 5] = ["object", "array", "union", "ref", "blob"];

/// Whether `type_name` is handled by this parser
pub fn is_complex(type_name: &str) -> bool {
    COMPLEX_TYPES.contains(&type_name)
}

/// Parse a complex definition
pub fn parse(def: &Value) -> Result<TypeDefinition> {
    let type_name = type_of(def)?;

    match type_name {
        "object" => parse_object(def).map(TypeDefinition::Object),
        "array" => parse_array(def).map(TypeDefinition::Array),
        "union" => decode::<UnionType>(type_name, def).map(TypeDefinition::Union),
        "ref" => parse_ref(def).map(TypeDefinition::Ref),
        "blob" => decode::<BlobType>(type_name, def).map(TypeDefinition::Blob),
        other => Err(ParseError::UnknownType(other.to_string())),
    }
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Result<Vec<String>> {
    match obj.get(key) {
        None => Ok(Vec::new()),
        Some(value) => decode::<Vec<String>>("object", value),
    }
}

fn parse_object(def: &Value) -> Result<ObjectType> {
    let obj = def
        .as_object()
        .ok_or_else(|| ParseError::malformed("object", "definition must be an object"))?;

    let description = match obj.get("description") {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };

    let mut object = ObjectType {
        description,
        required: string_list(obj, "required")?,
        nullable: string_list(obj, "nullable")?,
        ..Default::default()
    };

    match obj.get("properties") {
        None => {}
        Some(Value::Object(properties)) => {
            for (name, prop) in properties {
                object.properties.insert(name.clone(), parse_type(prop)?);
            }
        }
        Some(_) => {
            return Err(ParseError::malformed(
                "object",
                "properties must be an object",
            ))
        }
    }

    Ok(object)
}

fn parse_array(def: &Value) -> Result<ArrayType> {
    let items = def
        .get("items")
        .ok_or_else(|| ParseError::MissingField("items".to_string()))?;

    Ok(ArrayType {
        description: def
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        items: Box::new(parse_type(items)?),
        constraints: decode::<ArrayConstraints>("array", def)?,
    })
}

fn parse_ref(def: &Value) -> Result<RefType> {
    if def.get("ref").is_none() {
        return Err(ParseError::MissingField("ref".to_string()));
    }
    decode("ref", def)
}
