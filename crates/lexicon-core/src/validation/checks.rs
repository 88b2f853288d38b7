//! Per-type value checks
//!
//! Structural checks (the value has the right shape at all) return the first
//! problem as an `Err`. Constraint checks collect every violated keyword so a
//! single value can report, say, both `maxLength` and `maxGraphemes`.

use super::report::Violation;
use crate::constraints::*;
use crate::formats;
use crate::types::{json_type_name, StringType};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Map, Value};
use unicode_segmentation::UnicodeSegmentation;

/// Validate string constraints and format
pub fn check_string(value: &str, def: &StringType, out: &mut Vec<Violation>) {
    let constraints = &def.constraints;

    // Lengths are measured in UTF-8 bytes
    let byte_len = value.len();
    if let Some(max) = constraints.max_length {
        if byte_len > max {
            out.push(Violation::StringTooLong { actual: byte_len, max });
        }
    }
    if let Some(min) = constraints.min_length {
        if byte_len < min {
            out.push(Violation::StringTooShort { actual: byte_len, min });
        }
    }

    if constraints.max_graphemes.is_some() || constraints.min_graphemes.is_some() {
        let grapheme_count = value.graphemes(true).count();
        if let Some(max) = constraints.max_graphemes {
            if grapheme_count > max {
                out.push(Violation::TooManyGraphemes { actual: grapheme_count, max });
            }
        }
        if let Some(min) = constraints.min_graphemes {
            if grapheme_count < min {
                out.push(Violation::TooFewGraphemes { actual: grapheme_count, min });
            }
        }
    }

    if let Some(allowed) = &constraints.r#enum {
        if !allowed.iter().any(|a| a == value) {
            out.push(Violation::NotInEnum {
                value: json!(value),
                allowed: json!(allowed),
            });
        }
    }

    if let Some(constant) = &constraints.r#const {
        if value != constant {
            out.push(Violation::ConstMismatch {
                actual: json!(value),
                expected: json!(constant),
            });
        }
    }

    // Formats this engine does not recognize pass
    if let Some(format) = def.string_format() {
        if !format.is_valid(value) {
            out.push(Violation::InvalidFormat {
                format: format.to_string(),
                value: value.to_string(),
            });
        }
    }
}

/// Validate integer value against integer constraints
pub fn check_integer(value: i64, constraints: &IntegerConstraints, out: &mut Vec<Violation>) {
    if let Some(min) = constraints.minimum {
        if value < min {
            out.push(Violation::IntegerTooSmall { value, min });
        }
    }
    if let Some(max) = constraints.maximum {
        if value > max {
            out.push(Violation::IntegerTooLarge { value, max });
        }
    }

    if let Some(allowed) = &constraints.r#enum {
        if !allowed.contains(&value) {
            out.push(Violation::NotInEnum {
                value: json!(value),
                allowed: json!(allowed),
            });
        }
    }

    if let Some(constant) = constraints.r#const {
        if value != constant {
            out.push(Violation::ConstMismatch {
                actual: json!(value),
                expected: json!(constant),
            });
        }
    }
}

/// Validate boolean value against boolean constraints
pub fn check_boolean(value: bool, constraints: &BooleanConstraints, out: &mut Vec<Violation>) {
    if let Some(constant) = constraints.r#const {
        if value != constant {
            out.push(Violation::ConstMismatch {
                actual: json!(value),
                expected: json!(constant),
            });
        }
    }
}

/// Validate array length against array constraints
pub fn check_array_length(length: usize, constraints: &ArrayConstraints, out: &mut Vec<Violation>) {
    if let Some(max) = constraints.max_items {
        if length > max {
            out.push(Violation::ArrayTooLong { actual: length, max });
        }
    }
    if let Some(min) = constraints.min_items {
        if length < min {
            out.push(Violation::ArrayTooShort { actual: length, min });
        }
    }
}

/// Decode a `{"$bytes": "<base64>"}` value
///
/// Both padded and unpadded base64 are accepted.
pub fn decode_bytes(value: &Value) -> Result<Vec<u8>, Violation> {
    let encoded = single_key(value, "$bytes")
        .map_err(Violation::InvalidBytes)?
        .as_str()
        .ok_or_else(|| Violation::InvalidBytes("$bytes must be a string".to_string()))?;

    general_purpose::STANDARD_NO_PAD
        .decode(encoded)
        .or_else(|_| general_purpose::STANDARD.decode(encoded))
        .map_err(|e| Violation::InvalidBytes(e.to_string()))
}

/// Validate decoded bytes length
pub fn check_bytes_length(length: usize, constraints: &BytesConstraints, out: &mut Vec<Violation>) {
    if let Some(max) = constraints.max_length {
        if length > max {
            out.push(Violation::BytesTooLong { actual: length, max });
        }
    }
    if let Some(min) = constraints.min_length {
        if length < min {
            out.push(Violation::BytesTooShort { actual: length, min });
        }
    }
}

/// Check the `{"$link": "<cid>"}` shape and return the CID string
pub fn cid_link_target(value: &Value) -> Result<&str, Violation> {
    let link = single_key(value, "$link").map_err(Violation::InvalidCidLink)?;
    link.as_str()
        .ok_or_else(|| Violation::InvalidCidLink("$link must be a string".to_string()))
}

/// Check a `{"$link": "<cid>"}` value, including the CID itself
pub fn check_cid_link(value: &Value) -> Result<(), Violation> {
    let cid = cid_link_target(value)?;
    if formats::is_valid_cid(cid) {
        Ok(())
    } else {
        Err(Violation::InvalidCidLink(format!("invalid CID: {}", cid)))
    }
}

fn single_key<'a>(value: &'a Value, key: &str) -> Result<&'a Value, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected object, got {}", json_type_name(value)))?;
    obj.get(key).ok_or_else(|| format!("missing {}", key))
}

/// The parts of a blob reference that constraints apply to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef<'a> {
    /// Declared MIME type
    pub mime_type: &'a str,
    /// Declared size in bytes
    pub size: u64,
    /// The `ref` value, either a `{"$link": ...}` object or a plain string
    pub reference: &'a Value,
}

/// Check the shape of a blob reference
///
/// ```json
/// { "$type": "blob", "ref": { "$link": "bafkrei..." }, "mimeType": "image/png", "size": 12345 }
/// ```
pub fn parse_blob(value: &Value) -> Result<BlobRef<'_>, Violation> {
    let obj: &Map<String, Value> = value.as_object().ok_or_else(|| {
        Violation::InvalidBlob(format!("expected object, got {}", json_type_name(value)))
    })?;

    if obj.get("$type").and_then(Value::as_str) != Some("blob") {
        return Err(Violation::InvalidBlob("$type must be \"blob\"".to_string()));
    }

    let reference = match obj.get("ref") {
        Some(reference @ (Value::Object(_) | Value::String(_))) => reference,
        Some(other) => {
            return Err(Violation::InvalidBlob(format!(
                "ref must be an object or string, got {}",
                json_type_name(other)
            )))
        }
        None => return Err(Violation::InvalidBlob("missing ref".to_string())),
    };

    let mime_type = obj
        .get("mimeType")
        .and_then(Value::as_str)
        .ok_or_else(|| Violation::InvalidBlob("mimeType must be a string".to_string()))?;

    let size = obj
        .get("size")
        .and_then(Value::as_u64)
        .ok_or_else(|| Violation::InvalidBlob("size must be a non-negative integer".to_string()))?;

    Ok(BlobRef {
        mime_type,
        size,
        reference,
    })
}

/// Validate a blob against `accept` and `maxSize`
///
/// A `{"$link": ...}` ref must also carry a well-formed CID. String refs are
/// taken as is.
pub fn check_blob(blob: &BlobRef<'_>, constraints: &BlobConstraints, out: &mut Vec<Violation>) {
    if blob.reference.is_object() {
        if let Err(e) = check_cid_link(blob.reference) {
            out.push(Violation::InvalidBlob(format!("ref: {}", e)));
        }
    }

    if let Some(accept) = &constraints.accept {
        if !accept.iter().any(|pattern| mime_matches(pattern, blob.mime_type)) {
            out.push(Violation::BlobMimeTypeNotAccepted {
                mime_type: blob.mime_type.to_string(),
                accept: accept.clone(),
            });
        }
    }

    if let Some(max) = constraints.max_size {
        if blob.size > max {
            out.push(Violation::BlobTooLarge {
                actual: blob.size,
                max,
            });
        }
    }
}

/// Match a MIME type against an accept pattern (`image/png`, `image/*`, `*/*`)
pub fn mime_matches(pattern: &str, mime_type: &str) -> bool {
    if pattern == "*/*" {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(prefix) => mime_type
            .split_once('/')
            .is_some_and(|(top, _)| top == prefix),
        None => pattern == mime_type,
    }
}
