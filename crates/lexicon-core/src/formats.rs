//! String format types for Lexicon schemas
//!
//! These formats provide additional validation and semantic meaning for
//! string values. A `format` name this engine does not recognize is not an
//! error: the value simply passes the format check.

use super::nsid::Nsid;
use serde::{Deserialize, Serialize};

/// String format types defined by AT Protocol
///
/// Reference: <https://atproto.com/specs/lexicon#string-formats>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    /// AT Protocol identifier (DID or handle)
    AtIdentifier,

    /// AT Protocol URI: `at://authority/collection/rkey`
    AtUri,

    /// Content Identifier
    ///
    /// CIDv0 (`Qm…`, base58btc, 46 characters) or CIDv1 in base32 (`b…`)
    /// or base58btc (`z…`) multibase encoding.
    Cid,

    /// RFC 3339 datetime with timezone
    Datetime,

    /// Decentralized Identifier: `did:method:identifier`
    Did,

    /// Domain name handle
    Handle,

    /// Namespaced Identifier
    Nsid,

    /// Timestamp Identifier: 13-character base32-sortable string
    Tid,

    /// Record key
    RecordKey,

    /// Generic URI (`scheme:rest`)
    Uri,

    /// BCP 47 language tag
    Language,
}

impl StringFormat {
    /// Get the string representation of the format
    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::AtIdentifier => "at-identifier",
            StringFormat::AtUri => "at-uri",
            StringFormat::Cid => "cid",
            StringFormat::Datetime => "datetime",
            StringFormat::Did => "did",
            StringFormat::Handle => "handle",
            StringFormat::Nsid => "nsid",
            StringFormat::Tid => "tid",
            StringFormat::RecordKey => "record-key",
            StringFormat::Uri => "uri",
            StringFormat::Language => "language",
        }
    }

    /// Look up a format by name; `None` for formats this engine does not know
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "at-identifier" => Some(StringFormat::AtIdentifier),
            "at-uri" => Some(StringFormat::AtUri),
            "cid" => Some(StringFormat::Cid),
            "datetime" => Some(StringFormat::Datetime),
            "did" => Some(StringFormat::Did),
            "handle" => Some(StringFormat::Handle),
            "nsid" => Some(StringFormat::Nsid),
            "tid" => Some(StringFormat::Tid),
            "record-key" => Some(StringFormat::RecordKey),
            "uri" => Some(StringFormat::Uri),
            "language" => Some(StringFormat::Language),
            _ => None,
        }
    }

    /// Check a value against this format
    pub fn is_valid(&self, value: &str) -> bool {
        match self {
            StringFormat::AtIdentifier => is_valid_at_identifier(value),
            StringFormat::AtUri => is_valid_at_uri(value),
            StringFormat::Cid => is_valid_cid(value),
            StringFormat::Datetime => is_valid_datetime(value),
            StringFormat::Did => is_valid_did(value),
            StringFormat::Handle => is_valid_handle(value),
            StringFormat::Nsid => Nsid::is_valid(value),
            StringFormat::Tid => is_valid_tid(value),
            StringFormat::RecordKey => is_valid_record_key(value),
            StringFormat::Uri => is_valid_uri(value),
            StringFormat::Language => is_valid_language(value),
        }
    }
}

impl std::fmt::Display for StringFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const CIDV0_LENGTH: usize = 46;
const MIN_CIDV1_LENGTH: usize = 8;

/// DID or handle
pub fn is_valid_at_identifier(value: &str) -> bool {
    if value.starts_with("did:") {
        is_valid_did(value)
    } else {
        is_valid_handle(value)
    }
}

/// `at://authority[/collection[/rkey]]`
pub fn is_valid_at_uri(value: &str) -> bool {
    let Some(rest) = value.strip_prefix("at://") else {
        return false;
    };

    let mut parts = rest.split('/');
    let authority = parts.next().unwrap_or_default();
    if !is_valid_at_identifier(authority) {
        return false;
    }

    match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => true,
        (Some(collection), None, _) => Nsid::is_valid(collection),
        (Some(collection), Some(rkey), None) => {
            Nsid::is_valid(collection) && is_valid_record_key(rkey)
        }
        _ => false,
    }
}

/// CIDv0 (`Qm…`) or multibase CIDv1 (`b…` base32, `z…` base58btc)
pub fn is_valid_cid(value: &str) -> bool {
    let is_base58 = |s: &str| s.chars().all(|c| BASE58_ALPHABET.contains(c));

    if value.starts_with("Qm") {
        return value.len() == CIDV0_LENGTH && is_base58(value);
    }

    if value.len() < MIN_CIDV1_LENGTH {
        return false;
    }

    if let Some(body) = value.strip_prefix('b') {
        return body
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c));
    }

    if let Some(body) = value.strip_prefix('z') {
        return is_base58(body);
    }

    false
}

/// RFC 3339 datetime; a timezone (`Z` or offset) is mandatory
pub fn is_valid_datetime(value: &str) -> bool {
    // chrono also accepts a lowercase `t` or a space as the separator
    value.as_bytes().get(10) == Some(&b'T') && chrono::DateTime::parse_from_rfc3339(value).is_ok()
}

/// `did:method:identifier`
pub fn is_valid_did(value: &str) -> bool {
    if value.len() > 2048 {
        return false;
    }
    let Some(rest) = value.strip_prefix("did:") else {
        return false;
    };
    let Some((method, identifier)) = rest.split_once(':') else {
        return false;
    };

    if method.is_empty() || !method.chars().all(|c| c.is_ascii_lowercase()) {
        return false;
    }

    if identifier.is_empty() || identifier.ends_with(':') || identifier.ends_with('%') {
        return false;
    }

    identifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '%' | '-'))
}

/// Domain-name handle
pub fn is_valid_handle(value: &str) -> bool {
    if value.is_empty() || value.len() > 253 || !value.contains('.') {
        return false;
    }

    let segments: Vec<&str> = value.split('.').collect();
    for segment in &segments {
        if segment.is_empty() || segment.len() > 63 {
            return false;
        }
        if !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
        if segment.starts_with('-') || segment.ends_with('-') {
            return false;
        }
    }

    // TLD may not start with a digit
    segments
        .last()
        .and_then(|tld| tld.chars().next())
        .is_some_and(|c| c.is_ascii_alphabetic())
}

/// 13 base32-sortable characters
pub fn is_valid_tid(value: &str) -> bool {
    const FIRST: &str = "234567abcdefghij";

    value.len() == 13
        && value.chars().next().is_some_and(|c| FIRST.contains(c))
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c))
}

/// Record key: 1-512 characters from `A-Za-z0-9._:~-`, not `.` or `..`
pub fn is_valid_record_key(value: &str) -> bool {
    if value.is_empty() || value.len() > 512 || value == "." || value == ".." {
        return false;
    }

    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | ':'))
}

/// `scheme:rest` with an RFC 3986 scheme and no whitespace
pub fn is_valid_uri(value: &str) -> bool {
    if value.len() > 8192 || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };

    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}

/// BCP 47-like tag: 2-8 letter primary subtag, then 1-8 alphanumeric subtags
pub fn is_valid_language(value: &str) -> bool {
    let mut subtags = value.split('-');
    let primary = subtags.next().unwrap_or_default();

    if !(2..=8).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    subtags.all(|s| (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_format_names() {
        let formats = [
            StringFormat::AtIdentifier,
            StringFormat::AtUri,
            StringFormat::Cid,
            StringFormat::Datetime,
            StringFormat::Did,
            StringFormat::Handle,
            StringFormat::Nsid,
            StringFormat::Tid,
            StringFormat::RecordKey,
            StringFormat::Uri,
            StringFormat::Language,
        ];

        for format in formats {
            assert_eq!(StringFormat::from_name(format.as_str()), Some(format));
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, format!("\"{}\"", format));
        }
        assert_eq!(StringFormat::from_name("invalid"), None);
    }

    #[test]
    fn test_did() {
        assert!(is_valid_did("did:plc:abc123"));
        assert!(is_valid_did("did:web:example.com"));
        assert!(is_valid_did("did:key:z6MkpTHR8VNsBxYAAWHut2Geadd9jSwuBV8xRoAnwWsdvktH"));

        assert!(!is_valid_did("not-a-did"));
        assert!(!is_valid_did("did:"));
        assert!(!is_valid_did("did:plc:"));
        assert!(!is_valid_did("did:PLC:abc"));
        assert!(!is_valid_did("did:plc:abc:"));
    }

    #[test]
    fn test_handle() {
        assert!(is_valid_handle("user.bsky.social"));
        assert!(is_valid_handle("example.com"));
        assert!(is_valid_handle("xn--ls8h.test"));

        assert!(!is_valid_handle(""));
        assert!(!is_valid_handle("nodot"));
        assert!(!is_valid_handle(".startsdot.com"));
        assert!(!is_valid_handle("endsdot.com."));
        assert!(!is_valid_handle("invalid-.com"));
        assert!(!is_valid_handle("example.123"));
    }

    #[test]
    fn test_datetime() {
        assert!(is_valid_datetime("2024-01-01T00:00:00Z"));
        assert!(is_valid_datetime("2024-01-01T00:00:00.123Z"));
        assert!(is_valid_datetime("2024-01-01T00:00:00+00:00"));
        assert!(is_valid_datetime("2024-01-01T00:00:00-05:00"));

        assert!(!is_valid_datetime("2024-01-01"));
        assert!(!is_valid_datetime("2024-01-01T00:00:00"));
        assert!(!is_valid_datetime("2024-01-01 00:00:00Z"));
        assert!(!is_valid_datetime("not a date"));
    }

    #[test]
    fn test_at_uri() {
        assert!(is_valid_at_uri("at://did:plc:abc123"));
        assert!(is_valid_at_uri("at://did:plc:abc123/app.bsky.feed.post/3jui7kd54zh2y"));
        assert!(is_valid_at_uri("at://alice.bsky.social/app.bsky.feed.post"));

        assert!(!is_valid_at_uri("https://example.com"));
        assert!(!is_valid_at_uri("at://"));
        assert!(!is_valid_at_uri("at://did:plc:abc/notnsid/rkey"));
        assert!(!is_valid_at_uri("at://did:plc:abc/app.bsky.feed.post/rkey/extra"));
    }

    #[test]
    fn test_cid() {
        assert!(is_valid_cid("QmWATWQ7fVPP2EFGu71UkfnqhYXDYH566qy47CnJDgvs8u"));
        assert!(is_valid_cid(
            "bafyreie5737gdxlw5i64vzichcalba3z2v5n6icifvx5xytvske7mr3hpm"
        ));
        assert!(is_valid_cid("zdj7WhuEjrB52m1BisYCtmjH1hSKa7yZ3jEZ9JcXaFRD51wVz"));

        assert!(!is_valid_cid(""));
        assert!(!is_valid_cid("QmTooShort"));
        assert!(!is_valid_cid("bafyREIE5737"));
        assert!(!is_valid_cid("z0OIl000000"));
        assert!(!is_valid_cid("xyz123456789"));
    }

    #[test]
    fn test_tid() {
        assert!(is_valid_tid("3jui7kd54zh2y"));

        assert!(!is_valid_tid("tooshort"));
        assert!(!is_valid_tid("UPPERCASE1234"));
        assert!(!is_valid_tid("invalid!chars"));
        assert!(!is_valid_tid("zzzzzzzzzzzzz"));
    }

    #[test]
    fn test_record_key() {
        assert!(is_valid_record_key("self"));
        assert!(is_valid_record_key("3jui7kd54zh2y"));
        assert!(is_valid_record_key("literal:self"));

        assert!(!is_valid_record_key(""));
        assert!(!is_valid_record_key("."));
        assert!(!is_valid_record_key(".."));
        assert!(!is_valid_record_key("has space"));
    }

    #[test]
    fn test_uri() {
        assert!(is_valid_uri("https://example.com/path?q=1"));
        assert!(is_valid_uri("mailto:someone@example.com"));
        assert!(is_valid_uri("at://did:plc:abc"));

        assert!(!is_valid_uri("no-scheme"));
        assert!(!is_valid_uri("1http://example.com"));
        assert!(!is_valid_uri("https://exa mple.com"));
        assert!(!is_valid_uri("https:"));
    }

    #[test]
    fn test_language() {
        assert!(is_valid_language("en"));
        assert!(is_valid_language("en-US"));
        assert!(is_valid_language("pt-BR"));
        assert!(is_valid_language("zh-Hant-TW"));

        assert!(!is_valid_language(""));
        assert!(!is_valid_language("e"));
        assert!(!is_valid_language("toolongprimary"));
        assert!(!is_valid_language("en-"));
        assert!(!is_valid_language("en_US"));
    }

    #[test]
    fn test_at_identifier() {
        assert!(StringFormat::AtIdentifier.is_valid("did:plc:abc123"));
        assert!(StringFormat::AtIdentifier.is_valid("user.bsky.social"));
        assert!(!StringFormat::AtIdentifier.is_valid("not an identifier"));
    }
}
