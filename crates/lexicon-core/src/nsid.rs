//! Namespaced Identifiers (NSIDs)
//!
//! An NSID names a Lexicon schema using reverse-DNS order, e.g.
//! `app.bsky.feed.post`. All segments but the last form the *authority*; the
//! last segment is the *name*.
//!
//! Reference: <https://atproto.com/specs/nsid>
//!
//! # Example
//!
//! ```rust
//! use lexicon_core::Nsid;
//!
//! let nsid = Nsid::parse("app.bsky.feed.post").unwrap();
//! assert_eq!(nsid.authority(), "app.bsky.feed");
//! assert_eq!(nsid.name(), "post");
//! assert_eq!(nsid.authority_domain(), "feed.bsky.app");
//!
//! assert!(!Nsid::is_valid("com.example"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum total length of an NSID
pub const MAX_NSID_LENGTH: usize = 317;

/// Maximum length of a single segment
pub const MAX_SEGMENT_LENGTH: usize = 63;

/// Minimum number of dot-separated segments
pub const MIN_SEGMENTS: usize = 3;

/// NSID format errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NsidError {
    /// Input was empty
    #[error("NSID cannot be empty")]
    Empty,

    /// Input exceeds the maximum length
    #[error("NSID exceeds maximum length: {0} > {MAX_NSID_LENGTH}")]
    TooLong(usize),

    /// Fewer than three segments
    #[error("NSID must have at least {MIN_SEGMENTS} segments: {0}")]
    TooFewSegments(String),

    /// A segment violates the grammar
    #[error("Invalid NSID segment '{segment}' in '{nsid}': {reason}")]
    InvalidSegment {
        /// The full input
        nsid: String,
        /// The offending segment
        segment: String,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// A validated Namespaced Identifier
///
/// Equality is exact string comparison; no case or trailing-dot
/// normalization is performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nsid(String);

impl Nsid {
    /// Parse and validate an NSID
    pub fn parse(s: &str) -> Result<Self, NsidError> {
        validate(s)?;
        Ok(Nsid(s.to_string()))
    }

    /// Check whether a string is a valid NSID without allocating an error
    pub fn is_valid(s: &str) -> bool {
        validate(s).is_ok()
    }

    /// The NSID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the dot-separated segments
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split('.')
    }

    /// All segments but the last (e.g. `app.bsky.feed`)
    pub fn authority(&self) -> &str {
        // Validated NSIDs always contain a dot
        match self.0.rfind('.') {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// The last segment (e.g. `post`)
    pub fn name(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// All segments in reversed order (e.g. `post.feed.bsky.app`)
    pub fn to_domain(&self) -> String {
        self.segments().rev().collect::<Vec<_>>().join(".")
    }

    /// Authority segments in reversed order (e.g. `feed.bsky.app`)
    ///
    /// This is the domain queried for `_lexicon` TXT records.
    pub fn authority_domain(&self) -> String {
        self.authority().split('.').rev().collect::<Vec<_>>().join(".")
    }
}

fn validate(s: &str) -> Result<(), NsidError> {
    if s.is_empty() {
        return Err(NsidError::Empty);
    }
    if s.len() > MAX_NSID_LENGTH {
        return Err(NsidError::TooLong(s.len()));
    }

    let segments: Vec<&str> = s.split('.').collect();
    for segment in &segments {
        if let Err(reason) = validate_segment(segment) {
            return Err(NsidError::InvalidSegment {
                nsid: s.to_string(),
                segment: segment.to_string(),
                reason,
            });
        }
    }

    if segments.len() < MIN_SEGMENTS {
        return Err(NsidError::TooFewSegments(s.to_string()));
    }

    Ok(())
}

fn validate_segment(segment: &str) -> Result<(), &'static str> {
    let first = segment.chars().next().ok_or("segment is empty")?;

    if segment.len() > MAX_SEGMENT_LENGTH {
        return Err("segment exceeds 63 characters");
    }
    if !first.is_ascii_alphabetic() {
        return Err("segment must start with a letter");
    }
    if !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("segment may only contain letters, digits and hyphens");
    }
    if segment.ends_with('-') {
        return Err("segment must end with a letter or digit");
    }

    Ok(())
}

impl fmt::Display for Nsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Nsid {
    type Err = NsidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Nsid::parse(s)
    }
}

impl TryFrom<String> for Nsid {
    type Error = NsidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(&value)?;
        Ok(Nsid(value))
    }
}

impl From<Nsid> for String {
    fn from(nsid: Nsid) -> Self {
        nsid.0
    }
}

impl AsRef<str> for Nsid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
