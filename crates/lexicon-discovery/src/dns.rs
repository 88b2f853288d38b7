//! TXT record lookup
//!
//! Lookups go through a DNS-over-HTTPS JSON endpoint so discovery needs no
//! resolver beyond the HTTP stack it already carries.

use crate::{DiscoveryError, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// DNS record type code for TXT
const TXT_RECORD_TYPE: u16 = 16;

/// Resolves TXT records for a name
#[async_trait]
pub trait TxtResolver: Send + Sync {
    /// Return every TXT record at `name`, with character-strings joined
    async fn resolve_txt(&self, name: &str) -> Result<Vec<String>>;
}

/// Resolver that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTxtResolver;

#[async_trait]
impl TxtResolver for NullTxtResolver {
    async fn resolve_txt(&self, _name: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status", default)]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

/// TXT resolver backed by a DNS-over-HTTPS JSON API
#[derive(Debug, Clone)]
pub struct DohTxtResolver {
    client: reqwest::Client,
    url: String,
}

impl DohTxtResolver {
    /// Create a resolver for the given endpoint
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Get the endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TxtResolver for DohTxtResolver {
    async fn resolve_txt(&self, name: &str) -> Result<Vec<String>> {
        let dns_error = |reason: String| DiscoveryError::Dns {
            name: name.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&self.url)
            .query(&[("name", name), ("type", "TXT")])
            .header("accept", "application/dns-json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(dns_error(format!("HTTP {}", response.status())));
        }

        let body: DohResponse = response.json().await?;

        // NXDOMAIN (3) is an empty answer, not a failure
        if body.status != 0 && body.status != 3 {
            return Err(dns_error(format!("rcode {}", body.status)));
        }

        Ok(body
            .answer
            .iter()
            .filter(|a| a.record_type == TXT_RECORD_TYPE)
            .map(|a| unquote_txt(&a.data))
            .collect())
    }
}

/// Join the quoted character-strings of a TXT record
///
/// `"did=did:plc:" "abc"` becomes `did=did:plc:abc`. Unquoted data is
/// returned as is.
pub(crate) fn unquote_txt(data: &str) -> String {
    let trimmed = data.trim();
    if !trimmed.starts_with('"') {
        return trimmed.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_quotes = false;
    let mut chars = trimmed.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            _ if in_quotes => out.push(c),
            _ => {}
        }
    }
    out
}
