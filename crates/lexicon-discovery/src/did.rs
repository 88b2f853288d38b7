//! DID resolution down to a PDS endpoint

use crate::{DiscoveryError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Service id suffix of the atproto PDS entry
const PDS_SERVICE_ID: &str = "#atproto_pds";

/// A service entry in a DID document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidService {
    /// Service id, usually `#atproto_pds`
    pub id: String,
    /// Service type
    #[serde(rename = "type")]
    pub service_type: String,
    /// Endpoint URL
    pub service_endpoint: String,
}

/// The subset of a DID document discovery needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDocument {
    /// The DID
    pub id: String,
    /// Declared services
    #[serde(default)]
    pub service: Vec<DidService>,
}

impl DidDocument {
    /// Endpoint of the atproto PDS service, if declared
    pub fn pds_endpoint(&self) -> Option<&str> {
        self.service
            .iter()
            .find(|s| s.id.ends_with(PDS_SERVICE_ID))
            .map(|s| s.service_endpoint.as_str())
    }
}

/// Resolves a DID to the PDS hosting its repository
#[async_trait]
pub trait DidResolver: Send + Sync {
    /// Return the PDS base URL for `did`
    async fn resolve_pds(&self, did: &str) -> Result<String>;
}

/// Resolver for `did:plc` (via a PLC directory) and `did:web`
#[derive(Debug, Clone)]
pub struct PlcDidResolver {
    client: reqwest::Client,
    plc_url: String,
}

impl PlcDidResolver {
    /// Create a resolver using the given PLC directory
    pub fn new(client: reqwest::Client, plc_url: impl Into<String>) -> Self {
        Self {
            client,
            plc_url: plc_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// URL of the DID document for `did`
    pub fn document_url(&self, did: &str) -> Result<String> {
        if did.starts_with("did:plc:") {
            Ok(format!("{}/{}", self.plc_url, did))
        } else if let Some(host) = did.strip_prefix("did:web:") {
            // Path-based did:web is not used for lexicon authorities
            if host.is_empty() || host.contains(':') {
                return Err(DiscoveryError::UnsupportedDid(did.to_string()));
            }
            Ok(format!("https://{}/.well-known/did.json", host))
        } else {
            Err(DiscoveryError::UnsupportedDid(did.to_string()))
        }
    }

    /// Fetch the DID document for `did`
    pub async fn resolve_document(&self, did: &str) -> Result<DidDocument> {
        let url = self.document_url(did)?;
        tracing::debug!("Fetching DID document for {} from {}", did, url);

        let document: DidDocument = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if document.id != did {
            return Err(DiscoveryError::InvalidRecord(format!(
                "DID document id {} does not match {}",
                document.id, did
            )));
        }

        Ok(document)
    }
}

#[async_trait]
impl DidResolver for PlcDidResolver {
    async fn resolve_pds(&self, did: &str) -> Result<String> {
        let document = self.resolve_document(did).await?;
        document
            .pds_endpoint()
            .map(|endpoint| endpoint.trim_end_matches('/').to_string())
            .ok_or_else(|| DiscoveryError::NoPdsEndpoint(did.to_string()))
    }
}
