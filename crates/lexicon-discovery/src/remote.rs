//! Remote Lexicon resolution over DNS, DID and XRPC

use crate::config::DiscoveryConfig;
use crate::did::{DidResolver, PlcDidResolver};
use crate::dns::{DohTxtResolver, TxtResolver};
use crate::xrpc::{RetryConfig, XrpcClient, XrpcRequest};
use crate::{DiscoveryError, Result};
use lexicon_core::{MemorySchemaSource, Nsid, SourceError};
use serde::Deserialize;
use serde_json::Value;

/// Collection holding published schema records
pub const LEXICON_SCHEMA_COLLECTION: &str = "com.atproto.lexicon.schema";

/// Prefix of the TXT record naming the authority's DID
const TXT_DID_PREFIX: &str = "did=";

/// DNS name queried for an NSID's authority (e.g. `_lexicon.feed.bsky.app`)
pub fn lexicon_domain(nsid: &Nsid) -> String {
    format!("_lexicon.{}", nsid.authority_domain())
}

#[derive(Debug, Deserialize)]
struct GetRecordOutput {
    #[serde(default)]
    uri: Option<String>,
    value: Value,
}

/// Fetches published Lexicon schemas from their authority's repository
///
/// # Example
///
/// ```no_run
/// use lexicon_core::{MemorySchemaSource, Nsid, Validator};
/// use lexicon_discovery::{DiscoveryConfig, RemoteLexiconResolver};
///
/// # async fn run() -> lexicon_discovery::Result<()> {
/// let remote = RemoteLexiconResolver::new(DiscoveryConfig::default())?;
/// let source = MemorySchemaSource::new();
/// let nsid = Nsid::parse("app.bsky.feed.post").unwrap();
/// remote.prefetch(&[nsid], &source).await;
///
/// let validator = Validator::new(source);
/// # Ok(())
/// # }
/// ```
pub struct RemoteLexiconResolver<T = DohTxtResolver, D = PlcDidResolver> {
    txt: T,
    did: D,
    http: reqwest::Client,
    config: DiscoveryConfig,
}

impl RemoteLexiconResolver {
    /// Create a resolver using DNS-over-HTTPS and the PLC directory
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        let http = config.http_client()?;
        let txt = DohTxtResolver::new(http.clone(), config.doh_url.clone());
        let did = PlcDidResolver::new(http.clone(), config.plc_directory_url.clone());
        Ok(Self {
            txt,
            did,
            http,
            config,
        })
    }
}

impl<T: TxtResolver, D: DidResolver> RemoteLexiconResolver<T, D> {
    /// Create a resolver with custom TXT and DID resolvers
    pub fn with_resolvers(txt: T, did: D, config: DiscoveryConfig) -> Result<Self> {
        Ok(Self {
            txt,
            did,
            http: config.http_client()?,
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Find the DID controlling `nsid`'s authority
    pub async fn resolve_authority(&self, nsid: &Nsid) -> Result<String> {
        let name = lexicon_domain(nsid);
        let records = self.txt.resolve_txt(&name).await?;

        records
            .iter()
            .find_map(|record| record.strip_prefix(TXT_DID_PREFIX))
            .map(|did| did.trim().to_string())
            .filter(|did| did.starts_with("did:"))
            .ok_or(DiscoveryError::NoAuthorityRecord(name))
    }

    /// Fetch the raw schema, surfacing the underlying failure
    pub async fn try_fetch(&self, nsid: &Nsid) -> Result<Value> {
        let did = self.resolve_authority(nsid).await?;
        let pds = self.did.resolve_pds(&did).await?;
        tracing::debug!("Fetching lexicon {} from {} ({})", nsid, pds, did);

        let client = XrpcClient::with_http_client(
            self.http.clone(),
            pds,
            RetryConfig::new(self.config.max_retries),
        );
        let request = XrpcRequest::query("com.atproto.repo.getRecord")
            .param("repo", did.as_str())
            .param("collection", LEXICON_SCHEMA_COLLECTION)
            .param("rkey", nsid.as_str());

        let response = client.query::<GetRecordOutput>(&request).await?;
        let value = response.data.value;

        match value.get("id").and_then(Value::as_str) {
            Some(id) if id == nsid.as_str() => Ok(value),
            other => Err(DiscoveryError::InvalidRecord(format!(
                "record {} has id {:?}, expected {}",
                response.data.uri.as_deref().unwrap_or("<unknown>"),
                other,
                nsid
            ))),
        }
    }

    /// Fetch the raw schema for `nsid`
    ///
    /// Every discovery failure is reported as not found.
    pub async fn fetch(&self, nsid: &Nsid) -> std::result::Result<Value, SourceError> {
        self.try_fetch(nsid).await.map_err(|e| {
            tracing::warn!("Remote lexicon discovery for {} failed: {}", nsid, e);
            SourceError::NotFound(nsid.to_string())
        })
    }

    /// Fetch each schema and register it in `target`
    ///
    /// Returns how many schemas were registered. Schemas already present
    /// are not fetched again.
    pub async fn prefetch(&self, nsids: &[Nsid], target: &MemorySchemaSource) -> usize {
        let mut registered = 0;
        for nsid in nsids {
            if target.contains(nsid) {
                continue;
            }
            let Ok(raw) = self.fetch(nsid).await else {
                continue;
            };
            match target.insert_raw(raw) {
                Ok(_) => registered += 1,
                Err(e) => tracing::warn!("Discovered lexicon {} is malformed: {}", nsid, e),
            }
        }
        registered
    }
}

impl<T, D> std::fmt::Debug for RemoteLexiconResolver<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLexiconResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
