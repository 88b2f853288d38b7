//! Remote Lexicon schema discovery
//!
//! Published Lexicon schemas live as `com.atproto.lexicon.schema` records in
//! the repository of the account that controls the NSID's authority. Finding
//! one takes three hops:
//!
//! 1. DNS TXT lookup of `_lexicon.<authority domain>`, expecting `did=<did>`
//! 2. Resolution of that DID to its PDS endpoint
//! 3. `com.atproto.repo.getRecord` on the PDS with `rkey = <nsid>`
//!
//! Reference: <https://atproto.com/specs/lexicon#lexicon-publication-and-resolution>
//!
//! The core engine is synchronous and never performs I/O, so schemas are
//! fetched ahead of time with [`RemoteLexiconResolver::prefetch`] into a
//! [`lexicon_core::MemorySchemaSource`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod did;
pub mod dns;
pub mod remote;
pub mod xrpc;

pub use config::DiscoveryConfig;
pub use did::{DidDocument, DidResolver, DidService, PlcDidResolver};
pub use dns::{DohTxtResolver, NullTxtResolver, TxtResolver};
pub use remote::RemoteLexiconResolver;
pub use xrpc::{XrpcClient, XrpcError, XrpcRequest, XrpcResponse};

use thiserror::Error;

/// Errors that can occur during discovery
///
/// These never reach the validation engine: [`RemoteLexiconResolver::fetch`]
/// degrades every one of them to a not-found result.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// XRPC call failed
    #[error(transparent)]
    Xrpc(#[from] XrpcError),

    /// DNS-over-HTTPS lookup failed
    #[error("DNS lookup for {name} failed: {reason}")]
    Dns {
        /// Queried name
        name: String,
        /// What went wrong
        reason: String,
    },

    /// No `did=` TXT record for the authority
    #[error("No lexicon authority record at {0}")]
    NoAuthorityRecord(String),

    /// DID method is not supported or the DID is malformed
    #[error("Unsupported DID: {0}")]
    UnsupportedDid(String),

    /// DID document has no PDS service
    #[error("No PDS endpoint in DID document for {0}")]
    NoPdsEndpoint(String),

    /// The fetched record is not the requested schema
    #[error("Invalid schema record: {0}")]
    InvalidRecord(String),
}

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
