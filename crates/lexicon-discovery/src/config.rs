//! Discovery configuration

use crate::Result;
use std::time::Duration;

/// Default DNS-over-HTTPS endpoint (JSON API)
pub const DEFAULT_DOH_URL: &str = "https://cloudflare-dns.com/dns-query";

/// Default PLC directory
pub const DEFAULT_PLC_DIRECTORY_URL: &str = "https://plc.directory";

/// Settings shared by the discovery resolvers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// DNS-over-HTTPS endpoint
    pub doh_url: String,
    /// PLC directory base URL
    pub plc_directory_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Retries for recoverable XRPC failures
    pub max_retries: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            doh_url: DEFAULT_DOH_URL.to_string(),
            plc_directory_url: DEFAULT_PLC_DIRECTORY_URL.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: format!("lexicon-engine/{}", env!("CARGO_PKG_VERSION")),
            max_retries: 2,
        }
    }
}

impl DiscoveryConfig {
    /// Set the DNS-over-HTTPS endpoint
    pub fn with_doh_url(mut self, url: impl Into<String>) -> Self {
        self.doh_url = url.into();
        self
    }

    /// Set the PLC directory
    pub fn with_plc_directory_url(mut self, url: impl Into<String>) -> Self {
        self.plc_directory_url = url.into();
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry count
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Build an HTTP client with these settings
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?)
    }
}
