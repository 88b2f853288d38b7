//! Minimal XRPC query client
//!
//! Discovery only ever issues `com.atproto.repo.getRecord`, so this client
//! speaks XRPC queries (HTTP GET) with retry on network-class failures.

use crate::config::DiscoveryConfig;
use reqwest::{Client as ReqwestClient, Response as ReqwestResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// =============================================================================
// Error Types
// =============================================================================

/// XRPC error with HTTP status and message
///
/// # Examples
/// ```
/// use lexicon_discovery::XrpcError;
///
/// let error = XrpcError::new(404, "RecordNotFound", "Could not locate record");
/// assert_eq!(error.status(), 404);
/// assert!(!error.is_network_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrpcError {
    /// HTTP status code (0 when no response was received)
    status: u16,
    /// Error code (e.g., "InvalidRequest", "RecordNotFound")
    error: String,
    /// Human-readable error message
    message: String,
}

impl XrpcError {
    /// Create a new XRPC error
    pub fn new(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the error code
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a network-related error that should be retried
    ///
    /// Status 0 means the request never got a response.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.status,
            0 | 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524
        )
    }
}

impl std::fmt::Display for XrpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "XRPC error {}: {} - {}",
            self.status, self.error, self.message
        )
    }
}

impl std::error::Error for XrpcError {}

/// Standard XRPC error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrpcErrorResponse {
    /// Error code
    pub error: String,
    /// Error message
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// XRPC query request
#[derive(Debug, Clone)]
pub struct XrpcRequest {
    /// Method NSID (e.g., "com.atproto.repo.getRecord")
    pub nsid: String,
    /// Query parameters, in insertion order
    pub params: Vec<(String, String)>,
}

impl XrpcRequest {
    /// Create a new query request
    pub fn query(nsid: impl Into<String>) -> Self {
        Self {
            nsid: nsid.into(),
            params: Vec::new(),
        }
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

/// XRPC response
#[derive(Debug, Clone)]
pub struct XrpcResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Response data
    pub data: T,
}

// =============================================================================
// Retry Logic with Exponential Backoff
// =============================================================================

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential backoff)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculate the delay for a given retry attempt
    fn calculate_delay(&self, attempt: usize) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);

        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Retry an async operation while `should_retry` accepts its error
pub async fn retry<F, Fut, T, E>(
    config: RetryConfig,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempts += 1;
                if !should_retry(&err) || attempts > config.max_retries {
                    return Err(err);
                }

                let delay = config.calculate_delay(attempts - 1);
                tracing::debug!("Retrying after {:?} (attempt {})", delay, attempts);
                sleep(delay).await;
            }
        }
    }
}

// =============================================================================
// XRPC Client Implementation
// =============================================================================

/// XRPC client bound to one service (a PDS)
#[derive(Debug, Clone)]
pub struct XrpcClient {
    client: ReqwestClient,
    service_url: String,
    retry: RetryConfig,
}

impl XrpcClient {
    /// Create a client with its own HTTP connection pool
    pub fn new(service_url: impl Into<String>, config: &DiscoveryConfig) -> crate::Result<Self> {
        Ok(Self::with_http_client(
            config.http_client()?,
            service_url,
            RetryConfig::new(config.max_retries),
        ))
    }

    /// Create a client sharing an existing HTTP client
    pub fn with_http_client(
        client: ReqwestClient,
        service_url: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            service_url: service_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Get the service URL
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Make a query request (GET), retrying network-class failures
    pub async fn query<T: DeserializeOwned>(
        &self,
        request: &XrpcRequest,
    ) -> Result<XrpcResponse<T>, XrpcError> {
        retry(
            self.retry.clone(),
            |err: &XrpcError| err.is_network_error(),
            || self.execute(request),
        )
        .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: &XrpcRequest,
    ) -> Result<XrpcResponse<T>, XrpcError> {
        let url = format!("{}/xrpc/{}", self.service_url, request.nsid);

        let response = self
            .client
            .get(&url)
            .query(&request.params)
            .send()
            .await
            .map_err(|e| XrpcError::new(0, "NetworkError", format!("Request failed: {}", e)))?;

        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: ReqwestResponse,
) -> Result<XrpcResponse<T>, XrpcError> {
    let status = response.status().as_u16();

    if !response.status().is_success() {
        let error_body = response.text().await.unwrap_or_default();

        return Err(
            match serde_json::from_str::<XrpcErrorResponse>(&error_body) {
                Ok(error_response) => {
                    XrpcError::new(status, error_response.error, error_response.message)
                }
                Err(_) => XrpcError::new(status, "Unknown", format!("HTTP {}: {}", status, error_body)),
            },
        );
    }

    let body = response
        .text()
        .await
        .map_err(|e| XrpcError::new(0, "ParseError", format!("Failed to read response: {}", e)))?;

    let data: T = serde_json::from_str(&body)
        .map_err(|e| XrpcError::new(status, "ParseError", format!("Failed to parse JSON: {}", e)))?;

    Ok(XrpcResponse { status, data })
}
