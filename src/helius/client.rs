//! Helius API client
//!
//! Wraps the two provider endpoints with request pacing and retry. The
//! signature pager talks JSON-RPC to the RPC host; enhanced batches go to
//! the v0 REST API.

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::helius::types::{EnhancedTransaction, SignatureInfo};
use crate::helius::TransactionProvider;

/// Enforces a minimum interval between calls to one endpoint.
pub struct Pacer {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Sleep until the minimum interval since the previous call has passed.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Helius API client
pub struct HeliusClient {
    client: Client,
    api_key: String,
    rest_base_url: String,
    rpc_url: String,
    timeout: Duration,
    rpc_pacer: Pacer,
    enhanced_pacer: Pacer,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HeliusClient {
    /// Create a new Helius client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            rest_base_url: config.rest_base_url.clone(),
            rpc_url: format!("{}/?api-key={}", config.rpc_base_url, config.api_key),
            timeout: Duration::from_secs(config.timeout_secs),
            rpc_pacer: Pacer::new(Duration::from_millis(config.rpc_min_interval_ms)),
            enhanced_pacer: Pacer::new(Duration::from_millis(config.enhanced_min_interval_ms)),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    /// Extract an API key from a Helius RPC URL
    pub fn api_key_from_rpc_url(rpc_url: &str) -> Option<String> {
        let key_start = rpc_url.find("api-key=")?;
        let key = &rpc_url[key_start + 8..];
        let key = key.split('&').next().unwrap_or(key);
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    /// Run one provider call under the retry budget: transient failures are
    /// retried with exponential backoff from the base delay, rate-limit
    /// responses wait three times as long before the next attempt.
    async fn with_retry<T, F, Fut>(&self, what: &str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        // Elapsed-time cap sized so the doubling schedule yields at most
        // max_retries re-attempts (base * (2^n - 1)).
        let budget = self.retry_base_delay * (2u32.pow(self.max_retries) - 1);
        let policy = ExponentialBackoff {
            initial_interval: self.retry_base_delay,
            multiplier: 2.0,
            randomization_factor: 0.0,
            max_interval: self.retry_base_delay * 2u32.pow(self.max_retries),
            max_elapsed_time: Some(budget),
            ..Default::default()
        };

        let what = what.to_string();
        retry(policy, || async {
            match op().await {
                Ok(v) => Ok(v),
                Err(e @ Error::ProviderRateLimited { .. }) => {
                    let wait = self.retry_base_delay * 3;
                    warn!("{} rate limited, retrying after {:?}", what, wait);
                    Err(backoff::Error::retry_after(e, wait))
                }
                Err(e) if e.is_retryable() => {
                    warn!("{} transient failure: {}", what, e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    /// Map an HTTP response into our error kinds, returning the body text on
    /// success.
    async fn read_body(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(6);
            return Err(Error::ProviderRateLimited { retry_after_secs });
        }
        if status.is_server_error() {
            return Err(Error::ProviderUnavailable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderMalformed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }
        response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::ProviderTimeout(self.timeout.as_millis() as u64)
            } else {
                Error::ProviderUnavailable(e.to_string())
            }
        })
    }

    async fn signatures_once(
        &self,
        address: &str,
        before: Option<&str>,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>> {
        self.rpc_pacer.wait().await;

        let mut options = serde_json::json!({ "limit": limit });
        if let Some(before) = before {
            options["before"] = serde_json::json!(before);
        }
        if let Some(until) = until {
            options["until"] = serde_json::json!(until);
        }
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "walletscope-signatures",
            "method": "getSignaturesForAddress",
            "params": [address, options]
        });

        debug!(address = %address, ?before, ?until, limit, "Fetching signatures");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ProviderTimeout(self.timeout.as_millis() as u64)
                } else {
                    Error::ProviderUnavailable(format!("RPC request failed: {}", e))
                }
            })?;

        let body = self.read_body(response).await?;
        let rpc_response: RpcResponse<Vec<SignatureInfo>> = serde_json::from_str(&body)
            .map_err(|e| Error::ProviderMalformed(format!("signature response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            // -32429 is Helius' JSON-RPC surface for rate limiting
            if error.code == -32429 || error.message.to_lowercase().contains("rate") {
                return Err(Error::ProviderRateLimited { retry_after_secs: 6 });
            }
            return Err(Error::ProviderUnavailable(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        Ok(rpc_response.result.unwrap_or_default())
    }

    async fn enhanced_once(&self, signatures: &[String]) -> Result<Vec<EnhancedTransaction>> {
        self.enhanced_pacer.wait().await;

        let url = format!(
            "{}/v0/transactions?api-key={}",
            self.rest_base_url, self.api_key
        );
        let request = serde_json::json!({ "transactions": signatures });

        debug!(count = signatures.len(), "Fetching enhanced transactions");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ProviderTimeout(self.timeout.as_millis() as u64)
                } else {
                    Error::ProviderUnavailable(format!("Enhanced request failed: {}", e))
                }
            })?;

        let body = self.read_body(response).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::ProviderMalformed(format!("enhanced response: {}", e)))
    }
}

#[async_trait]
impl TransactionProvider for HeliusClient {
    async fn signatures(
        &self,
        address: &str,
        before: Option<&str>,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>> {
        self.with_retry("signatures", || {
            self.signatures_once(address, before, until, limit)
        })
        .await
    }

    async fn enhanced(&self, signatures: &[String]) -> Result<Vec<EnhancedTransaction>> {
        if signatures.len() > 100 {
            return Err(Error::Internal(format!(
                "enhanced batch of {} exceeds provider limit of 100",
                signatures.len()
            )));
        }
        self.with_retry("enhanced", || self.enhanced_once(signatures))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}
