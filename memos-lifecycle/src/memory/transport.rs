//! HTTP transport for the memory service.
//!
//! [`MemosTransport::call`] is the one primitive every other operation goes
//! through: JSON POST, optional `X-Internal-Service` header, a hard deadline
//! per attempt and linear backoff between attempts.

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::{Credentials, MemosConfig};
use crate::errors::{MemosError, Result};

/// Header carrying the service secret.
pub const INTERNAL_SERVICE_HEADER: &str = "X-Internal-Service";

/// Endpoint paths of the memory service.
pub mod endpoints {
    /// Ranked search
    pub const SEARCH: &str = "/product/search";
    /// Memory creation
    pub const ADD: &str = "/product/add";
    /// Text completion
    pub const COMPLETE: &str = "/product/chat/complete";
}

/// Retrying JSON-over-HTTP transport.
#[derive(Debug)]
pub struct MemosTransport {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    request_timeout: Duration,
    backoff_step: Duration,
}

impl MemosTransport {
    /// Creates a transport from the client configuration.
    pub fn new(config: &MemosConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| MemosError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            credentials: config.credentials.clone(),
            request_timeout: config.request_timeout,
            backoff_step: config.backoff_step,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POSTs `body` to `endpoint`, retrying up to `retries` more times.
    ///
    /// Non-2xx statuses, timeouts, network errors and undecodable bodies are
    /// all retried. Before retry `n` the transport sleeps `backoff_step * n`.
    /// Once the budget is spent the last failure is returned wrapped in
    /// [`MemosError::CallFailed`].
    pub async fn call(&self, endpoint: &str, body: &Value, retries: u32) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        let started = Instant::now();
        let mut last_error = None;

        for attempt in 0..=retries {
            match self.attempt(&url, body).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            "{} succeeded after {} attempts ({:?})",
                            endpoint,
                            attempt + 1,
                            started.elapsed()
                        );
                    }
                    return Ok(value);
                },
                Err(err) => {
                    if attempt < retries {
                        let delay = self.backoff_step * (attempt + 1);
                        debug!(
                            "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                            endpoint,
                            attempt + 1,
                            retries + 1,
                            err,
                            delay
                        );
                        sleep(delay).await;
                    }
                    last_error = Some(err);
                },
            }
        }

        let last = last_error.unwrap_or(MemosError::Network("no attempt made".to_string()));
        warn!(
            "{} failed after {} attempts in {:?}: {}",
            endpoint,
            retries + 1,
            started.elapsed(),
            last
        );
        Err(MemosError::call_failed(endpoint, retries + 1, last))
    }

    async fn attempt(&self, url: &str, body: &Value) -> Result<Value> {
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);

        if let Some(secret) = self.credentials.secret() {
            request = request.header(INTERNAL_SERVICE_HEADER, secret);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(MemosError::HttpStatus {
                    status: status.as_u16(),
                });
            }
            let bytes = response.bytes().await?;
            serde_json::from_slice::<Value>(&bytes)
                .map_err(|e| MemosError::InvalidResponse(e.to_string()))
        };

        match timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(MemosError::Timeout {
                millis: self.request_timeout.as_millis() as u64,
            }),
        }
    }
}
