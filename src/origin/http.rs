use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Url};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::payload;
use super::retry::RetryPolicy;
use super::{CatalogOrigin, FetchError};
use crate::config::OriginConfig;
use crate::core::entry::CatalogEntry;

/// Catalog origin reached over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: Client,
    url: Url,
    retry: RetryPolicy,
    max_in_memory_size: usize,
}

impl HttpOrigin {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidTarget` if the configured scheme, host and
    /// path do not form a valid URL, or `FetchError::Transport` if the HTTP
    /// client cannot be initialized.
    pub fn new(config: &OriginConfig) -> Result<Self, FetchError> {
        let target = config.url();
        let url = Url::parse(&target).map_err(|e| FetchError::InvalidTarget {
            target: target.clone(),
            message: e.to_string(),
        })?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.response_timeout())
            .build()
            .map_err(|e| FetchError::Transport {
                target: target.clone(),
                message: e.to_string(),
            })?;

        debug!("Constructed origin URI: {url}");

        Ok(Self {
            client,
            url,
            retry: RetryPolicy::from_config(config),
            max_in_memory_size: config.max_in_memory_size,
        })
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn target(&self) -> &str {
        self.url.as_str()
    }

    fn transport_error(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                target: self.target().to_string(),
            }
        } else {
            FetchError::Transport {
                target: self.target().to_string(),
                message: err.to_string(),
            }
        }
    }

    fn too_large(&self) -> FetchError {
        FetchError::PayloadTooLarge {
            target: self.target().to_string(),
            limit: self.max_in_memory_size,
        }
    }

    /// One request, no retries
    async fn fetch_once(&self) -> Result<Vec<CatalogEntry>, FetchError> {
        let mut response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                target: self.target().to_string(),
                status: status.as_u16(),
            });
        }

        // Refuse early when the server announces an oversized body
        if let Some(length) = response.content_length() {
            if usize::try_from(length).map_or(true, |l| l > self.max_in_memory_size) {
                return Err(self.too_large());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.transport_error(&e))?
        {
            if body.len() + chunk.len() > self.max_in_memory_size {
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }

        payload::decode(&body).map_err(|e| FetchError::Decode {
            target: self.target().to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl CatalogOrigin for HttpOrigin {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, FetchError> {
        info!("Fetching catalog from {}", self.url);
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.fetch_once().await {
                Ok(entries) => {
                    info!(
                        "Fetched {} catalog entries in {} ms",
                        entries.len(),
                        started.elapsed().as_millis()
                    );
                    return Ok(entries);
                }
                Err(err) if err.is_retryable() && attempt <= self.retry.attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Starting retry attempt {} of {} in {:?} due to: {}",
                        attempt, self.retry.attempts, delay, err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    let err = if err.is_retryable() {
                        FetchError::Exhausted {
                            target: self.target().to_string(),
                            attempts: attempt,
                            last: Box::new(err),
                        }
                    } else {
                        err
                    };
                    error!("Error fetching catalog: {err}");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_builds_target_from_parts() {
        let config = OriginConfig {
            scheme: "http".to_string(),
            host: "127.0.0.1:9000".to_string(),
            path: "/apps".to_string(),
            ..OriginConfig::default()
        };
        let origin = HttpOrigin::new(&config).unwrap();
        assert_eq!(origin.target(), "http://127.0.0.1:9000/apps");
    }

    #[test]
    fn test_new_rejects_invalid_host() {
        let config = OriginConfig {
            host: "bad host".to_string(),
            ..OriginConfig::default()
        };
        let err = HttpOrigin::new(&config).unwrap_err();
        assert!(matches!(err, FetchError::InvalidTarget { .. }));
    }
}
