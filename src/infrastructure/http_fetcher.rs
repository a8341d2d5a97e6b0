//! Retrying catalog fetcher
//!
//! Performs the single GET against a merchant's catalog endpoint with a
//! bounded retry budget, and classifies terminal failures by origin: the
//! orchestrator's user-facing message depends on whether the merchant never
//! answered, answered with a non-2xx status, answered too slowly, or answered
//! with something that is not JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::{debug, info};

use crate::infrastructure::config::FetchConfig;
use crate::infrastructure::retry::{RetryPolicy, retry_with_backoff};

/// Terminal fetch failure, classified by origin.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("merchant endpoint returned HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },
    #[error("merchant endpoint unreachable: {reason}")]
    Unreachable { reason: String },
    #[error("no response within {timeout_secs}s from {url}")]
    Timeout { timeout_secs: u64, url: String },
    #[error("malformed catalog response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Seam between the orchestrator and the network. The production
/// implementation is [`HttpCatalogFetcher`]; tests supply scripted sources.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches and JSON-decodes a merchant catalog, retrying transient
    /// failures internally before surfacing a classified terminal error.
    async fn fetch_catalog(&self, url: &str) -> Result<Value, FetchError>;
}

/// reqwest-backed catalog source with per-attempt timeout and bounded
/// exponential-backoff retries.
#[derive(Clone)]
pub struct HttpCatalogFetcher {
    client: Client,
    policy: RetryPolicy,
    timeout_secs: u64,
}

impl HttpCatalogFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(&config.user_agent)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            policy: RetryPolicy {
                max_attempts: config.max_retries,
                initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            },
            timeout_secs: config.request_timeout_seconds,
        })
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                timeout_secs: self.timeout_secs,
                url: url.to_string(),
            }
        } else if error.is_decode() || error.is_body() {
            FetchError::Malformed {
                url: url.to_string(),
                reason: error.to_string(),
            }
        } else {
            FetchError::Unreachable {
                reason: error.to_string(),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.classify(url, e))?;

        serde_json::from_str(&body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogFetcher {
    async fn fetch_catalog(&self, url: &str) -> Result<Value, FetchError> {
        let budget = self.policy.max_attempts.max(1);
        retry_with_backoff(&self.policy, "catalog fetch", |attempt| {
            info!("🌐 GET (attempt {}/{}): {}", attempt, budget, url);
            self.fetch_once(url)
        })
        .await
        .inspect(|_| debug!("catalog fetched from {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::FetchConfig;

    fn fast_config() -> FetchConfig {
        FetchConfig {
            max_retries: 2,
            retry_initial_delay_ms: 1,
            ..FetchConfig::default()
        }
    }

    #[test]
    fn fetcher_builds_from_config() {
        assert!(HttpCatalogFetcher::new(&FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn connection_refused_classifies_as_unreachable() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let fetcher = HttpCatalogFetcher::new(&fast_config()).unwrap();
        let err = fetcher
            .fetch_catalog(&format!("http://127.0.0.1:{port}/catalog.json"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Unreachable { .. }), "got {err:?}");
    }

    #[test]
    fn classified_errors_have_distinct_messages() {
        let status = FetchError::HttpStatus { status: 503, url: "http://m.example/c.json".into() };
        let timeout = FetchError::Timeout { timeout_secs: 30, url: "http://m.example/c.json".into() };
        let unreachable = FetchError::Unreachable { reason: "connection refused".into() };
        let malformed = FetchError::Malformed { url: "http://m.example/c.json".into(), reason: "expected value".into() };

        let messages = [
            status.to_string(),
            timeout.to_string(),
            unreachable.to_string(),
            malformed.to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            assert!(!a.is_empty());
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
