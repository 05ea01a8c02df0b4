use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

use super::ScraperConfig;

/// Failure of a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Status(StatusCode),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// HTTP GET with a fixed number of attempts and a fixed backoff.
#[derive(Clone)]
pub struct RateFetcher {
    client: Client,
    config: ScraperConfig,
}

impl RateFetcher {
    pub fn new(config: ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Fetch the page body, or `None` once every attempt has failed.
    ///
    /// `None` is a normal outcome for callers: the run simply has no data.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        let attempts = self.config.retry_max.max(1);
        let delay = Duration::from_millis(self.config.retry_delay_ms);

        for attempt in 1..=attempts {
            tracing::debug!("Fetch attempt {}/{}: {}", attempt, attempts, url);

            match self.fetch_once(url).await {
                Ok(body) => {
                    tracing::info!(bytes = body.len(), attempt, "Fetched rates page");
                    return Some(body);
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Fetch failed ({}/{}): {}. Retrying in {:?}",
                        attempt,
                        attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!(url = %url, attempts, error = %e, "Giving up on rates page fetch");
                }
            }
        }

        None
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.text().await?)
    }
}
