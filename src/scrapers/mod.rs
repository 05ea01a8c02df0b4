pub mod extractor;
pub mod fetcher;
pub mod rules;

/// Browser-like identification; the upstream rejects clients without one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_SOURCE_URL: &str = "https://myfin.by/currency/minsk";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub source_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub retry_max: u32,
    /// Fixed delay between attempts, no growth and no jitter
    pub retry_delay_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 15,
            retry_max: 3,
            retry_delay_ms: 2000,
        }
    }
}
