//! Brave Search API client.
//!
//! Used only as a source of seed and replacement URLs for navigation.
//!
//! - **Endpoint**: `https://api.search.brave.com/res/v1/web/search`
//! - **Authentication**: `X-Subscription-Token` header.
//! - **Rate limiting**: at most one request per second per client.

pub mod error;
pub mod request;
pub mod response;

pub use error::BraveError;
pub use request::{SafeSearch, SearchRequest};
pub use response::SearchResult;

use std::sync::Arc;
use std::time::{Duration, Instant};

use scout_core::ScoutConfig;
use tokio::sync::Mutex;

const DEFAULT_BASE_URL: &str = "https://api.search.brave.com/res/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Ranked web search used for URL discovery.
#[async_trait::async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchResult>, BraveError>;
}

#[derive(Debug, Clone)]
pub struct BraveConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub min_interval: Duration,
}

impl BraveConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            min_interval: MIN_REQUEST_INTERVAL,
        }
    }

    /// # Errors
    ///
    /// Returns `BraveError::MissingApiKey` if `brave_api_key` is unset.
    pub fn from_config(config: &ScoutConfig) -> Result<Self, BraveError> {
        config.require_brave_api_key().map(Self::new).map_err(|_| BraveError::MissingApiKey)
    }
}

/// Serializes requests so consecutive calls are at least `min_interval` apart.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Clone)]
pub struct BraveClient {
    http: reqwest::Client,
    config: BraveConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl BraveClient {
    /// # Errors
    ///
    /// Returns `BraveError::MissingApiKey` for a blank key, or
    /// `BraveError::Network` if the HTTP client cannot be built.
    pub fn new(config: BraveConfig) -> Result<Self, BraveError> {
        if config.api_key.trim().is_empty() {
            return Err(BraveError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BraveError::Network(e.to_string()))?;

        let rate_limiter = Arc::new(RateLimiter::new(config.min_interval));
        Ok(Self { http, config, rate_limiter })
    }

    /// # Errors
    ///
    /// See [`BraveConfig::from_config`] and [`BraveClient::new`].
    pub fn from_config(config: &ScoutConfig) -> Result<Self, BraveError> {
        Self::new(BraveConfig::from_config(config)?)
    }
}

#[async_trait::async_trait]
impl WebSearch for BraveClient {
    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchResult>, BraveError> {
        request.validate()?;
        self.rate_limiter.acquire().await;

        let start = Instant::now();
        let response = self
            .http
            .get(format!("{}/web/search", self.config.base_url))
            .header("X-Subscription-Token", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&request)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            401 | 403 => return Err(BraveError::Auth),
            429 => return Err(BraveError::RateLimited),
            _ if !status.is_success() => return Err(BraveError::Http { status: status.as_u16() }),
            _ => {}
        }

        let bytes = response.bytes().await?;
        let raw: response::BraveApiResponse =
            serde_json::from_slice(&bytes).map_err(|e| BraveError::Parse(e.to_string()))?;
        let results = raw.into_results();

        tracing::debug!(
            query = %request.q,
            results = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "brave search completed"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BraveClient {
        let config = BraveConfig { base_url: server.uri(), min_interval: Duration::ZERO, ..BraveConfig::new("tok") };
        BraveClient::new(config).unwrap()
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(matches!(BraveClient::new(BraveConfig::new(" ")), Err(BraveError::MissingApiKey)));
        assert!(matches!(BraveClient::from_config(&ScoutConfig::default()), Err(BraveError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_search_sends_token_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/web/search"))
            .and(header("X-Subscription-Token", "tok"))
            .and(query_param("q", "Acme careers"))
            .and(query_param("count", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"web": {"results": [{"title": "Careers", "url": "https://acme.test/careers", "description": "d"}]}}"#,
            ))
            .mount(&server)
            .await;

        let results = client(&server).search(SearchRequest::new("Acme careers")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Careers");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "auth"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "limited"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "broken"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(matches!(client.search(SearchRequest::new("auth")).await, Err(BraveError::Auth)));
        assert!(matches!(client.search(SearchRequest::new("limited")).await, Err(BraveError::RateLimited)));
        assert!(matches!(client.search(SearchRequest::new("broken")).await, Err(BraveError::Http { status: 502 })));
    }

    #[tokio::test]
    async fn test_invalid_request_never_sent() {
        let server = MockServer::start().await;
        let result = client(&server).search(SearchRequest::new("")).await;
        assert!(matches!(result, Err(BraveError::InvalidQuery(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
