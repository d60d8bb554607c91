/// Failures of the Brave web search used for URL discovery.
#[derive(Debug, thiserror::Error)]
pub enum BraveError {
    #[error("missing Brave API key: set SCOUT_BRAVE_API_KEY")]
    MissingApiKey,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid count: must be 1-20")]
    InvalidCount,

    #[error("invalid offset: must be 0-9")]
    InvalidOffset,

    /// 401 or 403 from the API.
    #[error("Brave authentication failed")]
    Auth,

    #[error("Brave rate limit exceeded")]
    RateLimited,

    #[error("Brave HTTP error: {status}")]
    Http { status: u16 },

    #[error("Brave request timed out")]
    Timeout,

    #[error("Brave network error: {0}")]
    Network(String),

    #[error("Brave response parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BraveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout } else { Self::Network(err.to_string()) }
    }
}
