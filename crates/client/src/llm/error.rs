use thiserror::Error;

/// Failures of a generative model call. None of these is ever an empty success.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing API key or unusable client settings.
    #[error("model configuration error: {0}")]
    Config(String),

    /// Connection failure or timeout.
    #[error("model network error: {0}")]
    Network(String),

    /// Non-2xx response from the endpoint.
    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The answer did not decode into the requested shape.
    #[error("model response parse error: {0}")]
    Parse(String),

    /// No choices, or a blank message.
    #[error("model returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    /// Rate limiting and server-side failures are worth another attempt;
    /// a rejected key or malformed request is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Parse(_) | Self::EmptyResponse => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() { Self::Parse(err.to_string()) } else { Self::Network(err.to_string()) }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Network("reset".into()).is_transient());
        assert!(LlmError::EmptyResponse.is_transient());
        assert!(LlmError::Api { status: 429, message: "slow down".into() }.is_transient());
        assert!(LlmError::Api { status: 503, message: "overloaded".into() }.is_transient());
        assert!(!LlmError::Api { status: 401, message: "bad key".into() }.is_transient());
        assert!(!LlmError::Config("no key".into()).is_transient());
    }

    #[test]
    fn test_display_names_status() {
        let err = LlmError::Api { status: 500, message: "boom".into() };
        assert_eq!(err.to_string(), "model API error (500): boom");
    }
}
