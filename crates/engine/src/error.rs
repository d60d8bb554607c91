//! Engine error types.
//!
//! [`AnalysisError`] is the only failure `analyze_job_board` reports. Its
//! display string always starts with the phase that failed.

use scout_client::{BraveError, BrowserError, UrlError};
use thiserror::Error;

/// Phase of an analysis run, used to label terminal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Navigation,
    Search,
    Inference,
    Validation,
    Browser,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Search => "search",
            Self::Inference => "inference",
            Self::Validation => "validation",
            Self::Browser => "browser",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("navigation: invalid seed url: {0}")]
    InvalidSeed(#[from] UrlError),

    /// The seed page could not be loaded, so navigation never started.
    #[error("navigation: {0}")]
    Navigation(String),

    /// Every attempt ended with a failed model call.
    #[error("inference: schema generation failed after {attempts} attempts: {last}")]
    Inference { attempts: u32, last: String },

    /// The attempt budget ran out with the last candidate rejected by validation.
    #[error("validation: validation failed after all retry attempts ({attempts}): {last}")]
    Validation { attempts: u32, last: String },

    #[error("browser: {0}")]
    Browser(#[from] BrowserError),

    #[error("configuration: {0}")]
    Config(String),
}

impl AnalysisError {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::InvalidSeed(_) | Self::Navigation(_) => Some(Phase::Navigation),
            Self::Inference { .. } => Some(Phase::Inference),
            Self::Validation { .. } => Some(Phase::Validation),
            Self::Browser(_) => Some(Phase::Browser),
            Self::Config(_) => None,
        }
    }
}

/// Failure of the extraction engine.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("browser: {0}")]
    Browser(#[from] BrowserError),

    /// The container selector does not parse; field selectors degrade to empty values instead.
    #[error("invalid container selector {selector:?}: {reason}")]
    ContainerSelector { selector: String, reason: String },

    #[error("invalid page url: {0}")]
    PageUrl(String),

    /// Exceeded the validation time budget.
    #[error("extraction timed out after {0}ms")]
    Timeout(u64),
}

/// Failure of URL discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("search: {0}")]
    Search(#[from] BraveError),

    #[error("company name cannot be empty")]
    EmptyCompany,
}

/// Failure of a production scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("store: {0}")]
    Store(#[from] scout_core::Error),

    #[error("extraction: {0}")]
    Extract(#[from] ExtractError),

    #[error("browser: {0}")]
    Browser(#[from] BrowserError),

    #[error("no extraction schema stored for {0}")]
    NoSchema(String),
}
