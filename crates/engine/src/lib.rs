//! Analysis engine for intern-scout.
//!
//! This crate drives the client collaborators through a full analysis:
//! - Listing page navigation with rejection memory and re-search
//! - Search interaction detection and verification
//! - Schema inference, validation and the bounded retry loop
//! - Paginated extraction and production scrape runs
//! - Job board discovery over web search

pub mod analyzer;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod infer;
pub mod navigate;
pub mod prompts;
pub mod search;
pub mod session;
pub mod validate;

#[cfg(test)]
mod testing;

pub use analyzer::{Analyzer, ScrapeSummary};
pub use discovery::Discovery;
pub use error::{AnalysisError, DiscoveryError, ExtractError, Phase, ScrapeError};
pub use extract::{ExtractOptions, Extraction, SelectorTest, StopReason};
pub use navigate::{NavigationOptions, NavigationOutcome, Navigator, Rejection};
pub use session::{AnalysisSession, SessionPage};
pub use validate::{ValidationReport, ValidationVerdict};
