//! Core types and shared functionality for intern-scout.
//!
//! This crate provides:
//! - The extraction schema and job record model
//! - Unified error types
//! - Layered configuration and the shared retry policy
//! - The SQLite job store

pub mod config;
pub mod error;
pub mod hash;
pub mod model;
pub mod retry;
pub mod store;

pub use config::{ConfigError, ScoutConfig};
pub use error::Error;
pub use model::{ExtractionSchema, JobRecord, SearchInteraction, SelectorSet, ValidationFeedback};
pub use retry::RetryPolicy;
pub use store::JobStore;
