//! SQLite-backed job store.
//!
//! Persists companies, their extracted jobs (unique by URL), validated
//! extraction schemas and per-run execution logs. Access is async via
//! tokio-rusqlite; the schema is versioned through embedded migrations.

pub mod companies;
pub mod connection;
pub mod jobs;
pub mod migrations;
pub mod schemas;

pub use crate::Error;

pub use companies::{Company, ExecutionLog};
pub use connection::JobStore;
pub use jobs::{BatchSummary, StaleSummary};
