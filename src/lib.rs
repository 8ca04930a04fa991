//! Harvester Core Library
//!
//! This library provides the core functionality for the harvester tool,
//! which performs bulk, resumable harvesting of images from a paginated
//! search API with content-addressed deduplication and crash-safe resume.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Run configuration and credential loading
//! - [`credentials`] - Credential pool with round-robin quota failover
//! - [`checkpoint`] - Durable checkpoint state and the dedup ledger
//! - [`search`] - Paginated search driver over a pluggable transport
//! - [`download`] - Image byte fetching, naming, and deduplicated storage
//! - [`orchestrator`] - The batch state machine tying the above together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checkpoint;
pub mod config;
pub mod credentials;
pub mod download;
pub mod orchestrator;
pub mod search;

// Re-export commonly used types
pub use checkpoint::{CheckpointError, CheckpointState, ContentLedger, HarvestStats, WorkUnit};
pub use config::{ConfigError, HarvestConfig, MAX_RESULTS_PER_QUERY, RESULTS_PER_PAGE};
pub use credentials::{Credential, CredentialPool};
pub use download::{DownloadError, ImageClient, ImageStore, SaveOutcome};
pub use orchestrator::{Orchestrator, RunOutcome, RunReport};
pub use search::{
    CustomSearchClient, FetchOutcome, FilterCombination, ImageItem, PageResult, SearchApi,
    SearchDriver, SearchError,
};
