//! Paginated image search over a pluggable transport.
//!
//! The transport seam is the [`SearchApi`] trait: one call fetches one page
//! and reports quota exhaustion distinctly from transient failure. The
//! [`SearchDriver`] pages through a work unit on top of that, rotating
//! credentials on quota signals and classifying the outcome as complete,
//! partial, or pool-exhausted so the orchestrator can resume correctly.

mod api;
mod driver;
mod error;
mod filters;

pub use api::{CustomSearchClient, ImageItem, PageResult, SearchApi};
pub use driver::{FetchOutcome, SearchDriver};
pub use error::SearchError;
pub use filters::{DateRestrict, FilterCombination, ImageSize};
