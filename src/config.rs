//! Run configuration: API constants, credential loading, and query files.
//!
//! Configuration is resolved once at process start into an explicit
//! [`HarvestConfig`] value that is passed into the orchestrator and its
//! collaborators. Core logic never reads the environment directly.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::credentials::Credential;

/// Base URL of the Custom Search API.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Results returned per search page (API page size).
pub const RESULTS_PER_PAGE: usize = 10;

/// Hard API ceiling on results per query; start indices beyond this are rejected.
pub const MAX_RESULTS_PER_QUERY: usize = 100;

/// Default per-request timeout for search and download calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors raised while resolving configuration.
///
/// All of these fail the run before any checkpoint state is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No credential pairs were found in the environment.
    #[error(
        "no API credentials found: set API_KEY_1 and CX_1 (or API_KEY and CX) in the environment"
    )]
    NoCredentials,

    /// The queries file could not be read.
    #[error("failed to read queries file {path}: {source}")]
    QueriesFile {
        /// Path that failed to load.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The queries file contained no usable queries.
    #[error("no queries found in {path}")]
    EmptyQueries {
        /// Path of the empty file.
        path: PathBuf,
    },
}

/// Resolved configuration bundle consumed by the orchestrator.
///
/// Built once in the binary from CLI arguments and environment credentials,
/// then passed by value; there are no ambient lookups past this point.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Search queries, in file order.
    pub queries: Vec<String>,
    /// Path the queries were loaded from (recorded in the checkpoint).
    pub queries_file: PathBuf,
    /// Target images per work unit (clamped to [`MAX_RESULTS_PER_QUERY`]).
    pub target_count: usize,
    /// Directory image files are written to.
    pub output_dir: PathBuf,
    /// Filename prefix for saved images.
    pub prefix: String,
    /// Whether date-window filter combinations are generated.
    pub use_date_filters: bool,
    /// Whether image-size filter combinations are generated.
    pub use_size_filters: bool,
    /// Path of the durable checkpoint file.
    pub progress_file: PathBuf,
}

impl HarvestConfig {
    /// Clamps a requested per-unit count to the API's valid range.
    #[must_use]
    pub fn clamp_count(count: usize) -> usize {
        count.clamp(1, MAX_RESULTS_PER_QUERY)
    }
}

/// Loads credential pairs from the environment.
///
/// Looks for `API_KEY_1`/`CX_1`, `API_KEY_2`/`CX_2`, ... in order, stopping
/// at the first gap. Falls back to the unnumbered `API_KEY`/`CX` pair when
/// no numbered pairs exist.
///
/// # Errors
///
/// Returns [`ConfigError::NoCredentials`] when neither form is present.
pub fn load_credentials() -> Result<Vec<Credential>, ConfigError> {
    let mut credentials = Vec::new();

    let mut index = 1;
    loop {
        let key = std::env::var(format!("API_KEY_{index}")).ok();
        let cx = std::env::var(format!("CX_{index}")).ok();
        match (key, cx) {
            (Some(key), Some(cx)) if !key.is_empty() && !cx.is_empty() => {
                credentials.push(Credential::new(key, cx));
                index += 1;
            }
            _ => break,
        }
    }

    if credentials.is_empty()
        && let (Ok(key), Ok(cx)) = (std::env::var("API_KEY"), std::env::var("CX"))
        && !key.is_empty()
        && !cx.is_empty()
    {
        credentials.push(Credential::new(key, cx));
    }

    if credentials.is_empty() {
        return Err(ConfigError::NoCredentials);
    }

    Ok(credentials)
}

/// Reads search queries from a text file, one per line.
///
/// Blank lines and lines starting with `#` are skipped.
///
/// # Errors
///
/// Returns [`ConfigError::QueriesFile`] when the file cannot be read and
/// [`ConfigError::EmptyQueries`] when it yields no queries.
pub fn read_queries(path: &Path) -> Result<Vec<String>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::QueriesFile {
        path: path.to_path_buf(),
        source,
    })?;

    let queries: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect();

    if queries.is_empty() {
        return Err(ConfigError::EmptyQueries {
            path: path.to_path_buf(),
        });
    }

    Ok(queries)
}
