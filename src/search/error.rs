//! Error types for the search module.

use thiserror::Error;

/// Transient failures from the search transport.
///
/// Quota exhaustion is not an error: it travels as a distinct
/// [`PageResult`](super::PageResult) variant because the driver recovers
/// from it by rotating credentials. Everything here aborts the current
/// unit's fetch early; the unit stays incomplete and is retried on the
/// next run.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error searching \"{query}\": {source}")]
    Network {
        /// The query being searched.
        query: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout searching \"{query}\"")]
    Timeout {
        /// The query that timed out.
        query: String,
    },

    /// Non-quota HTTP error response.
    #[error("HTTP {status} searching \"{query}\"")]
    HttpStatus {
        /// The query being searched.
        query: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be parsed.
    #[error("failed to parse search response for \"{query}\": {source}")]
    Parse {
        /// The query being searched.
        query: String,
        /// The underlying parse error.
        #[source]
        source: reqwest::Error,
    },
}

impl SearchError {
    /// Creates a network error from a reqwest error.
    pub fn network(query: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            query: query.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(query: impl Into<String>) -> Self {
        Self::Timeout {
            query: query.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(query: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            query: query.into(),
            status,
        }
    }

    /// Creates a parse error.
    pub fn parse(query: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Parse {
            query: query.into(),
            source,
        }
    }
}
