//! Search transport: the `SearchApi` seam and its Custom Search implementation.
//!
//! One call fetches one result page. Quota exhaustion is part of the
//! result contract, not an error: the API reports it via HTTP 429 or an
//! HTTP 403 body whose error reason names a quota limit, and callers must
//! be able to react by rotating credentials and retrying the same page.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::error::SearchError;
use super::filters::FilterCombination;
use crate::config::{DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};
use crate::credentials::Credential;

/// One candidate image from a search result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageItem {
    /// Direct URL of the image bytes.
    pub url: String,
    /// Page the image was found on.
    pub source_page_url: String,
    /// Result title.
    pub title: String,
}

/// Outcome of one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResult {
    /// The page was fetched; may be empty, which signals end-of-results.
    Items(Vec<ImageItem>),
    /// The credential used for this request has exhausted its quota.
    QuotaExceeded,
}

/// Transport capability consumed by the search driver.
///
/// Implementations must distinguish quota exhaustion (a [`PageResult`]
/// variant) from transient failure (an `Err`), because the two have
/// different resume semantics.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Fetches one result page for `query` under `filters`.
    ///
    /// `start_index` is 1-based as the remote API counts results.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport or parse failure.
    async fn search_page(
        &self,
        query: &str,
        filters: &FilterCombination,
        start_index: usize,
        page_size: usize,
        credential: &Credential,
    ) -> Result<PageResult, SearchError>;
}

/// Error reasons the API uses to report quota exhaustion inside a 403 body.
const QUOTA_REASONS: &[&str] = &["dailyLimitExceeded", "userRateLimitExceeded", "quotaExceeded"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    link: Option<String>,
    #[serde(default)]
    title: String,
    image: Option<RawImage>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    #[serde(rename = "contextLink", default)]
    context_link: String,
}

/// Custom Search API client.
///
/// Designed to be created once and reused across page requests to take
/// advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct CustomSearchClient {
    client: Client,
    base_url: String,
}

impl Default for CustomSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomSearchClient {
    /// Creates a client against the production API endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom endpoint (used by tests).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .gzip(true)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SearchApi for CustomSearchClient {
    #[instrument(skip(self, credential), fields(query = %query, start = start_index))]
    async fn search_page(
        &self,
        query: &str,
        filters: &FilterCombination,
        start_index: usize,
        page_size: usize,
        credential: &Credential,
    ) -> Result<PageResult, SearchError> {
        let start = start_index.to_string();
        let num = page_size.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("key", credential.key.as_str()),
            ("cx", credential.cx.as_str()),
            ("q", query),
            ("searchType", "image"),
            ("start", start.as_str()),
            ("num", num.as_str()),
        ];
        if let Some(date) = filters.date_restrict {
            params.push(("dateRestrict", date.as_param()));
        }
        if let Some(size) = filters.image_size {
            params.push(("imgSize", size.as_param()));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::timeout(query)
                } else {
                    SearchError::network(query, e)
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            debug!("quota exceeded (429)");
            return Ok(PageResult::QuotaExceeded);
        }

        if status.as_u16() == 403 {
            // 403 carries quota exhaustion only when the body names a quota
            // reason; other 403s are transient from the driver's viewpoint.
            let body = response.text().await.unwrap_or_default();
            if is_quota_body(&body) {
                debug!("quota exceeded (403 body)");
                return Ok(PageResult::QuotaExceeded);
            }
            return Err(SearchError::http_status(query, 403));
        }

        if !status.is_success() {
            return Err(SearchError::http_status(query, status.as_u16()));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::parse(query, e))?;

        let items: Vec<ImageItem> = parsed
            .items
            .into_iter()
            .filter_map(|raw| {
                raw.link.map(|url| ImageItem {
                    url,
                    source_page_url: raw.image.map(|i| i.context_link).unwrap_or_default(),
                    title: raw.title,
                })
            })
            .collect();

        debug!(count = items.len(), "page fetched");
        Ok(PageResult::Items(items))
    }
}

/// Returns true when a 403 body names one of the quota error reasons.
fn is_quota_body(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    value["error"]["errors"]
        .as_array()
        .and_then(|errors| errors.first())
        .and_then(|first| first["reason"].as_str())
        .is_some_and(|reason| QUOTA_REASONS.contains(&reason))
}
