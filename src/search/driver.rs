//! Pages a work unit through the search transport, rotating credentials
//! on quota signals.

use tracing::{debug, info, warn};

use super::api::{ImageItem, PageResult, SearchApi};
use super::error::SearchError;
use super::filters::FilterCombination;
use crate::config::{HarvestConfig, MAX_RESULTS_PER_QUERY, RESULTS_PER_PAGE};
use crate::credentials::CredentialPool;

/// Outcome of resolving one work unit's candidate items.
///
/// The three variants have different resume semantics and the orchestrator
/// must treat them differently:
/// - `Complete` with an empty vec means the unit legitimately found
///   nothing and must be marked done, else it would be retried forever;
/// - `Partial` means the fetch failed mid-way and the unit must NOT be
///   marked done, so a later run retries it;
/// - `AllCredentialsExhausted` is a run-level hard pause, not a unit error.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Every available page was fetched successfully.
    Complete(Vec<ImageItem>),
    /// A transient failure aborted the fetch; `items` is what accumulated
    /// before the failure.
    Partial {
        /// Items fetched before the failure.
        items: Vec<ImageItem>,
        /// The failure that stopped paging.
        error: SearchError,
    },
    /// Every credential in the pool is quota exhausted.
    AllCredentialsExhausted,
}

/// Turns a (query, filters) work unit into a bounded sequence of result
/// pages over a [`SearchApi`] transport.
pub struct SearchDriver<'a> {
    api: &'a dyn SearchApi,
}

impl<'a> SearchDriver<'a> {
    /// Creates a driver over the given transport.
    #[must_use]
    pub fn new(api: &'a dyn SearchApi) -> Self {
        Self { api }
    }

    /// Fetches up to `target_count` items for one work unit.
    ///
    /// Pages with a fixed page size from start index 1, accumulating until
    /// the target is reached, the API returns an empty page (end of
    /// results), or the API's per-query result ceiling is hit. A quota
    /// signal rotates the pool and retries the *same* page with the new
    /// credential.
    pub async fn fetch_results(
        &self,
        pool: &mut CredentialPool,
        query: &str,
        filters: &FilterCombination,
        target_count: usize,
    ) -> FetchOutcome {
        let target = HarvestConfig::clamp_count(target_count);
        let mut items: Vec<ImageItem> = Vec::new();
        let mut start_index = 1;

        while items.len() < target {
            if !pool.has_available() {
                return FetchOutcome::AllCredentialsExhausted;
            }

            let page_size = RESULTS_PER_PAGE.min(target - items.len());
            let page = self
                .api
                .search_page(query, filters, start_index, page_size, pool.current())
                .await;

            match page {
                Ok(PageResult::QuotaExceeded) => {
                    warn!(
                        credential = pool.current_ordinal(),
                        "credential quota exceeded"
                    );
                    if pool.rotate_to_next() {
                        info!(
                            credential = pool.current_ordinal(),
                            "rotated to next credential"
                        );
                        // Retry the same page with the new credential.
                        continue;
                    }
                    return FetchOutcome::AllCredentialsExhausted;
                }
                Ok(PageResult::Items(page_items)) => {
                    if page_items.is_empty() {
                        // The API signals end-of-results with an empty page.
                        debug!(accumulated = items.len(), "empty page, stopping");
                        break;
                    }
                    items.extend(page_items);
                    start_index += RESULTS_PER_PAGE;
                    if start_index > MAX_RESULTS_PER_QUERY {
                        debug!("result ceiling reached");
                        break;
                    }
                }
                Err(error) => {
                    warn!(%error, accumulated = items.len(), "fetch aborted early");
                    return FetchOutcome::Partial { items, error };
                }
            }
        }

        FetchOutcome::Complete(items)
    }
}
