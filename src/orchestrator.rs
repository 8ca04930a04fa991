//! Batch orchestrator: the state machine over work units.
//!
//! One run is one row-major pass over `queries × filter_combinations`
//! (query outer, filter inner). Units already in the checkpoint's
//! completed set are skipped without a fetch; every other unit is fetched,
//! downloaded, and committed to the checkpoint transactionally — the
//! checkpoint is flushed after every unit, so the crash window is at most
//! one in-flight unit.
//!
//! Processing is strictly sequential: one unit, one fetch, one download at
//! a time. The remote API is the bottleneck and rate-limited, so
//! concurrency would only complicate quota-rotation reasoning.

use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, instrument, warn};

use crate::checkpoint::{CheckpointError, CheckpointState, HarvestStats, WorkUnit};
use crate::config::HarvestConfig;
use crate::credentials::CredentialPool;
use crate::download::{DownloadError, ImageClient, ImageStore, SaveOutcome};
use crate::search::{FetchOutcome, FilterCombination, ImageItem, SearchApi, SearchDriver};

/// Terminal condition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every work unit was processed; the checkpoint is marked completed
    /// and the next invocation starts a fresh session.
    Completed,
    /// Every credential ran out of quota mid-run. Resumable later.
    PausedExhausted,
    /// An interrupt signal arrived; state was saved mid-pass. Resumable.
    Interrupted,
}

/// Summary reported to the operator at every terminal condition.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Cumulative statistics (across resumes of the same checkpoint).
    pub stats: HarvestStats,
    /// Work units completed so far.
    pub completed_units: usize,
    /// Total work units in this run's plan.
    pub total_units: usize,
    /// Units that completed with zero results.
    pub no_result_units: usize,
    /// 1-based ordinal of the credential in use at the end.
    pub credential_ordinal: usize,
    /// Pool size.
    pub credentials_total: usize,
    /// Credentials marked quota exhausted.
    pub credentials_exhausted: usize,
}

impl RunReport {
    /// Units still to process. Nonzero after a completed pass means some
    /// units failed transiently and will be retried by the next run.
    #[must_use]
    pub fn remaining_units(&self) -> usize {
        self.total_units - self.completed_units
    }
}

/// Iterates the work-unit plan, driving search, download, and checkpoint.
pub struct Orchestrator<'a> {
    config: &'a HarvestConfig,
    api: &'a dyn SearchApi,
    client: &'a ImageClient,
    store: ImageStore,
    show_progress: bool,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator, preparing the image output directory.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] when the output directory cannot be
    /// created.
    pub fn new(
        config: &'a HarvestConfig,
        api: &'a dyn SearchApi,
        client: &'a ImageClient,
    ) -> Result<Self, DownloadError> {
        let store = ImageStore::new(&config.output_dir, config.prefix.clone())?;
        Ok(Self {
            config,
            api,
            client,
            store,
            show_progress: true,
        })
    }

    /// Disables the per-unit progress bar (used by tests and quiet mode).
    #[must_use]
    pub fn without_progress_bar(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Runs one pass over all work units.
    ///
    /// `cancel` is the cooperative interruption flag: it is checked between
    /// units and between items, and when set the current state is saved and
    /// the run ends as [`RunOutcome::Interrupted`]. Partially processed
    /// units are not marked done and will be retried by a later run.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] when the checkpoint cannot be persisted;
    /// this is the only hard failure, since without durability the resume
    /// guarantees are void.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        checkpoint: &mut CheckpointState,
        pool: &mut CredentialPool,
        cancel: &AtomicBool,
    ) -> Result<RunReport, CheckpointError> {
        let filter_combinations =
            FilterCombination::generate(self.config.use_date_filters, self.config.use_size_filters);
        let total_units = self.config.queries.len() * filter_combinations.len();
        checkpoint.set_session_info(
            &self.config.queries_file,
            self.config.queries.len(),
            total_units,
        );

        let driver = SearchDriver::new(self.api);
        let mut outcome = RunOutcome::Completed;

        'queries: for (query_index, query) in self.config.queries.iter().enumerate() {
            for (filter_index, filters) in filter_combinations.iter().enumerate() {
                let unit = WorkUnit::new(query_index, filter_index);

                if cancel.load(Ordering::SeqCst) {
                    info!("interrupt received, saving checkpoint");
                    outcome = RunOutcome::Interrupted;
                    break 'queries;
                }

                if checkpoint.is_unit_done(unit) {
                    debug!(
                        query_index,
                        filter_index, "skipping already-completed unit"
                    );
                    continue;
                }

                checkpoint.record_position(unit);
                info!(
                    query = %query,
                    filters = %filters.describe(),
                    credential = pool.current_ordinal(),
                    "processing unit"
                );

                match driver
                    .fetch_results(pool, query, filters, self.config.target_count)
                    .await
                {
                    FetchOutcome::AllCredentialsExhausted => {
                        warn!("all credentials exhausted, pausing run");
                        outcome = RunOutcome::PausedExhausted;
                        break 'queries;
                    }
                    FetchOutcome::Partial { items, error } => {
                        // Unit stays incomplete and is retried wholesale on
                        // the next run; accumulated items are discarded.
                        warn!(
                            %error,
                            discarded = items.len(),
                            "unit fetch failed, will retry on next run"
                        );
                        checkpoint.increment_errors();
                        checkpoint.save()?;
                    }
                    FetchOutcome::Complete(items) if items.is_empty() => {
                        info!("no results for this combination");
                        checkpoint.add_no_result(unit, query, &filters.describe());
                        checkpoint.mark_unit_done(unit);
                        checkpoint.save()?;
                    }
                    FetchOutcome::Complete(items) => {
                        info!(found = items.len(), "downloading items");
                        let interrupted = self.process_items(&items, checkpoint, cancel).await;
                        if interrupted {
                            info!("interrupt received mid-unit, saving checkpoint");
                            outcome = RunOutcome::Interrupted;
                            break 'queries;
                        }
                        checkpoint.mark_unit_done(unit);
                        checkpoint.save()?;
                    }
                }
            }
        }

        // A pass that left units incomplete (transient fetch failures) must
        // stay resumable so those units are retried; only a fully covered
        // plan finishes the session.
        match outcome {
            RunOutcome::Completed if checkpoint.completed_count() == total_units => {
                checkpoint.mark_session_finished()?;
            }
            _ => checkpoint.save()?,
        }

        Ok(build_report(outcome, checkpoint, pool, total_units))
    }

    /// Downloads and stores one unit's items.
    ///
    /// Per-item failures increment the error stat and never abort the
    /// unit. Returns true when the cancel flag interrupted the loop; the
    /// caller must then leave the unit unmarked.
    async fn process_items(
        &self,
        items: &[ImageItem],
        checkpoint: &mut CheckpointState,
        cancel: &AtomicBool,
    ) -> bool {
        let bar = if self.show_progress {
            let bar = ProgressBar::new(items.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("  {bar:40} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        for item in items {
            if cancel.load(Ordering::SeqCst) {
                bar.finish_and_clear();
                return true;
            }

            match self.client.fetch_bytes(&item.url).await {
                Ok(image) => {
                    let saved = self
                        .store
                        .save(
                            &image.bytes,
                            &item.url,
                            image.content_type.as_deref(),
                            checkpoint.ledger_mut(),
                        )
                        .await;
                    match saved {
                        Ok(SaveOutcome::Saved(filename)) => {
                            checkpoint.increment_saved();
                            debug!(%filename, "saved");
                        }
                        Ok(SaveOutcome::Duplicate) => {
                            checkpoint.increment_duplicates();
                        }
                        Err(error) => {
                            warn!(url = %item.url, %error, "failed to persist image");
                            checkpoint.increment_errors();
                        }
                    }
                }
                Err(error) => {
                    debug!(url = %item.url, %error, "item download failed");
                    checkpoint.increment_errors();
                }
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        false
    }
}

fn build_report(
    outcome: RunOutcome,
    checkpoint: &CheckpointState,
    pool: &CredentialPool,
    total_units: usize,
) -> RunReport {
    RunReport {
        outcome,
        stats: checkpoint.stats(),
        completed_units: checkpoint.completed_count(),
        total_units,
        no_result_units: checkpoint.no_results().len(),
        credential_ordinal: pool.current_ordinal(),
        credentials_total: pool.len(),
        credentials_exhausted: pool.exhausted_count(),
    }
}
