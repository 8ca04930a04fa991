//! Checkpoint state: the unit of durability for a harvest run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::ledger::ContentLedger;

/// Errors raised while persisting or restoring the checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// File system error reading or writing the checkpoint file.
    #[error("IO error on checkpoint {path}: {source}")]
    Io {
        /// The checkpoint path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The in-memory state could not be serialized.
    #[error("failed to serialize checkpoint: {source}")]
    Serialize {
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl CheckpointError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// One (query, filter-combination) pair, the unit of completion tracking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WorkUnit {
    /// Index into the run's ordered query list.
    pub query_index: usize,
    /// Index into the run's ordered filter-combination list.
    pub filter_index: usize,
}

impl WorkUnit {
    /// Creates a work unit identifier.
    #[must_use]
    pub fn new(query_index: usize, filter_index: usize) -> Self {
        Self {
            query_index,
            filter_index,
        }
    }
}

/// Lifecycle status of a harvest session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session has unfinished work units and is resumable.
    InProgress,
    /// Session processed every work unit; the next run starts fresh.
    Completed,
}

/// Monotonic run statistics, persisted across resumes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HarvestStats {
    /// Images written to disk.
    pub images_saved: u64,
    /// Downloads rejected by the dedup ledger.
    pub duplicates_skipped: u64,
    /// Search and download failures.
    pub errors: u64,
}

/// Report entry for a unit that completed with zero results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoResultEntry {
    /// The unit that found nothing.
    #[serde(flatten)]
    pub unit: WorkUnit,
    /// Query text, for operator reporting.
    pub query: String,
    /// Human-readable filter description.
    pub filters: String,
}

/// On-disk shape of the checkpoint. Kept separate from the runtime state so
/// the file schema stays stable while the runtime uses set types.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    status: SessionStatus,
    started_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    queries_file: Option<String>,
    total_queries: usize,
    total_combinations: usize,
    current_position: WorkUnit,
    completed: Vec<WorkUnit>,
    stats: HarvestStats,
    #[serde(default)]
    no_results: Vec<NoResultEntry>,
    #[serde(flatten)]
    ledger: ContentLedger,
}

/// Durable record of work-unit completion, position, statistics, and the
/// dedup ledger.
///
/// Created empty at process start; [`CheckpointState::load`] restores a
/// prior incomplete session when one exists. Mutated after every work unit
/// and every downloaded item, and flushed wholesale with
/// [`CheckpointState::save`] after every unit, so the crash window is at
/// most one in-flight unit.
#[derive(Debug)]
pub struct CheckpointState {
    path: PathBuf,
    status: SessionStatus,
    started_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    queries_file: Option<String>,
    total_queries: usize,
    total_combinations: usize,
    position: WorkUnit,
    completed: HashSet<WorkUnit>,
    stats: HarvestStats,
    no_results: Vec<NoResultEntry>,
    ledger: ContentLedger,
}

impl CheckpointState {
    /// Creates an empty checkpoint bound to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            status: SessionStatus::InProgress,
            started_at: None,
            updated_at: None,
            queries_file: None,
            total_queries: 0,
            total_combinations: 0,
            position: WorkUnit::new(0, 0),
            completed: HashSet::new(),
            stats: HarvestStats::default(),
            no_results: Vec::new(),
            ledger: ContentLedger::new(),
        }
    }

    /// Restores a prior incomplete session from the checkpoint file.
    ///
    /// Returns true iff a resumable session was found. A missing file, an
    /// unparseable file, or a file whose status is `completed` all start a
    /// fresh session and return false; a completed checkpoint is never
    /// resumed.
    pub fn load(&mut self) -> bool {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), %error, "checkpoint unreadable, starting fresh");
                }
                self.started_at = Some(Utc::now());
                return false;
            }
        };

        let file: CheckpointFile = match serde_json::from_str(&contents) {
            Ok(file) => file,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "checkpoint corrupt, starting fresh");
                self.started_at = Some(Utc::now());
                return false;
            }
        };

        if file.status == SessionStatus::Completed {
            info!(path = %self.path.display(), "previous session completed, starting fresh");
            self.started_at = Some(Utc::now());
            return false;
        }

        self.status = file.status;
        self.started_at = file.started_at;
        self.updated_at = file.updated_at;
        self.queries_file = file.queries_file;
        self.total_queries = file.total_queries;
        self.total_combinations = file.total_combinations;
        self.position = file.current_position;
        self.completed = file.completed.into_iter().collect();
        self.stats = file.stats;
        self.no_results = file.no_results;
        self.ledger = file.ledger;

        debug!(
            completed = self.completed.len(),
            hashes = self.ledger.seen_count(),
            "resumed checkpoint"
        );
        true
    }

    /// Writes the full state durably, replacing the previous checkpoint.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// target, so a crash mid-write leaves the previous checkpoint intact
    /// as the recovery point.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] on serialization or file system failure.
    pub fn save(&mut self) -> Result<(), CheckpointError> {
        self.updated_at = Some(Utc::now());

        let mut completed: Vec<WorkUnit> = self.completed.iter().copied().collect();
        completed.sort_unstable();

        let file = CheckpointFile {
            status: self.status,
            started_at: self.started_at,
            updated_at: self.updated_at,
            queries_file: self.queries_file.clone(),
            total_queries: self.total_queries,
            total_combinations: self.total_combinations,
            current_position: self.position,
            completed,
            stats: self.stats,
            no_results: self.no_results.clone(),
            ledger: self.ledger.clone(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|source| CheckpointError::Serialize { source })?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| CheckpointError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| CheckpointError::io(&self.path, e))?;

        debug!(path = %self.path.display(), "checkpoint saved");
        Ok(())
    }

    /// Deletes the checkpoint file and resets to an empty session.
    ///
    /// Backs fresh-start runs; a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] when an existing file cannot be
    /// removed.
    pub fn discard(&mut self) -> Result<(), CheckpointError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "checkpoint discarded"),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(CheckpointError::io(self.path.clone(), error)),
        }
        let path = std::mem::take(&mut self.path);
        *self = Self::new(path);
        Ok(())
    }

    /// Records the queries file and totals for this run.
    pub fn set_session_info(
        &mut self,
        queries_file: &Path,
        total_queries: usize,
        total_combinations: usize,
    ) {
        self.queries_file = Some(queries_file.display().to_string());
        self.total_queries = total_queries;
        self.total_combinations = total_combinations;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    /// Updates the current position without marking anything done.
    pub fn record_position(&mut self, unit: WorkUnit) {
        self.position = unit;
    }

    /// Marks `unit` complete and moves the position onto it.
    pub fn mark_unit_done(&mut self, unit: WorkUnit) {
        self.completed.insert(unit);
        self.position = unit;
    }

    /// Returns true when `unit` was already fully processed.
    #[must_use]
    pub fn is_unit_done(&self, unit: WorkUnit) -> bool {
        self.completed.contains(&unit)
    }

    /// Marks the whole session completed and forces a save.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] when the final save fails.
    pub fn mark_session_finished(&mut self) -> Result<(), CheckpointError> {
        self.status = SessionStatus::Completed;
        self.save()
    }

    /// Records a unit that legitimately found zero results.
    pub fn add_no_result(&mut self, unit: WorkUnit, query: &str, filters: &str) {
        self.no_results.push(NoResultEntry {
            unit,
            query: query.to_string(),
            filters: filters.to_string(),
        });
    }

    /// Session status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Current (query, filter) position.
    #[must_use]
    pub fn position(&self) -> WorkUnit {
        self.position
    }

    /// Number of completed work units.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Total combinations recorded for this run.
    #[must_use]
    pub fn total_combinations(&self) -> usize {
        self.total_combinations
    }

    /// Run statistics so far.
    #[must_use]
    pub fn stats(&self) -> HarvestStats {
        self.stats
    }

    /// Units that completed with zero results.
    #[must_use]
    pub fn no_results(&self) -> &[NoResultEntry] {
        &self.no_results
    }

    /// Timestamp of the last save, if any.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Shared view of the dedup ledger.
    #[must_use]
    pub fn ledger(&self) -> &ContentLedger {
        &self.ledger
    }

    /// Exclusive view of the dedup ledger.
    pub fn ledger_mut(&mut self) -> &mut ContentLedger {
        &mut self.ledger
    }

    /// Increments the saved-images counter.
    pub fn increment_saved(&mut self) {
        self.stats.images_saved += 1;
    }

    /// Increments the duplicates counter.
    pub fn increment_duplicates(&mut self) {
        self.stats.duplicates_skipped += 1;
    }

    /// Increments the error counter.
    pub fn increment_errors(&mut self) {
        self.stats.errors += 1;
    }
}
