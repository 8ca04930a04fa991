//! Durable checkpoint state for crash-safe resume.
//!
//! The checkpoint is a single JSON document rewritten wholesale after every
//! work unit. It carries the completed-unit set, run statistics, the
//! content-hash dedup ledger, and the current position, which together let
//! a later invocation resume exactly where the previous one stopped.

mod ledger;
mod state;

pub use ledger::ContentLedger;
pub use state::{
    CheckpointError, CheckpointState, HarvestStats, NoResultEntry, SessionStatus, WorkUnit,
};
