//! Image byte fetching, naming, and deduplicated storage.
//!
//! Downloads are buffered whole because the content hash over the full
//! byte body is the dedup key; images are bounded in size so this stays
//! cheap. [`ImageStore`] owns the write path: hash, consult the ledger,
//! assign a sequential filename, persist.

mod client;
mod error;
pub mod filename;
mod store;

pub use client::{DownloadedImage, ImageClient};
pub use error::DownloadError;
pub use store::{ImageStore, SaveOutcome, content_hash};
