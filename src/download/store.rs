//! Deduplicated image persistence.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::error::DownloadError;
use super::filename::build_image_filename;
use crate::checkpoint::ContentLedger;

/// Computes the lowercase hex SHA-256 digest of `bytes`, the dedup key.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Result of offering downloaded bytes to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The bytes were new; saved under this filename.
    Saved(String),
    /// Byte-identical content was already saved under some earlier name.
    Duplicate,
}

/// Writes accepted images to the output directory with sequential,
/// source-derived filenames.
#[derive(Debug, Clone)]
pub struct ImageStore {
    output_dir: PathBuf,
    prefix: String,
}

impl ImageStore {
    /// Creates the store, creating `output_dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] when the directory cannot be created.
    pub fn new(output_dir: &Path, prefix: impl Into<String>) -> Result<Self, DownloadError> {
        std::fs::create_dir_all(output_dir)
            .map_err(|e| DownloadError::io(output_dir.to_path_buf(), e))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            prefix: prefix.into(),
        })
    }

    /// Offers downloaded bytes to the ledger and persists them when new.
    ///
    /// The check-then-insert on the ledger is atomic per item (single
    /// logical worker), so the same hash is never saved twice within or
    /// across runs. Duplicates leave the ledger and the sequence counter
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] when the file write fails. The hash
    /// is still accepted in that case only if the write succeeded, so a
    /// failed write can be retried by a later run.
    #[instrument(skip(self, bytes, ledger), fields(url = %url, bytes = bytes.len()))]
    pub async fn save(
        &self,
        bytes: &[u8],
        url: &str,
        content_type: Option<&str>,
        ledger: &mut ContentLedger,
    ) -> Result<SaveOutcome, DownloadError> {
        let hash = content_hash(bytes);

        if ledger.is_duplicate(&hash) {
            debug!(%hash, "duplicate content, skipping");
            return Ok(SaveOutcome::Duplicate);
        }

        let sequence = ledger.next_sequence_number();
        let filename = build_image_filename(&self.prefix, sequence, url, content_type);
        let path = self.output_dir.join(&filename);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DownloadError::io(path.clone(), e))?;

        // Accept only after the write lands so a failed write is retryable.
        ledger.accept(hash);

        debug!(path = %path.display(), "image saved");
        Ok(SaveOutcome::Saved(filename))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_is_hex_sha256() {
        let hash = content_hash(b"hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_save_writes_file_with_sequential_name() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path(), "pothole").unwrap();
        let mut ledger = ContentLedger::new();

        let outcome = store
            .save(
                b"imagebytes",
                "https://example.com/a.jpg",
                Some("image/jpeg"),
                &mut ledger,
            )
            .await
            .unwrap();

        match outcome {
            SaveOutcome::Saved(filename) => {
                assert_eq!(filename, "pothole_001_example.com-a.jpg.jpg");
                assert_eq!(
                    std::fs::read(dir.path().join(&filename)).unwrap(),
                    b"imagebytes"
                );
            }
            SaveOutcome::Duplicate => panic!("first save must not be a duplicate"),
        }
        assert_eq!(ledger.counter(), 1);
    }

    #[tokio::test]
    async fn test_identical_bytes_under_different_urls_are_one_image() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path(), "img").unwrap();
        let mut ledger = ContentLedger::new();

        let first = store
            .save(b"same", "https://a.example/x.jpg", None, &mut ledger)
            .await
            .unwrap();
        let second = store
            .save(b"same", "https://b.example/y.png", None, &mut ledger)
            .await
            .unwrap();

        assert!(matches!(first, SaveOutcome::Saved(_)));
        assert_eq!(second, SaveOutcome::Duplicate);
        // Duplicate consumed no sequence number.
        assert_eq!(ledger.counter(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_distinct_bytes_get_increasing_sequence_numbers() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path(), "img").unwrap();
        let mut ledger = ContentLedger::new();

        for (i, body) in [b"one" as &[u8], b"two", b"three"].iter().enumerate() {
            let outcome = store
                .save(body, "https://example.com/p.jpg", None, &mut ledger)
                .await
                .unwrap();
            match outcome {
                SaveOutcome::Saved(filename) => {
                    assert!(filename.starts_with(&format!("img_{:03}", i + 1)));
                }
                SaveOutcome::Duplicate => panic!("distinct bytes flagged duplicate"),
            }
        }
    }

    #[test]
    fn test_new_creates_output_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/images");
        ImageStore::new(&nested, "img").unwrap();
        assert!(nested.is_dir());
    }
}
