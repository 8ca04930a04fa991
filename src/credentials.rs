//! Credential pool with round-robin rotation on quota exhaustion.
//!
//! The pool holds an ordered list of interchangeable API credentials.
//! When the current credential hits its quota it is marked exhausted and
//! the pool scans forward circularly for the next usable one, so every
//! credential is tried exactly once before the pool reports total
//! exhaustion. Exhaustion marks persist until [`CredentialPool::reset_all`]
//! is invoked for a new quota period.

use std::collections::HashSet;

use tracing::debug;

use crate::config::ConfigError;

/// A single API credential: key plus search-engine identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// API key.
    pub key: String,
    /// Search engine (cx) identifier scoping the key.
    pub cx: String,
}

impl Credential {
    /// Creates a credential from a key/cx pair.
    #[must_use]
    pub fn new(key: impl Into<String>, cx: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cx: cx.into(),
        }
    }
}

/// Ordered pool of credentials with per-credential exhaustion flags.
///
/// The pool order is fixed for the lifetime of a run; `current_index`
/// always refers to a valid pool slot.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    current_index: usize,
    exhausted: HashSet<usize>,
}

impl CredentialPool {
    /// Creates a pool from an ordered, non-empty credential list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoCredentials`] when `credentials` is empty.
    pub fn new(credentials: Vec<Credential>) -> Result<Self, ConfigError> {
        if credentials.is_empty() {
            return Err(ConfigError::NoCredentials);
        }
        Ok(Self {
            credentials,
            current_index: 0,
            exhausted: HashSet::new(),
        })
    }

    /// Returns the credential currently in use.
    #[must_use]
    pub fn current(&self) -> &Credential {
        &self.credentials[self.current_index]
    }

    /// Returns the 1-based ordinal of the current credential, for display.
    #[must_use]
    pub fn current_ordinal(&self) -> usize {
        self.current_index + 1
    }

    /// Returns the number of credentials in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Returns true when the pool holds no credentials. Never true after
    /// construction, present for API completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Returns how many credentials have been marked exhausted.
    #[must_use]
    pub fn exhausted_count(&self) -> usize {
        self.exhausted.len()
    }

    /// Marks the current credential as quota exhausted.
    pub fn mark_current_exhausted(&mut self) {
        self.exhausted.insert(self.current_index);
    }

    /// Marks the current credential exhausted and rotates to the next
    /// usable one.
    ///
    /// The scan starts just after the current index and wraps, so earlier
    /// credentials are revisited only after all later ones have been tried.
    /// Returns false, leaving `current_index` unchanged, iff every
    /// credential in the pool is exhausted.
    pub fn rotate_to_next(&mut self) -> bool {
        self.mark_current_exhausted();

        for offset in 0..self.credentials.len() {
            let candidate = (self.current_index + 1 + offset) % self.credentials.len();
            if !self.exhausted.contains(&candidate) {
                debug!(
                    from = self.current_index + 1,
                    to = candidate + 1,
                    "rotating credential"
                );
                self.current_index = candidate;
                return true;
            }
        }

        false
    }

    /// Returns true while at least one credential is not exhausted.
    #[must_use]
    pub fn has_available(&self) -> bool {
        self.exhausted.len() < self.credentials.len()
    }

    /// Clears all exhaustion marks and resets to the first credential.
    ///
    /// Intended for a new quota period (e.g. a new day); not invoked by the
    /// harvesting loop itself.
    pub fn reset_all(&mut self) {
        self.exhausted.clear();
        self.current_index = 0;
    }
}
