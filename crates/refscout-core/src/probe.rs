//! Per-head criteria evaluation.
//!
//! A [`Probe`] answers "does path P exist at this revision" and
//! "last-modified timestamp" for one candidate head without forcing commit
//! resolution unless asked. `last_modified` never fails — criteria
//! evaluation must not abort discovery over a metadata gap — while
//! `path_exists` propagates transport errors, since those indicate the run
//! itself is infeasible.

use std::sync::Arc;

use crate::error::HostError;
use crate::host::RepositoryHost;
use crate::resolve::CommitSlot;

/// Read-only evaluation surface over one candidate head.
pub struct Probe {
    host: Arc<dyn RepositoryHost>,
    head_name: String,
    hash: Option<String>,
    slot: Arc<CommitSlot>,
    /// Timestamp known from the listing payload (tag creation time); serves
    /// last-modified without forcing the slot.
    listed_timestamp_ms: Option<i64>,
}

impl Probe {
    /// Creates a probe over `head_name` at `hash` (absent when the head's
    /// revision could not be resolved).
    #[must_use]
    pub fn new(
        host: Arc<dyn RepositoryHost>,
        head_name: impl Into<String>,
        hash: Option<String>,
        slot: Arc<CommitSlot>,
    ) -> Self {
        Self {
            host,
            head_name: head_name.into(),
            hash,
            slot,
            listed_timestamp_ms: None,
        }
    }

    /// Seeds a timestamp already known from the listing payload, so
    /// last-modified needs no second network call.
    #[must_use]
    pub const fn with_listed_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.listed_timestamp_ms = Some(timestamp_ms);
        self
    }

    /// The head this probe evaluates.
    #[must_use]
    pub fn head_name(&self) -> &str {
        &self.head_name
    }

    /// The revision hash, when resolved.
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Last-modified timestamp of the head's revision in epoch
    /// milliseconds.
    ///
    /// Never fails: an unresolved head or a degraded resolution yields `0`
    /// and a debug log.
    #[must_use]
    pub fn last_modified(&self) -> i64 {
        if let Some(timestamp) = self.listed_timestamp_ms {
            return timestamp;
        }
        if self.hash.is_none() {
            tracing::debug!(
                head = %self.head_name,
                "cannot report last-modified for an unresolved head"
            );
            return 0;
        }
        self.slot.timestamp_ms()
    }

    /// Whether `path` exists at this head's revision.
    ///
    /// # Errors
    ///
    /// Propagates [`HostError`] from the existence check; a transport
    /// failure here is allowed to fail the run. An unresolved head returns
    /// `Ok(false)` with a debug log instead.
    pub fn path_exists(&self, path: &str) -> Result<bool, HostError> {
        let Some(hash) = self.hash.as_deref() else {
            tracing::debug!(
                head = %self.head_name,
                path,
                "cannot evaluate path existence for an unresolved head"
            );
            return Ok(false);
        };
        self.host.path_exists(hash, path)
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("head", &self.head_name)
            .field("hash", &self.hash)
            .finish()
    }
}
