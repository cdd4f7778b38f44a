//! Lazy, memoized commit-metadata resolution.
//!
//! Every raw branch/tag/PR-side carries at most one [`CommitSlot`].
//! Accessing author, message, or timestamp triggers resolution once; after
//! that, the slot serves the cached value. A failed resolution is also
//! remembered — the slot degrades to empty/zero metadata instead of
//! re-contacting a flaky endpoint for the same ref again, whether the next
//! access comes from discovery or from criteria evaluation. Resolution
//! failure is never fatal to a run.

use std::sync::{Arc, Mutex};

use crate::error::HostError;
use crate::host::{CommitMeta, RepositoryHost};

type MetaSupplier = Box<dyn FnOnce() -> Result<CommitMeta, HostError> + Send>;

enum SlotState {
    /// Resolution not yet attempted.
    Pending { label: String, supplier: MetaSupplier },
    /// Resolved successfully; value is final.
    Resolved(CommitMeta),
    /// Resolution was attempted and failed; serves degraded metadata.
    Degraded,
}

/// Single-assignment commit-metadata cell.
pub struct CommitSlot {
    state: Mutex<SlotState>,
}

impl CommitSlot {
    /// A slot that resolves through `supplier` on first access. `label`
    /// names the ref in degradation logs.
    pub fn deferred(
        label: impl Into<String>,
        supplier: impl FnOnce() -> Result<CommitMeta, HostError> + Send + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(SlotState::Pending {
                label: label.into(),
                supplier: Box::new(supplier),
            }),
        }
    }

    /// A slot whose metadata is already known; no resolution will run.
    #[must_use]
    pub fn resolved(meta: CommitMeta) -> Self {
        Self {
            state: Mutex::new(SlotState::Resolved(meta)),
        }
    }

    /// A slot that resolves `hash` through `host` on first access.
    ///
    /// An unknown hash degrades (single-ref not-found is not an error), as
    /// does any host failure.
    pub fn for_commit(host: Arc<dyn RepositoryHost>, hash: impl Into<String>) -> Self {
        let hash = hash.into();
        let label = format!("{}@{hash}", host.repository());
        Self::deferred(label, move || {
            host.resolve_commit(&hash)?
                .map(|commit| commit.meta)
                .ok_or_else(|| HostError::not_found(hash.clone()))
        })
    }

    /// Returns the commit metadata, resolving on first access.
    ///
    /// Never fails: a failed or absent resolution yields
    /// `CommitMeta::default()` and is logged at debug level.
    pub fn meta(&self) -> CommitMeta {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match &mut *state {
            SlotState::Resolved(meta) => meta.clone(),
            SlotState::Degraded => CommitMeta::default(),
            SlotState::Pending { .. } => {
                let taken = std::mem::replace(&mut *state, SlotState::Degraded);
                let SlotState::Pending { label, supplier } = taken else {
                    // The match arm above guarantees the pending variant.
                    return CommitMeta::default();
                };
                match supplier() {
                    Ok(meta) => {
                        *state = SlotState::Resolved(meta.clone());
                        meta
                    }
                    Err(err) => {
                        tracing::debug!(
                            ref_label = %label,
                            error = %err,
                            "commit metadata resolution failed, degrading to empty metadata"
                        );
                        CommitMeta::default()
                    }
                }
            }
        }
    }

    /// Commit author, resolving on first access.
    pub fn author(&self) -> String {
        self.meta().author
    }

    /// Commit message, resolving on first access.
    pub fn message(&self) -> String {
        self.meta().message
    }

    /// Commit timestamp in epoch milliseconds, resolving on first access.
    /// `0` when resolution degraded.
    pub fn timestamp_ms(&self) -> i64 {
        self.meta().timestamp_ms
    }

    /// Returns `true` once resolution has been attempted (successfully or
    /// not).
    pub fn attempted(&self) -> bool {
        let state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        !matches!(&*state, SlotState::Pending { .. })
    }
}

impl std::fmt::Debug for CommitSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitSlot")
            .field("attempted", &self.attempted())
            .finish()
    }
}
