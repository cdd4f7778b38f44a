//! Cooperative cancellation for long-running discovery loops.
//!
//! A [`CancelToken`] is cloned into every paginated loop and checked at
//! well-defined points: before each page fetch and between pull requests.
//! Cancellation surfaces as [`DiscoveryError::Interrupted`], distinct from
//! transport failure, so callers can tell an aborted run from a broken one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::DiscoveryError;

/// Cloneable cancellation flag shared between a discovery run and its owner.
///
/// Cheap to clone; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Checks the flag at a loop boundary.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Interrupted`] once cancellation has been
    /// requested.
    pub fn checkpoint(&self) -> Result<(), DiscoveryError> {
        if self.is_cancelled() {
            return Err(DiscoveryError::Interrupted);
        }
        Ok(())
    }
}
