//! Error taxonomy for discovery runs.
//!
//! The taxonomy follows the containment policy of the engine: conditions that
//! affect a single candidate (one pull request, one ref's metadata) are
//! contained where they occur and recorded as skips, while conditions that
//! affect the feasibility of the whole run propagate out of the discovery run
//! as a [`DiscoveryError`].
//!
//! `HostError` is `Clone` so that a failure captured by a deferred ref
//! sequence can be re-raised on every later iteration attempt without
//! re-contacting the host.

use thiserror::Error;

/// Errors surfaced by a [`RepositoryHost`](crate::host::RepositoryHost)
/// implementation.
///
/// Concrete clients are expected to absorb rate-limit responses internally
/// (pause and retry); the engine never observes a rate-limit condition, only
/// latency.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum HostError {
    /// Network or I/O failure unrelated to response semantics.
    ///
    /// Aborts the current discovery stage and propagates to the caller.
    #[error("host transport error: {message}")]
    Transport {
        /// Description of the underlying failure.
        message: String,
    },

    /// The repository or a specific ref is absent.
    ///
    /// Hard error for whole-repository listings; single-ref resolution paths
    /// return an absent value instead of raising this.
    #[error("not found: {what}")]
    NotFound {
        /// What was missing.
        what: String,
    },

    /// Permission denied (401/403) on specific data.
    ///
    /// Caught at per-pull-request granularity when a fork's commits are
    /// unreadable; the affected pull request is skipped, never the run.
    #[error("forbidden: {what}")]
    Forbidden {
        /// What access was denied to.
        what: String,
    },

    /// A paginated fetch was interrupted by cooperative cancellation.
    ///
    /// Distinguished from [`HostError::Transport`] so the driver can
    /// propagate it as [`DiscoveryError::Interrupted`].
    #[error("host call interrupted")]
    Interrupted,
}

impl HostError {
    /// Shorthand for a transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Shorthand for a not-found condition.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Shorthand for a forbidden condition.
    pub fn forbidden(what: impl Into<String>) -> Self {
        Self::Forbidden { what: what.into() }
    }

    /// Returns `true` for a permission-denied condition.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    /// Returns `true` for an absent repository/ref condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when the call was cancelled mid-flight.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl From<std::io::Error> for HostError {
    fn from(value: std::io::Error) -> Self {
        Self::Transport {
            message: value.to_string(),
        }
    }
}

/// Errors that abort an entire discovery run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    /// A host call failed in a way that makes the run infeasible.
    #[error("discovery failed: {0}")]
    Host(#[source] HostError),

    /// The run was cancelled cooperatively.
    ///
    /// Always checked at stage and per-pull-request boundaries and
    /// propagated immediately.
    #[error("discovery interrupted")]
    Interrupted,
}

impl From<HostError> for DiscoveryError {
    fn from(value: HostError) -> Self {
        // An interruption observed inside a host call keeps its identity
        // rather than degrading to a transport failure.
        if value.is_interrupted() {
            Self::Interrupted
        } else {
            Self::Host(value)
        }
    }
}
