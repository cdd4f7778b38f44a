//! Deferred ref sequences.
//!
//! A [`LazySeq`] wraps a supplier of listing results. The supplier runs at
//! most once, on the first attempt to iterate; its outcome (items or
//! failure) is cached for every later attempt within the same instance. A
//! discovery run scoped away from a ref kind therefore performs zero
//! network I/O for that kind, and construction is always infallible — safe
//! before any host credentials are validated.

use std::sync::{Mutex, OnceLock};

use thiserror::Error;

use crate::error::HostError;

/// Failure captured by a deferred listing, re-raised on every iteration
/// attempt after the first.
#[derive(Debug, Clone, Error)]
#[error("deferred ref listing failed")]
pub struct SequenceError(#[source] HostError);

impl SequenceError {
    /// Returns the captured host failure.
    #[must_use]
    pub fn into_inner(self) -> HostError {
        self.0
    }

    /// Borrows the captured host failure.
    #[must_use]
    pub const fn inner(&self) -> &HostError {
        &self.0
    }
}

type Supplier<T> = Box<dyn FnOnce() -> Result<Vec<T>, HostError> + Send>;

/// A sequence whose first iteration triggers the underlying listing call.
pub struct LazySeq<T> {
    supplier: Mutex<Option<Supplier<T>>>,
    outcome: OnceLock<Result<Vec<T>, HostError>>,
}

impl<T> LazySeq<T> {
    /// Wraps `supplier` without invoking it.
    pub fn new(supplier: impl FnOnce() -> Result<Vec<T>, HostError> + Send + 'static) -> Self {
        Self {
            supplier: Mutex::new(Some(Box::new(supplier))),
            outcome: OnceLock::new(),
        }
    }

    /// A sequence that is already populated; no supplier will ever run.
    #[must_use]
    pub fn resolved(items: Vec<T>) -> Self {
        let outcome = OnceLock::new();
        let _ = outcome.set(Ok(items));
        Self {
            supplier: Mutex::new(None),
            outcome,
        }
    }

    /// Returns the items, forcing the supplier on first call.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError`] wrapping the supplier's failure, on the
    /// forcing call and on every call after it.
    pub fn items(&self) -> Result<&[T], SequenceError> {
        let outcome = self.outcome.get_or_init(|| {
            let supplier = self
                .supplier
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take();
            match supplier {
                Some(supplier) => {
                    tracing::debug!("forcing deferred ref listing");
                    supplier()
                }
                // A supplier can only be absent when the cell was seeded via
                // `resolved`, in which case get_or_init never runs this.
                None => Ok(Vec::new()),
            }
        });
        match outcome {
            Ok(items) => Ok(items.as_slice()),
            Err(err) => Err(SequenceError(err.clone())),
        }
    }

    /// Returns `true` once the supplier has been invoked (or the sequence
    /// was constructed pre-populated).
    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.outcome.get().is_some()
    }
}

impl<T> std::fmt::Debug for LazySeq<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazySeq")
            .field("forced", &self.is_forced())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_supplier_runs_at_most_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let seq = LazySeq::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(seq.items().unwrap(), &[1, 2, 3]);
        assert_eq!(seq.items().unwrap(), &[1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_construction_performs_no_io() {
        let seq: LazySeq<u32> = LazySeq::new(|| panic!("must not run"));
        assert!(!seq.is_forced());
        drop(seq);
    }

    #[test]
    fn test_failure_is_captured_and_re_raised() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let seq: LazySeq<u32> = LazySeq::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(HostError::transport("listing failed"))
        });

        let first = seq.items().unwrap_err();
        let second = seq.items().unwrap_err();
        assert!(matches!(first.inner(), HostError::Transport { .. }));
        assert!(matches!(second.inner(), HostError::Transport { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolved_sequence_never_calls_a_supplier() {
        let seq = LazySeq::resolved(vec!["a", "b"]);
        assert!(seq.is_forced());
        assert_eq!(seq.items().unwrap(), &["a", "b"]);
    }
}
