//! The scoped, closable context for one discovery run.
//!
//! A [`DiscoveryRequest`] holds which ref kinds to fetch, the
//! checkout-strategy matrix for origin vs. fork pull requests, an optional
//! caller-supplied restriction (specific branch names / tag names / PR
//! identifiers), and the three lazily-populated ref sequences. It is
//! created at the start of a run and closed at the end — always, including
//! on error; closing also happens on drop.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::head::{CheckoutStrategy, PrOrigin};
use crate::host::{RawBranch, RawPullRequest, RawTag, RepositoryHost};
use crate::lazy::LazySeq;

/// Caller-declared interest in a subset of refs.
///
/// Derived from an observer's declared interest; an empty restriction means
/// "everything of the requested kinds".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Restriction {
    /// Branch names to include.
    pub branch_names: BTreeSet<String>,
    /// Tag names to include.
    pub tag_names: BTreeSet<String>,
    /// Pull-request identifiers to include.
    pub pr_ids: BTreeSet<u64>,
}

impl Restriction {
    /// Returns `true` when no subset was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branch_names.is_empty() && self.tag_names.is_empty() && self.pr_ids.is_empty()
    }

    /// Whether `name` is an included branch.
    #[must_use]
    pub fn wants_branch(&self, name: &str) -> bool {
        self.branch_names.is_empty() || self.branch_names.contains(name)
    }

    /// Whether `name` is an included tag.
    #[must_use]
    pub fn wants_tag(&self, name: &str) -> bool {
        self.tag_names.is_empty() || self.tag_names.contains(name)
    }

    /// Whether `id` is an included pull request.
    #[must_use]
    pub fn wants_pull_request(&self, id: u64) -> bool {
        self.pr_ids.is_empty() || self.pr_ids.contains(&id)
    }
}

/// Scoped context for one discovery run.
#[derive(Debug)]
pub struct DiscoveryRequest {
    fetch_branches: bool,
    fetch_tags: bool,
    origin_strategies: BTreeSet<CheckoutStrategy>,
    fork_strategies: BTreeSet<CheckoutStrategy>,
    restriction: Restriction,
    branches: Option<LazySeq<RawBranch>>,
    tags: Option<LazySeq<RawTag>>,
    pull_requests: Option<LazySeq<RawPullRequest>>,
    closed: bool,
}

impl DiscoveryRequest {
    /// A request scoped to zero ref kinds. Combine with the `with_*`
    /// builders.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fetch_branches: false,
            fetch_tags: false,
            origin_strategies: BTreeSet::new(),
            fork_strategies: BTreeSet::new(),
            restriction: Restriction::default(),
            branches: None,
            tags: None,
            pull_requests: None,
            closed: false,
        }
    }

    /// The minimal, criteria-free request used for authority checking
    /// outside a full discovery pass. Scoped to zero ref kinds.
    #[must_use]
    pub fn authority() -> Self {
        Self::new()
    }

    /// Requests branch discovery.
    #[must_use]
    pub fn with_branches(mut self) -> Self {
        self.fetch_branches = true;
        self
    }

    /// Requests tag discovery.
    #[must_use]
    pub fn with_tags(mut self) -> Self {
        self.fetch_tags = true;
        self
    }

    /// Requests origin pull-request discovery with the given strategies.
    #[must_use]
    pub fn with_origin_pull_requests(
        mut self,
        strategies: impl IntoIterator<Item = CheckoutStrategy>,
    ) -> Self {
        self.origin_strategies.extend(strategies);
        self
    }

    /// Requests fork pull-request discovery with the given strategies.
    #[must_use]
    pub fn with_fork_pull_requests(
        mut self,
        strategies: impl IntoIterator<Item = CheckoutStrategy>,
    ) -> Self {
        self.fork_strategies.extend(strategies);
        self
    }

    /// Restricts the run to a declared subset of refs.
    #[must_use]
    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = restriction;
        self
    }

    /// Whether branch discovery was requested.
    #[must_use]
    pub const fn wants_branches(&self) -> bool {
        self.fetch_branches
    }

    /// Whether tag discovery was requested.
    #[must_use]
    pub const fn wants_tags(&self) -> bool {
        self.fetch_tags
    }

    /// Whether any pull-request discovery was requested.
    #[must_use]
    pub fn wants_pull_requests(&self) -> bool {
        !self.origin_strategies.is_empty() || !self.fork_strategies.is_empty()
    }

    /// Whether nothing at all was requested.
    #[must_use]
    pub fn is_empty_scope(&self) -> bool {
        !self.fetch_branches && !self.fetch_tags && !self.wants_pull_requests()
    }

    /// The checkout strategies configured for a pull request's fork class.
    /// Empty when that class was not requested.
    #[must_use]
    pub const fn strategies_for(&self, origin: &PrOrigin) -> &BTreeSet<CheckoutStrategy> {
        match origin {
            PrOrigin::Origin => &self.origin_strategies,
            PrOrigin::Fork { .. } => &self.fork_strategies,
        }
    }

    /// The declared restriction.
    #[must_use]
    pub const fn restriction(&self) -> &Restriction {
        &self.restriction
    }

    /// Installs the ref sequences for every requested kind, wired to
    /// `host`. Suppliers capture the host handle but perform no I/O until
    /// iterated.
    pub fn prime(&mut self, host: &Arc<dyn RepositoryHost>, cancel: &CancelToken) {
        if self.fetch_branches && self.branches.is_none() {
            let host = Arc::clone(host);
            let cancel = cancel.clone();
            self.branches = Some(LazySeq::new(move || host.list_branches(&cancel)));
        }
        if self.fetch_tags && self.tags.is_none() {
            let host = Arc::clone(host);
            let cancel = cancel.clone();
            self.tags = Some(LazySeq::new(move || host.list_tags(&cancel)));
        }
        if self.wants_pull_requests() && self.pull_requests.is_none() {
            let host = Arc::clone(host);
            let cancel = cancel.clone();
            self.pull_requests = Some(LazySeq::new(move || host.list_pull_requests(&cancel)));
        }
    }

    /// Installs a pre-built branch sequence.
    pub fn install_branches(&mut self, seq: LazySeq<RawBranch>) {
        self.branches = Some(seq);
    }

    /// Installs a pre-built tag sequence.
    pub fn install_tags(&mut self, seq: LazySeq<RawTag>) {
        self.tags = Some(seq);
    }

    /// Installs a pre-built pull-request sequence.
    pub fn install_pull_requests(&mut self, seq: LazySeq<RawPullRequest>) {
        self.pull_requests = Some(seq);
    }

    /// The branch sequence, when installed.
    #[must_use]
    pub const fn branches(&self) -> Option<&LazySeq<RawBranch>> {
        self.branches.as_ref()
    }

    /// The tag sequence, when installed.
    #[must_use]
    pub const fn tags(&self) -> Option<&LazySeq<RawTag>> {
        self.tags.as_ref()
    }

    /// The pull-request sequence, when installed.
    #[must_use]
    pub const fn pull_requests(&self) -> Option<&LazySeq<RawPullRequest>> {
        self.pull_requests.as_ref()
    }

    /// Releases the underlying sequences. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.branches = None;
        self.tags = None;
        self.pull_requests = None;
    }

    /// Whether the request has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for DiscoveryRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DiscoveryRequest {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostKind, InMemoryHost, RepoCoordinates};

    #[test]
    fn test_empty_scope_requests_nothing() {
        let request = DiscoveryRequest::new();
        assert!(request.is_empty_scope());
        assert!(!request.wants_branches());
        assert!(!request.wants_pull_requests());
    }

    #[test]
    fn test_strategies_are_tracked_per_fork_class() {
        let request = DiscoveryRequest::new()
            .with_origin_pull_requests([CheckoutStrategy::Merge])
            .with_fork_pull_requests([CheckoutStrategy::Merge, CheckoutStrategy::Head]);

        assert_eq!(request.strategies_for(&PrOrigin::Origin).len(), 1);
        let fork = PrOrigin::Fork {
            author: "someone".to_string(),
        };
        assert_eq!(request.strategies_for(&fork).len(), 2);
    }

    #[test]
    fn test_empty_restriction_wants_everything() {
        let restriction = Restriction::default();
        assert!(restriction.wants_branch("main"));
        assert!(restriction.wants_tag("v1.0"));
        assert!(restriction.wants_pull_request(7));
    }

    #[test]
    fn test_populated_restriction_filters() {
        let mut restriction = Restriction::default();
        restriction.branch_names.insert("main".to_string());
        restriction.pr_ids.insert(7);

        assert!(restriction.wants_branch("main"));
        assert!(!restriction.wants_branch("feature-x"));
        assert!(restriction.wants_pull_request(7));
        assert!(!restriction.wants_pull_request(8));
        // No tag subset declared, so every tag is wanted.
        assert!(restriction.wants_tag("v1.0"));
    }

    #[test]
    fn test_prime_installs_only_requested_kinds_without_io() {
        let host = InMemoryHost::new(HostKind::Cloud, RepoCoordinates::new("acme", "widget"));
        let shared: Arc<dyn RepositoryHost> = Arc::new(host.clone());
        let cancel = CancelToken::new();

        let mut request = DiscoveryRequest::new().with_branches();
        request.prime(&shared, &cancel);

        assert!(request.branches().is_some());
        assert!(request.tags().is_none());
        assert!(request.pull_requests().is_none());
        assert_eq!(host.branch_listings(), 0);
    }

    #[test]
    fn test_close_releases_sequences_and_is_idempotent() {
        let host = InMemoryHost::new(HostKind::Cloud, RepoCoordinates::new("acme", "widget"));
        let shared: Arc<dyn RepositoryHost> = Arc::new(host);
        let cancel = CancelToken::new();

        let mut request = DiscoveryRequest::new().with_branches().with_tags();
        request.prime(&shared, &cancel);
        request.close();
        assert!(request.is_closed());
        assert!(request.branches().is_none());
        request.close();
        assert!(request.is_closed());
    }
}
