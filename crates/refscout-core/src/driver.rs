//! The reconciliation driver.
//!
//! Orchestrates one discovery run as an explicit state machine:
//! `Branches → PullRequests → Tags → Done`, each stage entered only when
//! requested and only while the observer is not yet satisfied. Within a
//! stage, refs are processed in the order the host returned them; per ref
//! the driver builds head(s), attaches a deferred commit slot, constructs
//! a probe, evaluates acceptance, and records the outcome through the
//! witness channel.
//!
//! # Containment
//!
//! A pull request whose fork commits are unreadable (forbidden) is logged
//! and skipped; any other host failure aborts the stage and propagates.
//! Cancellation is checked between stages and between pull requests. The
//! discovery request is closed on every exit path.
//!
//! # Commit sharing
//!
//! Commit slots are keyed by hash for the whole run, so a pull request
//! whose target branch was already discovered reuses the same memoized
//! commit data instead of re-resolving it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::builder::HeadBuilder;
use crate::cache::PrMetadata;
use crate::directory::CacheService;
use crate::cancel::CancelToken;
use crate::error::DiscoveryError;
use crate::head::{Head, PrRevision, Revision, SimpleRevision};
use crate::host::{CommitMeta, HostKind, RawPullRequest, RepositoryHost, ScmKind};
use crate::observe::{AcceptanceCriteria, HeadObserver, Witness, WitnessOutcome};
use crate::probe::Probe;
use crate::request::DiscoveryRequest;
use crate::resolve::CommitSlot;

/// Aggregate result of one discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Number of refs processed across all stages.
    pub processed: usize,
    /// Whether the observer completed the query before full enumeration.
    pub completed_early: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct StageOutcome {
    processed: usize,
    completed_early: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Branches,
    PullRequests,
    Tags,
    Done,
}

/// Where a pull request's source commit ended up after resolution.
enum PrSource {
    /// Hash known and (for forks) confirmed readable.
    Resolved {
        hash: String,
        slot: Arc<CommitSlot>,
    },
    /// The acting credential cannot see into the fork; skip the whole
    /// pull request.
    Unreadable,
    /// No hash available; heads are recorded as skipped.
    Unknown,
}

/// One discovery run over one repository.
pub struct Discovery<'a> {
    host: Arc<dyn RepositoryHost>,
    request: DiscoveryRequest,
    criteria: &'a dyn AcceptanceCriteria,
    observer: &'a mut dyn HeadObserver,
    witness: &'a mut dyn Witness,
    cancel: CancelToken,
    caches: Option<Arc<CacheService>>,
    /// Run-scoped commit slots, keyed by hash.
    slots: HashMap<String, Arc<CommitSlot>>,
    scm: Option<ScmKind>,
}

impl<'a> Discovery<'a> {
    /// Creates a run over `host` scoped by `request`.
    pub fn new(
        host: Arc<dyn RepositoryHost>,
        request: DiscoveryRequest,
        criteria: &'a dyn AcceptanceCriteria,
        observer: &'a mut dyn HeadObserver,
        witness: &'a mut dyn Witness,
    ) -> Self {
        Self {
            host,
            request,
            criteria,
            observer,
            witness,
            cancel: CancelToken::new(),
            caches: None,
            slots: HashMap::new(),
            scm: None,
        }
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attaches the shared cache service; enables per-pull-request
    /// metadata caching and its reconciliation against closed pull
    /// requests.
    #[must_use]
    pub fn with_caches(mut self, caches: Arc<CacheService>) -> Self {
        self.caches = Some(caches);
        self
    }

    /// Runs the state machine to completion.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Interrupted`] on cancellation and
    /// [`DiscoveryError::Host`] when a stage-level host call fails. The
    /// discovery request is closed before returning, on every path.
    pub fn run(mut self) -> Result<DiscoverySummary, DiscoveryError> {
        let outcome = self.run_stages();
        self.request.close();
        outcome
    }

    fn run_stages(&mut self) -> Result<DiscoverySummary, DiscoveryError> {
        let mut summary = DiscoverySummary::default();
        if self.request.is_empty_scope() {
            tracing::debug!("discovery scoped to zero ref kinds, nothing to do");
            return Ok(summary);
        }
        self.request.prime(&self.host, &self.cancel);

        let mut stage = Stage::Branches;
        while stage != Stage::Done {
            self.cancel.checkpoint()?;
            let satisfied = self.observer.is_satisfied();
            match stage {
                Stage::Branches => {
                    if self.request.wants_branches() && !satisfied {
                        let outcome = self.branch_stage()?;
                        self.witness.stage_complete(
                            "branches",
                            outcome.processed,
                            outcome.completed_early,
                        );
                        summary.processed += outcome.processed;
                        summary.completed_early |= outcome.completed_early;
                    }
                    stage = Stage::PullRequests;
                }
                Stage::PullRequests => {
                    if self.request.wants_pull_requests() && !satisfied {
                        let outcome = self.pull_request_stage()?;
                        self.witness.stage_complete(
                            "pull-requests",
                            outcome.processed,
                            outcome.completed_early,
                        );
                        summary.processed += outcome.processed;
                        summary.completed_early |= outcome.completed_early;
                    }
                    stage = Stage::Tags;
                }
                Stage::Tags => {
                    if self.request.wants_tags() && !satisfied {
                        let outcome = self.tag_stage()?;
                        self.witness.stage_complete(
                            "tags",
                            outcome.processed,
                            outcome.completed_early,
                        );
                        summary.processed += outcome.processed;
                        summary.completed_early |= outcome.completed_early;
                    }
                    stage = Stage::Done;
                }
                Stage::Done => {}
            }
        }
        Ok(summary)
    }

    fn scm_kind(&mut self) -> Result<ScmKind, DiscoveryError> {
        if let Some(scm) = self.scm {
            return Ok(scm);
        }
        let metadata = self.host.repository_metadata().map_err(DiscoveryError::from)?;
        self.scm = Some(metadata.scm);
        Ok(metadata.scm)
    }

    fn slot_for(&mut self, hash: &str) -> Arc<CommitSlot> {
        if let Some(slot) = self.slots.get(hash) {
            return Arc::clone(slot);
        }
        let slot = Arc::new(CommitSlot::for_commit(Arc::clone(&self.host), hash));
        self.slots.insert(hash.to_string(), Arc::clone(&slot));
        slot
    }

    fn seed_slot(&mut self, hash: &str, meta: CommitMeta) -> Arc<CommitSlot> {
        let slot = Arc::new(CommitSlot::resolved(meta));
        self.slots.insert(hash.to_string(), Arc::clone(&slot));
        slot
    }

    fn builder(&mut self) -> Result<HeadBuilder, DiscoveryError> {
        let scm = self.scm_kind()?;
        Ok(HeadBuilder::new(scm, self.host.repository().clone()))
    }

    fn branch_stage(&mut self) -> Result<StageOutcome, DiscoveryError> {
        let builder = self.builder()?;
        let Some(seq) = self.request.branches() else {
            return Ok(StageOutcome::default());
        };
        let branches = seq
            .items()
            .map_err(|err| DiscoveryError::from(err.into_inner()))?
            .to_vec();

        let mut outcome = StageOutcome::default();
        for raw in branches {
            self.cancel.checkpoint()?;
            if !self.request.restriction().wants_branch(&raw.name) {
                continue;
            }
            outcome.processed += 1;

            let head = Head::Branch(builder.branch_head(&raw));
            let name = head.name().to_string();
            let slot = self.slot_for(&raw.head_hash);
            let probe = Probe::new(
                Arc::clone(&self.host),
                name.clone(),
                Some(raw.head_hash.clone()),
                Arc::clone(&slot),
            );

            match self.criteria.accepts(&head, &probe) {
                Err(err) => return Err(err.into()),
                Ok(false) => self.witness.record(&name, WitnessOutcome::Rejected),
                Ok(true) => {
                    let revision = Revision::Simple(SimpleRevision {
                        hash: raw.head_hash.clone(),
                        meta: slot.meta(),
                    });
                    self.observer.observe(head, revision);
                    self.witness.record(&name, WitnessOutcome::Accepted);
                    if self.observer.is_satisfied() {
                        outcome.completed_early = true;
                        break;
                    }
                }
            }
        }
        Ok(outcome)
    }

    fn tag_stage(&mut self) -> Result<StageOutcome, DiscoveryError> {
        let builder = self.builder()?;
        let Some(seq) = self.request.tags() else {
            return Ok(StageOutcome::default());
        };
        let tags = seq
            .items()
            .map_err(|err| DiscoveryError::from(err.into_inner()))?
            .to_vec();

        let mut outcome = StageOutcome::default();
        for raw in tags {
            self.cancel.checkpoint()?;
            if !self.request.restriction().wants_tag(&raw.name) {
                continue;
            }
            outcome.processed += 1;

            let head = Head::Tag(builder.tag_head(&raw));
            let name = head.name().to_string();
            let slot = self.slot_for(&raw.hash);
            let probe = Probe::new(
                Arc::clone(&self.host),
                name.clone(),
                Some(raw.hash.clone()),
                Arc::clone(&slot),
            )
            .with_listed_timestamp(raw.created_at_ms);

            match self.criteria.accepts(&head, &probe) {
                Err(err) => return Err(err.into()),
                Ok(false) => self.witness.record(&name, WitnessOutcome::Rejected),
                Ok(true) => {
                    let revision = Revision::Simple(SimpleRevision {
                        hash: raw.hash.clone(),
                        meta: slot.meta(),
                    });
                    self.observer.observe(head, revision);
                    self.witness.record(&name, WitnessOutcome::Accepted);
                    if self.observer.is_satisfied() {
                        outcome.completed_early = true;
                        break;
                    }
                }
            }
        }
        Ok(outcome)
    }

    fn pull_request_stage(&mut self) -> Result<StageOutcome, DiscoveryError> {
        let builder = self.builder()?;
        let Some(seq) = self.request.pull_requests() else {
            return Ok(StageOutcome::default());
        };
        let pull_requests = seq
            .items()
            .map_err(|err| DiscoveryError::from(err.into_inner()))?
            .to_vec();

        // Every identifier in the listing is still open on the host,
        // whether or not its fork class is being discovered.
        let live: BTreeSet<u64> = pull_requests.iter().map(|pr| pr.id).collect();

        let mut outcome = StageOutcome::default();
        'pull_requests: for raw in pull_requests {
            self.cancel.checkpoint()?;
            if !self.request.restriction().wants_pull_request(raw.id) {
                continue;
            }
            let origin = builder.classify_origin(&raw);
            let strategies = self.request.strategies_for(&origin).clone();
            if strategies.is_empty() {
                continue;
            }
            outcome.processed += 1;

            if let Some(caches) = &self.caches {
                caches.pr_metadata().insert(
                    raw.id,
                    PrMetadata {
                        title: raw.title.clone(),
                        author: raw.author.clone(),
                    },
                );
            }

            // On a cloud-kind host the origin repository's commit endpoint
            // cannot see fork-only commits; scope a handle to the fork.
            let fork_scoped = origin.is_fork() && self.host.kind() == HostKind::Cloud;
            let source_host = if fork_scoped {
                self.host.for_repository(&raw.source.repo)
            } else {
                Arc::clone(&self.host)
            };

            let source = match self.resolve_pull_request_source(&raw, &source_host, fork_scoped)? {
                PrSource::Resolved { hash, slot } => Some((hash, slot)),
                PrSource::Unreadable => {
                    for head in builder.pull_request_heads(&raw, &origin, &strategies) {
                        self.witness.record(&head.name, WitnessOutcome::Skipped);
                    }
                    continue;
                }
                PrSource::Unknown => None,
            };
            let target_hash = raw.target.commit_hash.clone();
            let target_slot = target_hash.as_deref().map(|hash| self.slot_for(hash));

            for pr_head in builder.pull_request_heads(&raw, &origin, &strategies) {
                let head = Head::PullRequest(pr_head);
                let name = head.name().to_string();

                let (Some((source_hash, source_slot)), Some(target_hash), Some(target_slot)) =
                    (&source, &target_hash, &target_slot)
                else {
                    // Unresolved revision: recorded as skipped without
                    // evaluating criteria.
                    self.witness.record(&name, WitnessOutcome::Skipped);
                    continue;
                };

                let probe = Probe::new(
                    Arc::clone(&source_host),
                    name.clone(),
                    Some(source_hash.clone()),
                    Arc::clone(source_slot),
                );

                match self.criteria.accepts(&head, &probe) {
                    Err(err) => return Err(err.into()),
                    Ok(false) => self.witness.record(&name, WitnessOutcome::Rejected),
                    Ok(true) => {
                        let revision = Revision::PullRequest(PrRevision {
                            target: SimpleRevision {
                                hash: target_hash.clone(),
                                meta: target_slot.meta(),
                            },
                            source: SimpleRevision {
                                hash: source_hash.clone(),
                                meta: source_slot.meta(),
                            },
                        });
                        self.observer.observe(head, revision);
                        self.witness.record(&name, WitnessOutcome::Accepted);
                        if self.observer.is_satisfied() {
                            outcome.completed_early = true;
                            break 'pull_requests;
                        }
                    }
                }
            }
        }

        // Explicit reconciliation against possibly-closed pull requests,
        // not a TTL expiry.
        if let Some(caches) = &self.caches {
            caches.pr_metadata().retain_live(&live);
        }
        Ok(outcome)
    }

    fn resolve_pull_request_source(
        &mut self,
        raw: &RawPullRequest,
        source_host: &Arc<dyn RepositoryHost>,
        fork_scoped: bool,
    ) -> Result<PrSource, DiscoveryError> {
        let Some(hash) = raw.source.commit_hash.clone() else {
            tracing::debug!(
                pull_request = raw.id,
                "listing carried no source commit hash"
            );
            return Ok(PrSource::Unknown);
        };

        // Fork-scoped handles confirm visibility eagerly so a forbidden
        // fork skips the pull request instead of degrading silently later.
        if fork_scoped {
            return match source_host.resolve_commit(&hash) {
                Ok(Some(commit)) => Ok(PrSource::Resolved {
                    slot: self.seed_slot(&hash, commit.meta),
                    hash,
                }),
                Ok(None) => {
                    tracing::debug!(
                        pull_request = raw.id,
                        hash = %hash,
                        "source commit not found in fork"
                    );
                    Ok(PrSource::Unknown)
                }
                Err(err) if err.is_forbidden() => {
                    tracing::warn!(
                        pull_request = raw.id,
                        source_repo = %raw.source.repo,
                        "cannot read fork commits, skipping pull request"
                    );
                    Ok(PrSource::Unreadable)
                }
                Err(err) => Err(err.into()),
            };
        }

        let slot = self.slot_for(&hash);
        Ok(PrSource::Resolved { hash, slot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::head::CheckoutStrategy;
    use crate::host::{CommitMeta, InMemoryHost, PrSide, RepoCoordinates};
    use crate::observe::{AcceptAll, RecordingWitness, SnapshotObserver};

    fn widget() -> RepoCoordinates {
        RepoCoordinates::new("acme", "widget")
    }

    fn meta(author: &str, ts: i64) -> CommitMeta {
        CommitMeta {
            author: author.to_string(),
            message: format!("by {author}"),
            timestamp_ms: ts,
        }
    }

    fn shared(host: &InMemoryHost) -> Arc<dyn RepositoryHost> {
        Arc::new(host.clone())
    }

    #[test]
    fn test_empty_scope_performs_no_listing_calls() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();

        let summary = Discovery::new(
            shared(&host),
            DiscoveryRequest::new(),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .run()
        .unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(host.branch_listings(), 0);
        assert_eq!(host.tag_listings(), 0);
        assert_eq!(host.pr_listings(), 0);
    }

    #[test]
    fn test_branches_only_run_discovers_all_branches() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        host.add_branch("main", "h1");
        host.add_branch("feature-x", "h2");
        host.insert_commit("h1", meta("jane", 100));
        host.insert_commit("h2", meta("sam", 200));

        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        let summary = Discovery::new(
            shared(&host),
            DiscoveryRequest::new().with_branches(),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .run()
        .unwrap();

        assert_eq!(summary.processed, 2);
        assert!(!summary.completed_early);
        let snapshot = observer.into_snapshot();
        assert_eq!(snapshot["main"].hash(), "h1");
        assert_eq!(snapshot["feature-x"].hash(), "h2");
        assert_eq!(witness.stages, vec![("branches".to_string(), 2, false)]);
    }

    #[test]
    fn test_restriction_filters_unrequested_branches() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        host.add_branch("main", "h1");
        host.add_branch("feature-x", "h2");
        host.insert_commit("h1", meta("jane", 100));

        let mut restriction = crate::request::Restriction::default();
        restriction.branch_names.insert("main".to_string());

        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        let summary = Discovery::new(
            shared(&host),
            DiscoveryRequest::new()
                .with_branches()
                .with_restriction(restriction),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .run()
        .unwrap();

        assert_eq!(summary.processed, 1);
        assert!(observer.snapshot().contains_key("main"));
        assert!(!observer.snapshot().contains_key("feature-x"));
    }

    #[test]
    fn test_early_completion_stops_further_resolution() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        host.add_branch("main", "h1");
        host.add_branch("feature-x", "h2");
        host.add_branch("feature-y", "h3");
        host.insert_commit("h1", meta("jane", 100));

        let mut observer = SnapshotObserver::wanting(["main".to_string()]);
        let mut witness = RecordingWitness::default();
        let summary = Discovery::new(
            shared(&host),
            DiscoveryRequest::new().with_branches().with_tags(),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .run()
        .unwrap();

        assert!(summary.completed_early);
        assert_eq!(summary.processed, 1);
        // Branches after the satisfying one are never resolved, and the
        // tag stage is skipped entirely.
        assert_eq!(host.resolve_calls("h2"), 0);
        assert_eq!(host.resolve_calls("h3"), 0);
        assert_eq!(host.tag_listings(), 0);
        assert_eq!(witness.stages, vec![("branches".to_string(), 1, true)]);
    }

    #[test]
    fn test_interruption_propagates_and_closes_request() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        host.add_branch("main", "h1");
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        let result = Discovery::new(
            shared(&host),
            DiscoveryRequest::new().with_branches(),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .with_cancel(cancel)
        .run();

        assert!(matches!(result, Err(DiscoveryError::Interrupted)));
    }

    #[test]
    fn test_listing_transport_failure_aborts_the_run() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        host.fail_branch_listing(crate::error::HostError::transport("boom"));

        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        let result = Discovery::new(
            shared(&host),
            DiscoveryRequest::new().with_branches(),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .run();

        assert!(matches!(result, Err(DiscoveryError::Host(_))));
    }

    fn pr(id: u64, source_repo: RepoCoordinates, source_hash: &str) -> RawPullRequest {
        RawPullRequest {
            id,
            title: format!("change {id}"),
            author: "someone".to_string(),
            source: PrSide {
                branch: "feature-x".to_string(),
                repo: source_repo,
                commit_hash: Some(source_hash.to_string()),
            },
            target: PrSide {
                branch: "main".to_string(),
                repo: RepoCoordinates::new("acme", "widget"),
                commit_hash: Some("h1".to_string()),
            },
        }
    }

    #[test]
    fn test_origin_pull_request_yields_paired_revision() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        host.insert_commit("h1", meta("jane", 100));
        host.insert_commit("h2", meta("sam", 200));
        host.add_pull_request(pr(7, widget(), "h2"));

        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        let summary = Discovery::new(
            shared(&host),
            DiscoveryRequest::new().with_origin_pull_requests([CheckoutStrategy::Merge]),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .run()
        .unwrap();

        assert_eq!(summary.processed, 1);
        let snapshot = observer.into_snapshot();
        match &snapshot["PR-7"] {
            Revision::PullRequest(pair) => {
                assert_eq!(pair.target.hash, "h1");
                assert_eq!(pair.source.hash, "h2");
                assert_eq!(pair.source.meta.author, "sam");
            }
            other => panic!("expected paired revision, got {other:?}"),
        }
    }

    #[test]
    fn test_fork_pull_request_resolves_through_fork_scoped_handle() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        let fork = RepoCoordinates::new("outsider", "widget");
        host.add_repository(fork.clone());
        host.insert_commit("h1", meta("jane", 100));
        host.add_pull_request(pr(9, fork.clone(), "f2"));

        // The fork commit only exists in the fork's own repository.
        host.scoped(fork.clone()).insert_commit("f2", meta("sam", 200));

        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        let summary = Discovery::new(
            shared(&host),
            DiscoveryRequest::new().with_fork_pull_requests([CheckoutStrategy::Head]),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .run()
        .unwrap();

        assert_eq!(summary.processed, 1);
        assert!(observer.snapshot().contains_key("PR-9"));
        // The source resolution went to the fork's repository, not the
        // origin's.
        let scopes = host.resolve_scopes();
        assert!(scopes.contains(&(fork, "f2".to_string())));
        assert!(!scopes.contains(&(widget(), "f2".to_string())));
    }

    #[test]
    fn test_forbidden_fork_is_skipped_and_run_continues() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        let fork = RepoCoordinates::new("outsider", "widget");
        host.add_repository(fork.clone());
        host.forbid(&fork);
        host.insert_commit("h1", meta("jane", 100));
        host.insert_commit("h2", meta("sam", 200));
        host.add_pull_request(pr(9, fork, "f2"));
        host.add_pull_request(pr(7, widget(), "h2"));

        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        let summary = Discovery::new(
            shared(&host),
            DiscoveryRequest::new()
                .with_origin_pull_requests([CheckoutStrategy::Merge])
                .with_fork_pull_requests([CheckoutStrategy::Merge]),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .run()
        .unwrap();

        assert_eq!(summary.processed, 2);
        let snapshot = observer.into_snapshot();
        assert!(!snapshot.contains_key("PR-9"));
        assert!(snapshot.contains_key("PR-7"));
    }

    #[test]
    fn test_pr_metadata_is_cached_and_pruned_when_closed() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        host.insert_commit("h1", meta("jane", 100));
        host.insert_commit("h2", meta("sam", 200));
        host.add_pull_request(pr(7, widget(), "h2"));

        let caches = Arc::new(CacheService::default());
        let request =
            || DiscoveryRequest::new().with_origin_pull_requests([CheckoutStrategy::Merge]);

        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        Discovery::new(shared(&host), request(), &AcceptAll, &mut observer, &mut witness)
            .with_caches(Arc::clone(&caches))
            .run()
            .unwrap();
        assert!(caches.pr_metadata().get(7).is_some());

        // Close the pull request on the host and re-run discovery.
        host.close_pull_request(7);
        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        Discovery::new(shared(&host), request(), &AcceptAll, &mut observer, &mut witness)
            .with_caches(Arc::clone(&caches))
            .run()
            .unwrap();
        assert!(caches.pr_metadata().get(7).is_none());
    }

    #[test]
    fn test_target_commit_data_is_shared_with_branch_stage() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        host.add_branch("main", "h1");
        host.insert_commit("h1", meta("jane", 100));
        host.insert_commit("h2", meta("sam", 200));
        host.add_pull_request(pr(7, widget(), "h2"));

        let mut observer = SnapshotObserver::new();
        let mut witness = RecordingWitness::default();
        Discovery::new(
            shared(&host),
            DiscoveryRequest::new()
                .with_branches()
                .with_origin_pull_requests([CheckoutStrategy::Merge]),
            &AcceptAll,
            &mut observer,
            &mut witness,
        )
        .run()
        .unwrap();

        // "main" was resolved during the branch stage; the pull request's
        // target half reuses the same slot.
        assert_eq!(host.resolve_calls("h1"), 1);
    }
}
