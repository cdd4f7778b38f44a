//! In-memory [`RepositoryHost`] for tests and examples.
//!
//! Holds a fixed snapshot of branches/tags/pull-requests per repository and
//! counts every listing and resolution call, so tests can assert the
//! engine's laziness and memoization properties (a discovery scoped to zero
//! ref-kinds performs zero listing calls; a twice-accessed commit resolves
//! at most once).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::cancel::CancelToken;
use crate::error::HostError;

use super::{
    CloneLink, Commit, CommitMeta, HostKind, RawBranch, RawPullRequest, RawTag, RepoCoordinates,
    RepositoryHost, RepositoryMetadata, ScmKind,
};

/// Per-repository fixture data.
#[derive(Default)]
struct RepoFixture {
    branches: Vec<RawBranch>,
    tags: Vec<RawTag>,
    pull_requests: Vec<RawPullRequest>,
    commits: HashMap<String, CommitMeta>,
    /// `(ref_or_hash, path)` pairs that exist.
    paths: HashSet<(String, String)>,
    metadata: Option<RepositoryMetadata>,
    /// When set, any access into this repository is denied.
    forbidden: bool,
    /// Injected listing failures, returned once per listing call.
    branch_listing_error: Option<HostError>,
    pr_listing_error: Option<HostError>,
}

/// Aggregated call counters.
#[derive(Default)]
struct Counters {
    branch_listings: usize,
    tag_listings: usize,
    pr_listings: usize,
    path_checks: usize,
    /// Resolution calls per commit hash.
    resolves: HashMap<String, usize>,
    /// `(repository, hash)` per resolution call, in call order.
    resolve_scopes: Vec<(RepoCoordinates, String)>,
}

struct ServiceState {
    kind: HostKind,
    repos: HashMap<RepoCoordinates, RepoFixture>,
    counters: Counters,
}

/// In-memory hosting service. Cloning the handle or scoping it to another
/// repository (`for_repository`) shares the same underlying snapshot and
/// counters.
#[derive(Clone)]
pub struct InMemoryHost {
    state: Arc<Mutex<ServiceState>>,
    scope: RepoCoordinates,
}

impl InMemoryHost {
    /// Creates a service with one repository.
    #[must_use]
    pub fn new(kind: HostKind, repo: RepoCoordinates) -> Self {
        let mut repos = HashMap::new();
        repos.insert(
            repo.clone(),
            RepoFixture {
                metadata: Some(default_metadata()),
                ..RepoFixture::default()
            },
        );
        Self {
            state: Arc::new(Mutex::new(ServiceState {
                kind,
                repos,
                counters: Counters::default(),
            })),
            scope: repo,
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ServiceState) -> R) -> R {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state)
    }

    fn with_fixture<R>(&self, f: impl FnOnce(&mut RepoFixture) -> R) -> R {
        let scope = self.scope.clone();
        self.with_state(|state| f(state.repos.entry(scope).or_default()))
    }

    /// Returns a concrete handle scoped to `repo`, sharing this service's
    /// snapshot and counters. Useful for seeding fork fixtures.
    #[must_use]
    pub fn scoped(&self, repo: RepoCoordinates) -> Self {
        Self {
            state: Arc::clone(&self.state),
            scope: repo,
        }
    }

    /// Registers another repository (a fork) on the same service.
    pub fn add_repository(&self, repo: RepoCoordinates) {
        self.with_state(|state| {
            state.repos.entry(repo).or_insert_with(|| RepoFixture {
                metadata: Some(default_metadata()),
                ..RepoFixture::default()
            });
        });
    }

    /// Denies all access into `repo`.
    pub fn forbid(&self, repo: &RepoCoordinates) {
        let repo = repo.clone();
        self.with_state(|state| {
            state.repos.entry(repo).or_default().forbidden = true;
        });
    }

    /// Adds a branch to the scoped repository.
    pub fn add_branch(&self, name: impl Into<String>, head_hash: impl Into<String>) {
        let branch = RawBranch {
            name: name.into(),
            head_hash: head_hash.into(),
        };
        self.with_fixture(|fixture| fixture.branches.push(branch));
    }

    /// Adds a tag to the scoped repository.
    pub fn add_tag(
        &self,
        name: impl Into<String>,
        hash: impl Into<String>,
        created_at_ms: i64,
    ) {
        let tag = RawTag {
            name: name.into(),
            hash: hash.into(),
            created_at_ms,
        };
        self.with_fixture(|fixture| fixture.tags.push(tag));
    }

    /// Adds an open pull request to the scoped repository.
    pub fn add_pull_request(&self, pr: RawPullRequest) {
        self.with_fixture(|fixture| fixture.pull_requests.push(pr));
    }

    /// Removes a pull request (simulates it being closed on the host).
    pub fn close_pull_request(&self, id: u64) {
        self.with_fixture(|fixture| fixture.pull_requests.retain(|pr| pr.id != id));
    }

    /// Registers commit metadata in the scoped repository.
    pub fn insert_commit(&self, hash: impl Into<String>, meta: CommitMeta) {
        let hash = hash.into();
        self.with_fixture(|fixture| fixture.commits.insert(hash, meta));
    }

    /// Marks `path` as existing at `ref_or_hash` in the scoped repository.
    pub fn add_path(&self, ref_or_hash: impl Into<String>, path: impl Into<String>) {
        let key = (ref_or_hash.into(), path.into());
        self.with_fixture(|fixture| fixture.paths.insert(key));
    }

    /// Overrides the scoped repository's metadata.
    pub fn set_metadata(&self, metadata: RepositoryMetadata) {
        self.with_fixture(|fixture| fixture.metadata = Some(metadata));
    }

    /// Makes the next branch listing fail with `err`.
    pub fn fail_branch_listing(&self, err: HostError) {
        self.with_fixture(|fixture| fixture.branch_listing_error = Some(err));
    }

    /// Makes the next pull-request listing fail with `err`.
    pub fn fail_pr_listing(&self, err: HostError) {
        self.with_fixture(|fixture| fixture.pr_listing_error = Some(err));
    }

    /// Number of branch listing calls issued service-wide.
    #[must_use]
    pub fn branch_listings(&self) -> usize {
        self.with_state(|state| state.counters.branch_listings)
    }

    /// Number of tag listing calls issued service-wide.
    #[must_use]
    pub fn tag_listings(&self) -> usize {
        self.with_state(|state| state.counters.tag_listings)
    }

    /// Number of pull-request listing calls issued service-wide.
    #[must_use]
    pub fn pr_listings(&self) -> usize {
        self.with_state(|state| state.counters.pr_listings)
    }

    /// Number of path-existence checks issued service-wide.
    #[must_use]
    pub fn path_checks(&self) -> usize {
        self.with_state(|state| state.counters.path_checks)
    }

    /// Number of resolution calls issued for `hash`, service-wide.
    #[must_use]
    pub fn resolve_calls(&self, hash: &str) -> usize {
        self.with_state(|state| state.counters.resolves.get(hash).copied().unwrap_or(0))
    }

    /// `(repository, hash)` per resolution call, in call order.
    #[must_use]
    pub fn resolve_scopes(&self) -> Vec<(RepoCoordinates, String)> {
        self.with_state(|state| state.counters.resolve_scopes.clone())
    }

}

fn fixture_mut<'a>(
    state: &'a mut ServiceState,
    scope: &RepoCoordinates,
) -> Result<&'a mut RepoFixture, HostError> {
    let fixture = state
        .repos
        .get_mut(scope)
        .ok_or_else(|| HostError::not_found(scope.to_string()))?;
    if fixture.forbidden {
        return Err(HostError::forbidden(scope.to_string()));
    }
    Ok(fixture)
}

fn default_metadata() -> RepositoryMetadata {
    RepositoryMetadata {
        scm: ScmKind::Git,
        default_branch: Some("main".to_string()),
        clone_links: Vec::new(),
    }
}

impl RepositoryHost for InMemoryHost {
    fn kind(&self) -> HostKind {
        self.with_state(|state| state.kind)
    }

    fn repository(&self) -> &RepoCoordinates {
        &self.scope
    }

    fn list_branches(&self, cancel: &CancelToken) -> Result<Vec<RawBranch>, HostError> {
        if cancel.is_cancelled() {
            return Err(HostError::Interrupted);
        }
        self.with_state(|state| {
            state.counters.branch_listings += 1;
            let fixture = fixture_mut(state, &self.scope)?;
            if let Some(err) = fixture.branch_listing_error.take() {
                return Err(err);
            }
            Ok(fixture.branches.clone())
        })
    }

    fn list_tags(&self, cancel: &CancelToken) -> Result<Vec<RawTag>, HostError> {
        if cancel.is_cancelled() {
            return Err(HostError::Interrupted);
        }
        self.with_state(|state| {
            state.counters.tag_listings += 1;
            Ok(fixture_mut(state, &self.scope)?.tags.clone())
        })
    }

    fn list_pull_requests(
        &self,
        cancel: &CancelToken,
    ) -> Result<Vec<RawPullRequest>, HostError> {
        if cancel.is_cancelled() {
            return Err(HostError::Interrupted);
        }
        self.with_state(|state| {
            state.counters.pr_listings += 1;
            let fixture = fixture_mut(state, &self.scope)?;
            if let Some(err) = fixture.pr_listing_error.take() {
                return Err(err);
            }
            Ok(fixture.pull_requests.clone())
        })
    }

    fn resolve_commit(&self, hash: &str) -> Result<Option<Commit>, HostError> {
        self.with_state(|state| {
            *state.counters.resolves.entry(hash.to_string()).or_insert(0) += 1;
            state
                .counters
                .resolve_scopes
                .push((self.scope.clone(), hash.to_string()));
            let fixture = fixture_mut(state, &self.scope)?;
            Ok(fixture.commits.get(hash).map(|meta| Commit {
                hash: hash.to_string(),
                meta: meta.clone(),
            }))
        })
    }

    fn path_exists(&self, ref_or_hash: &str, path: &str) -> Result<bool, HostError> {
        self.with_state(|state| {
            state.counters.path_checks += 1;
            let key = (ref_or_hash.to_string(), path.to_string());
            Ok(fixture_mut(state, &self.scope)?.paths.contains(&key))
        })
    }

    fn repository_metadata(&self) -> Result<RepositoryMetadata, HostError> {
        self.with_state(|state| {
            fixture_mut(state, &self.scope)?
                .metadata
                .clone()
                .ok_or_else(|| HostError::not_found(self.scope.to_string()))
        })
    }

    fn for_repository(&self, repo: &RepoCoordinates) -> Arc<dyn RepositoryHost> {
        Arc::new(Self {
            state: Arc::clone(&self.state),
            scope: repo.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> RepoCoordinates {
        RepoCoordinates::new("acme", "widget")
    }

    #[test]
    fn test_listing_counts_and_contents() {
        let host = InMemoryHost::new(HostKind::SelfHosted, widget());
        host.add_branch("main", "h1");
        let cancel = CancelToken::new();

        let branches = host.list_branches(&cancel).unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name, "main");
        assert_eq!(host.branch_listings(), 1);
    }

    #[test]
    fn test_unknown_repository_listing_is_not_found() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        let elsewhere = host.for_repository(&RepoCoordinates::new("ghost", "repo"));
        let err = elsewhere.list_branches(&CancelToken::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_forbidden_repository_denies_resolution() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        let fork = RepoCoordinates::new("outsider", "widget");
        host.add_repository(fork.clone());
        host.forbid(&fork);

        let scoped = host.for_repository(&fork);
        let err = scoped.resolve_commit("h9").unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_resolve_counts_per_hash() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        host.insert_commit("h1", CommitMeta::default());
        let _ = host.resolve_commit("h1");
        let _ = host.resolve_commit("h1");
        assert_eq!(host.resolve_calls("h1"), 2);
        assert_eq!(host.resolve_calls("h2"), 0);
    }

    #[test]
    fn test_metadata_override_is_served_back() {
        let host = InMemoryHost::new(HostKind::SelfHosted, widget());
        host.set_metadata(RepositoryMetadata {
            scm: ScmKind::Mercurial,
            default_branch: Some("default".to_string()),
            clone_links: vec![CloneLink {
                protocol: "ssh".to_string(),
                url: "ssh://host/acme/widget".to_string(),
            }],
        });

        let metadata = host.repository_metadata().unwrap();
        assert_eq!(metadata.scm, ScmKind::Mercurial);
        assert_eq!(metadata.default_branch.as_deref(), Some("default"));
        assert_eq!(metadata.clone_links[0].protocol, "ssh");
    }

    #[test]
    fn test_cancelled_listing_is_interrupted() {
        let host = InMemoryHost::new(HostKind::Cloud, widget());
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = host.list_branches(&cancel).unwrap_err();
        assert!(err.is_interrupted());
    }
}
