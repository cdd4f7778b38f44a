//! Abstract repository-host capability.
//!
//! The engine never talks HTTP itself. Everything it needs from a remote
//! hosting service is expressed as the [`RepositoryHost`] trait: paginated
//! read access to branches, tags, and pull requests, single-commit
//! resolution, a commit/path existence check, and repository metadata.
//! Concrete bindings (transport, retry-on-429, pagination cursors,
//! authentication) live outside this crate.
//!
//! # Rate limiting
//!
//! Implementations must absorb rate-limit responses internally — pause and
//! retry rather than surfacing an error. The engine only ever observes
//! latency.
//!
//! # Not-found policy
//!
//! Listing calls raise [`HostError::NotFound`](crate::error::HostError) when
//! the repository itself is absent (never an empty success). Single-commit
//! resolution returns `Ok(None)` for an unknown hash so callers can log and
//! continue.

mod memory;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use memory::InMemoryHost;

use crate::cancel::CancelToken;
use crate::error::HostError;

/// Distributed-VCS flavor of a repository.
///
/// The two flavors differ in commit-reachability semantics, which matters
/// when deciding how a pull request's source commits can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    /// Git repository.
    Git,
    /// Mercurial repository.
    Mercurial,
}

impl ScmKind {
    /// Returns the lowercase wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Mercurial => "mercurial",
        }
    }
}

/// Hosting-service kind.
///
/// On a [`HostKind::Cloud`] service, forks have independent commit
/// reachability: the origin repository's commit endpoint cannot see
/// fork-only commits, so fork pull requests must be resolved through a
/// handle scoped to the fork's own repository. Self-hosted services share
/// reachability and the origin handle suffices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKind {
    /// Cloud-style service; forks are independently reachable.
    Cloud,
    /// Self-hosted service; fork commits are reachable from the origin.
    SelfHosted,
}

/// Owner + slug coordinates of one repository on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoCoordinates {
    /// Owning user or team.
    pub owner: String,
    /// Repository slug.
    pub slug: String,
}

impl RepoCoordinates {
    /// Creates coordinates from owner and slug.
    pub fn new(owner: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            slug: slug.into(),
        }
    }
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

/// One clone URL advertised by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneLink {
    /// Protocol name (`http`, `ssh`).
    pub protocol: String,
    /// Clone URL.
    pub url: String,
}

/// Repository metadata returned by [`RepositoryHost::repository_metadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    /// VCS flavor of the repository.
    pub scm: ScmKind,
    /// Default branch name, when the host reports one.
    pub default_branch: Option<String>,
    /// Advertised clone URLs.
    pub clone_links: Vec<CloneLink>,
}

/// Commit metadata fetched lazily per distinct ref.
///
/// `Default` yields the degraded form (empty author/message, zero
/// timestamp) used when resolution fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// Author display string.
    pub author: String,
    /// Commit message.
    pub message: String,
    /// Commit timestamp in epoch milliseconds.
    pub timestamp_ms: i64,
}

/// A resolved commit: immutable hash plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit hash.
    pub hash: String,
    /// Author/message/timestamp metadata.
    pub meta: CommitMeta,
}

/// A branch as returned by the host listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBranch {
    /// Branch name.
    pub name: String,
    /// Head commit hash.
    pub head_hash: String,
}

/// A tag as returned by the host listing.
///
/// The creation timestamp is carried from the listing payload so that
/// last-modified checks on tag heads never need a second network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTag {
    /// Tag name.
    pub name: String,
    /// Tagged commit hash.
    pub hash: String,
    /// Tag creation timestamp in epoch milliseconds.
    pub created_at_ms: i64,
}

/// One side (source or target) of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrSide {
    /// Branch name on this side.
    pub branch: String,
    /// Repository the branch lives in.
    pub repo: RepoCoordinates,
    /// Head commit hash, when the listing payload included one.
    pub commit_hash: Option<String>,
}

/// A pull request as returned by the host listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPullRequest {
    /// Host-assigned pull request identifier.
    pub id: u64,
    /// Title at listing time.
    pub title: String,
    /// Contributor login/name.
    pub author: String,
    /// Source side (the contribution).
    pub source: PrSide,
    /// Target side (where it would merge).
    pub target: PrSide,
}

/// Read capability over one repository on a remote hosting service.
///
/// Listing calls accept a [`CancelToken`] so implementations can honor
/// cooperative cancellation between page fetches; an interrupted fetch
/// returns [`HostError::Interrupted`].
pub trait RepositoryHost: Send + Sync {
    /// Returns the hosting-service kind.
    fn kind(&self) -> HostKind;

    /// Returns the repository this handle is scoped to.
    fn repository(&self) -> &RepoCoordinates;

    /// Lists branches.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotFound`] when the repository itself is absent,
    /// [`HostError::Forbidden`] on denied access, [`HostError::Interrupted`]
    /// when cancelled between pages, and [`HostError::Transport`] on I/O
    /// failure.
    fn list_branches(&self, cancel: &CancelToken) -> Result<Vec<RawBranch>, HostError>;

    /// Lists tags. Same error contract as [`RepositoryHost::list_branches`].
    ///
    /// # Errors
    ///
    /// See [`RepositoryHost::list_branches`].
    fn list_tags(&self, cancel: &CancelToken) -> Result<Vec<RawTag>, HostError>;

    /// Lists open pull requests targeting this repository. Same error
    /// contract as [`RepositoryHost::list_branches`].
    ///
    /// # Errors
    ///
    /// See [`RepositoryHost::list_branches`].
    fn list_pull_requests(&self, cancel: &CancelToken)
    -> Result<Vec<RawPullRequest>, HostError>;

    /// Resolves a single commit by hash.
    ///
    /// Returns `Ok(None)` for an unknown hash; [`HostError::Forbidden`] when
    /// the acting credential cannot see into this repository (the fork
    /// case).
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Forbidden`] or [`HostError::Transport`].
    fn resolve_commit(&self, hash: &str) -> Result<Option<Commit>, HostError>;

    /// Checks whether `path` exists at `ref_or_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Transport`] on I/O failure; this one is allowed
    /// to fail a run since it indicates a transport problem, not a
    /// data-availability gap.
    fn path_exists(&self, ref_or_hash: &str, path: &str) -> Result<bool, HostError>;

    /// Returns repository metadata (VCS flavor, default branch, clone
    /// links).
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotFound`] when the repository is absent.
    fn repository_metadata(&self) -> Result<RepositoryMetadata, HostError>;

    /// Returns a handle scoped to a different repository on the same
    /// service, sharing the credential of this handle.
    ///
    /// Used to resolve fork-only commits on [`HostKind::Cloud`] services.
    fn for_repository(&self, repo: &RepoCoordinates) -> Arc<dyn RepositoryHost>;
}
