//! Cached team and repository lookups.
//!
//! Discovery consumers routinely render the owning team's profile and the
//! owner's repository list next to discovery output. Both lookups go
//! through the process-wide [`CacheService`] so that concurrent discovery
//! runs share fetches; repository listings are additionally keyed by the
//! acting credential, since different credentials may see different
//! repository sets, and are sorted by slug for deterministic output.
//!
//! The cache service is an explicit value with injected lifetime —
//! constructed on startup, cleared on demand — so tests build isolated
//! instances instead of sharing static state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{BoundedCache, CacheConfig, PrMetadataCache};
use crate::error::HostError;
use crate::host::ScmKind;

/// A team/org profile as rendered next to discovery output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamProfile {
    /// Owner key.
    pub owner: String,
    /// Display name.
    pub display_name: String,
    /// Avatar URL, when the host exposes one.
    pub avatar_url: Option<String>,
}

/// One repository in an owner's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    /// Owner key.
    pub owner: String,
    /// Repository slug.
    pub slug: String,
    /// VCS flavor.
    pub scm: ScmKind,
    /// Default branch, when the host reports one.
    pub default_branch: Option<String>,
}

/// Cache key for repository listings: owner plus acting credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    /// Owner whose repositories are listed.
    pub owner: String,
    /// Identity of the credential performing the listing.
    pub credential: String,
}

/// Directory read capability of the hosting service.
pub trait HostDirectory: Send + Sync {
    /// Fetches the profile of `owner`; `None` when the owner is a plain
    /// user without a team profile.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] on transport failure or denied access.
    fn team_profile(&self, owner: &str) -> Result<Option<TeamProfile>, HostError>;

    /// Lists the repositories of `owner` visible to the acting credential.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotFound`] when the owner is absent.
    fn list_repositories(&self, owner: &str) -> Result<Vec<RepositorySummary>, HostError>;
}

/// Process-wide shared caches.
pub struct CacheService {
    teams: BoundedCache<String, Option<TeamProfile>>,
    repositories: BoundedCache<ListingKey, Vec<RepositorySummary>>,
    pr_metadata: PrMetadataCache,
}

impl CacheService {
    /// Creates the service with one configuration for both bounded caches.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            teams: BoundedCache::new(config.clone()),
            repositories: BoundedCache::new(config),
            pr_metadata: PrMetadataCache::new(),
        }
    }

    /// The team-profile cache.
    #[must_use]
    pub const fn teams(&self) -> &BoundedCache<String, Option<TeamProfile>> {
        &self.teams
    }

    /// The repository-listing cache.
    #[must_use]
    pub const fn repositories(&self) -> &BoundedCache<ListingKey, Vec<RepositorySummary>> {
        &self.repositories
    }

    /// The per-pull-request metadata cache.
    #[must_use]
    pub const fn pr_metadata(&self) -> &PrMetadataCache {
        &self.pr_metadata
    }

    /// Clears every cache.
    pub fn clear(&self) {
        self.teams.clear();
        self.repositories.clear();
        self.pr_metadata.clear();
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Cached directory view for one credential.
pub struct Directory {
    source: Arc<dyn HostDirectory>,
    caches: Arc<CacheService>,
    credential: String,
}

impl Directory {
    /// Creates a directory view over `source`, caching through `caches`.
    /// `credential` names the acting identity for listing-cache keying.
    pub fn new(
        source: Arc<dyn HostDirectory>,
        caches: Arc<CacheService>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            source,
            caches,
            credential: credential.into(),
        }
    }

    /// The team profile of `owner`, fetched at most once per cache window.
    ///
    /// # Errors
    ///
    /// Propagates the underlying lookup failure.
    pub fn team(&self, owner: &str) -> Result<Option<TeamProfile>, HostError> {
        let source = Arc::clone(&self.source);
        let key = owner.to_string();
        self.caches
            .teams()
            .get_or_compute(key, move || source.team_profile(owner))
    }

    /// The repositories of `owner` visible to this credential, sorted by
    /// slug.
    ///
    /// # Errors
    ///
    /// Propagates the underlying listing failure.
    pub fn repositories(&self, owner: &str) -> Result<Vec<RepositorySummary>, HostError> {
        let source = Arc::clone(&self.source);
        let key = ListingKey {
            owner: owner.to_string(),
            credential: self.credential.clone(),
        };
        self.caches.repositories().get_or_compute(key, move || {
            let mut listed = source.list_repositories(owner)?;
            listed.sort_by(|a, b| a.slug.cmp(&b.slug));
            Ok(listed)
        })
    }
}
