//! Turning raw refs into candidate heads.
//!
//! The builder is pure: it classifies origin vs. fork, synthesizes stable
//! head names, and expands a pull request into one head per configured
//! checkout strategy. Network-backed steps (resolving fork commits,
//! constructing metadata slots) stay in the reconciliation driver.
//!
//! # Naming
//!
//! A pull request named with exactly one strategy for its fork class keeps
//! the plain `PR-<id>` name; with more than one strategy each head gets a
//! `PR-<id>-<strategy>` suffix, so names stay unique within a run.

use std::collections::BTreeSet;

use crate::head::{BranchHead, CheckoutStrategy, PrHead, PrOrigin, TagHead};
use crate::host::{RawBranch, RawPullRequest, RawTag, RepoCoordinates, ScmKind};

/// Per-ref-kind head construction for one discovery run.
#[derive(Debug, Clone)]
pub struct HeadBuilder {
    scm: ScmKind,
    target_repo: RepoCoordinates,
}

impl HeadBuilder {
    /// Creates a builder for the discovery target repository.
    #[must_use]
    pub fn new(scm: ScmKind, target_repo: RepoCoordinates) -> Self {
        Self { scm, target_repo }
    }

    /// Branch → exactly one branch head.
    #[must_use]
    pub fn branch_head(&self, raw: &RawBranch) -> BranchHead {
        BranchHead {
            name: raw.name.clone(),
            scm: self.scm,
        }
    }

    /// Tag → exactly one tag head carrying the listing's creation
    /// timestamp.
    #[must_use]
    pub fn tag_head(&self, raw: &RawTag) -> TagHead {
        TagHead {
            name: raw.name.clone(),
            created_at_ms: raw.created_at_ms,
            scm: self.scm,
        }
    }

    /// Classifies a pull request against the discovery target repository.
    #[must_use]
    pub fn classify_origin(&self, raw: &RawPullRequest) -> PrOrigin {
        if raw.source.repo == self.target_repo {
            PrOrigin::Origin
        } else {
            PrOrigin::Fork {
                author: raw.author.clone(),
            }
        }
    }

    /// Pull request → one head per strategy in `strategies`.
    ///
    /// Returns an empty vector when no strategy is configured for the
    /// pull request's fork class (that class was not requested).
    #[must_use]
    pub fn pull_request_heads(
        &self,
        raw: &RawPullRequest,
        origin: &PrOrigin,
        strategies: &BTreeSet<CheckoutStrategy>,
    ) -> Vec<PrHead> {
        let sole = strategies.len() == 1;
        strategies
            .iter()
            .map(|&strategy| PrHead {
                name: pull_request_head_name(raw.id, strategy, sole),
                id: raw.id,
                source_branch: raw.source.branch.clone(),
                source_repo: raw.source.repo.clone(),
                origin: origin.clone(),
                target: BranchHead {
                    name: raw.target.branch.clone(),
                    scm: self.scm,
                },
                strategy,
            })
            .collect()
    }
}

/// Synthesizes the stable head name for one pull-request candidate.
#[must_use]
pub fn pull_request_head_name(id: u64, strategy: CheckoutStrategy, sole: bool) -> String {
    if sole {
        format!("PR-{id}")
    } else {
        format!("PR-{id}-{strategy}")
    }
}
