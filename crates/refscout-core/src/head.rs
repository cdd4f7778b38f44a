//! Heads and revisions.
//!
//! A head is a named, discoverable line of development; a revision is the
//! immutable binding of a head to a concrete commit. Both are closed sum
//! types: the set of kinds is known at design time, so the head builder and
//! the reconciliation driver match exhaustively instead of dispatching
//! through open-ended polymorphism.
//!
//! A pull-request head stores a value copy of its target branch head, never
//! a live reference into the target's own discovery record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::{CommitMeta, RepoCoordinates, ScmKind};

/// How a pull request should be materialized at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStrategy {
    /// The merge result with the target branch.
    Merge,
    /// The raw head of the source branch.
    Head,
}

impl CheckoutStrategy {
    /// Returns the lowercase wire representation, also used as the head
    /// name suffix when more than one strategy applies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Head => "head",
        }
    }
}

impl fmt::Display for CheckoutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a pull request comes from the discovery target repository or
/// from a fork of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum PrOrigin {
    /// Source repository is the discovery target itself.
    Origin,
    /// Source repository is a fork.
    Fork {
        /// Contributor identity.
        author: String,
    },
}

impl PrOrigin {
    /// Returns `true` for fork-originated pull requests.
    #[must_use]
    pub const fn is_fork(&self) -> bool {
        matches!(self, Self::Fork { .. })
    }
}

/// A branch head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    /// Branch name.
    pub name: String,
    /// VCS flavor of the repository the branch lives in.
    pub scm: ScmKind,
}

/// A tag head. Immutable once observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagHead {
    /// Tag name.
    pub name: String,
    /// Tag creation timestamp in epoch milliseconds.
    pub created_at_ms: i64,
    /// VCS flavor of the repository the tag lives in.
    pub scm: ScmKind,
}

/// A pull-request head: one candidate per configured checkout strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrHead {
    /// Synthetic head name: `PR-<id>` or `PR-<id>-<strategy>`.
    pub name: String,
    /// Host-assigned pull request identifier.
    pub id: u64,
    /// Source branch name.
    pub source_branch: String,
    /// Source repository coordinates.
    pub source_repo: RepoCoordinates,
    /// Origin classification.
    pub origin: PrOrigin,
    /// Value copy of the target branch head.
    pub target: BranchHead,
    /// Checkout strategy this head represents.
    pub strategy: CheckoutStrategy,
}

/// A named, typed pointer to a line of development.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Head {
    /// Branch head.
    Branch(BranchHead),
    /// Tag head.
    Tag(TagHead),
    /// Pull-request head.
    PullRequest(PrHead),
}

impl Head {
    /// The head's unique name within a discovery run.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Branch(head) => &head.name,
            Self::Tag(head) => &head.name,
            Self::PullRequest(head) => &head.name,
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binding of one head to one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleRevision {
    /// Commit hash. Never changes for the same head within a run.
    pub hash: String,
    /// Commit metadata, populated at most once per ref.
    pub meta: CommitMeta,
}

/// Paired revision for a pull-request head. Equality and trust decisions
/// operate on the pair, not on either half alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrRevision {
    /// Binding of the pull request's target head.
    pub target: SimpleRevision,
    /// Binding of the pull request's own head.
    pub source: SimpleRevision,
}

/// Immutable binding of a head to a concrete revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Revision {
    /// Single-commit binding.
    Simple(SimpleRevision),
    /// Source/target pair for a pull-request head.
    PullRequest(PrRevision),
}

impl Revision {
    /// The hash this revision would be checked out at: the commit itself,
    /// or the source half of a pull-request pair.
    #[must_use]
    pub fn hash(&self) -> &str {
        match self {
            Self::Simple(revision) => &revision.hash,
            Self::PullRequest(revision) => &revision.source.hash,
        }
    }
}
