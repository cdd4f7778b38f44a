//! Trust decisions for fork-originated pull requests.
//!
//! A pull request from a fork carries content from a potentially untrusted
//! contributor. The trust evaluator decides whether the *source* side may
//! supply security-sensitive build configuration, or whether the *target*
//! side's revision must be used instead. The decision runs independently of
//! a full discovery pass: it scopes a minimal, criteria-free
//! [`DiscoveryRequest`] to authority checking only.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::head::{PrHead, PrOrigin, PrRevision, SimpleRevision};
use crate::request::DiscoveryRequest;

/// Who may supply build configuration from a fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum TrustRule {
    /// No fork is trusted; every fork pull request builds against its
    /// target's content.
    Nobody,
    /// Every fork is trusted.
    Everyone,
    /// Forks are trusted when the contributor is in the allowlist.
    Authors {
        /// Trusted contributor identities.
        allowed: BTreeSet<String>,
    },
}

impl TrustRule {
    /// Decides whether `head` may supply its own build definition.
    ///
    /// Origin pull requests are always trusted — their source is the
    /// discovery target repository itself.
    #[must_use]
    pub fn trusts(&self, head: &PrHead) -> bool {
        match &head.origin {
            PrOrigin::Origin => true,
            PrOrigin::Fork { author } => match self {
                Self::Nobody => false,
                Self::Everyone => true,
                Self::Authors { allowed } => allowed.contains(author),
            },
        }
    }
}

/// Trust evaluator over one configured rule.
#[derive(Debug, Clone)]
pub struct TrustEvaluator {
    rule: TrustRule,
}

impl TrustEvaluator {
    /// Creates an evaluator for `rule`.
    #[must_use]
    pub const fn new(rule: TrustRule) -> Self {
        Self { rule }
    }

    /// The minimal request an authority check runs under: zero ref kinds,
    /// no restriction, no criteria.
    #[must_use]
    pub fn authority_request() -> DiscoveryRequest {
        DiscoveryRequest::authority()
    }

    /// Whether `head` is trusted to supply its own build definition.
    #[must_use]
    pub fn trusts(&self, head: &PrHead) -> bool {
        // Authority checks share the request vocabulary of a discovery run
        // but never iterate refs; the scoped request is closed immediately.
        let mut request = Self::authority_request();
        let decision = self.rule.trusts(head);
        request.close();
        decision
    }

    /// The revision whose content may be used for security-sensitive build
    /// configuration: the pull request's own source half when trusted, the
    /// target half otherwise.
    #[must_use]
    pub fn trusted_revision(&self, head: &PrHead, revision: &PrRevision) -> SimpleRevision {
        if self.trusts(head) {
            revision.source.clone()
        } else {
            tracing::debug!(
                head = %head.name,
                "untrusted fork pull request, substituting target revision"
            );
            revision.target.clone()
        }
    }
}
