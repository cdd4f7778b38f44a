//! Acceptance criteria, observers, and the witness channel.
//!
//! The reconciliation driver consults an [`AcceptanceCriteria`] only when a
//! head has a resolvable revision, delivers accepted heads to a
//! [`HeadObserver`], and reports every accept/reject/skip decision through
//! a [`Witness`] so a long-running discovery is observable without waiting
//! for full completion. An observer that declares itself satisfied
//! short-circuits the remaining refs of the current stage.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::HostError;
use crate::head::{Head, Revision};
use crate::probe::Probe;

/// Caller-supplied acceptance predicate.
pub trait AcceptanceCriteria {
    /// Decides whether `head` meets the criteria.
    ///
    /// # Errors
    ///
    /// May propagate a transport failure from the probe, which aborts the
    /// current stage.
    fn accepts(&self, head: &Head, probe: &Probe) -> Result<bool, HostError>;
}

/// Accepts every head; the default when a caller wants the full snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AcceptanceCriteria for AcceptAll {
    fn accepts(&self, _head: &Head, _probe: &Probe) -> Result<bool, HostError> {
        Ok(true)
    }
}

/// Accepts heads whose revision contains a marker path (a build definition
/// file, typically).
#[derive(Debug, Clone)]
pub struct RequirePath {
    path: String,
}

impl RequirePath {
    /// Requires `path` to exist at the head's revision.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl AcceptanceCriteria for RequirePath {
    fn accepts(&self, _head: &Head, probe: &Probe) -> Result<bool, HostError> {
        probe.path_exists(&self.path)
    }
}

/// Downstream consumer of accepted heads.
pub trait HeadObserver {
    /// Delivers one accepted head and its resolved revision.
    fn observe(&mut self, head: Head, revision: Revision);

    /// Returns `true` once the observer has everything it needs; the
    /// driver then stops enumerating the remaining refs of the stage.
    fn is_satisfied(&self) -> bool {
        false
    }
}

/// Observer that collects the accepted snapshot into a name-keyed map.
///
/// When constructed with a wanted-name set it reports satisfaction as soon
/// as every wanted name has been observed, driving early completion on
/// hosts with thousands of refs.
#[derive(Debug, Default)]
pub struct SnapshotObserver {
    snapshot: BTreeMap<String, Revision>,
    wanted: BTreeSet<String>,
}

impl SnapshotObserver {
    /// Collects every accepted head.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects accepted heads and completes early once all `wanted` names
    /// have been seen.
    #[must_use]
    pub fn wanting(wanted: impl IntoIterator<Item = String>) -> Self {
        Self {
            snapshot: BTreeMap::new(),
            wanted: wanted.into_iter().collect(),
        }
    }

    /// The collected "head name → revision" snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &BTreeMap<String, Revision> {
        &self.snapshot
    }

    /// Consumes the observer, returning the snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> BTreeMap<String, Revision> {
        self.snapshot
    }
}

impl HeadObserver for SnapshotObserver {
    fn observe(&mut self, head: Head, revision: Revision) {
        self.snapshot.insert(head.name().to_string(), revision);
    }

    fn is_satisfied(&self) -> bool {
        !self.wanted.is_empty()
            && self
                .wanted
                .iter()
                .all(|name| self.snapshot.contains_key(name))
    }
}

/// Outcome of processing one candidate head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessOutcome {
    /// Head met the criteria and was delivered to the observer.
    Accepted,
    /// Head was evaluated and did not meet the criteria.
    Rejected,
    /// Head was not evaluated (unresolved revision, unreadable fork).
    Skipped,
}

/// Progress/observability channel for a discovery run.
pub trait Witness {
    /// Records the outcome for one candidate head.
    fn record(&mut self, head_name: &str, outcome: WitnessOutcome);

    /// Reports a completed stage: how many refs were processed and whether
    /// the observer completed the query early.
    fn stage_complete(&mut self, stage: &str, processed: usize, completed_early: bool);
}

/// Default witness that reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWitness;

impl Witness for TracingWitness {
    fn record(&mut self, head_name: &str, outcome: WitnessOutcome) {
        match outcome {
            WitnessOutcome::Accepted => tracing::info!(head = %head_name, "head accepted"),
            WitnessOutcome::Rejected => {
                tracing::debug!(head = %head_name, "head does not meet criteria");
            }
            WitnessOutcome::Skipped => tracing::debug!(head = %head_name, "head skipped"),
        }
    }

    fn stage_complete(&mut self, stage: &str, processed: usize, completed_early: bool) {
        if completed_early {
            tracing::info!(stage, processed, "{processed} processed, query completed early");
        } else {
            tracing::info!(stage, processed, "{processed} processed");
        }
    }
}

/// Witness that records everything in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingWitness {
    /// `(head name, outcome)` in processing order.
    pub records: Vec<(String, WitnessOutcome)>,
    /// `(stage, processed, completed_early)` per completed stage.
    pub stages: Vec<(String, usize, bool)>,
}

impl Witness for RecordingWitness {
    fn record(&mut self, head_name: &str, outcome: WitnessOutcome) {
        self.records.push((head_name.to_string(), outcome));
    }

    fn stage_complete(&mut self, stage: &str, processed: usize, completed_early: bool) {
        self.stages.push((stage.to_string(), processed, completed_early));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::head::{BranchHead, SimpleRevision};
    use crate::host::{CommitMeta, ScmKind};

    fn head(name: &str) -> Head {
        Head::Branch(BranchHead {
            name: name.to_string(),
            scm: ScmKind::Git,
        })
    }

    fn revision(hash: &str) -> Revision {
        Revision::Simple(SimpleRevision {
            hash: hash.to_string(),
            meta: CommitMeta::default(),
        })
    }

    #[test]
    fn test_snapshot_observer_collects_by_name() {
        let mut observer = SnapshotObserver::new();
        observer.observe(head("main"), revision("h1"));
        observer.observe(head("feature-x"), revision("h2"));

        assert_eq!(observer.snapshot().len(), 2);
        assert_eq!(observer.snapshot()["main"].hash(), "h1");
        assert!(!observer.is_satisfied());
    }

    #[test]
    fn test_wanting_observer_satisfied_once_all_names_seen() {
        let mut observer = SnapshotObserver::wanting(["main".to_string()]);
        assert!(!observer.is_satisfied());
        observer.observe(head("main"), revision("h1"));
        assert!(observer.is_satisfied());
    }

    #[test]
    fn test_recording_witness_keeps_processing_order() {
        let mut witness = RecordingWitness::default();
        witness.record("main", WitnessOutcome::Accepted);
        witness.record("old", WitnessOutcome::Rejected);
        witness.stage_complete("branches", 2, false);

        assert_eq!(witness.records.len(), 2);
        assert_eq!(witness.records[0].0, "main");
        assert_eq!(witness.stages, vec![("branches".to_string(), 2, false)]);
    }
}
