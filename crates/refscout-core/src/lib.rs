//! Discovery and revision resolution for remote source-control hosts.
//!
//! refscout reconciles a paginated, rate-limited, eventually-consistent
//! hosting API with a consumer that wants a stable snapshot of
//! "head name → revision" plus commit metadata for each accepted head. It
//! enumerates branches, tags, and pull requests, expands them into
//! candidate heads, resolves each head to an immutable revision with
//! lazily-memoized commit metadata, and evaluates caller-supplied
//! acceptance criteria with early-completion support.
//!
//! # Architecture
//!
//! ```text
//! RepositoryHost (trait)
//!     |
//!     +-- LazySeq          deferred ref listings, at-most-once fetch
//!     +-- CommitSlot       memoized per-ref commit metadata
//!     +-- DiscoveryRequest scoped, closable run context
//!     +-- HeadBuilder      refs -> candidate heads, origin/fork classing
//!     +-- Probe            path/last-modified criteria evaluation
//!     +-- TrustEvaluator   fork trust decisions
//!     +-- Discovery        the reconciliation state machine
//!
//! CacheService             shared LRU+TTL caches (teams, listings)
//! ensure_hook              idempotent webhook registration
//! ```
//!
//! # Guarantees
//!
//! - A run scoped to zero ref kinds performs zero host calls.
//! - Commit metadata is fetched at most once per distinct ref, no matter
//!   how many call sites ask for it.
//! - Head names are unique within a run, including pull requests expanded
//!   across multiple checkout strategies.
//! - A pull request whose fork is unreadable is skipped; the run
//!   completes with the remaining refs.
//! - Given a fixed snapshot of host responses, output is deterministic.

pub mod builder;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod directory;
pub mod driver;
pub mod error;
pub mod head;
pub mod host;
pub mod lazy;
pub mod observe;
pub mod probe;
pub mod request;
pub mod resolve;
pub mod trust;
pub mod webhook;

pub use builder::HeadBuilder;
pub use cache::{BoundedCache, CacheConfig, PrMetadata, PrMetadataCache};
pub use cancel::CancelToken;
pub use config::{ConfigError, DiscoveryTuning};
pub use directory::{CacheService, Directory, HostDirectory, RepositorySummary, TeamProfile};
pub use driver::{Discovery, DiscoverySummary};
pub use error::{DiscoveryError, HostError};
pub use head::{
    BranchHead, CheckoutStrategy, Head, PrHead, PrOrigin, PrRevision, Revision, SimpleRevision,
    TagHead,
};
pub use host::{
    CloneLink, Commit, CommitMeta, HostKind, InMemoryHost, PrSide, RawBranch, RawPullRequest,
    RawTag, RepoCoordinates, RepositoryHost, RepositoryMetadata, ScmKind,
};
pub use lazy::{LazySeq, SequenceError};
pub use observe::{
    AcceptAll, AcceptanceCriteria, HeadObserver, RecordingWitness, RequirePath,
    SnapshotObserver, TracingWitness, Witness, WitnessOutcome,
};
pub use probe::Probe;
pub use request::{DiscoveryRequest, Restriction};
pub use resolve::CommitSlot;
pub use trust::{TrustEvaluator, TrustRule};
pub use webhook::{DesiredHook, ExistingHook, HookChange, HookRegistry, ensure_hook};
