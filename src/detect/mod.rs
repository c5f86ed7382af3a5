//! Sequential-decision detectors for output analysis.
//!
//! A detector consumes a running stream of observations (or
//! per-replication summaries) and decides whether enough data has been
//! gathered. Every detector moves through the same phase machine:
//! it starts `Searching`, and eventually lands in exactly one of two
//! mutually exclusive terminal phases — `Detected` (positive decision,
//! with a usable size/count) or `Aborted` (gave up after exceeding a
//! budget). Terminal phases are idempotent: further feed calls change
//! nothing until `reset`.

pub mod batch;
pub mod replication;
pub mod transient;

pub use batch::{AdaptiveBatchSizeDetector, FixedBatchSizeDetector};
pub use replication::{
    EngineLimits, FixedDuration, FixedObservationCount, FixedReplicationCount,
    SequentialPrecision,
};
pub use transient::{NullTransientDetector, WindowedTransientDetector};

use crate::time::VirtualTime;

/// Decision phase of a sequential detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DetectorPhase {
    /// Still gathering evidence; no decision yet.
    Searching,
    /// Positive terminal decision.
    Detected,
    /// Terminal give-up: the decision was abandoned after exceeding a
    /// configured budget.
    Aborted,
}

impl DetectorPhase {
    /// Returns `true` for `Detected` or `Aborted`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, DetectorPhase::Searching)
    }
}

impl std::fmt::Display for DetectorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorPhase::Searching => write!(f, "searching"),
            DetectorPhase::Detected => write!(f, "detected"),
            DetectorPhase::Aborted => write!(f, "aborted"),
        }
    }
}

/// Decides the length of the warm-up (transient) period of a single
/// long run. Observations before the detected warm-up length are not
/// representative of steady state and must be discarded.
pub trait TransientDetector {
    /// Feed one raw observation; returns the phase after this call.
    fn observe(&mut self, value: f64, weight: f64) -> DetectorPhase;

    /// Current phase.
    fn phase(&self) -> DetectorPhase;

    /// Number of observations to discard, once `Detected`.
    fn warmup_length(&self) -> Option<u64>;

    /// Return to `Searching` with cleared history.
    fn reset(&mut self);
}

/// Decides the batch length after which consecutive batch means can be
/// treated as approximately independent samples.
pub trait BatchSizeDetector {
    /// Feed one post-warm-up observation; returns the phase after this
    /// call.
    fn observe(&mut self, value: f64) -> DetectorPhase;

    /// Current phase.
    fn phase(&self) -> DetectorPhase;

    /// The validated batch length, once `Detected`.
    fn batch_size(&self) -> Option<u64>;

    /// Return to `Searching` with cleared history.
    fn reset(&mut self);
}

/// Decides when one replication has produced enough data.
///
/// Consulted by the replication driver between engine steps; the
/// detector is the authoritative stopping condition for the run, with
/// the engine's own limits as a hard backstop.
pub trait ReplicationSizeDetector {
    /// Whether the replication is complete, given the tracked
    /// statistic's observation count and the current virtual time.
    fn is_complete(&mut self, observations: u64, now: VirtualTime) -> bool;

    /// Clear any internal history.
    fn reset(&mut self);
}

/// Decides how many independent replications an experiment needs.
///
/// Fed once per completed replication with the across-replication
/// sample summary.
pub trait ReplicationCountDetector {
    /// Assess after a completed replication: `replications` finished so
    /// far, with the across-replication `mean` and `std_dev` of the
    /// per-replication point estimates.
    fn assess(&mut self, replications: u64, mean: f64, std_dev: f64) -> DetectorPhase;

    /// Current phase.
    fn phase(&self) -> DetectorPhase;

    /// The recommended replication count, once `Detected`.
    fn recommended_count(&self) -> Option<u64>;

    /// Return to `Searching` with cleared history.
    fn reset(&mut self);
}
