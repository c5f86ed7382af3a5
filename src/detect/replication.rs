//! Replication-size and replication-count policies.

use tracing::debug;

use crate::detect::{DetectorPhase, ReplicationCountDetector, ReplicationSizeDetector};
use crate::stats::student_t;
use crate::time::VirtualTime;

// ── Replication size ─────────────────────────────────────────────────

/// A replication is complete after a fixed number of observations of
/// the tracked statistic.
#[derive(Debug, Clone)]
pub struct FixedObservationCount {
    target: u64,
}

impl FixedObservationCount {
    /// # Panics
    /// Panics if `target` is zero.
    pub fn new(target: u64) -> Self {
        assert!(target > 0, "observation target must be positive");
        FixedObservationCount { target }
    }
}

impl ReplicationSizeDetector for FixedObservationCount {
    fn is_complete(&mut self, observations: u64, _now: VirtualTime) -> bool {
        observations >= self.target
    }

    fn reset(&mut self) {}
}

/// A replication is complete after a fixed simulated duration.
#[derive(Debug, Clone)]
pub struct FixedDuration {
    until: VirtualTime,
}

impl FixedDuration {
    /// Complete once the virtual clock reaches `until`.
    pub fn new(until: VirtualTime) -> Self {
        FixedDuration { until }
    }
}

impl ReplicationSizeDetector for FixedDuration {
    fn is_complete(&mut self, _observations: u64, now: VirtualTime) -> bool {
        !now.is_before(self.until)
    }

    fn reset(&mut self) {}
}

/// Dummy policy: never declares completion, delegating the stopping
/// decision entirely to the engine's own run limits. The explicit
/// "the engine owns the stop" configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineLimits;

impl EngineLimits {
    pub fn new() -> Self {
        EngineLimits
    }
}

impl ReplicationSizeDetector for EngineLimits {
    fn is_complete(&mut self, _observations: u64, _now: VirtualTime) -> bool {
        false
    }

    fn reset(&mut self) {}
}

// ── Replication count ────────────────────────────────────────────────

/// Stop after exactly `target` replications, consulting no further
/// stopping rule. The count is a required explicit value — there is no
/// implicit "unbounded" default.
#[derive(Debug, Clone)]
pub struct FixedReplicationCount {
    target: u64,
    phase: DetectorPhase,
}

impl FixedReplicationCount {
    /// # Panics
    /// Panics if `target` is zero.
    pub fn new(target: u64) -> Self {
        assert!(target > 0, "replication target must be positive");
        FixedReplicationCount { target, phase: DetectorPhase::Searching }
    }
}

impl ReplicationCountDetector for FixedReplicationCount {
    fn assess(&mut self, replications: u64, _mean: f64, _std_dev: f64) -> DetectorPhase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        if replications >= self.target {
            self.phase = DetectorPhase::Detected;
        }
        self.phase
    }

    fn phase(&self) -> DetectorPhase {
        self.phase
    }

    fn recommended_count(&self) -> Option<u64> {
        match self.phase {
            DetectorPhase::Detected => Some(self.target),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.phase = DetectorPhase::Searching;
    }
}

/// Sequential procedure in the style of Banks et al. (2005, ch. 11):
/// after an initial `min_replications`, stop as soon as the
/// across-replication relative precision — the Student-t half-width
/// over the per-replication estimates, normalized by their mean —
/// reaches `target_precision`. Gives up past `max_replications`.
#[derive(Debug, Clone)]
pub struct SequentialPrecision {
    target_precision: f64,
    confidence: f64,
    min_replications: u64,
    max_replications: u64,
    phase: DetectorPhase,
    decided_at: Option<u64>,
}

impl SequentialPrecision {
    /// # Panics
    /// Panics on a non-positive precision target, a confidence outside
    /// (0, 1), `min_replications < 2`, or a cap below the minimum.
    pub fn new(
        target_precision: f64,
        confidence: f64,
        min_replications: u64,
        max_replications: u64,
    ) -> Self {
        assert!(target_precision > 0.0, "precision target must be positive");
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must be in (0, 1), got {}",
            confidence
        );
        assert!(min_replications >= 2, "need at least two replications");
        assert!(
            max_replications >= min_replications,
            "replication cap below the minimum"
        );
        SequentialPrecision {
            target_precision,
            confidence,
            min_replications,
            max_replications,
            phase: DetectorPhase::Searching,
            decided_at: None,
        }
    }
}

impl ReplicationCountDetector for SequentialPrecision {
    fn assess(&mut self, replications: u64, mean: f64, std_dev: f64) -> DetectorPhase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        if replications >= self.min_replications {
            let t = student_t::critical_value(self.confidence, replications - 1);
            let half_width = t * std_dev / (replications as f64).sqrt();
            let relative = if mean == 0.0 {
                f64::INFINITY
            } else {
                half_width / mean.abs()
            };
            if relative <= self.target_precision {
                self.phase = DetectorPhase::Detected;
                self.decided_at = Some(replications);
                debug!(replications, relative, "replication count detected");
                return self.phase;
            }
        }
        if replications >= self.max_replications {
            self.phase = DetectorPhase::Aborted;
            debug!(cap = self.max_replications, "replication count aborted");
        }
        self.phase
    }

    fn phase(&self) -> DetectorPhase {
        self.phase
    }

    fn recommended_count(&self) -> Option<u64> {
        self.decided_at
    }

    fn reset(&mut self) {
        self.phase = DetectorPhase::Searching;
        self.decided_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_observation_count() {
        let mut d = FixedObservationCount::new(100);
        assert!(!d.is_complete(99, VirtualTime::ZERO));
        assert!(d.is_complete(100, VirtualTime::ZERO));
        assert!(d.is_complete(101, VirtualTime::ZERO));
    }

    #[test]
    fn test_fixed_duration() {
        let mut d = FixedDuration::new(VirtualTime::new(50.0));
        assert!(!d.is_complete(0, VirtualTime::new(49.9)));
        assert!(d.is_complete(0, VirtualTime::new(50.0)));
        assert!(d.is_complete(0, VirtualTime::new(51.0)));
    }

    #[test]
    fn test_engine_limits_never_completes() {
        let mut d = EngineLimits::new();
        assert!(!d.is_complete(u64::MAX, VirtualTime::new(1.0e12)));
    }

    #[test]
    fn test_fixed_replication_count_stops_exactly_at_target() {
        let mut d = FixedReplicationCount::new(30);
        for n in 1..30 {
            assert_eq!(d.assess(n, 0.0, 0.0), DetectorPhase::Searching);
        }
        assert_eq!(d.assess(30, 0.0, 0.0), DetectorPhase::Detected);
        assert_eq!(d.recommended_count(), Some(30));
        // Terminal: no further stopping rule is consulted.
        assert_eq!(d.assess(31, f64::NAN, f64::NAN), DetectorPhase::Detected);
    }

    #[test]
    fn test_sequential_precision_converges() {
        // Tiny spread around a mean of 10: precise almost immediately.
        let mut d = SequentialPrecision::new(0.05, 0.95, 5, 100);
        for n in 1..5 {
            assert_eq!(d.assess(n, 10.0, 0.01), DetectorPhase::Searching);
        }
        assert_eq!(d.assess(5, 10.0, 0.01), DetectorPhase::Detected);
        assert_eq!(d.recommended_count(), Some(5));
    }

    #[test]
    fn test_sequential_precision_aborts_at_cap() {
        // Huge spread: the target precision is unreachable.
        let mut d = SequentialPrecision::new(0.01, 0.95, 5, 20);
        let mut phase = DetectorPhase::Searching;
        for n in 1..=20 {
            phase = d.assess(n, 1.0, 50.0);
        }
        assert_eq!(phase, DetectorPhase::Aborted);
        assert_eq!(d.recommended_count(), None);
        // Idempotent after the terminal decision.
        assert_eq!(d.assess(21, 1.0, 0.0), DetectorPhase::Aborted);
    }

    #[test]
    fn test_sequential_zero_mean_is_infinite_imprecision() {
        let mut d = SequentialPrecision::new(0.1, 0.95, 2, 3);
        assert_eq!(d.assess(2, 0.0, 0.001), DetectorPhase::Searching);
        assert_eq!(d.assess(3, 0.0, 0.001), DetectorPhase::Aborted);
    }

    #[test]
    fn test_reset() {
        let mut d = SequentialPrecision::new(0.05, 0.95, 2, 100);
        d.assess(2, 10.0, 0.0001);
        assert_eq!(d.phase(), DetectorPhase::Detected);
        d.reset();
        assert_eq!(d.phase(), DetectorPhase::Searching);
        assert_eq!(d.recommended_count(), None);
    }
}
