//! Independent replications.
//!
//! Each replication is one independent execution of the model from a
//! fresh engine, fresh statistics, and an independently derived random
//! seed; it contributes exactly one scalar point estimate per tracked
//! quantity. The across-replication sample of those estimates is what
//! the confidence interval is computed over.

use tracing::debug;

use crate::analysis::{AbortReason, AnalysisOutcome, Report};
use crate::detect::{DetectorPhase, ReplicationCountDetector, ReplicationSizeDetector};
use crate::engine::{Engine, EventHandler};
use crate::error::{SimError, SimResult};
use crate::rng::spawn_seed;
use crate::stats::mean::MeanEstimator;
use crate::stats::Statistic;

/// Phase of an independent-replications experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ReplicationPhase {
    Initializing,
    Replicating,
    Converged,
    Aborted,
}

impl std::fmt::Display for ReplicationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplicationPhase::Initializing => write!(f, "initializing"),
            ReplicationPhase::Replicating => write!(f, "replicating"),
            ReplicationPhase::Converged => write!(f, "converged"),
            ReplicationPhase::Aborted => write!(f, "aborted"),
        }
    }
}

/// Run one replication to completion and extract its point estimate.
///
/// Drives `engine` until the replication-size detector declares the
/// replication complete — consulted between events with the tracked
/// statistic's observation count and the current virtual time — or
/// until the engine exhausts its events or hits its own run limits
/// (the hard backstop, and the authoritative stop under the
/// `EngineLimits` policy). Returns the tracked statistic's estimate.
///
/// Fails with [`SimError::UnknownStatistic`] if `statistic` is not
/// registered with the engine.
pub fn run_replication<P>(
    engine: &mut Engine<P>,
    handler: &mut dyn EventHandler<P>,
    size_detector: &mut dyn ReplicationSizeDetector,
    statistic: &str,
) -> SimResult<f64> {
    if engine.statistic(statistic).is_none() {
        return Err(SimError::UnknownStatistic(statistic.to_string()));
    }
    engine.run_until(handler, |e| {
        size_detector.is_complete(e.observation_count(statistic), e.current_time())
    });
    let stat = engine
        .statistic(statistic)
        .ok_or_else(|| SimError::UnknownStatistic(statistic.to_string()))?;
    Ok(stat.estimate())
}

/// The independent-replications method.
///
/// `run` calls a caller-supplied closure once per replication, passing
/// a derived seed; the closure owns replication construction (fresh
/// engine, fresh statistics, a random stream seeded with the given
/// seed) and returns that replication's point estimate. After each
/// replication the number-of-replications detector decides whether to
/// continue, converge, or abort.
pub struct IndependentReplications {
    name: String,
    confidence: f64,
    detector: Box<dyn ReplicationCountDetector>,
    base_seed: u64,
    across: MeanEstimator,
    phase: ReplicationPhase,
}

impl IndependentReplications {
    /// Create an experiment tracking `name` at the given confidence
    /// level, stopping per `detector`, deriving replication seeds from
    /// `base_seed`.
    pub fn new(
        name: impl Into<String>,
        confidence: f64,
        detector: Box<dyn ReplicationCountDetector>,
        base_seed: u64,
    ) -> Self {
        let name = name.into();
        let across = MeanEstimator::new(name.clone(), confidence);
        IndependentReplications {
            name,
            confidence,
            detector,
            base_seed,
            across,
            phase: ReplicationPhase::Initializing,
        }
    }

    /// Current experiment phase.
    pub fn phase(&self) -> ReplicationPhase {
        self.phase
    }

    /// Replications completed so far.
    pub fn replications_completed(&self) -> u64 {
        self.across.num_observations()
    }

    /// Run replications until the count detector reaches a terminal
    /// decision.
    pub fn run(&mut self, mut replicate: impl FnMut(u64) -> f64) -> AnalysisOutcome {
        self.phase = ReplicationPhase::Replicating;
        loop {
            let index = self.across.num_observations();
            let seed = spawn_seed(self.base_seed, index);
            let sample = replicate(seed);
            self.across.collect(sample, 1.0);

            let n = self.across.num_observations();
            debug!(replication = n, sample, "replication complete");
            match self.detector.assess(
                n,
                self.across.estimate(),
                self.across.standard_deviation(),
            ) {
                DetectorPhase::Searching => continue,
                DetectorPhase::Detected => {
                    self.phase = ReplicationPhase::Converged;
                    return AnalysisOutcome::Converged(self.report());
                }
                DetectorPhase::Aborted => {
                    self.phase = ReplicationPhase::Aborted;
                    return AnalysisOutcome::Aborted(AbortReason::ReplicationCapExceeded {
                        replications: n,
                    });
                }
            }
        }
    }

    /// The across-replication report in its current state.
    pub fn report(&self) -> Report {
        Report {
            name: self.name.clone(),
            estimate: self.across.estimate(),
            half_width: self.across.half_width(),
            std_dev: self.across.standard_deviation(),
            observations: self.across.num_observations(),
            confidence: self.confidence,
        }
    }

    /// Reset to a fresh experiment, clearing the across-replication
    /// sample and the detector.
    pub fn reset(&mut self) {
        self.across.reset();
        self.detector.reset();
        self.phase = ReplicationPhase::Initializing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{
        FixedObservationCount, FixedReplicationCount, SequentialPrecision,
    };
    use crate::engine::EngineContext;
    use crate::event::Event;
    use crate::rng::{ChaChaSource, Distribution, Exponential, RandomSource};
    use crate::stats::student_t;
    use crate::time::VirtualTime;

    #[test]
    fn test_fixed_count_runs_exactly_thirty() {
        let mut experiment = IndependentReplications::new(
            "estimate",
            0.95,
            Box::new(FixedReplicationCount::new(30)),
            1,
        );
        let mut calls = 0u64;
        let outcome = experiment.run(|_seed| {
            calls += 1;
            calls as f64
        });
        assert_eq!(calls, 30);
        assert!(outcome.is_converged());
        assert_eq!(experiment.phase(), ReplicationPhase::Converged);
        assert_eq!(experiment.replications_completed(), 30);
    }

    #[test]
    fn test_report_matches_manual_t_interval() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut experiment = IndependentReplications::new(
            "estimate",
            0.95,
            Box::new(FixedReplicationCount::new(8)),
            7,
        );
        let mut i = 0;
        let outcome = experiment.run(|_seed| {
            let s = samples[i];
            i += 1;
            s
        });
        let report = outcome.report().expect("converged");
        assert!((report.estimate - 5.0).abs() < 1e-12);
        let sd = (32.0f64 / 7.0).sqrt();
        assert!((report.std_dev - sd).abs() < 1e-12);
        let expected_hw = student_t::critical_value(0.95, 7) * sd / 8.0f64.sqrt();
        assert!((report.half_width - expected_hw).abs() < 1e-12);
        assert_eq!(report.observations, 8);
    }

    #[test]
    fn test_seeds_are_derived_and_distinct() {
        let mut experiment = IndependentReplications::new(
            "estimate",
            0.95,
            Box::new(FixedReplicationCount::new(5)),
            99,
        );
        let mut seeds = Vec::new();
        experiment.run(|seed| {
            seeds.push(seed);
            1.0
        });
        assert_eq!(seeds.len(), 5);
        let mut unique = seeds.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 5, "seeds must be pairwise distinct: {:?}", seeds);
    }

    #[test]
    fn test_sequential_abort_is_distinct_outcome() {
        // Wildly alternating estimates never meet a 1% precision target.
        let mut experiment = IndependentReplications::new(
            "estimate",
            0.95,
            Box::new(SequentialPrecision::new(0.01, 0.95, 5, 20)),
            3,
        );
        let mut flip = false;
        let outcome = experiment.run(|_seed| {
            flip = !flip;
            if flip {
                100.0
            } else {
                -100.0
            }
        });
        assert_eq!(
            outcome,
            AnalysisOutcome::Aborted(AbortReason::ReplicationCapExceeded {
                replications: 20
            })
        );
        assert_eq!(experiment.phase(), ReplicationPhase::Aborted);
    }

    #[test]
    fn test_sequential_converges_on_tight_samples() {
        let mut experiment = IndependentReplications::new(
            "estimate",
            0.95,
            Box::new(SequentialPrecision::new(0.05, 0.95, 5, 100)),
            3,
        );
        let mut i = 0u64;
        let outcome = experiment.run(|_seed| {
            i += 1;
            10.0 + 0.01 * (i % 3) as f64
        });
        let report = outcome.report().expect("converged");
        assert!(report.relative_precision() <= 0.05);
        assert!(report.observations >= 5);
    }

    // M/M/1-style end-to-end: arrivals and departures at a single
    // server, tracking the number in system at event instants.
    #[derive(Clone, Copy)]
    enum QueueEvent {
        Arrival,
        Departure,
    }

    struct Mm1 {
        rng: ChaChaSource,
        interarrival: Exponential,
        service: Exponential,
        in_system: u64,
    }

    impl EventHandler<QueueEvent> for Mm1 {
        fn handle(&mut self, ctx: &mut EngineContext<'_, QueueEvent>, event: &Event<QueueEvent>) {
            match event.payload {
                QueueEvent::Arrival => {
                    self.in_system += 1;
                    let gap = self.interarrival.sample(&mut self.rng);
                    ctx.schedule_after(gap, QueueEvent::Arrival);
                    if self.in_system == 1 {
                        let service = self.service.sample(&mut self.rng);
                        ctx.schedule_after(service, QueueEvent::Departure);
                    }
                }
                QueueEvent::Departure => {
                    self.in_system -= 1;
                    if self.in_system > 0 {
                        let service = self.service.sample(&mut self.rng);
                        ctx.schedule_after(service, QueueEvent::Departure);
                    }
                }
            }
            ctx.collect("in_system", self.in_system as f64, 1.0).unwrap();
        }
    }

    #[test]
    fn test_replicated_queue_model_end_to_end() {
        let mut experiment = IndependentReplications::new(
            "in_system",
            0.95,
            Box::new(FixedReplicationCount::new(5)),
            2024,
        );

        let outcome = experiment.run(|seed| {
            let mut engine = Engine::with_limits(Some(10_000), None);
            engine
                .register_statistic(Box::new(MeanEstimator::new("in_system", 0.95)))
                .unwrap();
            engine.schedule(VirtualTime::ZERO, QueueEvent::Arrival).unwrap();

            let mut model = Mm1 {
                rng: ChaChaSource::new(seed),
                interarrival: Exponential::new(1.0),
                service: Exponential::new(2.0),
                in_system: 0,
            };
            let mut size = FixedObservationCount::new(2_000);
            run_replication(&mut engine, &mut model, &mut size, "in_system").unwrap()
        });

        let report = outcome.report().expect("converged");
        assert_eq!(report.observations, 5);
        assert!(report.estimate.is_finite());
        assert!(report.estimate > 0.0);
        assert!(report.half_width.is_finite());
    }

    #[test]
    fn test_run_replication_unknown_statistic() {
        let mut engine: Engine<()> = Engine::new();
        let mut handler = |_ctx: &mut EngineContext<'_, ()>, _event: &Event<()>| {};
        let mut size = FixedObservationCount::new(1);
        let err = run_replication(&mut engine, &mut handler, &mut size, "missing").unwrap_err();
        assert_eq!(err, SimError::UnknownStatistic("missing".into()));
    }

    #[test]
    fn test_reset_clears_experiment() {
        let mut experiment = IndependentReplications::new(
            "estimate",
            0.95,
            Box::new(FixedReplicationCount::new(3)),
            1,
        );
        experiment.run(|_seed| 1.0);
        assert_eq!(experiment.replications_completed(), 3);
        experiment.reset();
        assert_eq!(experiment.replications_completed(), 0);
        assert_eq!(experiment.phase(), ReplicationPhase::Initializing);
        // Detector was reset too: a second run completes again.
        let outcome = experiment.run(|_seed| 2.0);
        assert!(outcome.is_converged());
    }
}
