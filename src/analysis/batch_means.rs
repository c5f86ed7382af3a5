//! Batch means.
//!
//! A single long run is turned into pseudo-independent samples: raw
//! observations first pass a transient detector (everything before the
//! detected warm-up length is discarded from all estimators), then
//! group into batches whose length a batch-size detector validates.
//! Each batch's mean is one sample of a derived mean-of-batch-means
//! estimator; the final interval is a Student-t interval over that
//! derived sample, exactly as across replications.

use tracing::debug;

use crate::analysis::{AbortReason, AnalysisOutcome, Report};
use crate::detect::{BatchSizeDetector, DetectorPhase, TransientDetector};
use crate::stats::mean::MeanEstimator;
use crate::stats::Statistic;

/// Phase of a batch-means run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BatchMeansPhase {
    WarmingUp,
    Batching,
    Converged,
    Aborted,
}

impl std::fmt::Display for BatchMeansPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchMeansPhase::WarmingUp => write!(f, "warming up"),
            BatchMeansPhase::Batching => write!(f, "batching"),
            BatchMeansPhase::Converged => write!(f, "converged"),
            BatchMeansPhase::Aborted => write!(f, "aborted"),
        }
    }
}

/// The batch-means method, fed one observation at a time.
///
/// Observations arriving while the transient detector is still
/// searching are buffered so the post-warm-up tail can be re-fed once
/// the warm-up length is known; likewise post-warm-up observations
/// buffer until the batch-size detector fixes a length. Both buffers
/// are bounded by the respective detector's observation budget.
pub struct BatchMeans {
    name: String,
    confidence: f64,
    transient: Box<dyn TransientDetector>,
    batch_detector: Box<dyn BatchSizeDetector>,
    precision_target: Option<f64>,
    observation_budget: Option<u64>,

    phase: BatchMeansPhase,
    abort: Option<AbortReason>,
    warmup_buffer: Vec<f64>,
    sizing_buffer: Vec<f64>,
    batch_size: Option<u64>,
    current_sum: f64,
    current_len: u64,
    across: MeanEstimator,
    seen: u64,
}

impl BatchMeans {
    /// Create a batch-means run tracking `name` at the given
    /// confidence level, with the supplied transient and batch-size
    /// policies.
    pub fn new(
        name: impl Into<String>,
        confidence: f64,
        transient: Box<dyn TransientDetector>,
        batch_detector: Box<dyn BatchSizeDetector>,
    ) -> Self {
        let name = name.into();
        let across = MeanEstimator::new(name.clone(), confidence);
        BatchMeans {
            name,
            confidence,
            transient,
            batch_detector,
            precision_target: None,
            observation_budget: None,
            phase: BatchMeansPhase::WarmingUp,
            abort: None,
            warmup_buffer: Vec::new(),
            sizing_buffer: Vec::new(),
            batch_size: None,
            current_sum: 0.0,
            current_len: 0,
            across,
            seen: 0,
        }
    }

    /// Converge once the across-batch relative precision reaches
    /// `target`; abort with [`AbortReason::PrecisionNotReached`] past
    /// `observation_budget` raw observations. Without a target, the run
    /// ends when the caller stops feeding and asks for the outcome.
    pub fn with_precision_target(mut self, target: f64, observation_budget: u64) -> Self {
        assert!(target > 0.0, "precision target must be positive");
        assert!(observation_budget > 0, "observation budget must be positive");
        self.precision_target = Some(target);
        self.observation_budget = Some(observation_budget);
        self
    }

    /// Current phase.
    pub fn phase(&self) -> BatchMeansPhase {
        self.phase
    }

    /// The validated batch length, once batching has begun.
    pub fn batch_size(&self) -> Option<u64> {
        self.batch_size
    }

    /// Completed batches so far.
    pub fn batches_completed(&self) -> u64 {
        self.across.num_observations()
    }

    /// Raw observations consumed so far, including discarded warm-up.
    pub fn observations_seen(&self) -> u64 {
        self.seen
    }

    /// Feed one raw observation; returns the phase after this call.
    ///
    /// The weight is forwarded to the transient detector; batch
    /// aggregation itself uses unit weights.
    pub fn observe(&mut self, value: f64, weight: f64) -> BatchMeansPhase {
        if matches!(self.phase, BatchMeansPhase::Converged | BatchMeansPhase::Aborted) {
            return self.phase;
        }
        self.seen += 1;

        match self.phase {
            BatchMeansPhase::WarmingUp => {
                self.warmup_buffer.push(value);
                match self.transient.observe(value, weight) {
                    DetectorPhase::Searching => {}
                    DetectorPhase::Aborted => {
                        self.abort_with(AbortReason::TransientUndetected {
                            observations: self.seen,
                        });
                    }
                    DetectorPhase::Detected => {
                        let warmup = self
                            .transient
                            .warmup_length()
                            .expect("detected transient detector must report a length")
                            as usize;
                        let buffered = std::mem::take(&mut self.warmup_buffer);
                        let cut = warmup.min(buffered.len());
                        debug!(warmup = cut, "steady state reached, truncating");
                        self.phase = BatchMeansPhase::Batching;
                        for v in &buffered[cut..] {
                            self.feed_steady_state(*v);
                        }
                    }
                }
            }
            BatchMeansPhase::Batching => self.feed_steady_state(value),
            BatchMeansPhase::Converged | BatchMeansPhase::Aborted => unreachable!(),
        }

        if let (Some(budget), BatchMeansPhase::WarmingUp | BatchMeansPhase::Batching) =
            (self.observation_budget, self.phase)
        {
            if self.seen >= budget {
                self.abort_with(AbortReason::PrecisionNotReached { observations: self.seen });
            }
        }
        self.phase
    }

    /// One post-warm-up observation: through the batch-size detector
    /// while the length is still open, into batch accumulation after.
    fn feed_steady_state(&mut self, value: f64) {
        if matches!(self.phase, BatchMeansPhase::Converged | BatchMeansPhase::Aborted) {
            return;
        }
        match self.batch_size {
            Some(size) => self.accumulate(value, size),
            None => {
                self.sizing_buffer.push(value);
                match self.batch_detector.observe(value) {
                    DetectorPhase::Searching => {}
                    DetectorPhase::Aborted => {
                        self.abort_with(AbortReason::BatchSizeUndetected {
                            observations: self.seen,
                        });
                    }
                    DetectorPhase::Detected => {
                        let size = self
                            .batch_detector
                            .batch_size()
                            .expect("detected batch-size detector must report a size");
                        debug!(batch_size = size, "batch size fixed");
                        self.batch_size = Some(size);
                        let buffered = std::mem::take(&mut self.sizing_buffer);
                        for v in buffered {
                            self.accumulate(v, size);
                        }
                    }
                }
            }
        }
    }

    fn accumulate(&mut self, value: f64, size: u64) {
        self.current_sum += value;
        self.current_len += 1;
        if self.current_len == size {
            let mean = self.current_sum / size as f64;
            self.across.collect(mean, 1.0);
            self.current_sum = 0.0;
            self.current_len = 0;
            if let Some(target) = self.precision_target {
                if self.across.precision_reached(target) {
                    debug!(batches = self.across.num_observations(), "precision reached");
                    self.phase = BatchMeansPhase::Converged;
                }
            }
        }
    }

    fn abort_with(&mut self, reason: AbortReason) {
        debug!(%reason, "batch means aborted");
        self.abort = Some(reason);
        self.phase = BatchMeansPhase::Aborted;
    }

    /// The final outcome of the run.
    ///
    /// An explicitly converged or aborted run reports as such. A run
    /// still batching when the caller stops feeding converges if at
    /// least two batch means exist; anything less — including a run
    /// still warming up — is [`AbortReason::InsufficientData`], never a
    /// silent partial interval.
    pub fn outcome(&self) -> AnalysisOutcome {
        match self.phase {
            BatchMeansPhase::Converged => AnalysisOutcome::Converged(self.report()),
            BatchMeansPhase::Aborted => AnalysisOutcome::Aborted(
                self.abort
                    .clone()
                    .expect("aborted phase must carry a reason"),
            ),
            BatchMeansPhase::WarmingUp => {
                AnalysisOutcome::Aborted(AbortReason::InsufficientData {
                    observations: self.seen,
                })
            }
            BatchMeansPhase::Batching => {
                if self.across.num_observations() >= 2 {
                    AnalysisOutcome::Converged(self.report())
                } else {
                    AnalysisOutcome::Aborted(AbortReason::InsufficientData {
                        observations: self.seen,
                    })
                }
            }
        }
    }

    /// The across-batch report in its current state.
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

    /// Reset to a fresh run, clearing buffers, detectors, and the
    /// across-batch sample.
    pub fn reset(&mut self) {
        self.transient.reset();
        self.batch_detector.reset();
        self.phase = BatchMeansPhase::WarmingUp;
        self.abort = None;
        self.warmup_buffer.clear();
        self.sizing_buffer.clear();
        self.batch_size = None;
        self.current_sum = 0.0;
        self.current_len = 0;
        self.across.reset();
        self.seen = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{
        AdaptiveBatchSizeDetector, FixedBatchSizeDetector, NullTransientDetector,
        WindowedTransientDetector,
    };

    fn no_batching() -> BatchMeans {
        BatchMeans::new(
            "obs",
            0.95,
            Box::new(NullTransientDetector::new()),
            Box::new(FixedBatchSizeDetector::default()),
        )
    }

    #[test]
    fn test_dummy_detector_reproduces_plain_mean_interval() {
        // Size-1 batches must give exactly the plain mean/variance CI.
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        let mut bm = no_batching();
        let mut plain = MeanEstimator::new("obs", 0.95);
        for &v in &values {
            bm.observe(v, 1.0);
            plain.collect(v, 1.0);
        }
        assert_eq!(bm.batch_size(), Some(1));
        assert_eq!(bm.batches_completed(), 8);

        let report = bm.outcome().report().cloned().expect("converged");
        assert!((report.estimate - plain.estimate()).abs() < 1e-12);
        assert!((report.half_width - plain.half_width()).abs() < 1e-12);
        assert!((report.std_dev - plain.standard_deviation()).abs() < 1e-12);
    }

    #[test]
    fn test_warmup_observations_discarded() {
        // 10 decaying observations, then a flat level of 5. Windows of
        // 5 with a 2-window stable run put the warm-up cut at exactly
        // the end of the decay.
        let mut bm = BatchMeans::new(
            "obs",
            0.95,
            Box::new(WindowedTransientDetector::new(5, 2, 0.05, 10_000)),
            Box::new(FixedBatchSizeDetector::default()),
        );
        for i in 0..10u64 {
            bm.observe(100.0 - 10.0 * i as f64, 1.0);
        }
        for _ in 0..10 {
            bm.observe(5.0, 1.0);
        }

        assert_eq!(bm.phase(), BatchMeansPhase::Batching);
        let report = bm.outcome().report().cloned().expect("converged");
        // Only post-warm-up observations contribute: all equal to 5.
        assert_eq!(report.observations, 10);
        assert!((report.estimate - 5.0).abs() < 1e-12);
        assert!(report.half_width.abs() < 1e-12);
    }

    #[test]
    fn test_transient_abort_surfaces_distinctly() {
        let mut bm = BatchMeans::new(
            "obs",
            0.95,
            Box::new(WindowedTransientDetector::new(10, 4, 0.01, 200)),
            Box::new(FixedBatchSizeDetector::default()),
        );
        for i in 0..300u64 {
            bm.observe(i as f64, 1.0);
        }
        assert_eq!(bm.phase(), BatchMeansPhase::Aborted);
        let outcome = bm.outcome();
        assert!(!outcome.is_converged());
        assert_eq!(
            outcome,
            AnalysisOutcome::Aborted(AbortReason::TransientUndetected { observations: 200 })
        );
    }

    #[test]
    fn test_batch_size_abort_surfaces_distinctly() {
        let mut bm = BatchMeans::new(
            "obs",
            0.95,
            Box::new(NullTransientDetector::new()),
            Box::new(AdaptiveBatchSizeDetector::new(8, 0.1, 100)),
        );
        for i in 0..150u64 {
            bm.observe(i as f64, 1.0);
        }
        let outcome = bm.outcome();
        assert_eq!(
            outcome,
            AnalysisOutcome::Aborted(AbortReason::BatchSizeUndetected { observations: 100 })
        );
    }

    #[test]
    fn test_precision_target_converges() {
        let mut bm = no_batching().with_precision_target(0.01, 10_000);
        let mut i = 0u64;
        while bm.phase() != BatchMeansPhase::Converged {
            assert!(i < 1_000, "did not converge within 1000 observations");
            let v = if i % 2 == 0 { 9.9 } else { 10.1 };
            bm.observe(v, 1.0);
            i += 1;
        }
        let report = bm.outcome().report().cloned().expect("converged");
        assert!(report.relative_precision() <= 0.01);
        // Terminal: further observations are ignored.
        let before = bm.batches_completed();
        bm.observe(1_000.0, 1.0);
        assert_eq!(bm.batches_completed(), before);
    }

    #[test]
    fn test_precision_budget_exhaustion_aborts() {
        let mut bm = no_batching().with_precision_target(1e-9, 50);
        let mut i = 0u64;
        for _ in 0..80 {
            let v = if i % 2 == 0 { 1.0 } else { 100.0 };
            bm.observe(v, 1.0);
            i += 1;
        }
        assert_eq!(
            bm.outcome(),
            AnalysisOutcome::Aborted(AbortReason::PrecisionNotReached { observations: 50 })
        );
    }

    #[test]
    fn test_insufficient_data_outcomes() {
        // Still warming up: one observation against a long window.
        let mut warming = BatchMeans::new(
            "obs",
            0.95,
            Box::new(WindowedTransientDetector::new(10, 4, 0.05, 1_000)),
            Box::new(FixedBatchSizeDetector::default()),
        );
        warming.observe(1.0, 1.0);
        assert_eq!(
            warming.outcome(),
            AnalysisOutcome::Aborted(AbortReason::InsufficientData { observations: 1 })
        );

        // Batching but only one batch mean so far.
        let mut thin = no_batching();
        thin.observe(1.0, 1.0);
        assert_eq!(
            thin.outcome(),
            AnalysisOutcome::Aborted(AbortReason::InsufficientData { observations: 1 })
        );
    }

    #[test]
    fn test_adaptive_sizing_consumes_buffered_tail() {
        // Alternating 0/10 forces the adaptive detector to size 2; the
        // buffered sizing observations must all land in batches.
        let mut bm = BatchMeans::new(
            "obs",
            0.95,
            Box::new(NullTransientDetector::new()),
            Box::new(AdaptiveBatchSizeDetector::new(32, 0.2, 10_000)),
        );
        for i in 0..64u64 {
            bm.observe(if i % 2 == 0 { 0.0 } else { 10.0 }, 1.0);
        }
        assert_eq!(bm.batch_size(), Some(2));
        // 64 observations at size 2 → 32 batches, every mean 5.
        assert_eq!(bm.batches_completed(), 32);
        let report = bm.outcome().report().cloned().expect("converged");
        assert!((report.estimate - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_round_trip() {
        let mut bm = no_batching();
        for i in 0..10u64 {
            bm.observe(i as f64, 1.0);
        }
        bm.reset();
        assert_eq!(bm.phase(), BatchMeansPhase::WarmingUp);
        assert_eq!(bm.batches_completed(), 0);
        assert_eq!(bm.observations_seen(), 0);
        assert_eq!(bm.batch_size(), None);
    }
}
