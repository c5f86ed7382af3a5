//! Batch-size detection policies.

use tracing::debug;

use crate::detect::{BatchSizeDetector, DetectorPhase};

/// Degenerate/dummy policy: a fixed batch length, decided on the first
/// observation. The default size of 1 means "no batching, treat every
/// observation independently" — the placeholder configuration for
/// streams already known to be uncorrelated.
#[derive(Debug, Clone)]
pub struct FixedBatchSizeDetector {
    size: u64,
    phase: DetectorPhase,
}

impl FixedBatchSizeDetector {
    /// # Panics
    /// Panics if `size` is zero.
    pub fn new(size: u64) -> Self {
        assert!(size > 0, "batch size must be positive");
        FixedBatchSizeDetector { size, phase: DetectorPhase::Searching }
    }
}

impl Default for FixedBatchSizeDetector {
    /// Size 1: no batching.
    fn default() -> Self {
        Self::new(1)
    }
}

impl BatchSizeDetector for FixedBatchSizeDetector {
    fn observe(&mut self, _value: f64) -> DetectorPhase {
        self.phase = DetectorPhase::Detected;
        self.phase
    }

    fn phase(&self) -> DetectorPhase {
        self.phase
    }

    fn batch_size(&self) -> Option<u64> {
        match self.phase {
            DetectorPhase::Detected => Some(self.size),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.phase = DetectorPhase::Searching;
    }
}

/// Adaptive policy: grow the batch size until consecutive batch means
/// pass an independence test.
///
/// Observations accumulate into batches of the current candidate size;
/// once `required_batches` complete batches exist, the lag-1
/// autocorrelation of their means is tested against
/// `correlation_threshold`. On failure the candidate size doubles and
/// adjacent batch sums merge, so no observation is ever revisited.
/// Exceeding `observation_budget` before passing the test aborts.
#[derive(Debug, Clone)]
pub struct AdaptiveBatchSizeDetector {
    required_batches: usize,
    correlation_threshold: f64,
    observation_budget: u64,

    phase: DetectorPhase,
    batch_size: u64,
    sums: Vec<f64>,
    current_sum: f64,
    current_len: u64,
    seen: u64,
}

impl AdaptiveBatchSizeDetector {
    /// # Panics
    /// Panics unless `required_batches` is an even number of at least 4
    /// (doubling merges sums pairwise), `0 < correlation_threshold < 1`,
    /// and the budget covers one full test at size 1.
    pub fn new(
        required_batches: usize,
        correlation_threshold: f64,
        observation_budget: u64,
    ) -> Self {
        assert!(
            required_batches >= 4 && required_batches % 2 == 0,
            "required batch count must be an even number >= 4"
        );
        assert!(
            correlation_threshold > 0.0 && correlation_threshold < 1.0,
            "correlation threshold must be in (0, 1)"
        );
        assert!(
            observation_budget >= required_batches as u64,
            "budget too small for one test at batch size 1"
        );
        AdaptiveBatchSizeDetector {
            required_batches,
            correlation_threshold,
            observation_budget,
            phase: DetectorPhase::Searching,
            batch_size: 1,
            sums: Vec::with_capacity(required_batches),
            current_sum: 0.0,
            current_len: 0,
            seen: 0,
        }
    }

    /// Lag-1 autocorrelation of the current batch means. A zero
    /// denominator (constant means) counts as zero correlation.
    fn lag1_autocorrelation(&self) -> f64 {
        let k = self.sums.len();
        let size = self.batch_size as f64;
        let mean = self.sums.iter().sum::<f64>() / (k as f64 * size);
        let mut num = 0.0;
        let mut den = 0.0;
        for i in 0..k {
            let d = self.sums[i] / size - mean;
            den += d * d;
            if i + 1 < k {
                num += d * (self.sums[i + 1] / size - mean);
            }
        }
        if den == 0.0 {
            0.0
        } else {
            num / den
        }
    }

    /// Double the candidate size, merging adjacent batch sums.
    fn grow(&mut self) {
        self.batch_size *= 2;
        let merged: Vec<f64> = self.sums.chunks(2).map(|pair| pair.iter().sum()).collect();
        self.sums = merged;
    }
}

impl BatchSizeDetector for AdaptiveBatchSizeDetector {
    fn observe(&mut self, value: f64) -> DetectorPhase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        self.seen += 1;
        self.current_sum += value;
        self.current_len += 1;

        if self.current_len == self.batch_size {
            self.sums.push(self.current_sum);
            self.current_sum = 0.0;
            self.current_len = 0;

            if self.sums.len() == self.required_batches {
                let rho = self.lag1_autocorrelation();
                if rho.abs() <= self.correlation_threshold {
                    self.phase = DetectorPhase::Detected;
                    debug!(batch_size = self.batch_size, rho, "batch size detected");
                    return self.phase;
                }
                debug!(batch_size = self.batch_size, rho, "batch means still correlated");
                self.grow();
            }
        }

        if self.seen >= self.observation_budget {
            self.phase = DetectorPhase::Aborted;
            debug!(budget = self.observation_budget, "batch-size detection aborted");
        }
        self.phase
    }

    fn phase(&self) -> DetectorPhase {
        self.phase
    }

    fn batch_size(&self) -> Option<u64> {
        match self.phase {
            DetectorPhase::Detected => Some(self.batch_size),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.phase = DetectorPhase::Searching;
        self.batch_size = 1;
        self.sums.clear();
        self.current_sum = 0.0;
        self.current_len = 0;
        self.seen = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_detects_on_first_observation() {
        let mut d = FixedBatchSizeDetector::default();
        assert_eq!(d.phase(), DetectorPhase::Searching);
        assert_eq!(d.batch_size(), None);
        assert_eq!(d.observe(1.0), DetectorPhase::Detected);
        assert_eq!(d.batch_size(), Some(1));
    }

    #[test]
    fn test_fixed_custom_size() {
        let mut d = FixedBatchSizeDetector::new(64);
        d.observe(0.0);
        assert_eq!(d.batch_size(), Some(64));
    }

    #[test]
    fn test_adaptive_uncorrelated_stream_keeps_size_one() {
        // Constant stream: batch means constant, zero autocorrelation.
        let mut d = AdaptiveBatchSizeDetector::new(32, 0.2, 10_000);
        let mut phase = DetectorPhase::Searching;
        for _ in 0..32 {
            phase = d.observe(5.0);
        }
        assert_eq!(phase, DetectorPhase::Detected);
        assert_eq!(d.batch_size(), Some(1));
    }

    #[test]
    fn test_adaptive_grows_until_independent() {
        // Alternating 0/10 is perfectly negatively correlated at size 1
        // (rho = -1) and constant at size 2 (rho = 0).
        let mut d = AdaptiveBatchSizeDetector::new(32, 0.2, 10_000);
        let mut phase = DetectorPhase::Searching;
        for i in 0..64u64 {
            phase = d.observe(if i % 2 == 0 { 0.0 } else { 10.0 });
        }
        assert_eq!(phase, DetectorPhase::Detected);
        assert_eq!(d.batch_size(), Some(2));
    }

    #[test]
    fn test_adaptive_ramp_aborts_on_budget() {
        // A ramp keeps batch means maximally correlated at every size.
        let mut d = AdaptiveBatchSizeDetector::new(8, 0.1, 200);
        let mut phase = DetectorPhase::Searching;
        for i in 0..200u64 {
            phase = d.observe(i as f64);
        }
        assert_eq!(phase, DetectorPhase::Aborted);
        assert_eq!(d.batch_size(), None);
    }

    #[test]
    fn test_terminal_idempotence_and_reset() {
        let mut d = AdaptiveBatchSizeDetector::new(8, 0.1, 200);
        for i in 0..200u64 {
            d.observe(i as f64);
        }
        assert_eq!(d.phase(), DetectorPhase::Aborted);
        assert_eq!(d.observe(0.0), DetectorPhase::Aborted);

        d.reset();
        assert_eq!(d.phase(), DetectorPhase::Searching);
        assert_eq!(d.batch_size(), None);
    }
}
