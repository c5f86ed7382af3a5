//! Running-mean estimators.
//!
//! `MeanEstimator` is the workhorse of the output-analysis subsystem:
//! it backs both raw observation streams and the derived
//! across-replication / across-batch samples. The update is Welford's
//! numerically stable incremental method — never the naive
//! sum-of-squares formula, which cancels catastrophically for long runs
//! with small variance.

use crate::stats::student_t;
use crate::stats::Statistic;

/// Online mean and variance via Welford's method.
///
/// Maintains running count, mean, and sum-of-squared-deviations (M2).
/// The weight argument of `collect` is ignored; use
/// [`WeightedMeanEstimator`] for weighted/time-average statistics.
#[derive(Debug, Clone)]
pub struct MeanEstimator {
    name: String,
    confidence: f64,
    count: u64,
    mean: f64,
    m2: f64,
    enabled: bool,
}

impl MeanEstimator {
    /// Create a new estimator for `name` at the given confidence level.
    ///
    /// # Panics
    /// Panics unless `0 < confidence < 1`.
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must be in (0, 1), got {}",
            confidence
        );
        MeanEstimator {
            name: name.into(),
            confidence,
            count: 0,
            mean: 0.0,
            m2: 0.0,
            enabled: true,
        }
    }
}

impl Statistic for MeanEstimator {
    fn name(&self) -> &str {
        &self.name
    }

    fn confidence_level(&self) -> f64 {
        self.confidence
    }

    fn collect(&mut self, value: f64, _weight: f64) {
        if !self.enabled {
            return;
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        // Uses the *updated* mean; this is what keeps M2 non-negative.
        self.m2 += delta * (value - self.mean);
    }

    fn estimate(&self) -> f64 {
        self.mean
    }

    fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            f64::INFINITY
        }
    }

    fn half_width(&self) -> f64 {
        if self.count <= 1 {
            return f64::INFINITY;
        }
        let t = student_t::critical_value(self.confidence, self.count - 1);
        t * self.standard_deviation() / (self.count as f64).sqrt()
    }

    fn num_observations(&self) -> u64 {
        self.count
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn reset(&mut self) {
        self.count = 0;
        self.mean = 0.0;
        self.m2 = 0.0;
    }
}

/// Weighted running mean via West's (1979) incremental update.
///
/// Interprets weights as frequency weights: the variance divisor is
/// `sum_of_weights - 1`, so unit weights reproduce [`MeanEstimator`]
/// exactly. The effective degrees of freedom for the half-width are
/// `count - 1`.
#[derive(Debug, Clone)]
pub struct WeightedMeanEstimator {
    name: String,
    confidence: f64,
    count: u64,
    sum_weights: f64,
    mean: f64,
    m2: f64,
    enabled: bool,
}

impl WeightedMeanEstimator {
    /// Create a new weighted estimator for `name` at the given
    /// confidence level.
    ///
    /// # Panics
    /// Panics unless `0 < confidence < 1`.
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must be in (0, 1), got {}",
            confidence
        );
        WeightedMeanEstimator {
            name: name.into(),
            confidence,
            count: 0,
            sum_weights: 0.0,
            mean: 0.0,
            m2: 0.0,
            enabled: true,
        }
    }

    /// Total weight collected since the last reset.
    pub fn sum_of_weights(&self) -> f64 {
        self.sum_weights
    }
}

impl Statistic for WeightedMeanEstimator {
    fn name(&self) -> &str {
        &self.name
    }

    fn confidence_level(&self) -> f64 {
        self.confidence
    }

    fn collect(&mut self, value: f64, weight: f64) {
        if !self.enabled {
            return;
        }
        assert!(
            weight.is_finite() && weight > 0.0,
            "weight must be finite and positive, got {}",
            weight
        );
        self.count += 1;
        self.sum_weights += weight;
        let delta = value - self.mean;
        self.mean += (weight / self.sum_weights) * delta;
        self.m2 += weight * delta * (value - self.mean);
    }

    fn estimate(&self) -> f64 {
        self.mean
    }

    fn variance(&self) -> f64 {
        if self.count > 1 && self.sum_weights > 1.0 {
            self.m2 / (self.sum_weights - 1.0)
        } else {
            f64::INFINITY
        }
    }

    fn half_width(&self) -> f64 {
        if self.count <= 1 {
            return f64::INFINITY;
        }
        let variance = self.variance();
        if !variance.is_finite() {
            return f64::INFINITY;
        }
        let t = student_t::critical_value(self.confidence, self.count - 1);
        t * (variance / self.sum_weights).sqrt()
    }

    fn num_observations(&self) -> u64 {
        self.count
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn reset(&mut self) {
        self.count = 0;
        self.sum_weights = 0.0;
        self.mean = 0.0;
        self.m2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance_reference_sequence() {
        // Naive two-pass reference: mean 5.0, variance 32/7.
        let mut m = MeanEstimator::new("ref", 0.95);
        for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            m.collect(x, 1.0);
        }
        assert_eq!(m.num_observations(), 8);
        assert!((m.estimate() - 5.0).abs() < 1e-12);
        assert!((m.variance() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_half_width_reference_sequence() {
        let mut m = MeanEstimator::new("ref", 0.95);
        for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            m.collect(x, 1.0);
        }
        // t(0.975, 7) * sd / sqrt(8) = 2.3646 * 2.13809 / 2.82843.
        let expected = 2.3646 * (32.0f64 / 7.0).sqrt() / 8.0f64.sqrt();
        assert!((m.half_width() - expected).abs() < 1e-2);
    }

    #[test]
    fn test_undefined_sentinels() {
        let mut m = MeanEstimator::new("s", 0.95);
        assert_eq!(m.variance(), f64::INFINITY);
        assert_eq!(m.half_width(), f64::INFINITY);

        m.collect(3.0, 1.0);
        // One observation: point estimate defined, dispersion not.
        assert_eq!(m.estimate(), 3.0);
        assert_eq!(m.variance(), f64::INFINITY);
        assert_eq!(m.half_width(), f64::INFINITY);
    }

    #[test]
    fn test_weight_ignored() {
        let mut a = MeanEstimator::new("a", 0.95);
        let mut b = MeanEstimator::new("b", 0.95);
        for &x in &[1.0, 2.0, 3.0] {
            a.collect(x, 1.0);
            b.collect(x, 100.0);
        }
        assert_eq!(a.estimate(), b.estimate());
        assert_eq!(a.variance(), b.variance());
    }

    #[test]
    fn test_reset_round_trip() {
        let fresh = MeanEstimator::new("x", 0.9);
        let mut used = MeanEstimator::new("x", 0.9);
        for &x in &[5.0, 6.0, 7.0] {
            used.collect(x, 1.0);
        }
        used.reset();

        assert_eq!(used.num_observations(), fresh.num_observations());
        assert_eq!(used.estimate(), fresh.estimate());
        assert_eq!(used.variance(), fresh.variance());
        assert_eq!(used.half_width(), fresh.half_width());
        assert_eq!(used.confidence_level(), fresh.confidence_level());
        assert_eq!(used.name(), fresh.name());
    }

    #[test]
    fn test_disabled_ignores_collect() {
        let mut m = MeanEstimator::new("x", 0.95);
        m.collect(1.0, 1.0);
        m.set_enabled(false);
        m.collect(100.0, 1.0);
        assert_eq!(m.num_observations(), 1);
        assert_eq!(m.estimate(), 1.0);
        m.set_enabled(true);
        m.collect(3.0, 1.0);
        assert_eq!(m.num_observations(), 2);
    }

    #[test]
    fn test_numerical_stability_large_offset() {
        // A shifted sequence must keep the same variance.
        let offset = 1.0e9;
        let mut m = MeanEstimator::new("big", 0.95);
        for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            m.collect(x + offset, 1.0);
        }
        assert!((m.estimate() - (5.0 + offset)).abs() < 1e-3);
        assert!((m.variance() - 32.0 / 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_weighted_unit_weights_match_plain_mean() {
        let mut plain = MeanEstimator::new("p", 0.95);
        let mut weighted = WeightedMeanEstimator::new("w", 0.95);
        for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            plain.collect(x, 1.0);
            weighted.collect(x, 1.0);
        }
        assert!((plain.estimate() - weighted.estimate()).abs() < 1e-12);
        assert!((plain.variance() - weighted.variance()).abs() < 1e-12);
        assert!((plain.half_width() - weighted.half_width()).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_double_weight_equals_duplicate() {
        let mut doubled = WeightedMeanEstimator::new("d", 0.95);
        doubled.collect(2.0, 2.0);
        doubled.collect(8.0, 1.0);

        let mut duplicated = WeightedMeanEstimator::new("u", 0.95);
        duplicated.collect(2.0, 1.0);
        duplicated.collect(2.0, 1.0);
        duplicated.collect(8.0, 1.0);

        assert!((doubled.estimate() - duplicated.estimate()).abs() < 1e-12);
        assert!((doubled.variance() - duplicated.variance()).abs() < 1e-12);
    }

    #[test]
    #[should_panic]
    fn test_weighted_rejects_nonpositive_weight() {
        let mut w = WeightedMeanEstimator::new("w", 0.95);
        w.collect(1.0, 0.0);
    }
}
