//! Online statistic estimators.
//!
//! Every measured quantity in a simulation is tracked by one estimator
//! implementing the [`Statistic`] trait: a memory-bounded accumulator
//! that accepts weighted observations and reports a point estimate, a
//! confidence half-width, and metadata. Estimators never panic on
//! statistically undefined states — they return sentinel values instead
//! (`+inf` for unbounded imprecision, `0` for no dispersion by
//! construction), and callers must check `num_observations` before
//! trusting a derived quantity.

pub mod extrema;
pub mod mean;
pub mod quantile;
pub mod student_t;

pub use extrema::{MaxEstimator, MinEstimator};
pub use mean::{MeanEstimator, WeightedMeanEstimator};
pub use quantile::P2Estimator;

/// Common contract for all online estimators.
///
/// `collect` is the single mutation entry point; everything else is a
/// read accessor or `reset`. Implementations are not thread-safe —
/// one run, one owner (see the crate docs on the concurrency model).
pub trait Statistic {
    /// The name of the measured quantity.
    fn name(&self) -> &str;

    /// Configured confidence level in (0, 1), e.g. 0.95.
    fn confidence_level(&self) -> f64;

    /// Accept one weighted observation. Estimators that do not support
    /// weighting ignore `weight`. A no-op while disabled.
    fn collect(&mut self, value: f64, weight: f64);

    /// Current point estimate.
    fn estimate(&self) -> f64;

    /// Current variance estimate; `+inf` when undefined (fewer than two
    /// observations for dispersion-bearing estimators).
    fn variance(&self) -> f64;

    /// Square root of the variance; `+inf` propagates.
    fn standard_deviation(&self) -> f64 {
        let v = self.variance();
        if v.is_finite() {
            v.sqrt()
        } else {
            f64::INFINITY
        }
    }

    /// Radius of the confidence interval at the configured level;
    /// `+inf` when undefined.
    fn half_width(&self) -> f64;

    /// `half_width / |estimate|`.
    ///
    /// Defined as `+inf` when the estimate is exactly 0 or fewer than
    /// two observations exist: division by near-zero is treated as
    /// infinite imprecision, never as a runtime fault.
    fn relative_precision(&self) -> f64 {
        if self.num_observations() < 2 {
            return f64::INFINITY;
        }
        let est = self.estimate();
        if est == 0.0 {
            return f64::INFINITY;
        }
        self.half_width() / est.abs()
    }

    /// Whether the relative precision has reached `target`.
    fn precision_reached(&self, target: f64) -> bool {
        self.relative_precision() <= target
    }

    /// Number of observations collected since the last reset.
    fn num_observations(&self) -> u64;

    /// Whether `collect` currently accepts observations.
    fn is_enabled(&self) -> bool;

    /// Enable or disable collection. Disabling does not clear state.
    fn set_enabled(&mut self, enabled: bool);

    /// Reinitialize accumulator state without destroying identity
    /// (name and confidence level are preserved). After `reset`, the
    /// externally observable state equals a freshly constructed
    /// estimator's.
    fn reset(&mut self);

    /// Snapshot of the read accessors, for external formatters.
    fn summary(&self) -> StatSummary {
        StatSummary {
            name: self.name().to_string(),
            estimate: self.estimate(),
            half_width: self.half_width(),
            standard_deviation: self.standard_deviation(),
            observations: self.num_observations(),
            confidence_level: self.confidence_level(),
        }
    }
}

/// Plain-data snapshot of an estimator, decoupled from the `Statistic`
/// contract so external formatters can render reports any way they like.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StatSummary {
    pub name: String,
    pub estimate: f64,
    pub half_width: f64,
    pub standard_deviation: f64,
    pub observations: u64,
    pub confidence_level: f64,
}

impl std::fmt::Display for StatSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ± {} ({}% CI, n={})",
            self.name,
            self.estimate,
            self.half_width,
            self.confidence_level * 100.0,
            self.observations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let s = StatSummary {
            name: "wait_time".into(),
            estimate: 5.0,
            half_width: 1.5,
            standard_deviation: 2.0,
            observations: 8,
            confidence_level: 0.95,
        };
        assert_eq!(format!("{}", s), "wait_time: 5 ± 1.5 (95% CI, n=8)");
    }

    #[test]
    fn test_relative_precision_sentinels() {
        let mut m = MeanEstimator::new("m", 0.95);
        assert_eq!(m.relative_precision(), f64::INFINITY);
        m.collect(0.0, 1.0);
        m.collect(0.0, 1.0);
        // Estimate is exactly zero → infinite imprecision, not a fault.
        assert_eq!(m.relative_precision(), f64::INFINITY);
    }
}
