//! Running extremum estimators.
//!
//! A running max or min is a point estimate with no sampling
//! uncertainty in this design: variance and half-width are defined to
//! be exactly 0, so an extremum never blocks a precision-driven
//! stopping rule.

use crate::stats::Statistic;

/// Running maximum. `estimate` is the fold identity (`-inf`) before the
/// first observation.
#[derive(Debug, Clone)]
pub struct MaxEstimator {
    name: String,
    confidence: f64,
    count: u64,
    extremum: f64,
    enabled: bool,
}

/// Running minimum. `estimate` is the fold identity (`+inf`) before the
/// first observation.
#[derive(Debug, Clone)]
pub struct MinEstimator {
    name: String,
    confidence: f64,
    count: u64,
    extremum: f64,
    enabled: bool,
}

impl MaxEstimator {
    /// Create a new running-maximum estimator.
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must be in (0, 1), got {}",
            confidence
        );
        MaxEstimator {
            name: name.into(),
            confidence,
            count: 0,
            extremum: f64::NEG_INFINITY,
            enabled: true,
        }
    }
}

impl MinEstimator {
    /// Create a new running-minimum estimator.
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must be in (0, 1), got {}",
            confidence
        );
        MinEstimator {
            name: name.into(),
            confidence,
            count: 0,
            extremum: f64::INFINITY,
            enabled: true,
        }
    }
}

impl Statistic for MaxEstimator {
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
        if value > self.extremum {
            self.extremum = value;
        }
    }

    fn estimate(&self) -> f64 {
        self.extremum
    }

    fn variance(&self) -> f64 {
        0.0
    }

    fn half_width(&self) -> f64 {
        0.0
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
        self.extremum = f64::NEG_INFINITY;
    }
}

impl Statistic for MinEstimator {
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
        if value < self.extremum {
            self.extremum = value;
        }
    }

    fn estimate(&self) -> f64 {
        self.extremum
    }

    fn variance(&self) -> f64 {
        0.0
    }

    fn half_width(&self) -> f64 {
        0.0
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
        self.extremum = f64::INFINITY;
    }
}
