//! Streaming quantile estimation.
//!
//! Implements the P² algorithm (Jain & Chlamtac, 1985): five markers
//! track the target quantile and its neighbors, adjusted by parabolic
//! interpolation as observations arrive. O(1) memory, no stored
//! observation history. Exact over the first five observations.

use crate::stats::student_t;
use crate::stats::Statistic;

/// P² streaming estimator of the `p`-quantile.
///
/// The half-width is **an approximation**, not an exact interval: it is
/// a Student-t interval on the binomial proportion variance
/// `p(1-p)/(n-1)`, expressed in probability units. It is adequate as a
/// convergence signal but should not be reported as an exact quantile
/// interval.
#[derive(Debug, Clone)]
pub struct P2Estimator {
    name: String,
    confidence: f64,
    probability: f64,
    count: u64,
    /// Marker heights (estimates of the 0, p/2, p, (1+p)/2, 1 quantiles).
    heights: [f64; 5],
    /// Actual marker positions, 0-based.
    positions: [f64; 5],
    /// Desired marker positions.
    desired: [f64; 5],
    /// Per-observation desired-position increments.
    increments: [f64; 5],
    /// Buffer for the first five observations.
    initial: Vec<f64>,
    enabled: bool,
}

impl P2Estimator {
    /// Create a new estimator of the `probability`-quantile of `name`.
    ///
    /// # Panics
    /// Panics unless `0 < probability < 1` and `0 < confidence < 1`.
    pub fn new(name: impl Into<String>, probability: f64, confidence: f64) -> Self {
        assert!(
            probability > 0.0 && probability < 1.0,
            "quantile probability must be in (0, 1), got {}",
            probability
        );
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must be in (0, 1), got {}",
            confidence
        );
        let p = probability;
        P2Estimator {
            name: name.into(),
            confidence,
            probability: p,
            count: 0,
            heights: [0.0; 5],
            positions: [0.0, 1.0, 2.0, 3.0, 4.0],
            desired: [0.0, 2.0 * p, 4.0 * p, 2.0 + 2.0 * p, 4.0],
            increments: [0.0, p / 2.0, p, (1.0 + p) / 2.0, 1.0],
            initial: Vec::with_capacity(5),
            enabled: true,
        }
    }

    /// The target quantile probability.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Marker adjustment step for one post-initialization observation.
    fn update_markers(&mut self, x: f64) {
        // Locate the cell containing x, clamping into the extremes.
        let k = if x < self.heights[0] {
            self.heights[0] = x;
            0
        } else if x >= self.heights[4] {
            self.heights[4] = x;
            3
        } else {
            let mut cell = 0;
            for i in 0..4 {
                if self.heights[i] <= x {
                    cell = i;
                }
            }
            cell
        };

        for i in (k + 1)..5 {
            self.positions[i] += 1.0;
        }
        for i in 0..5 {
            self.desired[i] += self.increments[i];
        }

        // Adjust the three interior markers toward their desired
        // positions, by parabolic interpolation when it stays monotone,
        // linearly otherwise.
        for i in 1..4 {
            let offset = self.desired[i] - self.positions[i];
            let right_gap = self.positions[i + 1] - self.positions[i];
            let left_gap = self.positions[i - 1] - self.positions[i];
            if (offset >= 1.0 && right_gap > 1.0) || (offset <= -1.0 && left_gap < -1.0) {
                let d = offset.signum();
                let parabolic = self.heights[i]
                    + d / (self.positions[i + 1] - self.positions[i - 1])
                        * ((self.positions[i] - self.positions[i - 1] + d)
                            * (self.heights[i + 1] - self.heights[i])
                            / right_gap
                            + (self.positions[i + 1] - self.positions[i] - d)
                                * (self.heights[i] - self.heights[i - 1])
                                / (self.positions[i] - self.positions[i - 1]));
                if self.heights[i - 1] < parabolic && parabolic < self.heights[i + 1] {
                    self.heights[i] = parabolic;
                } else {
                    // Parabolic prediction left the bracket; fall back
                    // to linear interpolation toward the neighbor.
                    let j = if d > 0.0 { i + 1 } else { i - 1 };
                    self.heights[i] += d * (self.heights[j] - self.heights[i])
                        / (self.positions[j] - self.positions[i]);
                }
                self.positions[i] += d;
            }
        }
    }
}

impl Statistic for P2Estimator {
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
        if self.count <= 5 {
            self.initial.push(value);
            if self.count == 5 {
                self.initial.sort_by(|a, b| a.total_cmp(b));
                for (h, v) in self.heights.iter_mut().zip(self.initial.iter()) {
                    *h = *v;
                }
            }
            return;
        }
        self.update_markers(value);
    }

    fn estimate(&self) -> f64 {
        if self.count >= 5 {
            return self.heights[2];
        }
        if self.count == 0 {
            return 0.0;
        }
        // Exact order statistic while still buffering.
        let mut sorted = self.initial.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let rank = (self.probability * self.count as f64).ceil() as usize;
        sorted[rank.clamp(1, sorted.len()) - 1]
    }

    fn variance(&self) -> f64 {
        // Binomial proportion variance of the quantile's probability —
        // an approximation, in squared probability units.
        if self.count > 1 {
            self.probability * (1.0 - self.probability) / (self.count - 1) as f64
        } else {
            f64::INFINITY
        }
    }

    fn half_width(&self) -> f64 {
        if self.count <= 1 {
            return f64::INFINITY;
        }
        let t = student_t::critical_value(self.confidence, self.count - 1);
        t * self.variance().sqrt()
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
        let p = self.probability;
        self.count = 0;
        self.heights = [0.0; 5];
        self.positions = [0.0, 1.0, 2.0, 3.0, 4.0];
        self.desired = [0.0, 2.0 * p, 4.0 * p, 2.0 + 2.0 * p, 4.0];
        self.increments = [0.0, p / 2.0, p, (1.0 + p) / 2.0, 1.0];
        self.initial.clear();
    }
}
