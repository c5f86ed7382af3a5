//! Transient (warm-up) detection policies.

use std::collections::VecDeque;

use tracing::debug;

use crate::detect::{DetectorPhase, TransientDetector};

/// No-op policy: everything is steady state from time 0.
///
/// Detected immediately with a warm-up length of zero. Useful for
/// models initialized in (or near) steady state, and as the neutral
/// configuration for batch-means runs that skip truncation.
#[derive(Debug, Clone)]
pub struct NullTransientDetector {
    phase: DetectorPhase,
}

impl NullTransientDetector {
    pub fn new() -> Self {
        NullTransientDetector { phase: DetectorPhase::Searching }
    }
}

impl Default for NullTransientDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TransientDetector for NullTransientDetector {
    fn observe(&mut self, _value: f64, _weight: f64) -> DetectorPhase {
        self.phase = DetectorPhase::Detected;
        self.phase
    }

    fn phase(&self) -> DetectorPhase {
        self.phase
    }

    fn warmup_length(&self) -> Option<u64> {
        match self.phase {
            DetectorPhase::Detected => Some(0),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.phase = DetectorPhase::Searching;
    }
}

/// Window-stabilization heuristic in the spirit of Pawlikowski (1990):
/// the observation stream is cut into non-overlapping windows, and the
/// warm-up is declared over once a run of consecutive window means
/// stays within a relative tolerance of their common level — i.e. the
/// stream's low-frequency structure has stabilized.
///
/// Memory is O(`stable_windows`): only the recent window means are
/// retained. If no stable run appears within `observation_budget`
/// observations, the detector aborts.
#[derive(Debug, Clone)]
pub struct WindowedTransientDetector {
    window_len: u64,
    stable_windows: usize,
    tolerance: f64,
    observation_budget: u64,

    phase: DetectorPhase,
    seen: u64,
    current_sum: f64,
    current_len: u64,
    recent_means: VecDeque<f64>,
    warmup: Option<u64>,
}

impl WindowedTransientDetector {
    /// Create a detector that declares steady state once
    /// `stable_windows` consecutive windows of `window_len`
    /// observations have means within `tolerance` (relative spread),
    /// giving up after `observation_budget` observations.
    ///
    /// # Panics
    /// Panics on degenerate parameters (zero window, fewer than two
    /// windows, non-positive tolerance, budget smaller than one stable
    /// run).
    pub fn new(
        window_len: u64,
        stable_windows: usize,
        tolerance: f64,
        observation_budget: u64,
    ) -> Self {
        assert!(window_len > 0, "window length must be positive");
        assert!(stable_windows >= 2, "need at least two windows to compare");
        assert!(tolerance > 0.0, "tolerance must be positive");
        assert!(
            observation_budget >= window_len * stable_windows as u64,
            "budget too small for one full stable run"
        );
        WindowedTransientDetector {
            window_len,
            stable_windows,
            tolerance,
            observation_budget,
            phase: DetectorPhase::Searching,
            seen: 0,
            current_sum: 0.0,
            current_len: 0,
            recent_means: VecDeque::with_capacity(stable_windows),
            warmup: None,
        }
    }

    /// Spread test over the retained window means.
    fn is_stable(&self) -> bool {
        if self.recent_means.len() < self.stable_windows {
            return false;
        }
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &m in &self.recent_means {
            lo = lo.min(m);
            hi = hi.max(m);
            sum += m;
        }
        let level = sum / self.recent_means.len() as f64;
        // A level of exactly zero makes the relative test vacuous; use
        // the absolute spread there.
        let scale = if level == 0.0 { 1.0 } else { level.abs() };
        (hi - lo) <= self.tolerance * scale
    }
}

impl TransientDetector for WindowedTransientDetector {
    fn observe(&mut self, value: f64, _weight: f64) -> DetectorPhase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        self.seen += 1;
        self.current_sum += value;
        self.current_len += 1;

        if self.current_len == self.window_len {
            let mean = self.current_sum / self.window_len as f64;
            if self.recent_means.len() == self.stable_windows {
                self.recent_means.pop_front();
            }
            self.recent_means.push_back(mean);
            self.current_sum = 0.0;
            self.current_len = 0;

            if self.is_stable() {
                // Everything before the stable run is warm-up.
                let stable_span = self.window_len * self.stable_windows as u64;
                self.warmup = Some(self.seen - stable_span);
                self.phase = DetectorPhase::Detected;
                debug!(warmup = self.warmup, "transient detected");
                return self.phase;
            }
        }

        if self.seen >= self.observation_budget {
            self.phase = DetectorPhase::Aborted;
            debug!(budget = self.observation_budget, "transient detection aborted");
        }
        self.phase
    }

    fn phase(&self) -> DetectorPhase {
        self.phase
    }

    fn warmup_length(&self) -> Option<u64> {
        self.warmup
    }

    fn reset(&mut self) {
        self.phase = DetectorPhase::Searching;
        self.seen = 0;
        self.current_sum = 0.0;
        self.current_len = 0;
        self.recent_means.clear();
        self.warmup = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_detects_immediately() {
        let mut d = NullTransientDetector::new();
        assert_eq!(d.phase(), DetectorPhase::Searching);
        assert_eq!(d.observe(42.0, 1.0), DetectorPhase::Detected);
        assert_eq!(d.warmup_length(), Some(0));
    }

    #[test]
    fn test_constant_stream_detected_with_zero_warmup() {
        let mut d = WindowedTransientDetector::new(10, 4, 0.05, 10_000);
        let mut phase = DetectorPhase::Searching;
        for _ in 0..40 {
            phase = d.observe(7.0, 1.0);
        }
        assert_eq!(phase, DetectorPhase::Detected);
        assert_eq!(d.warmup_length(), Some(0));
    }

    #[test]
    fn test_decaying_transient_truncated() {
        // A transient that decays to a flat level: warm-up must cover
        // the decaying prefix, not the flat tail.
        let mut d = WindowedTransientDetector::new(10, 4, 0.05, 10_000);
        let mut detected_at = None;
        for i in 0..400u64 {
            let value = if i < 100 { 100.0 - i as f64 } else { 5.0 };
            if d.observe(value, 1.0) == DetectorPhase::Detected {
                detected_at = Some(i + 1);
                break;
            }
        }
        let warmup = d.warmup_length().expect("should detect");
        assert!(detected_at.is_some());
        assert!(warmup >= 90, "warm-up {} too short for a 100-long transient", warmup);
        assert!(warmup <= 110, "warm-up {} overshoots the transient", warmup);
    }

    #[test]
    fn test_ramp_never_stabilizes_aborts() {
        let mut d = WindowedTransientDetector::new(10, 4, 0.01, 500);
        let mut phase = DetectorPhase::Searching;
        for i in 0..500u64 {
            phase = d.observe(i as f64, 1.0);
        }
        assert_eq!(phase, DetectorPhase::Aborted);
        assert_eq!(d.phase(), DetectorPhase::Aborted);
        assert_eq!(d.warmup_length(), None);
    }

    #[test]
    fn test_terminal_phase_idempotent() {
        let mut d = WindowedTransientDetector::new(10, 4, 0.01, 500);
        for i in 0..500u64 {
            d.observe(i as f64, 1.0);
        }
        assert_eq!(d.phase(), DetectorPhase::Aborted);
        // Further observations change nothing.
        for _ in 0..100 {
            assert_eq!(d.observe(1.0, 1.0), DetectorPhase::Aborted);
        }
    }

    #[test]
    fn test_reset_returns_to_searching() {
        let mut d = WindowedTransientDetector::new(10, 4, 0.05, 10_000);
        for _ in 0..40 {
            d.observe(7.0, 1.0);
        }
        assert_eq!(d.phase(), DetectorPhase::Detected);
        d.reset();
        assert_eq!(d.phase(), DetectorPhase::Searching);
        assert_eq!(d.warmup_length(), None);
    }
}
