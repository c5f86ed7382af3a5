//! Virtual time for the simulation kernel.
//!
//! Represents a logical timestamp with no dependency on `std::time`.
//! Time advances only when the engine processes events — never from
//! wall-clock observation. The clock is real-valued because models draw
//! continuous inter-event delays (e.g. exponential service times).

use std::cmp::Ordering;

/// A point on the simulation's logical clock.
///
/// Backed by `f64` with a total order via `f64::total_cmp`. Construction
/// rejects non-finite values: a NaN or infinite timestamp is a usage bug,
/// not a runtime condition.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(f64);

impl VirtualTime {
    /// The zero-point of simulation time.
    pub const ZERO: VirtualTime = VirtualTime(0.0);

    /// Create a new `VirtualTime` from a raw clock value.
    ///
    /// # Panics
    /// Panics if `value` is NaN or infinite.
    #[inline]
    pub fn new(value: f64) -> Self {
        assert!(value.is_finite(), "VirtualTime must be finite, got {}", value);
        VirtualTime(value)
    }

    /// Return the raw clock value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Compute the absolute time that is `delay` after `self`.
    ///
    /// # Panics
    /// Panics if `delay` is negative or non-finite.
    #[inline]
    pub fn plus(self, delay: f64) -> VirtualTime {
        assert!(
            delay.is_finite() && delay >= 0.0,
            "delay must be finite and non-negative, got {}",
            delay
        );
        VirtualTime::new(self.0 + delay)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: VirtualTime) -> bool {
        self.0 < other.0
    }

    /// Returns the duration between two points in time.
    /// Returns `None` if `other` is after `self`.
    #[inline]
    pub fn duration_since(self, other: VirtualTime) -> Option<f64> {
        if self.0 >= other.0 {
            Some(self.0 - other.0)
        } else {
            None
        }
    }
}

impl PartialEq for VirtualTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for VirtualTime {}

impl PartialOrd for VirtualTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}
