//! Structured error types for Chronon.
//!
//! All fallible public APIs return `Result<T, SimError>`. This lets
//! callers distinguish recoverable operational errors (e.g. cancelling an
//! event that already fired) from programming errors (which assert and
//! abort the run) without relying on stringly-typed errors.

use crate::event::EventId;

/// The top-level error type for the simulation kernel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SimError {
    // ── Scheduling errors ─────────────────────────────────

    /// Attempted to schedule an event strictly before the current
    /// virtual time.
    InvalidSchedule {
        requested: f64,
        current: f64,
    },

    /// Attempted to cancel an event that is not pending — either it was
    /// never scheduled, already fired, or was already cancelled.
    UnknownEvent(EventId),

    // ── Statistic registry errors ─────────────────────────

    /// A statistic name was referenced but is not registered with the
    /// engine.
    UnknownStatistic(String),

    /// Attempted to register a statistic under a name already in use.
    StatisticAlreadyRegistered(String),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::InvalidSchedule { requested, current } => write!(
                f,
                "cannot schedule event at T={} when current time is T={}",
                requested, current
            ),
            SimError::UnknownEvent(id) => {
                write!(f, "event {} is not pending (unknown, fired, or cancelled)", id)
            }
            SimError::UnknownStatistic(name) => {
                write!(f, "statistic '{}' is not registered", name)
            }
            SimError::StatisticAlreadyRegistered(name) => {
                write!(f, "statistic '{}' is already registered", name)
            }
        }
    }
}

impl std::error::Error for SimError {}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
