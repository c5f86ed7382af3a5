//! Output-analysis methods.
//!
//! Two termination/validity procedures turn raw simulation output into
//! statistically defensible answers: independent replications
//! ([`replications::IndependentReplications`]) and batch means
//! ([`batch_means::BatchMeans`]). Both end in exactly one of two
//! user-visible outcomes: a [`Report`] with a Student-t confidence
//! interval, or a distinct [`AbortReason`] — never a silently
//! unreliable interval.

pub mod batch_means;
pub mod replications;

pub use batch_means::{BatchMeans, BatchMeansPhase};
pub use replications::{run_replication, IndependentReplications, ReplicationPhase};

/// Final answer of an output-analysis method.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    /// Name of the measured quantity.
    pub name: String,
    /// Point estimate (mean of the derived sample).
    pub estimate: f64,
    /// Student-t confidence half-width over the derived sample.
    pub half_width: f64,
    /// Standard deviation of the derived sample.
    pub std_dev: f64,
    /// Size of the derived sample (replications or batches).
    pub observations: u64,
    /// Confidence level of the interval.
    pub confidence: f64,
}

impl Report {
    /// `half_width / |estimate|`; `+inf` for a zero estimate.
    pub fn relative_precision(&self) -> f64 {
        if self.estimate == 0.0 {
            f64::INFINITY
        } else {
            self.half_width / self.estimate.abs()
        }
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ± {} ({}% CI, n={})",
            self.name,
            self.estimate,
            self.half_width,
            self.confidence * 100.0,
            self.observations
        )
    }
}

/// Why an output-analysis method gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AbortReason {
    /// The transient detector found no warm-up length within its
    /// observation budget.
    TransientUndetected { observations: u64 },
    /// The batch-size detector found no independent batch length within
    /// its observation budget.
    BatchSizeUndetected { observations: u64 },
    /// The sequential replication rule hit its replication cap before
    /// reaching the precision target.
    ReplicationCapExceeded { replications: u64 },
    /// The precision target was not met within the observation budget.
    PrecisionNotReached { observations: u64 },
    /// The run ended with too little data for any interval (fewer than
    /// two derived samples, or still warming up).
    InsufficientData { observations: u64 },
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::TransientUndetected { observations } => write!(
                f,
                "no steady state detected within {} observations",
                observations
            ),
            AbortReason::BatchSizeUndetected { observations } => write!(
                f,
                "no independent batch size found within {} observations",
                observations
            ),
            AbortReason::ReplicationCapExceeded { replications } => write!(
                f,
                "precision target unmet after {} replications",
                replications
            ),
            AbortReason::PrecisionNotReached { observations } => write!(
                f,
                "precision target unmet after {} observations",
                observations
            ),
            AbortReason::InsufficientData { observations } => {
                write!(f, "insufficient data ({} observations)", observations)
            }
        }
    }
}

/// Converged-or-aborted: the only two ways an experiment ends.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AnalysisOutcome {
    /// A statistically valid answer.
    Converged(Report),
    /// No statistically valid answer within budget.
    Aborted(AbortReason),
}

impl AnalysisOutcome {
    /// Returns `true` for `Converged`.
    pub fn is_converged(&self) -> bool {
        matches!(self, AnalysisOutcome::Converged(_))
    }

    /// The report, if converged.
    pub fn report(&self) -> Option<&Report> {
        match self {
            AnalysisOutcome::Converged(report) => Some(report),
            AnalysisOutcome::Aborted(_) => None,
        }
    }
}

impl std::fmt::Display for AnalysisOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisOutcome::Converged(report) => write!(f, "converged: {}", report),
            AnalysisOutcome::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}
