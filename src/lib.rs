//! # Chronon — Simulation Kernel with Output Analysis
//!
//! A deterministic discrete-event simulation kernel paired with the
//! statistical machinery needed to trust its output. No async, no
//! threads, no wall-clock time — a virtual clock drives pure event
//! handlers, and every answer the analysis layer produces is either a
//! confidence interval or an explicit abort.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────┐
//! │        Analysis           │ ← replications / batch means
//! │  ┌─────────────────────┐  │
//! │  │      Detectors      │  │ ← transient, batch size, run length
//! │  └─────────────────────┘  │
//! │  ┌─────────────────────┐  │
//! │  │     Statistics      │  │ ← mean, extrema, quantile + t CIs
//! │  └─────────────────────┘  │
//! │  ┌─────────────────────┐  │
//! │  │      Engine         │  │ ← execution loop, run limits
//! │  │  ┌───────────────┐  │  │
//! │  │  │  EventList    │  │  │ ← deterministic min-heap
//! │  │  └───────────────┘  │  │
//! │  │  ┌───────────────┐  │  │
//! │  │  │ VirtualTime   │  │  │ ← logical clock
//! │  │  └───────────────┘  │  │
//! │  └─────────────────────┘  │
//! └───────────────────────────┘
//! ```

pub mod analysis;
pub mod detect;
pub mod engine;
pub mod error;
pub mod event;
pub mod event_list;
pub mod rng;
pub mod stats;
pub mod time;

// Re-exports for convenience.
pub use analysis::{
    AbortReason, AnalysisOutcome, BatchMeans, IndependentReplications, Report,
};
pub use detect::{
    BatchSizeDetector, DetectorPhase, ReplicationCountDetector, ReplicationSizeDetector,
    TransientDetector,
};
pub use engine::{Engine, EngineContext, EventHandler};
pub use error::{SimError, SimResult};
pub use event::{Event, EventId, EventIdGen};
pub use event_list::EventList;
pub use rng::{ChaChaSource, Distribution, RandomSource};
pub use stats::{StatSummary, Statistic};
pub use time::VirtualTime;
