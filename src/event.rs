//! Event records for the simulation kernel.
//!
//! Every scheduled effect is modeled as an `Event`. Events are immutable
//! records placed on the event list and dispatched in deterministic
//! `(fire_at, id)` order.

use std::cmp::Ordering;

use crate::time::VirtualTime;

// ── Event ID ──────────────────────────────────────────────────────────

/// A strictly-increasing event identifier, unique within one event list.
///
/// The monotonic nature of `EventId` breaks fire-time ties: two events
/// scheduled at the same `VirtualTime` are ordered by their `EventId`,
/// which corresponds to scheduling (FIFO) order. It is also the handle
/// used to cancel a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic, strictly-increasing event-ID generator.
///
/// Each event list owns exactly one of these. Because a simulation run
/// is single-threaded and there is no shared mutable state, the counter
/// is trivially deterministic.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the next ID without consuming it.
    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }
}

impl Default for EventIdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single scheduled event.
///
/// Generic over the model-defined payload type `P`: the kernel never
/// inspects the payload, it only routes it back to the handler at the
/// right virtual time. The event list orders events by `(fire_at, id)`
/// to guarantee deterministic, FIFO-on-ties dispatch.
#[derive(Debug, Clone)]
pub struct Event<P> {
    /// Unique identifier (monotonically increasing); the cancel handle.
    pub id: EventId,

    /// The virtual time at which this event fires.
    pub fire_at: VirtualTime,

    /// The model-defined payload.
    pub payload: P,
}

impl<P> Event<P> {
    /// Convenience constructor.
    pub fn new(id: EventId, fire_at: VirtualTime, payload: P) -> Self {
        Event { id, fire_at, payload }
    }
}

/// Equality on the ordering key only — the payload does not participate,
/// so `P` needs no bounds.
impl<P> PartialEq for Event<P> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.fire_at == other.fire_at
    }
}

impl<P> Eq for Event<P> {}

/// Ordering: smallest `(fire_at, id)` first.
///
/// Rust's `BinaryHeap` is a *max*-heap, so we **reverse** the natural
/// ordering here to turn it into a min-heap.
impl<P> Ord for Event<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so that BinaryHeap pops the *smallest* key first.
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl<P> PartialOrd for Event<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
