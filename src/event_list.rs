//! Time-ordered event list.
//!
//! Uses a `BinaryHeap` with reversed `Ord` on `Event` to act as a
//! min-heap keyed by `(fire_at, event_id)`. Because event IDs are
//! strictly increasing and the heap is deterministic, equal fire times
//! always dispatch in FIFO scheduling order.
//!
//! Cancellation is lazy: a `BinaryHeap` cannot remove an interior
//! element, so cancelled IDs go into a tombstone set and the matching
//! events are discarded when they surface at the top of the heap.

use std::collections::{BinaryHeap, HashSet};

use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId, EventIdGen};
use crate::time::VirtualTime;

/// Ordered multiset of pending events, keyed by fire time.
///
/// Owns the heap, the tombstone set, and the ID generator. All
/// scheduling goes through this struct to ensure monotonic IDs and
/// deterministic ordering.
#[derive(Debug, Clone)]
pub struct EventList<P> {
    /// Min-heap (via reversed Ord on Event).
    queue: BinaryHeap<Event<P>>,

    /// IDs of scheduled events that have not yet fired or been cancelled.
    pending: HashSet<EventId>,

    /// IDs cancelled but still physically present in the heap.
    cancelled: HashSet<EventId>,

    /// Monotonic event-ID generator.
    id_gen: EventIdGen,
}

impl<P> EventList<P> {
    /// Create a new, empty event list.
    pub fn new() -> Self {
        EventList {
            queue: BinaryHeap::new(),
            pending: HashSet::new(),
            cancelled: HashSet::new(),
            id_gen: EventIdGen::new(),
        }
    }

    /// Insert a new event at the given fire time.
    ///
    /// Returns the `EventId` assigned to this event, which doubles as
    /// its cancellation handle.
    pub fn schedule(&mut self, fire_at: VirtualTime, payload: P) -> EventId {
        let id = self.id_gen.next_id();
        self.pending.insert(id);
        self.queue.push(Event::new(id, fire_at, payload));
        id
    }

    /// Cancel a pending event by identity.
    ///
    /// Fails with [`SimError::UnknownEvent`] if the event is not
    /// pending — never scheduled, already fired, or already cancelled.
    /// This is a recoverable, caller-checkable condition.
    pub fn cancel(&mut self, id: EventId) -> SimResult<()> {
        if self.pending.remove(&id) {
            self.cancelled.insert(id);
            Ok(())
        } else {
            Err(SimError::UnknownEvent(id))
        }
    }

    /// Remove and return the next live event (earliest time, lowest ID).
    ///
    /// Tombstoned events encountered on the way are dropped. Returns
    /// `None` when no live event remains.
    pub fn pop_next(&mut self) -> Option<Event<P>> {
        while let Some(event) = self.queue.pop() {
            if self.cancelled.remove(&event.id) {
                continue;
            }
            self.pending.remove(&event.id);
            return Some(event);
        }
        None
    }

    /// Peek at the next live event without removing it.
    ///
    /// Takes `&mut self` because tombstoned events at the top of the
    /// heap are discarded on the way.
    pub fn peek_next(&mut self) -> Option<&Event<P>> {
        while let Some(event) = self.queue.peek() {
            if self.cancelled.contains(&event.id) {
                let dead = self.queue.pop().expect("peeked event must pop");
                self.cancelled.remove(&dead.id);
                continue;
            }
            break;
        }
        self.queue.peek()
    }

    /// Returns `true` if no live event remains.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the number of live (non-cancelled) pending events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the next event ID that will be assigned.
    pub fn next_event_id(&self) -> EventId {
        self.id_gen.peek()
    }

    /// Drain all live events in deterministic order into a `Vec`.
    /// Useful for testing and snapshotting.
    pub fn drain_ordered(&mut self) -> Vec<Event<P>> {
        let mut events = Vec::with_capacity(self.pending.len());
        while let Some(e) = self.pop_next() {
            events.push(e);
        }
        events
    }
}

impl<P> Default for EventList<P> {
    fn default() -> Self {
        Self::new()
    }
}
