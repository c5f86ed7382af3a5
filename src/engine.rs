//! Simulation engine and run loop.
//!
//! Drives the event list: pops events, advances virtual time, dispatches
//! to a user-supplied handler. The loop is purely synchronous and
//! single-threaded — callbacks run to completion and all rescheduling
//! happens synchronously inside the callback, so determinism is trivial.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId};
use crate::event_list::EventList;
use crate::stats::{StatSummary, Statistic};
use crate::time::VirtualTime;

// ── Handler trait ─────────────────────────────────────────────────────

/// User-defined event handler.
///
/// Implement this trait to react to dispatched events. The handler
/// receives a mutable reference to [`EngineContext`] so it can read the
/// clock, schedule follow-up events, and feed observations into the
/// engine's registered statistics.
pub trait EventHandler<P> {
    /// Called for every dispatched event.
    fn handle(&mut self, ctx: &mut EngineContext<'_, P>, event: &Event<P>);
}

/// A handler backed by a closure — useful for tests and one-off models.
impl<P, F> EventHandler<P> for F
where
    F: FnMut(&mut EngineContext<'_, P>, &Event<P>),
{
    fn handle(&mut self, ctx: &mut EngineContext<'_, P>, event: &Event<P>) {
        (self)(ctx, event);
    }
}

// ── Engine Context ───────────────────────────────────────────────────

/// Mutable context passed to the handler on every event dispatch.
///
/// Provides the handler with:
/// - the current virtual time and aggregate counters (read-only)
/// - the ability to schedule and cancel events
/// - the `collect` entry point into registered statistics
///
/// The context borrows the event list mutably, so a handler cannot
/// interfere with dispatch ordering outside of the schedule API.
pub struct EngineContext<'a, P> {
    pub(crate) events: &'a mut EventList<P>,
    pub(crate) statistics: &'a mut BTreeMap<String, Box<dyn Statistic>>,
    pub(crate) now: VirtualTime,
    pub(crate) events_processed: u64,
    pub(crate) last_event_time: VirtualTime,
}

impl<'a, P> EngineContext<'a, P> {
    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Total elapsed virtual time of this run (equals `now`).
    #[inline]
    pub fn total_time(&self) -> VirtualTime {
        self.now
    }

    /// Fire time of the most recently dispatched event.
    #[inline]
    pub fn last_event_time(&self) -> VirtualTime {
        self.last_event_time
    }

    /// Number of events dispatched so far, including the current one.
    #[inline]
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Schedule an event at an absolute virtual time.
    ///
    /// Fails with [`SimError::InvalidSchedule`] if `at` is strictly
    /// before the current time. Scheduling at exactly `now` is legal;
    /// such events fire after the current one, in FIFO order among
    /// equal times.
    pub fn schedule_at(&mut self, at: VirtualTime, payload: P) -> SimResult<EventId> {
        if at.is_before(self.now) {
            return Err(SimError::InvalidSchedule {
                requested: at.value(),
                current: self.now.value(),
            });
        }
        Ok(self.events.schedule(at, payload))
    }

    /// Schedule an event `delay` after the current time.
    ///
    /// # Panics
    /// Panics if `delay` is negative or non-finite.
    pub fn schedule_after(&mut self, delay: f64, payload: P) -> EventId {
        self.events.schedule(self.now.plus(delay), payload)
    }

    /// Cancel a pending event by identity.
    ///
    /// Fails with [`SimError::UnknownEvent`] if the event already fired
    /// or was never scheduled — recoverable, not fatal.
    pub fn cancel(&mut self, id: EventId) -> SimResult<()> {
        self.events.cancel(id)
    }

    /// Feed one weighted observation into a registered statistic.
    ///
    /// Fails with [`SimError::UnknownStatistic`] if no statistic is
    /// registered under `name`.
    pub fn collect(&mut self, name: &str, value: f64, weight: f64) -> SimResult<()> {
        match self.statistics.get_mut(name) {
            Some(stat) => {
                stat.collect(value, weight);
                Ok(())
            }
            None => Err(SimError::UnknownStatistic(name.to_string())),
        }
    }

    /// Read access to a registered statistic.
    pub fn statistic(&self, name: &str) -> Option<&dyn Statistic> {
        self.statistics.get(name).map(|s| s.as_ref())
    }

    /// Number of pending events in the event list.
    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}

// ── Engine ────────────────────────────────────────────────────────────

/// Top-level simulation driver.
///
/// Owns the virtual clock, the event list, and a registry of named
/// statistics. Construct with [`Engine::new`] (no limits) or
/// [`Engine::with_limits`], seed initial events, then call [`Engine::run`]
/// to execute until event-list exhaustion or a run limit, or
/// [`Engine::step`] to advance by exactly one event. Statistics may be
/// read afterwards through [`Engine::statistic`].
pub struct Engine<P> {
    events: EventList<P>,
    statistics: BTreeMap<String, Box<dyn Statistic>>,
    current_time: VirtualTime,
    last_event_time: VirtualTime,
    events_processed: u64,
    max_events: Option<u64>,
    max_time: Option<VirtualTime>,
}

impl<P> Engine<P> {
    /// Create a new engine starting at time zero, with no run limits.
    pub fn new() -> Self {
        Engine::with_limits(None, None)
    }

    /// Create a new engine with optional run limits: a maximum number of
    /// dispatched events and/or a maximum virtual time. Events scheduled
    /// past the time limit stay queued and are never dispatched.
    pub fn with_limits(max_events: Option<u64>, max_time: Option<VirtualTime>) -> Self {
        Engine {
            events: EventList::new(),
            statistics: BTreeMap::new(),
            current_time: VirtualTime::ZERO,
            last_event_time: VirtualTime::ZERO,
            events_processed: 0,
            max_events,
            max_time,
        }
    }

    /// Current virtual time.
    pub fn current_time(&self) -> VirtualTime {
        self.current_time
    }

    /// Total elapsed virtual time (equals the current time).
    pub fn total_time(&self) -> VirtualTime {
        self.current_time
    }

    /// Fire time of the most recently dispatched event.
    pub fn last_event_time(&self) -> VirtualTime {
        self.last_event_time
    }

    /// Total events dispatched so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Schedule an event before or between runs.
    ///
    /// Fails with [`SimError::InvalidSchedule`] if `at` is strictly
    /// before the current time.
    pub fn schedule(&mut self, at: VirtualTime, payload: P) -> SimResult<EventId> {
        if at.is_before(self.current_time) {
            return Err(SimError::InvalidSchedule {
                requested: at.value(),
                current: self.current_time.value(),
            });
        }
        Ok(self.events.schedule(at, payload))
    }

    /// Cancel a pending event by identity.
    pub fn cancel(&mut self, id: EventId) -> SimResult<()> {
        self.events.cancel(id)
    }

    /// Register a statistic under its own name.
    ///
    /// Fails with [`SimError::StatisticAlreadyRegistered`] if the name
    /// is taken.
    pub fn register_statistic(&mut self, stat: Box<dyn Statistic>) -> SimResult<()> {
        let name = stat.name().to_string();
        if self.statistics.contains_key(&name) {
            return Err(SimError::StatisticAlreadyRegistered(name));
        }
        self.statistics.insert(name, stat);
        Ok(())
    }

    /// Read access to a registered statistic.
    pub fn statistic(&self, name: &str) -> Option<&dyn Statistic> {
        self.statistics.get(name).map(|s| s.as_ref())
    }

    /// Observation count of a registered statistic, 0 if unregistered.
    pub fn observation_count(&self, name: &str) -> u64 {
        self.statistic(name).map_or(0, |s| s.num_observations())
    }

    /// Summaries of all registered statistics, in name order.
    pub fn summaries(&self) -> Vec<StatSummary> {
        self.statistics.values().map(|s| s.summary()).collect()
    }

    /// Returns `true` once a run limit has been reached.
    pub fn limits_reached(&self) -> bool {
        if let Some(max) = self.max_events {
            if self.events_processed >= max {
                return true;
            }
        }
        false
    }

    /// Execute a single step: pop one event, advance time, dispatch.
    ///
    /// Returns `Some(event)` if an event was processed, `None` if the
    /// queue is empty or a run limit blocks further dispatch.
    pub fn step(&mut self, handler: &mut dyn EventHandler<P>) -> Option<Event<P>> {
        if self.limits_reached() {
            return None;
        }
        if let Some(limit) = self.max_time {
            let next = self.events.peek_next()?;
            if limit.is_before(next.fire_at) {
                return None;
            }
        }
        let event = self.events.pop_next()?;

        // Virtual time must never go backward.
        assert!(
            !event.fire_at.is_before(self.current_time),
            "Time went backward! current={}, event={}",
            self.current_time,
            event.fire_at
        );
        self.current_time = event.fire_at;
        self.last_event_time = event.fire_at;
        self.events_processed += 1;
        trace!(id = event.id.raw(), time = event.fire_at.value(), "dispatch");

        let mut ctx = EngineContext {
            events: &mut self.events,
            statistics: &mut self.statistics,
            now: self.current_time,
            events_processed: self.events_processed,
            last_event_time: self.last_event_time,
        };
        handler.handle(&mut ctx, &event);

        Some(event)
    }

    /// Run until the event list is exhausted or a run limit is reached.
    ///
    /// Returns the number of events processed during this call.
    pub fn run(&mut self, handler: &mut dyn EventHandler<P>) -> u64 {
        let start = self.events_processed;
        while self.step(handler).is_some() {}
        let processed = self.events_processed - start;
        debug!(
            processed,
            final_time = self.current_time.value(),
            "run complete"
        );
        processed
    }

    /// Run until exhaustion, a run limit, **or** until `stop` returns
    /// `true` — checked between steps, never mid-callback.
    ///
    /// This is the hook the output-analysis drivers use to make a
    /// replication-size detector the authoritative stopping condition,
    /// with the engine's own limits as a hard backstop.
    pub fn run_until(
        &mut self,
        handler: &mut dyn EventHandler<P>,
        mut stop: impl FnMut(&Engine<P>) -> bool,
    ) -> u64 {
        let start = self.events_processed;
        while !stop(self) {
            if self.step(handler).is_none() {
                break;
            }
        }
        self.events_processed - start
    }

    /// Returns `true` if there are no more events to process.
    pub fn is_finished(&self) -> bool {
        self.events.is_empty()
    }
}

impl<P> Default for Engine<P> {
    fn default() -> Self {
        Self::new()
    }
}
