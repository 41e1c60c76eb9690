//! Event scheduling.
//!
//! The [`EventScheduler`] files [`EventInstance`]s under *eventful moments*,
//! i.e. distinct simulation times at which at least one event is pending.
//! Events are kept in a single associative priority queue ordered by time,
//! then by [`Priority`](crate::event::Priority), then by filing order, so
//! that events filed at the same time with equal priorities are raised in
//! FIFO order. A side index counts the events filed under each moment.
//!
//! The scheduler does not know the current simulation time: checking that
//! an event is not filed in the past is the responsibility of the caller,
//! which is normally the [`Simulation`](crate::simulation::Simulation) or a
//! handler [`Context`].

use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use tracing::{debug, trace};

use crate::event::{EventInstance, Priority};
use crate::simulation::{Context, World};
use crate::time::SimTime;
use crate::util::priority_queue::{InsertKey, PriorityQueue};

/// A handle to an event filed in an [`EventScheduler`].
///
/// A key designates an event instance rather than a single filing: it remains
/// valid when a periodic event is filed again for its next occurrence or when
/// an event is re-scheduled from its own handler. Keys are never reused, even
/// after a [reset](EventScheduler::reset).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventKey(u64);

/// Summary of a processed eventful moment.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EventfulMoment {
    time: SimTime,
    event_count: usize,
    handler_count: usize,
}

impl EventfulMoment {
    /// Returns the time of the moment.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Returns the number of events raised.
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Returns the total number of handlers invoked.
    pub fn handler_count(&self) -> usize {
        self.handler_count
    }
}

/// Where an event currently lives.
#[derive(Copy, Clone, Debug)]
enum Filing {
    /// Pending in the queue.
    Queued(InsertKey),
    /// Pulled from the queue as part of the moment being processed.
    InFlight,
}

/// What happens to an event once its handlers have run.
#[derive(Debug, Default)]
pub(crate) struct Disposition {
    pub(crate) reschedule: Option<SimTime>,
    pub(crate) stop_repeating: bool,
}

/// Time-ordered collection of pending events.
///
/// See the [module-level documentation](self) for more details.
pub struct EventScheduler {
    queue: PriorityQueue<(SimTime, Priority), (u64, EventInstance)>,
    moments: BTreeMap<SimTime, usize>,
    filings: HashMap<u64, Filing>,
    next_event_id: u64,
    event_counter: u64,
    handler_counter: u64,
}

impl EventScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            moments: BTreeMap::new(),
            filings: HashMap::new(),
            next_event_id: 0,
            event_counter: 0,
            handler_counter: 0,
        }
    }

    /// Files an event under the moment for the specified time, creating the
    /// moment if necessary, and returns a key that identifies the event.
    ///
    /// The time of the event is overwritten with the specified time.
    pub fn add(&mut self, time: impl Into<SimTime>, event: EventInstance) -> EventKey {
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.file(id, time.into(), event);

        EventKey(id)
    }

    /// Removes a pending event and returns it.
    ///
    /// The moment the event was filed under is discarded if it becomes empty.
    /// `None` is returned if the event is not pending, which is the case if it
    /// was already raised or removed, or if it is being raised as part of the
    /// moment being processed (see [`EventScheduler::cancel`]).
    pub fn remove(&mut self, key: EventKey) -> Option<EventInstance> {
        let Some(&Filing::Queued(insert_key)) = self.filings.get(&key.0) else {
            return None;
        };
        let ((time, _), (_, event)) = self.queue.remove(insert_key)?;
        self.filings.remove(&key.0);
        self.release_moment(time);

        Some(event)
    }

    /// Cancels an event.
    ///
    /// Unlike [`EventScheduler::remove`], this also applies to an event
    /// belonging to the moment being processed: if it was not raised yet it
    /// will be skipped, and if it is being raised it will not be filed again.
    ///
    /// Returns `true` if the event was pending or in flight.
    pub fn cancel(&mut self, key: EventKey) -> bool {
        match self.filings.get(&key.0) {
            Some(Filing::Queued(_)) => self.remove(key).is_some(),
            Some(Filing::InFlight) => {
                self.filings.remove(&key.0);
                true
            }
            None => false,
        }
    }

    /// Returns the time a pending event is filed under.
    pub fn scheduled_time(&self, key: EventKey) -> Option<SimTime> {
        match self.filings.get(&key.0) {
            Some(&Filing::Queued(insert_key)) => {
                self.queue.get(insert_key).map(|(&(time, _), _)| time)
            }
            _ => None,
        }
    }

    /// Returns a reference to a pending event.
    pub fn get(&self, key: EventKey) -> Option<&EventInstance> {
        match self.filings.get(&key.0) {
            Some(&Filing::Queued(insert_key)) => {
                self.queue.get(insert_key).map(|(_, (_, event))| event)
            }
            _ => None,
        }
    }

    /// Returns the time of the earliest eventful moment, or `None` if no event
    /// is pending.
    pub fn time_of_next_scheduled_event(&self) -> Option<SimTime> {
        self.queue.peek_key().map(|&(time, _)| time)
    }

    /// Raises all events filed under the earliest eventful moment and returns
    /// a summary of the processed moment, or `None` if no event is pending.
    ///
    /// The time of `world` is advanced to that of the moment before any
    /// handler is invoked. The moment is detached from the scheduler before
    /// its first event is raised: events filed by the handlers, including at
    /// the current time, are processed as part of a later moment.
    pub fn process_next_point_in_time(&mut self, world: &mut World) -> Option<EventfulMoment> {
        let time = self.time_of_next_scheduled_event()?;
        self.moments.remove(&time);
        world.set_time(time);

        let mut batch = Vec::new();
        while self.queue.peek_key().is_some_and(|&(t, _)| t == time) {
            let Some((_, (id, event))) = self.queue.pull() else {
                break;
            };
            self.filings.insert(id, Filing::InFlight);
            batch.push((id, event));
        }
        trace!(time = %time, events = batch.len(), "processing eventful moment");

        let mut moment = EventfulMoment {
            time,
            event_count: 0,
            handler_count: 0,
        };
        for (id, mut event) in batch {
            // Skip events cancelled by a handler raised earlier in the moment.
            if !self.is_in_flight(id) {
                continue;
            }

            let handler_count = event.handler_count();
            if event.log_enabled() {
                debug!(
                    event = event.name(),
                    time = %time,
                    handlers = handler_count,
                    "raising event"
                );
            }

            let mut disposition = Disposition::default();
            {
                let name = event.shared_name();
                let mut cx = Context::new(self, world, &mut disposition, EventKey(id), &name);
                event.raise(&mut cx);
            }

            self.event_counter += 1;
            self.handler_counter += handler_count as u64;
            moment.event_count += 1;
            moment.handler_count += handler_count;

            self.settle(id, time, event, disposition);
        }

        Some(moment)
    }

    /// Discards all pending events and zeroes the counters.
    ///
    /// Keys issued before the reset are invalidated.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.moments.clear();
        self.filings.clear();
        self.reset_event_counter();
    }

    /// Zeroes the event and handler counters, leaving pending events intact.
    pub fn reset_event_counter(&mut self) {
        self.event_counter = 0;
        self.handler_counter = 0;
    }

    /// Returns the number of eventful moments.
    pub fn eventful_moments_count(&self) -> usize {
        self.moments.len()
    }

    /// Returns the number of events pending at the specified time.
    pub fn events_at(&self, time: impl Into<SimTime>) -> usize {
        self.moments.get(&time.into()).copied().unwrap_or(0)
    }

    /// Returns an iterator over the times of the eventful moments in
    /// chronological order.
    pub fn moment_times(&self) -> impl Iterator<Item = SimTime> + '_ {
        self.moments.keys().copied()
    }

    /// Returns the number of events raised since the last counter reset.
    pub fn event_counter(&self) -> u64 {
        self.event_counter
    }

    /// Returns the number of handlers invoked since the last counter reset.
    pub fn handler_counter(&self) -> u64 {
        self.handler_counter
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if no event is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Files an event under an existing identifier.
    fn file(&mut self, id: u64, time: SimTime, mut event: EventInstance) {
        event.set_time(time);
        let insert_key = self.queue.insert((time, event.priority()), (id, event));
        *self.moments.entry(time).or_insert(0) += 1;
        self.filings.insert(id, Filing::Queued(insert_key));
    }

    /// Decrements the event count of a moment and drops the moment once
    /// empty.
    fn release_moment(&mut self, time: SimTime) {
        if let btree_map::Entry::Occupied(mut entry) = self.moments.entry(time) {
            *entry.get_mut() -= 1;
            if *entry.get() == 0 {
                entry.remove();
            }
        }
    }

    fn is_in_flight(&self, id: u64) -> bool {
        matches!(self.filings.get(&id), Some(Filing::InFlight))
    }

    /// Files a raised event again if requested, or forgets it.
    fn settle(
        &mut self,
        id: u64,
        time: SimTime,
        mut event: EventInstance,
        disposition: Disposition,
    ) {
        // Cancelled by its own handlers.
        if !self.is_in_flight(id) {
            return;
        }
        if disposition.stop_repeating {
            event.set_period(None);
        }

        let next_time = disposition
            .reschedule
            .or_else(|| event.period().map(|period| time + period));
        match next_time {
            Some(next_time) => self.file(id, next_time, event),
            None => {
                self.filings.remove(&id);
            }
        }
    }

    /// Files a periodic event.
    pub(crate) fn add_periodic(
        &mut self,
        time: SimTime,
        period: f64,
        mut event: EventInstance,
    ) -> EventKey {
        event.set_period(Some(period));

        self.add(time, event)
    }
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventScheduler")
            .field("pending_events", &self.queue.len())
            .field("eventful_moments", &self.moments.len())
            .field("event_counter", &self.event_counter)
            .field("handler_counter", &self.handler_counter)
            .finish_non_exhaustive()
    }
}

/// Checks that a time is a valid scheduling target at time `now`.
pub(crate) fn check_time(now: SimTime, time: SimTime) -> Result<SimTime, SchedulingError> {
    if !time.is_finite() || time < now {
        return Err(SchedulingError::InvalidScheduledTime);
    }

    Ok(time)
}

/// Converts a delay relative to `now` into a scheduling target.
pub(crate) fn check_delay(now: SimTime, delay: f64) -> Result<SimTime, SchedulingError> {
    if !(delay >= 0.0) {
        return Err(SchedulingError::InvalidScheduledTime);
    }

    now.checked_add(delay)
        .ok_or(SchedulingError::InvalidScheduledTime)
        .and_then(|time| check_time(now, time))
}

/// Checks that a repetition period is strictly positive and finite.
pub(crate) fn check_period(period: f64) -> Result<f64, SchedulingError> {
    if !(period > 0.0 && period.is_finite()) {
        return Err(SchedulingError::InvalidRepetitionPeriod);
    }

    Ok(period)
}

/// Error returned when the scheduled time, the repetition period or the step
/// size are invalid.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SchedulingError {
    /// The scheduled time lies before the current simulation time or is not
    /// finite.
    InvalidScheduledTime,
    /// The repetition period is not strictly positive and finite.
    InvalidRepetitionPeriod,
    /// The step size is not strictly positive and finite.
    InvalidStepSize,
}

impl fmt::Display for SchedulingError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScheduledTime => write!(
                fmt,
                "the scheduled time should be finite and not lie before the current simulation time"
            ),
            Self::InvalidRepetitionPeriod => write!(
                fmt,
                "the repetition period should be strictly positive and finite"
            ),
            Self::InvalidStepSize => {
                write!(fmt, "the step size should be strictly positive and finite")
            }
        }
    }
}

impl Error for SchedulingError {}
