//! Discrete-event simulation management.
//!
//! This module contains most notably the [`Simulation`] environment, the
//! [`SimInit`] simulation builder, the [`EventScheduler`] and the handler
//! [`Context`], as well as miscellaneous other types related to simulation
//! management.
//!
//! # Simulation lifecycle
//!
//! The lifecycle of a simulation typically comprises the following stages:
//!
//! 1. instantiation of a [`SimInit`] simulation builder and initialization of
//!    a [`Simulation`] instance with [`SimInit::init()`],
//! 2. registration of the domain entities with [`Simulation::add_entity()`],
//! 3. scheduling of the initial events with [`Simulation::schedule()`] or
//!    [`Simulation::add_event_at()`],
//! 4. execution with one of [`Simulation::run()`],
//!    [`Simulation::run_until()`] or [`Simulation::step()`] and its variants,
//! 5. inspection of the entities and, for repeated evaluations such as
//!    optimization loops, a [`Simulation::reset_with_seed()`] before the next
//!    iteration.
//!
//! # State machine
//!
//! A simulation is [`Stopped`](SimState::Stopped) until a run starts, and is
//! [`Running`](SimState::Running) for the duration of the run. A run ends in
//! one of the following ways:
//!
//! - when no event remains, the simulation is `Stopped` and the run outcome
//!   is [`RunOutcome::Completed`],
//! - when a bounded run reaches its target time while events remain, the
//!   simulation time is set to the target time, the simulation is in the
//!   [`TimeElapsed`](SimState::TimeElapsed) state and the run outcome is
//!   [`RunOutcome::TimeElapsed`],
//! - when a pause is requested, the simulation is
//!   [`Paused`](SimState::Paused) and can be resumed with
//!   [`Simulation::resume()`],
//! - when a stop is requested, the simulation is `Stopped`.
//!
//! Pause and stop requests are only examined between two eventful moments,
//! so that all events of a moment are always raised together. They can be
//! issued from a handler through its [`Context`], or from another thread
//! through a [`Controller`].
//!
//! Listeners registered with [`Simulation::on_finished()`] are notified once
//! per run that completes or elapses its target time, after the state
//! transition took place.
//!
//! # Determinism
//!
//! Given the same seed and the same sequence of scheduling calls, a
//! simulation raises the same events in the same order at the same times.
//! Events filed at the same time are ordered by [`Priority`] and, at equal
//! priority, by filing order.
//!
//! [`Priority`]: crate::event::Priority
mod context;
mod control;
mod scheduler;
mod sim_init;

pub use context::{Context, World};
pub use control::{Controller, SimState};
pub use scheduler::{EventKey, EventScheduler, EventfulMoment, SchedulingError};
pub use sim_init::{SimConfig, SimInit};

use std::any::Any;
use std::error::Error;
use std::fmt;

use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, info_span, Dispatch};

use crate::entity::{EntityError, EntityRegistry};
use crate::event::EventInstance;
use crate::loom_exports::sync::Arc;
use crate::time::SimTime;
use crate::tracing::SimulationTimeGuard;

use control::{Control, Request};

/// The random number generator handed to event handlers.
pub type SimRng = ChaCha8Rng;

/// Simulation environment.
///
/// A `Simulation` is created by calling [`SimInit::init()`] on a simulation
/// builder. It owns an [`EventScheduler`], the simulation time, a seeded
/// random number generator and a directory of domain entities.
///
/// See the [module-level documentation](crate::simulation) for more details.
pub struct Simulation {
    config: SimConfig,
    scheduler: EventScheduler,
    world: World,
    run_mode: Option<RunMode>,
    is_reset: bool,
    finished_listeners: Vec<Box<dyn FnMut(&RunSummary) + Send>>,
    log_sink: Option<Dispatch>,
}

impl Simulation {
    /// Creates a new `Simulation`.
    pub(crate) fn new(config: SimConfig, log_sink: Option<Dispatch>) -> Self {
        let control = Arc::new(Control::new());
        control.publish_time(config.start_time);
        let world = World::with_control(config.start_time, config.seed, control);

        Self {
            config,
            scheduler: EventScheduler::new(),
            world,
            run_mode: None,
            is_reset: true,
            finished_listeners: Vec::new(),
            log_sink,
        }
    }

    /// Returns the name of the simulation.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the settings of the simulation.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.world.time()
    }

    /// Returns the current state.
    pub fn state(&self) -> SimState {
        self.world.control().state()
    }

    /// Returns `true` if a run is in progress.
    ///
    /// Since a run holds an exclusive borrow of the simulation, this is
    /// mostly useful through a [`Controller`].
    pub fn is_running(&self) -> bool {
        self.state() == SimState::Running
    }

    /// Returns `true` if the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.state() == SimState::Paused
    }

    /// Returns `true` if the simulation is stopped.
    pub fn is_stopped(&self) -> bool {
        self.state() == SimState::Stopped
    }

    /// Returns `true` if the simulation was not executed since it was built
    /// or last reset.
    pub fn is_reset(&self) -> bool {
        self.is_reset
    }

    /// Returns the seed the random number generator was last started from.
    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    /// Returns the amount of simulation time covered by a single step.
    pub fn step_size(&self) -> f64 {
        self.config.step_size
    }

    /// Sets the amount of simulation time covered by a single step.
    ///
    /// An error is returned if the step size is not strictly positive and
    /// finite.
    pub fn set_step_size(&mut self, step_size: f64) -> Result<(), SchedulingError> {
        if !(step_size > 0.0 && step_size.is_finite()) {
            return Err(SchedulingError::InvalidStepSize);
        }
        self.config.step_size = step_size;

        Ok(())
    }

    /// Returns the number of eventful moments.
    pub fn eventful_moments_count(&self) -> usize {
        self.scheduler.eventful_moments_count()
    }

    /// Returns the number of events raised since the last reset.
    pub fn event_counter(&self) -> u64 {
        self.scheduler.event_counter()
    }

    /// Returns the number of handlers invoked since the last reset.
    pub fn handler_counter(&self) -> u64 {
        self.scheduler.handler_counter()
    }

    /// Returns the scheduler.
    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    /// Returns a thread-safe handle which can pause or stop the simulation
    /// from another thread.
    pub fn controller(&self) -> Controller {
        Controller::new(self.world.control().clone())
    }

    /// Registers a listener notified when a run completes or elapses its
    /// target time.
    pub fn on_finished<F>(&mut self, listener: F)
    where
        F: FnMut(&RunSummary) + Send + 'static,
    {
        self.finished_listeners.push(Box::new(listener));
    }

    /// Schedules a closure at the specified time.
    ///
    /// An error is returned if the specified time lies before the current
    /// simulation time or is not finite.
    pub fn schedule<F>(
        &mut self,
        time: impl Into<SimTime>,
        name: impl Into<String>,
        handler: F,
    ) -> Result<EventKey, SchedulingError>
    where
        F: FnMut(&mut Context<'_>) + Send + 'static,
    {
        self.add_event_at(time, EventInstance::new(name).with_handler(handler))
    }

    /// Schedules a closure after the specified delay.
    ///
    /// An error is returned if the delay is negative or not finite.
    pub fn schedule_in<F>(
        &mut self,
        delay: f64,
        name: impl Into<String>,
        handler: F,
    ) -> Result<EventKey, SchedulingError>
    where
        F: FnMut(&mut Context<'_>) + Send + 'static,
    {
        let time = scheduler::check_delay(self.time(), delay)?;

        Ok(self
            .scheduler
            .add(time, EventInstance::new(name).with_handler(handler)))
    }

    /// Files an event at the specified time.
    ///
    /// An error is returned if the specified time lies before the current
    /// simulation time or is not finite.
    pub fn add_event_at(
        &mut self,
        time: impl Into<SimTime>,
        event: EventInstance,
    ) -> Result<EventKey, SchedulingError> {
        let time = scheduler::check_time(self.time(), time.into())?;

        Ok(self.scheduler.add(time, event))
    }

    /// Files an event raised at the specified time and then every `period`.
    ///
    /// An error is returned if the specified time lies before the current
    /// simulation time or if the period is not strictly positive and finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventide::event::EventInstance;
    /// use eventide::simulation::SimInit;
    ///
    /// let mut simu = SimInit::new().init().unwrap();
    /// simu.add_entity("samples", Vec::<f64>::new()).unwrap();
    ///
    /// let sampler = EventInstance::new("sampler").with_handler(|cx| {
    ///     let time = cx.time().as_f64();
    ///     cx.get_entity_mut::<Vec<f64>>("samples").unwrap().push(time);
    /// });
    /// let key = simu.schedule_periodic(0.5, 1.0, sampler).unwrap();
    ///
    /// simu.run_until(3.0).unwrap();
    /// assert_eq!(simu.get_entity::<Vec<f64>>("samples").unwrap(), &[0.5, 1.5, 2.5]);
    ///
    /// // The key designates the next occurrence.
    /// assert!(simu.cancel(key));
    /// ```
    pub fn schedule_periodic(
        &mut self,
        time: impl Into<SimTime>,
        period: f64,
        event: EventInstance,
    ) -> Result<EventKey, SchedulingError> {
        let time = scheduler::check_time(self.time(), time.into())?;
        let period = scheduler::check_period(period)?;

        Ok(self.scheduler.add_periodic(time, period, event))
    }

    /// Cancels a pending event.
    ///
    /// Returns `true` if the event was pending.
    pub fn cancel(&mut self, key: EventKey) -> bool {
        self.scheduler.cancel(key)
    }

    /// Removes a pending event and returns it.
    pub fn remove_event(&mut self, key: EventKey) -> Option<EventInstance> {
        self.scheduler.remove(key)
    }

    /// Returns the time a pending event is filed under.
    pub fn scheduled_time(&self, key: EventKey) -> Option<SimTime> {
        self.scheduler.scheduled_time(key)
    }

    /// Registers an entity under the specified identifier.
    pub fn add_entity<T: Any + Send>(
        &mut self,
        name: impl Into<String>,
        entity: T,
    ) -> Result<(), EntityError> {
        self.world.entities_mut().add(name, entity)
    }

    /// Unregisters an entity and returns it.
    pub fn remove_entity(&mut self, name: &str) -> Result<Box<dyn Any + Send>, EntityError> {
        self.world.entities_mut().remove(name)
    }

    /// Returns a reference to a registered entity.
    pub fn get_entity<T: Any>(&self, name: &str) -> Result<&T, EntityError> {
        self.world.entities().get(name)
    }

    /// Returns a mutable reference to a registered entity.
    pub fn get_entity_mut<T: Any>(&mut self, name: &str) -> Result<&mut T, EntityError> {
        self.world.entities_mut().get_mut(name)
    }

    /// Returns `true` if an entity is registered under this identifier.
    pub fn has_entity(&self, name: &str) -> bool {
        self.world.entities().contains(name)
    }

    /// Returns the entity directory.
    pub fn entities(&self) -> &EntityRegistry {
        self.world.entities()
    }

    /// Runs the simulation until no event remains or a pause or stop is
    /// requested.
    ///
    /// An error is returned, and the simulation is left untouched, if no
    /// event is scheduled.
    pub fn run(&mut self) -> Result<RunOutcome, ExecutionError> {
        if self.scheduler.is_empty() {
            return Err(ExecutionError::NothingScheduled);
        }

        Ok(self.execute(RunMode::Unbounded))
    }

    /// Runs the simulation until the specified time, until no event remains or
    /// until a pause or stop is requested.
    ///
    /// Events scheduled exactly at the target time are raised. If events
    /// remain afterwards, the simulation time is set to the target time and
    /// the simulation transitions to [`SimState::TimeElapsed`].
    ///
    /// An error is returned, and the simulation is left untouched, if no
    /// event is scheduled or if the target time lies before the current
    /// simulation time.
    pub fn run_until(
        &mut self,
        stop_time: impl Into<SimTime>,
    ) -> Result<RunOutcome, ExecutionError> {
        if self.scheduler.is_empty() {
            return Err(ExecutionError::NothingScheduled);
        }
        let stop_time = self.check_target(stop_time.into())?;

        Ok(self.execute(RunMode::Until(stop_time)))
    }

    /// Advances the simulation time by the step size, raising all events
    /// scheduled up to and including the target time.
    ///
    /// Unless interrupted, the simulation time upon return is the target
    /// time, whether or not an event was scheduled for that time, and the
    /// simulation is [`Paused`](SimState::Paused) if events remain or
    /// [`Stopped`](SimState::Stopped) otherwise. Finished listeners are not
    /// notified.
    pub fn step(&mut self) -> RunOutcome {
        let target = self.time() + self.config.step_size;

        self.execute(RunMode::StepTo(target))
    }

    /// Advances the simulation time by the specified duration, as if by
    /// calling [`Simulation::step()`] with that step size.
    ///
    /// An error is returned if the duration is negative or not finite.
    pub fn step_by(&mut self, duration: f64) -> Result<RunOutcome, ExecutionError> {
        let target = self
            .time()
            .checked_add(duration)
            .ok_or(ExecutionError::InvalidTargetTime)?;

        self.step_until(target)
    }

    /// Advances the simulation time to the specified time, as if by calling
    /// [`Simulation::step()`] with the appropriate step size.
    ///
    /// An error is returned if the target time lies before the current
    /// simulation time or is not finite.
    pub fn step_until(&mut self, target: impl Into<SimTime>) -> Result<RunOutcome, ExecutionError> {
        let target = self.check_target(target.into())?;

        Ok(self.execute(RunMode::StepTo(target)))
    }

    /// Resumes a paused simulation.
    ///
    /// A run resumes with its original bound, if any. A simulation paused at
    /// the end of a step resumes as an unbounded run.
    ///
    /// An error is returned if the simulation is not paused.
    pub fn resume(&mut self) -> Result<RunOutcome, ExecutionError> {
        if self.state() != SimState::Paused {
            return Err(ExecutionError::NotPaused);
        }
        let mode = self.run_mode.take().unwrap_or(RunMode::Unbounded);

        Ok(self.execute(mode))
    }

    /// Requests a pause.
    ///
    /// The request is honoured at the next moment boundary of the next run,
    /// which therefore returns [`RunOutcome::Paused`] before raising any
    /// event. Use a [`Controller`] to pause a run in progress from another
    /// thread.
    pub fn pause(&mut self) {
        self.world.control().request_pause();
    }

    /// Stops the simulation.
    ///
    /// A paused run or a run which elapsed its target time is abandoned;
    /// pending events are left untouched. Any pending pause or stop request
    /// is discarded.
    pub fn stop(&mut self) {
        self.world.control().clear_request();
        self.run_mode = None;
        self.in_log_scope(|simu| simu.set_state(SimState::Stopped));
    }

    /// Stops the simulation, discards all pending events, restores the start
    /// time, restarts the random number generator from the configured seed
    /// and zeroes the counters.
    ///
    /// Registered entities and finished listeners are kept.
    pub fn reset(&mut self) {
        self.reset_with_seed(self.config.seed);
    }

    /// Same as [`Simulation::reset()`], with a new seed.
    ///
    /// Replaying the same scheduling calls after a reset with the same seed
    /// reproduces the same sequence of events.
    pub fn reset_with_seed(&mut self, seed: u64) {
        self.in_log_scope(|simu| {
            simu.world.control().clear_request();
            simu.run_mode = None;
            simu.set_state(SimState::Stopped);

            simu.scheduler.reset();
            simu.config.seed = seed;
            simu.world.reseed(seed);
            simu.world.set_time(simu.config.start_time);
            simu.is_reset = true;

            debug!(seed, start_time = %simu.config.start_time, "simulation reset");
        });
    }

    /// Checks that a target time is finite and not in the past.
    fn check_target(&self, target: SimTime) -> Result<SimTime, ExecutionError> {
        if !target.is_finite() || target < self.time() {
            return Err(ExecutionError::InvalidTargetTime);
        }

        Ok(target)
    }

    /// Runs a closure with the log sink installed, if any.
    fn in_log_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let log_sink = self.log_sink.clone();
        let _guard = log_sink.as_ref().map(tracing::dispatcher::set_default);

        f(self)
    }

    /// Runs the event loop in the specified mode.
    fn execute(&mut self, mode: RunMode) -> RunOutcome {
        self.in_log_scope(|simu| {
            let span = info_span!("simulation", name = simu.config.name.as_str());
            let _span_guard = span.enter();
            let _time_guard = SimulationTimeGuard::enter(simu.time());

            simu.is_reset = false;
            simu.set_state(SimState::Running);

            let bound = match mode {
                RunMode::Unbounded => SimTime::INFINITY,
                RunMode::Until(time) | RunMode::StepTo(time) => time,
            };

            loop {
                match simu.world.control().take_request() {
                    Request::Stop => {
                        simu.run_mode = None;
                        simu.set_state(SimState::Stopped);

                        return RunOutcome::Stopped;
                    }
                    Request::Pause => {
                        simu.run_mode = Some(mode);
                        simu.set_state(SimState::Paused);

                        return RunOutcome::Paused;
                    }
                    Request::None => {}
                }

                match simu.scheduler.time_of_next_scheduled_event() {
                    Some(time) if time <= bound => {
                        simu.scheduler.process_next_point_in_time(&mut simu.world);
                    }
                    next => return simu.finish(mode, next.is_some()),
                }
            }
        })
    }

    /// Concludes a run once no event remains within its bound.
    fn finish(&mut self, mode: RunMode, has_pending_events: bool) -> RunOutcome {
        self.run_mode = None;

        match mode {
            RunMode::Until(stop_time) if has_pending_events => {
                self.world.set_time(stop_time);
                self.set_state(SimState::TimeElapsed);
                self.notify_finished(RunOutcome::TimeElapsed)
            }
            RunMode::Unbounded | RunMode::Until(_) => {
                self.set_state(SimState::Stopped);
                self.notify_finished(RunOutcome::Completed)
            }
            RunMode::StepTo(target) => {
                if target > self.time() {
                    self.world.set_time(target);
                }
                if has_pending_events {
                    self.set_state(SimState::Paused);
                } else {
                    self.set_state(SimState::Stopped);
                }

                RunOutcome::Stepped
            }
        }
    }

    fn notify_finished(&mut self, outcome: RunOutcome) -> RunOutcome {
        let summary = RunSummary {
            outcome,
            time: self.time(),
            event_counter: self.scheduler.event_counter(),
            handler_counter: self.scheduler.handler_counter(),
        };
        info!(
            outcome = ?summary.outcome,
            time = %summary.time,
            events = summary.event_counter,
            handlers = summary.handler_counter,
            "simulation finished"
        );
        for listener in &mut self.finished_listeners {
            listener(&summary);
        }

        outcome
    }

    fn set_state(&self, state: SimState) {
        let control = self.world.control();
        let previous = control.state();
        control.publish_state(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "state transition");
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("name", &self.config.name)
            .field("time", &self.time())
            .field("state", &self.state())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// The bound of a run.
#[derive(Copy, Clone, Debug)]
enum RunMode {
    Unbounded,
    Until(SimTime),
    StepTo(SimTime),
}

/// The way a call that executes a simulation returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    /// No event remains.
    Completed,
    /// The target time of a bounded run was reached while events remain.
    TimeElapsed,
    /// A pause was requested.
    Paused,
    /// A stop was requested.
    Stopped,
    /// A step reached its target time.
    Stepped,
}

/// Summary of a finished run, passed to finished listeners.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Either [`RunOutcome::Completed`] or [`RunOutcome::TimeElapsed`].
    pub outcome: RunOutcome,
    /// The simulation time at the end of the run.
    pub time: SimTime,
    /// The number of events raised since the last reset.
    pub event_counter: u64,
    /// The number of handlers invoked since the last reset.
    pub handler_counter: u64,
}

/// Error returned when a simulation cannot be executed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExecutionError {
    /// No event is scheduled.
    NothingScheduled,
    /// The simulation cannot be resumed because it is not paused.
    NotPaused,
    /// The target time lies before the current simulation time or is not
    /// finite.
    InvalidTargetTime,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingScheduled => write!(fmt, "the simulation has no scheduled event"),
            Self::NotPaused => write!(fmt, "the simulation is not paused"),
            Self::InvalidTargetTime => write!(
                fmt,
                "the target time should be finite and not lie before the current simulation time"
            ),
        }
    }
}

impl Error for ExecutionError {}
