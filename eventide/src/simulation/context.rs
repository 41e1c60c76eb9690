use std::any::Any;
use std::fmt;

use rand::SeedableRng;

use crate::entity::{EntityError, EntityRegistry};
use crate::event::EventInstance;
use crate::loom_exports::sync::Arc;
use crate::time::SimTime;

use super::control::Control;
use super::scheduler::{self, Disposition, EventKey, EventScheduler, SchedulingError};
use super::SimRng;

/// The simulation state shared with event handlers.
///
/// A `World` bundles the current simulation time, the seeded random number
/// generator and the entity directory. It is owned by a
/// [`Simulation`](crate::simulation::Simulation), and is only needed
/// explicitly when driving an [`EventScheduler`] by hand.
pub struct World {
    time: SimTime,
    rng: SimRng,
    entities: EntityRegistry,
    control: Arc<Control>,
}

impl World {
    /// Creates a world at the specified time with an RNG seeded from `seed`
    /// and an empty entity directory.
    pub fn new(time: SimTime, seed: u64) -> Self {
        Self::with_control(time, seed, Arc::new(Control::new()))
    }

    pub(crate) fn with_control(time: SimTime, seed: u64, control: Arc<Control>) -> Self {
        Self {
            time,
            rng: SimRng::seed_from_u64(seed),
            entities: EntityRegistry::new(),
            control,
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Returns the random number generator.
    pub fn rng(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    /// Returns the entity directory.
    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// Returns a mutable reference to the entity directory.
    pub fn entities_mut(&mut self) -> &mut EntityRegistry {
        &mut self.entities
    }

    /// Sets the simulation time and publishes it.
    pub(crate) fn set_time(&mut self, time: SimTime) {
        self.time = time;
        self.control.publish_time(time);
        crate::tracing::update_simulation_time(time);
    }

    /// Restarts the random number generator from the specified seed.
    pub(crate) fn reseed(&mut self, seed: u64) {
        self.rng = SimRng::seed_from_u64(seed);
    }

    pub(crate) fn control(&self) -> &Arc<Control> {
        &self.control
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("time", &self.time)
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

/// The environment of an event handler.
///
/// A `Context` is passed to every [`Handler`](crate::event::Handler) when its
/// event is raised. It gives access to the current time, to the scheduler,
/// to the seeded random number generator and to the entity directory, and
/// makes it possible to request a pause or a stop of the simulation.
///
/// # Examples
///
/// A machine which breaks down after a random time and is repaired one time
/// unit later.
///
/// ```
/// use eventide::event::EventInstance;
/// use eventide::simulation::{Context, SimInit};
/// use rand::Rng;
///
/// fn breakdown(cx: &mut Context<'_>) {
///     *cx.get_entity_mut::<u32>("breakdowns").unwrap() += 1;
///     cx.schedule_in(1.0, "repair", repair).unwrap();
/// }
///
/// fn repair(cx: &mut Context<'_>) {
///     let uptime = cx.rng().gen_range(5.0..10.0);
///     cx.schedule_in(uptime, "breakdown", breakdown).unwrap();
/// }
///
/// let mut simu = SimInit::new().with_seed(7).init().unwrap();
/// simu.add_entity("breakdowns", 0u32).unwrap();
/// simu.schedule(0.0, "breakdown", breakdown).unwrap();
/// simu.run_until(100.0).unwrap();
///
/// let breakdowns = *simu.get_entity::<u32>("breakdowns").unwrap();
/// assert!(breakdowns >= 10 && breakdowns <= 17);
/// ```
pub struct Context<'a> {
    scheduler: &'a mut EventScheduler,
    world: &'a mut World,
    disposition: &'a mut Disposition,
    event_key: EventKey,
    event_name: &'a str,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        scheduler: &'a mut EventScheduler,
        world: &'a mut World,
        disposition: &'a mut Disposition,
        event_key: EventKey,
        event_name: &'a str,
    ) -> Self {
        Self {
            scheduler,
            world,
            disposition,
            event_key,
            event_name,
        }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.world.time
    }

    /// Returns the name of the event being raised.
    pub fn event_name(&self) -> &str {
        self.event_name
    }

    /// Returns the key of the event being raised.
    pub fn event_key(&self) -> EventKey {
        self.event_key
    }

    /// Schedules a closure at the specified time.
    ///
    /// An error is returned if the specified time lies before the current
    /// time. Scheduling at the current time is allowed: the closure is then
    /// called once the current eventful moment is processed.
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
        let time = scheduler::check_delay(self.world.time, delay)?;

        Ok(self
            .scheduler
            .add(time, EventInstance::new(name).with_handler(handler)))
    }

    /// Files an event at the specified time.
    ///
    /// An error is returned if the specified time lies before the current
    /// time.
    pub fn add_event_at(
        &mut self,
        time: impl Into<SimTime>,
        event: EventInstance,
    ) -> Result<EventKey, SchedulingError> {
        let time = scheduler::check_time(self.world.time, time.into())?;

        Ok(self.scheduler.add(time, event))
    }

    /// Files an event raised at the specified time and then every `period`.
    ///
    /// An error is returned if the specified time lies before the current
    /// time or if the period is not strictly positive and finite.
    pub fn schedule_periodic(
        &mut self,
        time: impl Into<SimTime>,
        period: f64,
        event: EventInstance,
    ) -> Result<EventKey, SchedulingError> {
        let time = scheduler::check_time(self.world.time, time.into())?;
        let period = scheduler::check_period(period)?;

        Ok(self.scheduler.add_periodic(time, period, event))
    }

    /// Cancels an event, including one of the current moment that was not
    /// raised yet.
    ///
    /// Returns `true` if the event was pending.
    pub fn cancel(&mut self, key: EventKey) -> bool {
        self.scheduler.cancel(key)
    }

    /// Files the event being raised again after the specified delay, once
    /// all its handlers have run.
    ///
    /// An error is returned if the delay is negative or not finite.
    pub fn reschedule_current_in(&mut self, delay: f64) -> Result<(), SchedulingError> {
        let time = scheduler::check_delay(self.world.time, delay)?;
        self.disposition.reschedule = Some(time);

        Ok(())
    }

    /// Files the event being raised again at the specified time, once all
    /// its handlers have run.
    ///
    /// An error is returned if the specified time lies before the current
    /// time.
    pub fn reschedule_current_at(
        &mut self,
        time: impl Into<SimTime>,
    ) -> Result<(), SchedulingError> {
        let time = scheduler::check_time(self.world.time, time.into())?;
        self.disposition.reschedule = Some(time);

        Ok(())
    }

    /// Stops the repetition of the periodic event being raised.
    pub fn stop_repeating(&mut self) {
        self.disposition.stop_repeating = true;
    }

    /// Returns the random number generator of the simulation.
    pub fn rng(&mut self) -> &mut SimRng {
        &mut self.world.rng
    }

    /// Returns the entity directory.
    pub fn entities(&self) -> &EntityRegistry {
        &self.world.entities
    }

    /// Returns a mutable reference to the entity directory.
    pub fn entities_mut(&mut self) -> &mut EntityRegistry {
        &mut self.world.entities
    }

    /// Returns a reference to a registered entity.
    pub fn get_entity<T: Any>(&self, name: &str) -> Result<&T, EntityError> {
        self.world.entities.get(name)
    }

    /// Returns a mutable reference to a registered entity.
    pub fn get_entity_mut<T: Any>(&mut self, name: &str) -> Result<&mut T, EntityError> {
        self.world.entities.get_mut(name)
    }

    /// Requests the simulation to pause once the current moment is processed.
    pub fn request_pause(&self) {
        self.world.control.request_pause();
    }

    /// Requests the simulation to stop once the current moment is processed.
    pub fn request_stop(&self) {
        self.world.control.request_stop();
    }

    /// Returns the scheduler.
    pub fn scheduler(&self) -> &EventScheduler {
        self.scheduler
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("time", &self.world.time)
            .field("event_key", &self.event_key)
            .field("event_name", &self.event_name)
            .finish_non_exhaustive()
    }
}
