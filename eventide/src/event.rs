//! Schedulable events.
//!
//! An [`EventInstance`] is the unit of work filed in the
//! [`EventScheduler`](crate::simulation::EventScheduler). It carries a display
//! name, a [`Priority`] used to order it among the events filed at the same
//! time, and any number of [`Handler`]s which are invoked in attachment order
//! when the event is raised.
//!
//! Handlers are most conveniently written as closures taking a
//! [`Context`](crate::simulation::Context) argument, but any type implementing
//! the [`Handler`] trait can be attached with
//! [`EventInstance::with_handler_object`].
//!
//! # Examples
//!
//! A customer arrival that updates a counter registered as an entity and
//! re-schedules itself.
//!
//! ```
//! use eventide::event::{EventInstance, Priority};
//! use eventide::simulation::SimInit;
//!
//! let mut simu = SimInit::new().init().unwrap();
//! simu.add_entity("arrivals", 0u32).unwrap();
//!
//! let arrival = EventInstance::new("arrival")
//!     .with_priority(Priority::user(1.0))
//!     .with_handler(|cx| {
//!         let count = cx.get_entity_mut::<u32>("arrivals").unwrap();
//!         *count += 1;
//!         if *count < 3 {
//!             cx.reschedule_current_in(2.0).unwrap();
//!         }
//!     });
//!
//! simu.add_event_at(1.0, arrival).unwrap();
//! simu.run().unwrap();
//!
//! assert_eq!(*simu.get_entity::<u32>("arrivals").unwrap(), 3);
//! assert_eq!(simu.time().as_f64(), 5.0);
//! ```

mod priority;

use std::fmt;
use std::sync::Arc;

pub use priority::{Priority, PriorityCategory};

use crate::simulation::Context;
use crate::time::SimTime;

/// A type that can be attached to an [`EventInstance`] and invoked when the
/// event is raised.
///
/// This trait is implemented for all closures of type
/// `FnMut(&mut Context<'_>) + Send + 'static`.
pub trait Handler: Send + 'static {
    /// Handles the event.
    fn handle(&mut self, cx: &mut Context<'_>);
}

impl<F> Handler for F
where
    F: FnMut(&mut Context<'_>) + Send + 'static,
{
    fn handle(&mut self, cx: &mut Context<'_>) {
        self(cx)
    }
}

/// A schedulable unit of work.
///
/// See the [module-level documentation](crate::event) for more details.
pub struct EventInstance {
    name: Arc<str>,
    priority: Priority,
    time: Option<SimTime>,
    handlers: Vec<Box<dyn Handler>>,
    log_enabled: bool,
    period: Option<f64>,
}

impl EventInstance {
    /// Creates an event with the default priority and no handler.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            priority: Priority::default(),
            time: None,
            handlers: Vec::new(),
            log_enabled: false,
            period: None,
        }
    }

    /// Sets the priority of the event.
    ///
    /// The priority cannot be changed once the event is filed in a scheduler.
    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();

        self
    }

    /// Attaches a closure handler.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&mut Context<'_>) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));

        self
    }

    /// Attaches a handler object.
    pub fn with_handler_object(mut self, handler: impl Handler) -> Self {
        self.handlers.push(Box::new(handler));

        self
    }

    /// Attaches a closure handler to an existing event.
    pub fn add_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Context<'_>) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Enables or disables the logging of each raise of this event at the
    /// `DEBUG` level.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;

        self
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the time of the moment under which the event is filed, or the
    /// time it was last raised at if it is no longer filed.
    ///
    /// Returns `None` for an event that was never filed.
    pub fn time(&self) -> Option<SimTime> {
        self.time
    }

    /// Returns the number of attached handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if each raise of this event is logged.
    pub fn log_enabled(&self) -> bool {
        self.log_enabled
    }

    /// Returns the repetition period of a periodic event.
    pub fn period(&self) -> Option<f64> {
        self.period
    }

    /// Invokes all attached handlers in attachment order.
    ///
    /// This is how the scheduler dispatches filed events. A handler may also
    /// raise immediately an event it owns, within the context of the event
    /// being dispatched.
    pub fn raise(&mut self, cx: &mut Context<'_>) {
        for handler in &mut self.handlers {
            handler.handle(cx);
        }
    }

    /// Sets the time of the moment under which the event is filed.
    pub(crate) fn set_time(&mut self, time: SimTime) {
        self.time = Some(time);
    }

    /// Sets the repetition period.
    pub(crate) fn set_period(&mut self, period: Option<f64>) {
        self.period = period;
    }

    /// Returns a shared handle to the display name.
    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }
}

impl fmt::Debug for EventInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventInstance")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("time", &self.time)
            .field("handler_count", &self.handlers.len())
            .field("log_enabled", &self.log_enabled)
            .field("period", &self.period)
            .finish()
    }
}
