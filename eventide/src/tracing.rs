//! Support for structured logging.
//!
//! # Overview
//!
//! The simulation logs with the [`tracing`](https://docs.rs/tracing) crate.
//! Each call that runs or steps a simulation is wrapped in a
//! [`tracing::Span`] with the following metadata:
//!
//! - name: `simulation`,
//! - target: `eventide::simulation`,
//! - verbosity level: [`Level::INFO`](tracing::Level::INFO),
//! - a unique field called `name`, associated to the simulation name provided
//!   with [`SimInit::with_name`](crate::simulation::SimInit::with_name).
//!
//! State transitions are logged at the `DEBUG` level, the completion of a run
//! at the `INFO` level and the processing of each eventful moment at the
//! `TRACE` level. An event for which
//! [`EventInstance::with_logging`](crate::event::EventInstance::with_logging)
//! was enabled is logged at the `DEBUG` level each time it is raised.
//!
//! # Log sink
//!
//! Logs are sent to the default dispatcher of the calling thread, unless a
//! dispatcher was injected with
//! [`SimInit::with_log_sink`](crate::simulation::SimInit::with_log_sink), in
//! which case they only go to that dispatcher:
//!
//! ```
//! use eventide::simulation::SimInit;
//! use eventide::tracing::SimulationTime;
//!
//! let subscriber = tracing_subscriber::fmt()
//!     .with_timer(SimulationTime::with_system_timer())
//!     .with_max_level(tracing::Level::DEBUG)
//!     .finish();
//!
//! let mut simu = SimInit::new()
//!     .with_name("bench")
//!     .with_log_sink(subscriber)
//!     .init()
//!     .unwrap();
//! simu.schedule(1.0, "ping", |_| {}).unwrap();
//! simu.run().unwrap();
//! ```
//!
//! # Simulation timestamps
//!
//! The [`SimulationTime`] timer stamps the events emitted while a simulation
//! is being driven with the simulation time, and falls back to another timer
//! elsewhere:
//!
//! ```text
//! [t=12.5]  INFO simulation{name="bench"}: my_model: queue is full
//! 2024-09-10T14:39:24.670921Z  INFO my_model: outside the simulation
//! ```

use std::cell::Cell;
use std::fmt;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};

use crate::time::SimTime;

thread_local! {
    static SIMULATION_TIME: Cell<Option<SimTime>> = const { Cell::new(None) };
}

/// Returns the time of the simulation being driven by the current thread, if
/// any.
pub fn current_simulation_time() -> Option<SimTime> {
    SIMULATION_TIME.with(Cell::get)
}

/// Marks the current thread as driving a simulation until dropped.
pub(crate) struct SimulationTimeGuard {
    previous: Option<SimTime>,
}

impl SimulationTimeGuard {
    pub(crate) fn enter(time: SimTime) -> Self {
        let previous = SIMULATION_TIME.with(|t| t.replace(Some(time)));

        Self { previous }
    }
}

impl Drop for SimulationTimeGuard {
    fn drop(&mut self) {
        SIMULATION_TIME.with(|t| t.set(self.previous));
    }
}

/// Updates the simulation time seen by the timer if the current thread is
/// driving a simulation.
pub(crate) fn update_simulation_time(time: SimTime) {
    SIMULATION_TIME.with(|t| {
        if t.get().is_some() {
            t.set(Some(time));
        }
    });
}

/// A timer that can be used in conjunction with the
/// [`tracing-subscriber`][tracing_subscriber] crate to log events using the
/// simulation time instead of (or on top of) the wall clock time.
///
/// See the [module-level documentation][crate::tracing] for more details.
#[derive(Default, Debug)]
pub struct SimulationTime<const VERBOSE: bool, T> {
    sys_timer: T,
}

impl SimulationTime<false, SystemTime> {
    /// Constructs a new simulation timer which falls back to the [`SystemTime`]
    /// timer for events generated outside the simulation.
    pub fn with_system_timer() -> Self {
        Self::default()
    }
}

impl SimulationTime<true, SystemTime> {
    /// Constructs a new simulation timer which prepends a [`SystemTime`]
    /// timestamp to all tracing events, as well as a simulation timestamp for
    /// simulation events.
    pub fn with_system_timer_always() -> Self {
        Self::default()
    }
}

impl<T: FormatTime> SimulationTime<false, T> {
    /// Constructs a new simulation timer which falls back to the provided
    /// timer for tracing events generated outside the simulation.
    pub fn with_custom_timer(sys_timer: T) -> Self {
        Self { sys_timer }
    }
}

impl<const VERBOSE: bool, T: FormatTime> FormatTime for SimulationTime<VERBOSE, T> {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match current_simulation_time() {
            Some(time) => {
                if VERBOSE {
                    self.sys_timer.format_time(w)?;
                    w.write_char(' ')?;
                }
                write!(w, "[t={}]", time)
            }
            None => self.sys_timer.format_time(w),
        }
    }
}
