//! Cross-thread control of a running simulation.
//!
//! A [`Simulation`](crate::simulation::Simulation) is driven by a single
//! thread, but pause and stop requests may be issued from any thread through
//! a [`Controller`]. Requests are posted to atomic flags which are only
//! examined by the run loop between two eventful moments, so a request never
//! interrupts a handler. The state and the time of the simulation are
//! published the same way so that they can be observed while it runs.

use std::fmt;

use crossbeam_utils::CachePadded;

use crate::loom_exports::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use crate::loom_exports::sync::Arc;
use crate::time::SimTime;

/// The state of a simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SimState {
    /// No run is in progress.
    Stopped = 0,
    /// A run is in progress.
    Running = 1,
    /// A run was suspended and can be resumed.
    Paused = 2,
    /// A bounded run reached its target time while events were still
    /// pending.
    TimeElapsed = 3,
}

impl SimState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::TimeElapsed,
            _ => Self::Stopped,
        }
    }
}

/// A request posted to the run loop.
///
/// Requests are ordered so that a stop request overrides a pause request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub(crate) enum Request {
    None = 0,
    Pause = 1,
    Stop = 2,
}

impl Request {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Pause,
            2 => Self::Stop,
            _ => Self::None,
        }
    }
}

/// Atomic flags shared between a simulation and its controllers.
pub(crate) struct Control {
    request: CachePadded<AtomicU8>,
    state: AtomicU8,
    time: AtomicU64,
}

impl Control {
    pub(crate) fn new() -> Self {
        Self {
            request: CachePadded::new(AtomicU8::new(Request::None as u8)),
            state: AtomicU8::new(SimState::Stopped as u8),
            time: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub(crate) fn request_pause(&self) {
        self.request.fetch_max(Request::Pause as u8, Ordering::Release);
    }

    pub(crate) fn request_stop(&self) {
        self.request.fetch_max(Request::Stop as u8, Ordering::Release);
    }

    /// Consumes the pending request, if any.
    pub(crate) fn take_request(&self) -> Request {
        Request::from_u8(self.request.swap(Request::None as u8, Ordering::Acquire))
    }

    pub(crate) fn clear_request(&self) {
        self.request.store(Request::None as u8, Ordering::Relaxed);
    }

    pub(crate) fn publish_state(&self, state: SimState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn state(&self) -> SimState {
        SimState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn publish_time(&self, time: SimTime) {
        self.time.store(time.as_f64().to_bits(), Ordering::Release);
    }

    pub(crate) fn time(&self) -> SimTime {
        SimTime::new(f64::from_bits(self.time.load(Ordering::Acquire)))
    }
}

/// A thread-safe handle to control a simulation.
///
/// A `Controller` is obtained with
/// [`Simulation::controller`](crate::simulation::Simulation::controller). It
/// is cheap to clone and can be moved to another thread, typically a user
/// interface, to pause or stop a simulation running on a worker thread and to
/// observe its progress.
///
/// Pause and stop requests are honoured at the next moment boundary. A
/// request posted while no run is in progress is honoured when the next run
/// starts, unless the simulation is reset in the meantime.
///
/// # Examples
///
/// ```
/// use std::thread;
///
/// use eventide::simulation::{RunOutcome, SimInit};
///
/// let mut simu = SimInit::new().init().unwrap();
///
/// // An event which re-schedules itself forever.
/// simu.schedule(0.0, "tick", |cx| cx.reschedule_current_in(1.0).unwrap())
///     .unwrap();
///
/// let controller = simu.controller();
/// let worker = thread::spawn(move || simu.run().unwrap());
///
/// while controller.time().as_f64() < 100.0 {
///     thread::yield_now();
/// }
/// controller.stop();
///
/// assert_eq!(worker.join().unwrap(), RunOutcome::Stopped);
/// assert!(controller.is_stopped());
/// ```
#[derive(Clone)]
pub struct Controller {
    control: Arc<Control>,
}

impl Controller {
    pub(crate) fn new(control: Arc<Control>) -> Self {
        Self { control }
    }

    /// Requests the simulation to pause.
    pub fn pause(&self) {
        self.control.request_pause();
    }

    /// Requests the simulation to stop. A stop request overrides a pending
    /// pause request.
    pub fn stop(&self) {
        self.control.request_stop();
    }

    /// Returns the last published state of the simulation.
    pub fn state(&self) -> SimState {
        self.control.state()
    }

    /// Returns the last published simulation time.
    pub fn time(&self) -> SimTime {
        self.control.time()
    }

    /// Returns `true` if a run is in progress.
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
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state())
            .field("time", &self.time())
            .finish()
    }
}
