use std::fmt;

use tracing::Dispatch;

use crate::time::SimTime;

use super::scheduler::SchedulingError;
use super::Simulation;

/// Settings of a simulation.
///
/// A `SimConfig` can be deserialized when the `serde` feature is enabled,
/// with missing fields taking their default values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Name of the simulation, used to identify its logs.
    pub name: String,
    /// Simulation time at initialization and after each reset.
    pub start_time: SimTime,
    /// Amount of simulation time covered by a single step.
    pub step_size: f64,
    /// Seed of the random number generator.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            start_time: SimTime::ZERO,
            step_size: 1.0,
            seed: 0,
        }
    }
}

/// Builder for a discrete-event simulation.
#[derive(Default)]
pub struct SimInit {
    config: SimConfig,
    log_sink: Option<Dispatch>,
}

impl SimInit {
    /// Creates a builder with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from the specified settings.
    pub fn from_config(config: SimConfig) -> Self {
        Self {
            config,
            log_sink: None,
        }
    }

    /// Sets the name of the simulation.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();

        self
    }

    /// Sets the simulation time at initialization and after each reset.
    pub fn with_start_time(mut self, start_time: impl Into<SimTime>) -> Self {
        self.config.start_time = start_time.into();

        self
    }

    /// Sets the amount of simulation time covered by
    /// [`Simulation::step`](crate::simulation::Simulation::step).
    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.config.step_size = step_size;

        self
    }

    /// Sets the seed of the random number generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;

        self
    }

    /// Sets the dispatcher which receives the logs of the simulation.
    ///
    /// The dispatcher is installed as the default dispatcher of the calling
    /// thread for the duration of each call that runs, steps or resets the
    /// simulation. If no dispatcher is set, logs go to the default dispatcher
    /// of the calling thread.
    pub fn with_log_sink(mut self, log_sink: impl Into<Dispatch>) -> Self {
        self.log_sink = Some(log_sink.into());

        self
    }

    /// Builds a simulation.
    ///
    /// An error is returned if the start time is not finite or if the step
    /// size is not strictly positive and finite.
    pub fn init(self) -> Result<Simulation, SchedulingError> {
        if !self.config.start_time.is_finite() {
            return Err(SchedulingError::InvalidScheduledTime);
        }
        if !(self.config.step_size > 0.0 && self.config.step_size.is_finite()) {
            return Err(SchedulingError::InvalidStepSize);
        }

        Ok(Simulation::new(self.config, self.log_sink))
    }
}

impl fmt::Debug for SimInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimInit")
            .field("config", &self.config)
            .field("log_sink", &self.log_sink.is_some())
            .finish()
    }
}
