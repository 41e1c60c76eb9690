//! Simulation time.
//!
//! This module provides [`SimTime`], the logical timestamp used throughout the
//! crate. Simulation time is a dimensionless floating-point quantity: whether
//! one unit stands for a second, a minute or a day is left to the domain model.
//!
//! Unlike a raw `f64`, a `SimTime` is totally ordered. `NaN` is rejected at
//! construction and negative zero is normalized to positive zero, so that two
//! timestamps comparing equal always designate the same eventful moment.
//!
//! # Examples
//!
//! ```
//! use eventide::time::SimTime;
//!
//! let t0 = SimTime::ZERO;
//! let t1 = t0 + 2.5;
//!
//! assert!(t1 > t0);
//! assert_eq!(t1 - t0, 2.5);
//! assert_eq!(SimTime::from(-0.0), SimTime::ZERO);
//! ```

mod sim_time;

pub use sim_time::SimTime;
