//! A deterministic discrete-event simulation kernel.
//!
//! Eventide advances a logical clock through the points in time at which
//! work is scheduled, the *eventful moments*, and raises all events filed
//! under each moment in a well-defined order. Simulations can be run to
//! completion, up to a target time or step by step, and can be paused,
//! resumed and stopped from another thread. Given the same seed and the same
//! scheduling calls, a simulation always produces the same trace, which makes
//! it suitable for optimization loops that re-run a simulation many times to
//! score candidate solutions.
//!
//! # A practical overview
//!
//! Simulating a system typically involves three distinct activities:
//!
//! 1. the registration of the domain entities (queues, servers, counters...)
//!    in the entity directory of a [`Simulation`](simulation::Simulation),
//! 2. the scheduling of events whose handlers update the entities and
//!    schedule further events,
//! 3. the execution of the simulation.
//!
//! ## Events and handlers
//!
//! An [`EventInstance`](event::EventInstance) carries a name, a
//! [`Priority`](event::Priority) that orders it among the events filed at the
//! same time, and a list of handlers. Handlers are closures or
//! [`Handler`](event::Handler) objects which receive a
//! [`Context`](simulation::Context) giving access to the current time, to the
//! scheduler, to a seeded random number generator and to the entities.
//!
//! ## Execution
//!
//! A simulation is built with [`SimInit`](simulation::SimInit) and executed
//! with [`run()`](simulation::Simulation::run),
//! [`run_until()`](simulation::Simulation::run_until) or
//! [`step()`](simulation::Simulation::step) and its variants. A simulation
//! can be reset to its start time, optionally with a new seed, to evaluate it
//! again.
//!
//! # Example
//!
//! A single server fed by customers arriving at random intervals. Each
//! customer is served for one time unit; customers who find the server busy
//! are turned away.
//!
//! ```
//! use eventide::event::{EventInstance, Priority};
//! use eventide::simulation::{Context, RunOutcome, SimInit};
//! use rand::Rng;
//!
//! #[derive(Default)]
//! struct Server {
//!     busy: bool,
//!     served: u32,
//!     rejected: u32,
//! }
//!
//! fn arrival(cx: &mut Context<'_>) {
//!     let server = cx.get_entity_mut::<Server>("server").unwrap();
//!     if server.busy {
//!         server.rejected += 1;
//!     } else {
//!         server.busy = true;
//!         cx.schedule_in(1.0, "departure", departure).unwrap();
//!     }
//!     let interval = cx.rng().gen_range(0.5..2.0);
//!     cx.reschedule_current_in(interval).unwrap();
//! }
//!
//! fn departure(cx: &mut Context<'_>) {
//!     let server = cx.get_entity_mut::<Server>("server").unwrap();
//!     server.busy = false;
//!     server.served += 1;
//! }
//!
//! fn evaluate(seed: u64) -> (u32, u32) {
//!     let mut simu = SimInit::new().with_seed(seed).init().unwrap();
//!     simu.add_entity("server", Server::default()).unwrap();
//!
//!     // Departures are processed before arrivals occurring at the same time.
//!     let arrivals = EventInstance::new("arrival")
//!         .with_priority(Priority::user(1.0))
//!         .with_handler(arrival);
//!     simu.add_event_at(0.0, arrivals).unwrap();
//!
//!     assert_eq!(simu.run_until(1000.0), Ok(RunOutcome::TimeElapsed));
//!
//!     let server = simu.get_entity::<Server>("server").unwrap();
//!     (server.served, server.rejected)
//! }
//!
//! let (served, rejected) = evaluate(42);
//! assert!(served > 0 && rejected > 0);
//!
//! // Same seed, same outcome.
//! assert_eq!(evaluate(42), (served, rejected));
//! ```
//!
//! # Modules documentation
//!
//! More information is available in the documentation of the different
//! modules:
//!
//! * the [`simulation`] module discusses the simulation state machine, the
//!   cooperative pause and stop requests and determinism,
//! * the [`event`] module describes event instances and their priorities,
//! * the [`tracing`](crate::tracing) module explains how to collect the logs
//!   of a simulation,
//! * the [`time`] module describes the simulation timestamp ([`time::SimTime`]).
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod entity;
pub mod event;
mod loom_exports;
pub mod simulation;
pub mod time;
pub mod tracing;
pub(crate) mod util;
