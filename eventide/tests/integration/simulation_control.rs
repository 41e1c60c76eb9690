//! Run, step, pause, resume, stop and reset.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use eventide::simulation::{
    ExecutionError, RunOutcome, RunSummary, SimInit, SimState, Simulation,
};
use eventide::time::SimTime;

/// A simulation with no-op events at the specified times and a log of the
/// finished notifications.
fn bench(times: &[f64]) -> (Simulation, Arc<Mutex<Vec<RunSummary>>>) {
    let mut simu = SimInit::new().init().unwrap();
    for &time in times {
        simu.schedule(time, "noop", |_| {}).unwrap();
    }

    let summaries = Arc::new(Mutex::new(Vec::new()));
    let listener_summaries = summaries.clone();
    simu.on_finished(move |summary| listener_summaries.lock().unwrap().push(*summary));

    (simu, summaries)
}

#[test]
fn run_with_nothing_scheduled() {
    let (mut simu, summaries) = bench(&[]);

    assert_eq!(simu.run(), Err(ExecutionError::NothingScheduled));

    assert_eq!(simu.state(), SimState::Stopped);
    assert_eq!(simu.time(), SimTime::ZERO);
    assert!(simu.is_reset());
    assert!(summaries.lock().unwrap().is_empty());
}

#[test]
fn run_to_completion() {
    let (mut simu, summaries) = bench(&[1.0, 2.0, 2.0, 7.5]);

    assert_eq!(simu.run(), Ok(RunOutcome::Completed));

    assert_eq!(simu.time(), SimTime::new(7.5));
    assert!(simu.is_stopped());
    assert_eq!(simu.event_counter(), 4);
    assert_eq!(simu.handler_counter(), 4);
    assert_eq!(
        *summaries.lock().unwrap(),
        [RunSummary {
            outcome: RunOutcome::Completed,
            time: SimTime::new(7.5),
            event_counter: 4,
            handler_counter: 4,
        }]
    );
}

#[test]
fn run_until_clamps_time() {
    let (mut simu, summaries) = bench(&[1.0, 5.0, 12.0]);

    assert_eq!(simu.run_until(10.0), Ok(RunOutcome::TimeElapsed));

    assert_eq!(simu.time(), SimTime::new(10.0));
    assert_eq!(simu.state(), SimState::TimeElapsed);
    assert_eq!(simu.event_counter(), 2);
    assert_eq!(summaries.lock().unwrap().len(), 1);
    assert_eq!(summaries.lock().unwrap()[0].outcome, RunOutcome::TimeElapsed);

    // Pending events are preserved.
    assert_eq!(simu.run(), Ok(RunOutcome::Completed));
    assert_eq!(simu.time(), SimTime::new(12.0));
    assert_eq!(summaries.lock().unwrap().len(), 2);
}

#[test]
fn run_until_raises_events_at_stop_time() {
    let (mut simu, _) = bench(&[1.0, 4.0, 4.0, 6.0]);

    assert_eq!(simu.run_until(4.0), Ok(RunOutcome::TimeElapsed));

    assert_eq!(simu.event_counter(), 3);
    assert_eq!(simu.time(), SimTime::new(4.0));
}

#[test]
fn run_until_runs_out_of_work() {
    let (mut simu, summaries) = bench(&[1.0, 3.0]);

    assert_eq!(simu.run_until(10.0), Ok(RunOutcome::Completed));

    // The time is not clamped when no event remains.
    assert_eq!(simu.time(), SimTime::new(3.0));
    assert!(simu.is_stopped());
    assert_eq!(summaries.lock().unwrap()[0].outcome, RunOutcome::Completed);
}

#[test]
fn run_until_past_target() {
    let (mut simu, _) = bench(&[1.0, 3.0, 5.0]);
    simu.run_until(2.0).unwrap();

    assert_eq!(simu.run_until(1.0), Err(ExecutionError::InvalidTargetTime));
    assert_eq!(simu.state(), SimState::TimeElapsed);
    assert_eq!(
        simu.step_until(f64::INFINITY),
        Err(ExecutionError::InvalidTargetTime)
    );
}

#[test]
fn step_covers_step_size() {
    let (mut simu, summaries) = bench(&[0.5, 1.0, 1.5, 4.0]);
    simu.set_step_size(1.0).unwrap();

    assert_eq!(simu.step(), RunOutcome::Stepped);
    assert_eq!(simu.time(), SimTime::new(1.0));
    assert_eq!(simu.event_counter(), 2);
    assert!(simu.is_paused());

    assert_eq!(simu.step(), RunOutcome::Stepped);
    assert_eq!(simu.time(), SimTime::new(2.0));
    assert_eq!(simu.event_counter(), 3);

    assert_eq!(simu.step_by(2.0), Ok(RunOutcome::Stepped));
    assert_eq!(simu.time(), SimTime::new(4.0));
    assert_eq!(simu.event_counter(), 4);
    assert!(simu.is_stopped());

    // Steps do not notify finished listeners.
    assert!(summaries.lock().unwrap().is_empty());
}

#[test]
fn step_without_events() {
    let (mut simu, _) = bench(&[]);

    assert_eq!(simu.step_by(2.5), Ok(RunOutcome::Stepped));
    assert_eq!(simu.time(), SimTime::new(2.5));
    assert_eq!(simu.step_by(-1.0), Err(ExecutionError::InvalidTargetTime));
}

#[test]
fn pause_and_resume_bounded_run() {
    let (mut simu, summaries) = bench(&[1.0, 3.0, 8.0]);
    simu.schedule(2.0, "pause", |cx| cx.request_pause()).unwrap();

    assert_eq!(simu.run_until(5.0), Ok(RunOutcome::Paused));
    assert!(simu.is_paused());
    assert_eq!(simu.time(), SimTime::new(2.0));
    assert!(summaries.lock().unwrap().is_empty());

    // The original bound of the run is restored.
    assert_eq!(simu.resume(), Ok(RunOutcome::TimeElapsed));
    assert_eq!(simu.time(), SimTime::new(5.0));
    assert_eq!(simu.event_counter(), 3);
    assert_eq!(summaries.lock().unwrap().len(), 1);
}

#[test]
fn pause_is_honoured_between_moments() {
    let (mut simu, _) = bench(&[]);
    let raised = Arc::new(AtomicUsize::new(0));

    let counter = raised.clone();
    simu.schedule(1.0, "pause", move |cx| {
        cx.request_pause();
        counter.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();
    for _ in 0..3 {
        let counter = raised.clone();
        simu.schedule(1.0, "same-moment", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }
    simu.schedule(2.0, "next-moment", |_| {}).unwrap();

    assert_eq!(simu.run(), Ok(RunOutcome::Paused));

    // The whole moment is processed before pausing.
    assert_eq!(raised.load(Ordering::Relaxed), 4);
    assert_eq!(simu.scheduler().len(), 1);
}

#[test]
fn resume_when_not_paused() {
    let (mut simu, _) = bench(&[1.0]);

    assert_eq!(simu.resume(), Err(ExecutionError::NotPaused));
    simu.run().unwrap();
    assert_eq!(simu.resume(), Err(ExecutionError::NotPaused));
}

#[test]
fn stop_from_handler() {
    let (mut simu, summaries) = bench(&[1.0, 3.0]);
    simu.schedule(2.0, "stop", |cx| cx.request_stop()).unwrap();

    assert_eq!(simu.run(), Ok(RunOutcome::Stopped));

    assert!(simu.is_stopped());
    assert_eq!(simu.time(), SimTime::new(2.0));
    assert_eq!(simu.scheduler().len(), 1);
    assert!(summaries.lock().unwrap().is_empty());
    assert_eq!(simu.resume(), Err(ExecutionError::NotPaused));
}

#[test]
fn stop_overrides_pause() {
    let (mut simu, _) = bench(&[3.0]);
    simu.schedule(1.0, "both", |cx| {
        cx.request_pause();
        cx.request_stop();
    })
    .unwrap();

    assert_eq!(simu.run(), Ok(RunOutcome::Stopped));

    // No stale request is left behind.
    assert_eq!(simu.run(), Ok(RunOutcome::Completed));
}

#[test]
fn reset_discards_requests_and_events() {
    let (mut simu, _) = bench(&[1.0, 2.0]);
    simu.run_until(1.5).unwrap();
    simu.controller().stop();

    simu.reset();

    assert!(simu.is_reset());
    assert!(simu.is_stopped());
    assert_eq!(simu.time(), SimTime::ZERO);
    assert_eq!(simu.eventful_moments_count(), 0);
    assert_eq!(simu.event_counter(), 0);
    assert_eq!(simu.handler_counter(), 0);

    simu.schedule(1.0, "fresh", |_| {}).unwrap();
    assert_eq!(simu.run(), Ok(RunOutcome::Completed));
}

#[test]
fn finished_fires_once_per_run() {
    let (mut simu, summaries) = bench(&[1.0]);
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    simu.on_finished(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    simu.run().unwrap();
    assert_eq!(notified.load(Ordering::Relaxed), 1);

    simu.reset();
    simu.schedule(1.0, "again", |_| {}).unwrap();
    simu.run().unwrap();

    assert_eq!(notified.load(Ordering::Relaxed), 2);
    assert_eq!(summaries.lock().unwrap().len(), 2);
}
