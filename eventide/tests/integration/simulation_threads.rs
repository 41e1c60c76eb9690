//! Control of a simulation running on another thread.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use eventide::simulation::{RunOutcome, SimInit, SimState, Simulation};
use eventide::time::SimTime;

/// A simulation which never runs out of work.
fn endless_bench() -> Simulation {
    let mut simu = SimInit::new().init().unwrap();
    simu.schedule(0.0, "tick", |cx| cx.reschedule_current_in(1.0).unwrap())
        .unwrap();

    simu
}

fn wait_until(condition: impl Fn() -> bool) {
    while !condition() {
        thread::sleep(Duration::from_micros(100));
    }
}

#[test]
fn threads_stop_running_simulation() {
    let mut simu = endless_bench();
    let controller = simu.controller();

    let worker = thread::spawn(move || {
        let outcome = simu.run().unwrap();
        (outcome, simu)
    });

    wait_until(|| controller.time() >= SimTime::new(1000.0));
    controller.stop();

    let (outcome, simu) = worker.join().unwrap();
    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(controller.state(), SimState::Stopped);
    assert_eq!(controller.time(), simu.time());
    assert!(!simu.scheduler().is_empty());
}

#[test]
fn threads_pause_then_resume() {
    let mut simu = endless_bench();
    let controller = simu.controller();

    let (paused_tx, paused_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        assert_eq!(simu.run(), Ok(RunOutcome::Paused));
        paused_tx.send(simu.time()).unwrap();

        resume_rx.recv().unwrap();
        assert_eq!(simu.resume(), Ok(RunOutcome::Stopped));
    });

    wait_until(|| controller.time() >= SimTime::new(10.0));
    controller.pause();

    let paused_at = paused_rx.recv().unwrap();
    assert!(controller.is_paused());
    assert_eq!(controller.time(), paused_at);

    resume_tx.send(()).unwrap();
    wait_until(|| controller.time() > paused_at + 10.0);
    controller.stop();

    worker.join().unwrap();
    assert!(controller.is_stopped());
}
