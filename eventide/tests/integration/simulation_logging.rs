//! Log collection through an injected log sink.

use std::io;
use std::sync::{Arc, Mutex};

use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;

use eventide::event::EventInstance;
use eventide::simulation::SimInit;
use eventide::tracing::SimulationTime;

/// A writer appending to a shared buffer.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn log_sink(capture: &Capture) -> Dispatch {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_timer(SimulationTime::with_custom_timer(()))
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();

    Dispatch::new(subscriber)
}

#[test]
fn logging_to_injected_sink() {
    let capture = Capture::default();
    let mut simu = SimInit::new()
        .with_name("bench")
        .with_log_sink(log_sink(&capture))
        .init()
        .unwrap();

    simu.add_event_at(2.5, EventInstance::new("noisy").with_logging(true))
        .unwrap();
    simu.add_event_at(3.0, EventInstance::new("quiet")).unwrap();
    simu.run().unwrap();

    let logs = capture.contents();
    assert!(logs.contains("simulation{name=\"bench\"}"));
    assert!(logs.contains("raising event"));
    assert!(logs.contains("noisy"));
    assert!(!logs.contains("quiet"));
    assert!(logs.contains("[t=2.5]"));
    assert!(logs.contains("simulation finished"));
}

#[test]
fn logging_state_transitions() {
    let capture = Capture::default();
    let mut simu = SimInit::new()
        .with_log_sink(log_sink(&capture))
        .init()
        .unwrap();

    simu.schedule(1.0, "pause", |cx| cx.request_pause()).unwrap();
    simu.run().unwrap();
    simu.reset_with_seed(3);

    let logs = capture.contents();
    assert!(logs.contains("state transition"));
    assert!(logs.contains("Paused"));
    assert!(logs.contains("simulation reset"));
}

#[test]
fn logging_sinks_are_isolated() {
    let capture_a = Capture::default();
    let capture_b = Capture::default();

    let mut simu_a = SimInit::new()
        .with_name("a")
        .with_log_sink(log_sink(&capture_a))
        .init()
        .unwrap();
    let mut simu_b = SimInit::new()
        .with_name("b")
        .with_log_sink(log_sink(&capture_b))
        .init()
        .unwrap();

    simu_a.schedule(1.0, "x", |_| {}).unwrap();
    simu_b.schedule(1.0, "y", |_| {}).unwrap();
    simu_a.run().unwrap();
    simu_b.run().unwrap();

    assert!(capture_a.contents().contains("name=\"a\""));
    assert!(!capture_a.contents().contains("name=\"b\""));
    assert!(capture_b.contents().contains("name=\"b\""));
}
