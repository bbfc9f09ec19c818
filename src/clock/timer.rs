// Timer clock - Degraded fallback when no audio device is available
//
// Sleeps on a dedicated thread and reports plain timestamps: the authority
// advances from elapsed milliseconds instead of sample-accurate beats.

use super::generator::{BeatGenerator, SampleMode};
use super::status::{AtomicClockStatus, ClockStatus};
use super::ClockSource;
use crate::error::{TransportError, TransportResult};
use crate::sync::lock_or_recover;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub struct TimerClockSource {
    generator: Arc<Mutex<BeatGenerator>>,
    status: AtomicClockStatus,
    interval: Duration,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimerClockSource {
    pub fn new(generator: BeatGenerator, interval: Duration) -> Self {
        Self::from_shared(Arc::new(Mutex::new(generator)), interval)
    }

    pub(crate) fn from_shared(generator: Arc<Mutex<BeatGenerator>>, interval: Duration) -> Self {
        Self {
            generator,
            status: AtomicClockStatus::new(ClockStatus::Idle),
            interval: interval.max(Duration::from_millis(1)),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn generator(&self) -> Arc<Mutex<BeatGenerator>> {
        Arc::clone(&self.generator)
    }
}

impl ClockSource for TimerClockSource {
    fn start(&mut self) -> TransportResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        lock_or_recover(&self.generator).set_mode(SampleMode::DeltaOnly);
        self.running.store(true, Ordering::Release);
        self.status.set(ClockStatus::Starting);

        let generator = Arc::clone(&self.generator);
        let running = Arc::clone(&self.running);
        let interval = self.interval;

        let spawned = thread::Builder::new()
            .name("scoreclock-timer".into())
            .spawn(move || {
                let mut last = Instant::now();
                while running.load(Ordering::Acquire) {
                    thread::sleep(interval);
                    let now = Instant::now();
                    let elapsed = now.duration_since(last).as_secs_f64();
                    last = now;
                    lock_or_recover(&generator).advance(elapsed);
                }
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.status.set(ClockStatus::Degraded);
                tracing::warn!(
                    interval_ms = self.interval.as_millis() as u64,
                    "timer clock running, precision degraded"
                );
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.status.set(ClockStatus::Error);
                Err(TransportError::AcquisitionFailure(format!(
                    "timer thread: {e}"
                )))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("timer clock thread panicked");
            }
            tracing::info!("timer clock stopped");
        }
        self.status.set(ClockStatus::Idle);
    }

    fn status(&self) -> ClockStatus {
        self.status.get()
    }

    fn name(&self) -> &'static str {
        "timer"
    }

    fn beat_overruns(&self) -> u64 {
        lock_or_recover(&self.generator).counters().overruns()
    }
}

impl Drop for TimerClockSource {
    fn drop(&mut self) {
        self.stop();
    }
}
