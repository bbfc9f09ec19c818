// Beat generator - Realtime hot path of every clock source
//
// Called from the audio callback (or the fallback timer thread) with the
// amount of time just rendered. No allocation, no blocking: control
// messages are popped, beat messages are pushed, a full ring drops the beat.

use super::beat::{BeatMessage, BeatSample, ClockControl};
use super::link::ClockEndpoint;
use ringbuf::traits::{Consumer, Producer};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// What kind of samples the generator emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Beat position since `Start` (sample-accurate clocks)
    BeatData,
    /// Timestamps only (coarse clocks)
    DeltaOnly,
}

/// Counters readable outside the realtime thread
#[derive(Clone, Default)]
pub struct ClockCounters {
    emitted: Arc<AtomicU64>,
    overruns: Arc<AtomicU64>,
}

impl ClockCounters {
    /// Beat messages handed to the authority
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Beat messages lost to a full ring
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }
}

pub struct BeatGenerator {
    endpoint: ClockEndpoint,
    mode: SampleMode,
    emit_interval: f64,
    epoch: u32,
    running: bool,
    bpm: f64,
    beats: f64,
    clock_time: f64,
    since_emit: f64,
    counters: ClockCounters,
}

impl BeatGenerator {
    /// `emit_interval_ms` is the rendered time between two beat messages
    pub fn new(endpoint: ClockEndpoint, emit_interval_ms: f64) -> Self {
        Self {
            endpoint,
            mode: SampleMode::BeatData,
            emit_interval: emit_interval_ms / 1000.0,
            epoch: 0,
            running: false,
            bpm: 120.0,
            beats: 0.0,
            clock_time: 0.0,
            since_emit: 0.0,
            counters: ClockCounters::default(),
        }
    }

    pub fn counters(&self) -> ClockCounters {
        self.counters.clone()
    }

    pub fn mode(&self) -> SampleMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SampleMode) {
        self.mode = mode;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Seconds rendered since the generator was created
    pub fn clock_time(&self) -> f64 {
        self.clock_time
    }

    /// Apply every pending control message
    pub fn process_control(&mut self) {
        while let Some(control) = self.endpoint.control.try_pop() {
            match control {
                ClockControl::Start { epoch, bpm } => {
                    self.epoch = epoch;
                    self.bpm = bpm;
                    self.beats = 0.0;
                    self.since_emit = 0.0;
                    self.running = true;
                    // Anchor the new run at beat 0
                    self.emit();
                }
                ClockControl::Stop => {
                    self.running = false;
                }
                ClockControl::SetTempo(bpm) => {
                    self.bpm = bpm;
                }
            }
        }
    }

    /// Account for `frames` rendered at `sample_rate`
    pub fn advance_frames(&mut self, frames: usize, sample_rate: u32) {
        if sample_rate == 0 {
            return;
        }
        self.advance(frames as f64 / sample_rate as f64);
    }

    /// Account for `seconds` of rendered time
    pub fn advance(&mut self, seconds: f64) {
        self.process_control();

        let seconds = seconds.max(0.0);
        self.clock_time += seconds;
        if !self.running {
            return;
        }

        self.beats += seconds * self.bpm / 60.0;
        self.since_emit += seconds;
        if self.since_emit >= self.emit_interval {
            // One message per call, however long the call was
            self.since_emit %= self.emit_interval;
            self.emit();
        }
    }

    fn emit(&mut self) {
        let sample = match self.mode {
            SampleMode::BeatData => BeatSample::from_beats(self.clock_time, self.beats),
            SampleMode::DeltaOnly => BeatSample::TimeDeltaOnly {
                current_time: self.clock_time,
            },
        };
        let message = BeatMessage {
            epoch: self.epoch,
            sample,
        };

        if self.endpoint.beats.try_push(message).is_ok() {
            self.counters.emitted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.overruns.fetch_add(1, Ordering::Relaxed);
        }
    }
}
