// Clock handoff messages
// Realtime-safe: every type here is Copy and fixed size

use crate::transport::beats_to_ticks;

/// One clock notification
///
/// A realtime clock knows exactly how far the transport has travelled since
/// the last `Start`; a coarse fallback only knows what time it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeatSample {
    HasBeatData {
        /// Clock time in seconds
        current_time: f64,
        /// Whole beats since `Start`
        beat: f64,
        /// Position within the current beat, `[0, 1)`
        fraction: f64,
    },
    TimeDeltaOnly {
        current_time: f64,
    },
}

impl BeatSample {
    /// Split a continuous beat position into whole beat and fraction
    pub fn from_beats(current_time: f64, beats: f64) -> Self {
        let beats = beats.max(0.0);
        BeatSample::HasBeatData {
            current_time,
            beat: beats.floor(),
            fraction: beats.fract(),
        }
    }

    pub fn current_time(&self) -> f64 {
        match *self {
            BeatSample::HasBeatData { current_time, .. } => current_time,
            BeatSample::TimeDeltaOnly { current_time } => current_time,
        }
    }

    pub fn has_beat_data(&self) -> bool {
        matches!(self, BeatSample::HasBeatData { .. })
    }

    /// Continuous beat position, if the sample carries one
    pub fn beats(&self) -> Option<f64> {
        match *self {
            BeatSample::HasBeatData { beat, fraction, .. } => Some(beat + fraction),
            BeatSample::TimeDeltaOnly { .. } => None,
        }
    }

    /// Ticks since `Start`, rounded to the nearest tick
    pub fn ticks_since_start(&self, ppq: u32) -> Option<u64> {
        self.beats().map(|beats| beats_to_ticks(beats, ppq))
    }

    /// Same sample with the beat data stripped
    pub fn without_beat_data(self) -> Self {
        BeatSample::TimeDeltaOnly {
            current_time: self.current_time(),
        }
    }
}

/// Beat sample stamped with the clock run that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatMessage {
    pub epoch: u32,
    pub sample: BeatSample,
}

/// Authority → clock control protocol
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockControl {
    /// Restart the beat count at zero and tag samples with `epoch`
    Start { epoch: u32, bpm: f64 },
    Stop,
    SetTempo(f64),
}
