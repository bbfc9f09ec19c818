// Timeline - Musical time representation
// Converts between clock beats, absolute ticks, and measure/beat/tick positions

use crate::error::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default resolution in pulses (ticks) per quarter note
pub const DEFAULT_PPQ: u32 = 480;

/// Lowest accepted tempo
pub const MIN_BPM: f64 = 20.0;

/// Highest accepted tempo
pub const MAX_BPM: f64 = 999.0;

/// Time signature (numerator/denominator)
/// Example: 4/4 time = TimeSignature { numerator: 4, denominator: 4 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per measure
    pub denominator: u8, // Note value (4 = quarter note, 8 = eighth note)
}

impl TimeSignature {
    /// Creates a validated time signature
    pub fn try_new(numerator: u8, denominator: u8) -> TransportResult<Self> {
        let signature = Self {
            numerator,
            denominator,
        };
        signature.validate()?;
        Ok(signature)
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    /// Common 3/4 time signature (waltz)
    pub fn three_four() -> Self {
        Self {
            numerator: 3,
            denominator: 4,
        }
    }

    /// Common 6/8 time signature
    pub fn six_eight() -> Self {
        Self {
            numerator: 6,
            denominator: 8,
        }
    }

    pub fn validate(&self) -> TransportResult<()> {
        if self.numerator == 0 {
            return Err(TransportError::InvalidCommand(
                "time signature numerator must be > 0".into(),
            ));
        }
        if !self.denominator.is_power_of_two() || self.denominator > 32 {
            return Err(TransportError::InvalidCommand(format!(
                "time signature denominator must be a power of two up to 32, got {}",
                self.denominator
            )));
        }
        Ok(())
    }

    /// Ticks in one beat of this signature
    /// Example at 480 PPQ: 4/4 = 480, 6/8 = 240
    pub fn ticks_per_beat(&self, ppq: u32) -> u64 {
        (ppq as u64 * 4) / self.denominator as u64
    }

    /// Ticks in one full measure
    pub fn ticks_per_measure(&self, ppq: u32) -> u64 {
        self.ticks_per_beat(ppq) * self.numerator as u64
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (quarter notes per minute)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo
    /// BPM must be finite and in range [MIN_BPM, MAX_BPM]
    pub fn try_new(bpm: f64) -> TransportResult<Self> {
        if !bpm.is_finite() || !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(TransportError::InvalidCommand(format!(
                "tempo must be between {MIN_BPM} and {MAX_BPM} BPM, got {bpm}"
            )));
        }
        Ok(Self { bpm })
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one quarter note in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Fractional ticks elapsed over `millis` milliseconds
    ///
    /// `ticks = ms * (bpm / 60) * ppq / 1000`
    pub fn ticks_for_millis(&self, millis: f64, ppq: u32) -> f64 {
        millis * (self.bpm / 60.0) * ppq as f64 / 1000.0
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Convert a continuous beat position into integer ticks, rounding to the
/// nearest tick. Negative positions clamp to zero.
pub fn beats_to_ticks(beats: f64, ppq: u32) -> u64 {
    let ticks = (beats * ppq as f64).round();
    if ticks.is_finite() && ticks > 0.0 {
        ticks as u64
    } else {
        0
    }
}

/// Musical position decomposed from an absolute tick
/// Measure and beat are 1-based, tick is 0-based within the beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub measure: u32,
    pub beat: u32,
    pub tick: u32,
}

impl Position {
    /// Creates a new position
    pub fn new(measure: u32, beat: u32, tick: u32) -> Self {
        Self {
            measure,
            beat,
            tick,
        }
    }

    /// Zero position (measure 1, beat 1, tick 0)
    pub fn zero() -> Self {
        Self::new(1, 1, 0)
    }

    /// Create from absolute ticks
    pub fn from_absolute(absolute_tick: u64, ppq: u32, time_signature: &TimeSignature) -> Self {
        let ticks_per_beat = time_signature.ticks_per_beat(ppq).max(1);
        let ticks_per_measure = time_signature.ticks_per_measure(ppq).max(1);

        let measure = (absolute_tick / ticks_per_measure) + 1;
        let remaining = absolute_tick % ticks_per_measure;
        let beat = (remaining / ticks_per_beat) + 1;
        let tick = remaining % ticks_per_beat;

        Self::new(measure as u32, beat as u32, tick as u32)
    }

    /// Convert back to absolute ticks
    pub fn to_absolute(&self, ppq: u32, time_signature: &TimeSignature) -> u64 {
        let ticks_per_beat = time_signature.ticks_per_beat(ppq);
        let ticks_per_measure = time_signature.ticks_per_measure(ppq);

        let measure_0 = self.measure.saturating_sub(1) as u64;
        let beat_0 = self.beat.saturating_sub(1) as u64;

        measure_0 * ticks_per_measure + beat_0 * ticks_per_beat + self.tick as u64
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:03}", self.measure, self.beat, self.tick)
    }
}

/// Loop region `[start_tick, end_tick)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopRegion {
    pub enabled: bool,
    pub start_tick: u64,
    pub end_tick: u64,
}

impl LoopRegion {
    /// Creates a loop region; `start` must be strictly before `end`
    pub fn try_new(start_tick: u64, end_tick: u64, enabled: bool) -> TransportResult<Self> {
        if end_tick <= start_tick {
            return Err(TransportError::InvalidCommand(format!(
                "loop end ({end_tick}) must be after loop start ({start_tick})"
            )));
        }
        Ok(Self {
            enabled,
            start_tick,
            end_tick,
        })
    }

    /// Loop length in ticks
    pub fn length(&self) -> u64 {
        self.end_tick.saturating_sub(self.start_tick)
    }

    /// Wrap a tick back into the region if the loop is active and the tick
    /// has reached the end. Result is always in `[start_tick, end_tick)`.
    pub fn wrap(&self, tick: u64) -> u64 {
        let length = self.length();
        if !self.enabled || length == 0 || tick < self.end_tick {
            return tick;
        }
        self.start_tick + ((tick - self.start_tick) % length)
    }
}
