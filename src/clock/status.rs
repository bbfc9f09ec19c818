// Clock status - Liveness signal shared with the realtime side

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    Idle = 0,
    Starting = 1,
    /// Driven by the audio device callback
    Realtime = 2,
    /// Driven by the timer fallback, coarser precision
    Degraded = 3,
    Error = 4,
}

impl ClockStatus {
    /// True when beats are expected to flow
    pub fn is_running(&self) -> bool {
        matches!(self, ClockStatus::Realtime | ClockStatus::Degraded)
    }
}

impl From<u8> for ClockStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => ClockStatus::Idle,
            1 => ClockStatus::Starting,
            2 => ClockStatus::Realtime,
            3 => ClockStatus::Degraded,
            _ => ClockStatus::Error,
        }
    }
}

/// Status readable from any thread, writable from the stream error callback
#[derive(Clone)]
pub struct AtomicClockStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicClockStatus {
    pub fn new(status: ClockStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> ClockStatus {
        ClockStatus::from(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, status: ClockStatus) {
        self.inner.store(status as u8, Ordering::Relaxed);
    }
}

impl Default for AtomicClockStatus {
    fn default() -> Self {
        Self::new(ClockStatus::Idle)
    }
}
