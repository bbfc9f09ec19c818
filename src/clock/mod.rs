// Clock module - Realtime beat producers
//
// A clock source owns the realtime context. It only talks to the authority
// through the lock-free link: control messages in, beat messages out.

pub mod audio;
pub mod beat;
pub mod generator;
pub mod link;
pub mod status;
pub mod timer;

pub use audio::AudioClockSource;
pub use beat::{BeatMessage, BeatSample, ClockControl};
pub use generator::{BeatGenerator, ClockCounters, SampleMode};
pub use link::{AuthorityEndpoint, ClockEndpoint, link};
pub use status::{AtomicClockStatus, ClockStatus};
pub use timer::TimerClockSource;

use crate::error::TransportResult;

/// Realtime producer of beat messages
///
/// `start` is the only point where an external resource is acquired. A
/// started source keeps producing until `stop`; calling `start` on a running
/// source is a no-op.
pub trait ClockSource {
    fn start(&mut self) -> TransportResult<()>;

    fn stop(&mut self);

    fn status(&self) -> ClockStatus;

    /// Short label for logs
    fn name(&self) -> &'static str;

    /// Beat messages lost because the authority did not drain the ring
    fn beat_overruns(&self) -> u64 {
        0
    }
}
