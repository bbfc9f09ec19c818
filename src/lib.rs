// scoreclock - Library exports for the binary, tests and benchmarks
//
// Clock → TimeAuthority → EventBus (Tick) → EventScheduler → consumer callback

pub mod bus;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod transport;

mod sync;

// Re-export commonly used types for convenience
pub use bus::{BusMessage, BusStats, Channel, EventBus, Subscription};
pub use clock::{
    AudioClockSource, BeatGenerator, BeatMessage, BeatSample, ClockControl, ClockSource,
    ClockStatus, TimerClockSource, link,
};
pub use config::{BeatPolicy, ClockConfig, SchedulerConfig, StopPolicy, TransportConfig};
pub use diagnostics::{AtomicMetrics, Diagnostics, NoopObserver, TransportObserver};
pub use error::{ConfigError, DispatchError, TransportError, TransportResult};
pub use scheduler::{DispatchReport, EventId, EventScheduler, ScheduledEvent};
pub use transport::{
    LoopRegion, Position, Tempo, Tick, TimeAuthority, TimeSignature, TransportCommand,
    TransportSnapshot, TransportState,
};
