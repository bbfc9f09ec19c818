// Transport module - Musical time, commands and the time authority

pub mod authority;
pub mod command;
pub mod tick;
pub mod timeline;

pub use authority::{Liveness, PumpReport, TimeAuthority};
pub use command::TransportCommand;
pub use tick::{Tick, TransportSnapshot, TransportState};
pub use timeline::{
    DEFAULT_PPQ, LoopRegion, MAX_BPM, MIN_BPM, Position, Tempo, TimeSignature, beats_to_ticks,
};
