// Transport commands - Client → TimeAuthority
// Published on the bus command channel, applied once each in publish order

use serde::{Deserialize, Serialize};

/// Commands accepted by the time authority
///
/// Serialized as an internally tagged object, e.g. `{"type":"seek","tick":500}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransportCommand {
    Play,
    Pause,
    Stop,
    Toggle,
    Seek { tick: u64 },
    SetTempo { bpm: f64 },
    SetLoop { start: u64, end: u64, enabled: bool },
}

impl TransportCommand {
    /// Short name used in log fields
    pub fn name(&self) -> &'static str {
        match self {
            TransportCommand::Play => "play",
            TransportCommand::Pause => "pause",
            TransportCommand::Stop => "stop",
            TransportCommand::Toggle => "toggle",
            TransportCommand::Seek { .. } => "seek",
            TransportCommand::SetTempo { .. } => "setTempo",
            TransportCommand::SetLoop { .. } => "setLoop",
        }
    }
}
