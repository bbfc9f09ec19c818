// Tick broadcast payload and immutable transport snapshots

use super::timeline::{LoopRegion, Position, TimeSignature};
use serde::{Deserialize, Serialize};

/// Transport state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
    Disposed,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, TransportState::Disposed)
    }
}

/// Value broadcast on the tick channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub position: Position,
    pub absolute_tick: u64,
    pub tempo: f64,
    pub is_playing: bool,
    #[serde(rename = "loop")]
    pub loop_region: LoopRegion,
    /// Clock time in seconds of the sample that produced this tick
    pub timestamp: f64,
}

/// Read-only copy of the authority's state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportSnapshot {
    pub state: TransportState,
    pub tempo: f64,
    pub absolute_tick: u64,
    pub position: Position,
    pub loop_region: LoopRegion,
    pub time_signature: TimeSignature,
    pub ppq: u32,
    pub epoch: u32,
}

impl TransportSnapshot {
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }
}
