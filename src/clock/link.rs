// Lock-free clock ↔ authority channels

use super::beat::{BeatMessage, ClockControl};
use ringbuf::{HeapRb, traits::Split};

pub type BeatProducer = ringbuf::HeapProd<BeatMessage>;
pub type BeatConsumer = ringbuf::HeapCons<BeatMessage>;

pub type ControlProducer = ringbuf::HeapProd<ClockControl>;
pub type ControlConsumer = ringbuf::HeapCons<ClockControl>;

/// Realtime side: pushes beats, pops control messages
pub struct ClockEndpoint {
    pub beats: BeatProducer,
    pub control: ControlConsumer,
}

/// Authority side: pops beats, pushes control messages
pub struct AuthorityEndpoint {
    pub beats: BeatConsumer,
    pub control: ControlProducer,
}

pub fn link(beat_capacity: usize, control_capacity: usize) -> (ClockEndpoint, AuthorityEndpoint) {
    let (beat_tx, beat_rx) = HeapRb::<BeatMessage>::new(beat_capacity).split();
    let (control_tx, control_rx) = HeapRb::<ClockControl>::new(control_capacity).split();

    (
        ClockEndpoint {
            beats: beat_tx,
            control: control_rx,
        },
        AuthorityEndpoint {
            beats: beat_rx,
            control: control_tx,
        },
    )
}
