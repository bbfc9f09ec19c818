// Event queue - Tick-ordered pending events

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// Handle returned by `schedule`, usable to cancel the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventId(u64);

impl EventId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An event waiting for its trigger tick
///
/// Immutable once queued: fields are only readable through getters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent<P> {
    id: EventId,
    trigger_tick: u64,
    payload: P,
}

impl<P> ScheduledEvent<P> {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn trigger_tick(&self) -> u64 {
        self.trigger_tick
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }
}

/// Queue sorted by trigger tick, insertion order among equal ticks
///
/// Ids are assigned from a monotonic counter, so the id doubles as the
/// insertion sequence.
#[derive(Debug)]
pub struct EventQueue<P> {
    events: VecDeque<ScheduledEvent<P>>,
    next_id: u64,
}

impl<P> EventQueue<P> {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 0,
        }
    }

    pub fn insert(&mut self, trigger_tick: u64, payload: P) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;

        // After every event with the same tick keeps FIFO among ties
        let index = self.events.partition_point(|e| e.trigger_tick <= trigger_tick);
        self.events.insert(
            index,
            ScheduledEvent {
                id,
                trigger_tick,
                payload,
            },
        );
        id
    }

    /// Number of events with `trigger_tick <= tick`
    pub fn due_count(&self, tick: u64) -> usize {
        self.events.partition_point(|e| e.trigger_tick <= tick)
    }

    /// Remove and return the `count` earliest events
    pub fn pop_front_n(&mut self, count: usize) -> Vec<ScheduledEvent<P>> {
        let count = count.min(self.events.len());
        self.events.drain(..count).collect()
    }

    pub fn remove(&mut self, id: EventId) -> bool {
        match self.events.iter().position(|e| e.id == id) {
            Some(index) => {
                self.events.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) -> usize {
        let count = self.events.len();
        self.events.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn peek(&self) -> Option<&ScheduledEvent<P>> {
        self.events.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledEvent<P>> {
        self.events.iter()
    }
}

impl<P> Default for EventQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}
