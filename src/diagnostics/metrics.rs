// Transport metrics - Injectable observability port
//
// The authority and the scheduler report through `TransportObserver`. The
// default implementation accumulates lock-free counters that any thread can
// read; tests substitute a recording observer.

use crate::error::TransportError;
use crate::transport::Tick;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Observer notified by the transport core
///
/// Every method has an empty default so implementations only override what
/// they care about. Calls happen inside the serialized processing context
/// and must not block.
pub trait TransportObserver: Send + Sync {
    /// A tick was broadcast by the authority
    fn tick_published(&self, _tick: &Tick) {}

    /// A command was rejected without mutating state
    fn command_rejected(&self, _error: &TransportError) {}

    /// A beat message from a previous clock epoch was discarded
    fn stale_beat_discarded(&self) {}

    /// Events handed to the consumer callback by one tick
    fn events_dispatched(&self, _count: usize) {}

    /// Overdue events dropped by the backlog policy
    fn events_dropped(&self, _count: usize) {}

    /// The consumer callback failed for one event
    fn dispatch_failed(&self, _error: &TransportError) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TransportObserver for NoopObserver {}

/// Lock-free counters shared between the processing context and readers
///
/// Cloning shares the same counters.
#[derive(Clone, Default)]
pub struct AtomicMetrics {
    ticks_published: Arc<AtomicU64>,
    last_tick: Arc<AtomicU64>,
    commands_rejected: Arc<AtomicU64>,
    stale_beats: Arc<AtomicU64>,
    events_dispatched: Arc<AtomicU64>,
    events_dropped: Arc<AtomicU64>,
    dispatch_failures: Arc<AtomicU64>,
}

/// Plain copy of the counters at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub ticks_published: u64,
    pub last_tick: u64,
    pub commands_rejected: u64,
    pub stale_beats: u64,
    pub events_dispatched: u64,
    pub events_dropped: u64,
    pub dispatch_failures: u64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks_published: self.ticks_published.load(Ordering::Relaxed),
            last_tick: self.last_tick.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            stale_beats: self.stale_beats.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset statistics (start from zero)
    pub fn reset(&self) {
        self.ticks_published.store(0, Ordering::Relaxed);
        self.last_tick.store(0, Ordering::Relaxed);
        self.commands_rejected.store(0, Ordering::Relaxed);
        self.stale_beats.store(0, Ordering::Relaxed);
        self.events_dispatched.store(0, Ordering::Relaxed);
        self.events_dropped.store(0, Ordering::Relaxed);
        self.dispatch_failures.store(0, Ordering::Relaxed);
    }
}

impl TransportObserver for AtomicMetrics {
    fn tick_published(&self, tick: &Tick) {
        self.ticks_published.fetch_add(1, Ordering::Relaxed);
        self.last_tick.store(tick.absolute_tick, Ordering::Relaxed);
    }

    fn command_rejected(&self, _error: &TransportError) {
        self.commands_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn stale_beat_discarded(&self) {
        self.stale_beats.fetch_add(1, Ordering::Relaxed);
    }

    fn events_dispatched(&self, count: usize) {
        self.events_dispatched
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    fn events_dropped(&self, count: usize) {
        self.events_dropped.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn dispatch_failed(&self, _error: &TransportError) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }
}
