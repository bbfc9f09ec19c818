// Diagnostics - Read-only view over the whole pipeline

pub mod metrics;

pub use metrics::{AtomicMetrics, MetricsSnapshot, NoopObserver, TransportObserver};

use crate::bus::BusStats;
use crate::scheduler::SchedulerDiagnostics;
use serde::Serialize;

/// Pipeline health at one instant, serializable for status endpoints and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub ticks_published: u64,
    pub queue_size: usize,
    pub last_scheduled_tick: Option<u64>,
    pub last_processed_tick: Option<u64>,
    pub dropped_events: u64,
    pub dispatch_failures: u64,
    pub beat_overruns: u64,
}

impl Diagnostics {
    pub fn gather(bus: &BusStats, scheduler: &SchedulerDiagnostics, beat_overruns: u64) -> Self {
        Self {
            ticks_published: bus.ticks_published,
            queue_size: scheduler.queue_size,
            last_scheduled_tick: scheduler.last_scheduled_tick,
            last_processed_tick: scheduler.last_processed_tick,
            dropped_events: scheduler.dropped_total,
            dispatch_failures: scheduler.dispatch_failures,
            beat_overruns,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
