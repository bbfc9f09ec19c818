// Event scheduler - Releases queued events as the transport reaches their tick
//
// Driven by the Tick channel. Dispatch is isolated per event: one failing or
// panicking consumer never prevents the remaining due events from firing.

use super::queue::{EventId, EventQueue, ScheduledEvent};
use crate::bus::{EventBus, Subscription};
use crate::config::SchedulerConfig;
use crate::diagnostics::{NoopObserver, TransportObserver};
use crate::error::{DispatchError, TransportError};
use crate::sync::{lock_or_recover, panic_message};
use crate::transport::Tick;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// Consumer callback invoked once per due event
pub type DispatchFn<P> = Box<dyn FnMut(&ScheduledEvent<P>) -> Result<(), DispatchError> + Send>;

/// Outcome of one `advance_to` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub tick: u64,
    pub dispatched: usize,
    pub dropped: usize,
    pub failed: usize,
}

/// Read-only scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerDiagnostics {
    pub queue_size: usize,
    pub last_scheduled_tick: Option<u64>,
    pub last_processed_tick: Option<u64>,
    pub dispatched_total: u64,
    pub dropped_total: u64,
    pub dispatch_failures: u64,
}

pub struct EventScheduler<P> {
    queue: EventQueue<P>,
    dispatch: DispatchFn<P>,
    config: SchedulerConfig,
    observer: Arc<dyn TransportObserver>,
    last_scheduled_tick: Option<u64>,
    last_processed_tick: Option<u64>,
    dispatched_total: u64,
    dropped_total: u64,
    dispatch_failures: u64,
}

impl<P> EventScheduler<P> {
    pub fn new<F>(config: SchedulerConfig, dispatch: F) -> Self
    where
        F: FnMut(&ScheduledEvent<P>) -> Result<(), DispatchError> + Send + 'static,
    {
        Self::with_observer(config, dispatch, Arc::new(NoopObserver))
    }

    pub fn with_observer<F>(
        config: SchedulerConfig,
        dispatch: F,
        observer: Arc<dyn TransportObserver>,
    ) -> Self
    where
        F: FnMut(&ScheduledEvent<P>) -> Result<(), DispatchError> + Send + 'static,
    {
        Self {
            queue: EventQueue::new(),
            dispatch: Box::new(dispatch),
            config,
            observer,
            last_scheduled_tick: None,
            last_processed_tick: None,
            dispatched_total: 0,
            dropped_total: 0,
            dispatch_failures: 0,
        }
    }

    /// Queue `payload` to fire once the transport reaches `trigger_tick`
    pub fn schedule(&mut self, trigger_tick: u64, payload: P) -> EventId {
        self.last_scheduled_tick = Some(trigger_tick);
        self.queue.insert(trigger_tick, payload)
    }

    /// Remove a pending event; false if it already fired, was dropped or
    /// never existed
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.queue.remove(id)
    }

    /// Discard every pending event, returning how many were removed
    pub fn clear(&mut self) -> usize {
        self.queue.clear()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Trigger tick of the next pending event
    pub fn next_trigger_tick(&self) -> Option<u64> {
        self.queue.peek().map(|event| event.trigger_tick())
    }

    pub fn on_tick(&mut self, tick: &Tick) -> DispatchReport {
        self.advance_to(tick.absolute_tick)
    }

    /// Dispatch every event with `trigger_tick <= tick`, earliest first
    ///
    /// While lagging (queue over `max_queue_len`, or more than
    /// `max_tick_gap` ticks since the last call) at most `max_burst` events
    /// fire; the older overdue ones are dropped and counted.
    pub fn advance_to(&mut self, tick: u64) -> DispatchReport {
        let mut report = DispatchReport {
            tick,
            ..DispatchReport::default()
        };

        let due = self.queue.due_count(tick);
        if due > 0 {
            let lagging = self.is_lagging(tick);
            if lagging && due > self.config.max_burst {
                let dropped = due - self.config.max_burst;
                self.queue.pop_front_n(dropped);
                self.dropped_total += dropped as u64;
                report.dropped = dropped;
                self.observer.events_dropped(dropped);
                tracing::warn!(
                    "{}",
                    TransportError::BacklogOverrun {
                        tick,
                        dropped
                    }
                );
            }

            let ready = self.queue.pop_front_n(due - report.dropped);
            for event in &ready {
                if self.dispatch_one(event, tick) {
                    report.dispatched += 1;
                } else {
                    report.failed += 1;
                }
            }
            self.dispatched_total += report.dispatched as u64;
            self.observer.events_dispatched(report.dispatched);
        }

        self.last_processed_tick = Some(tick);
        report
    }

    fn is_lagging(&self, tick: u64) -> bool {
        if self.queue.len() > self.config.max_queue_len {
            return true;
        }
        // Backward jumps (loop wrap, seek) are never a gap
        self.last_processed_tick
            .is_some_and(|last| tick.saturating_sub(last) > self.config.max_tick_gap)
    }

    /// Returns false if the callback failed or panicked
    fn dispatch_one(&mut self, event: &ScheduledEvent<P>, tick: u64) -> bool {
        let dispatch = &mut self.dispatch;
        let reason = match panic::catch_unwind(AssertUnwindSafe(|| dispatch(event))) {
            Ok(Ok(())) => return true,
            Ok(Err(error)) => error.0,
            Err(payload) => format!("callback panicked: {}", panic_message(payload.as_ref())),
        };

        self.dispatch_failures += 1;
        let error = TransportError::DispatchFailure {
            tick: event.trigger_tick(),
            reason,
        };
        tracing::error!(event = %event.id(), current_tick = tick, "{error}");
        self.observer.dispatch_failed(&error);
        false
    }

    pub fn diagnostics(&self) -> SchedulerDiagnostics {
        SchedulerDiagnostics {
            queue_size: self.queue.len(),
            last_scheduled_tick: self.last_scheduled_tick,
            last_processed_tick: self.last_processed_tick,
            dispatched_total: self.dispatched_total,
            dropped_total: self.dropped_total,
            dispatch_failures: self.dispatch_failures,
        }
    }
}

impl<P: Send + 'static> EventScheduler<P> {
    /// Drive a shared scheduler from the bus Tick channel
    ///
    /// Ticks with `is_playing == false` (pause, stop and seek notifications)
    /// never release events. The dispatch callback must not lock the same
    /// scheduler; schedule follow-up events from a separate tick subscriber.
    pub fn attach(this: &Arc<Mutex<Self>>, bus: &EventBus) -> Subscription {
        let scheduler = Arc::clone(this);
        bus.subscribe_ticks(move |tick| {
            if !tick.is_playing {
                return;
            }
            lock_or_recover(&scheduler).on_tick(tick);
        })
    }
}
