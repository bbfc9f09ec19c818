// Scheduler module - Tick-addressed event dispatch

mod event_scheduler;
mod queue;

pub use event_scheduler::{DispatchFn, DispatchReport, EventScheduler, SchedulerDiagnostics};
pub use queue::{EventId, EventQueue, ScheduledEvent};
