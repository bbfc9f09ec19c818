//! Synchronous publish/subscribe between the transport and its clients.
//!
//! - `Command` channel: clients → `TimeAuthority`
//! - `Tick` channel: `TimeAuthority` → scheduler, widgets and other listeners
//!
//! Handlers run on the publisher's thread, in subscription order.

mod channel;
mod event_bus;

pub use channel::{Channel, Subscription};
pub use event_bus::{BusMessage, BusStats, EventBus, validate_tick};
