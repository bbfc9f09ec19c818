// Typed publish/subscribe channel
//
// Delivery is synchronous and in subscription order. The subscriber list is
// copied before handlers run, so handlers may publish, subscribe or
// unsubscribe (themselves or others) while a dispatch is in progress.

use crate::sync::{lock_or_recover, panic_message};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Validator<T> = Arc<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

struct Slot<T> {
    id: u64,
    active: Arc<AtomicBool>,
    handler: Handler<T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: Arc::clone(&self.active),
            handler: Arc::clone(&self.handler),
        }
    }
}

struct ChannelInner<T> {
    name: &'static str,
    slots: Mutex<Vec<Slot<T>>>,
    subscriber_count: AtomicUsize,
    next_id: AtomicU64,
    published: AtomicU64,
    validator: Mutex<Option<Validator<T>>>,
    validation_failures: AtomicU64,
    handler_panics: AtomicU64,
}

/// Type-erased removal so `Subscription` does not carry the payload type
trait SlotRemover: Send + Sync {
    fn remove(&self, id: u64);
}

impl<T: 'static> SlotRemover for ChannelInner<T> {
    fn remove(&self, id: u64) {
        let mut slots = lock_or_recover(&self.slots);
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        if slots.len() < before {
            self.subscriber_count.store(slots.len(), Ordering::Relaxed);
        }
    }
}

/// Unsubscribe capability returned by [`Channel::subscribe`]
///
/// Dropping it does not unsubscribe. `unsubscribe` is idempotent and may be
/// called from inside any handler, including the subscribed one.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    channel: Weak<dyn SlotRemover>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            if let Some(channel) = self.channel.upgrade() {
                channel.remove(self.id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// One typed channel of the event bus
pub struct Channel<T> {
    inner: Arc<ChannelInner<T>>,
}

impl<T: 'static> Channel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                name,
                slots: Mutex::new(Vec::new()),
                subscriber_count: AtomicUsize::new(0),
                next_id: AtomicU64::new(0),
                published: AtomicU64::new(0),
                validator: Mutex::new(None),
                validation_failures: AtomicU64::new(0),
                handler_panics: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Register a handler; it receives every payload published afterwards
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));

        {
            let mut slots = lock_or_recover(&self.inner.slots);
            slots.push(Slot {
                id,
                active: Arc::clone(&active),
                handler: Arc::new(handler),
            });
            self.inner
                .subscriber_count
                .store(slots.len(), Ordering::Relaxed);
        }

        let inner: Arc<dyn SlotRemover> = self.inner.clone();
        Subscription {
            id,
            active,
            channel: Arc::downgrade(&inner),
        }
    }

    /// Deliver `payload` to the current subscribers, in subscription order
    ///
    /// A panicking handler is logged and skipped; the others still run.
    pub fn publish(&self, payload: &T) {
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        self.validate(payload);

        let snapshot: Vec<Slot<T>> = lock_or_recover(&self.inner.slots).clone();
        for slot in snapshot {
            // Unsubscribed earlier in this same dispatch
            if !slot.active.load(Ordering::Acquire) {
                continue;
            }
            let handler = &slot.handler;
            if let Err(panic_payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                self.inner.handler_panics.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    channel = self.inner.name,
                    subscriber = slot.id,
                    reason = %panic_message(panic_payload.as_ref()),
                    "bus subscriber panicked"
                );
            }
        }
    }

    /// Install a diagnostic check run before each delivery
    ///
    /// Failures are logged and counted; the payload is still delivered.
    pub fn set_validator<F>(&self, validator: F)
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        *lock_or_recover(&self.inner.validator) = Some(Arc::new(validator));
    }

    pub fn clear_validator(&self) {
        *lock_or_recover(&self.inner.validator) = None;
    }

    fn validate(&self, payload: &T) {
        let validator = lock_or_recover(&self.inner.validator).clone();
        let Some(validator) = validator else {
            return;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| validator(payload)));
        let reason = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(reason)) => reason,
            Err(panic_payload) => panic_message(panic_payload.as_ref()),
        };
        self.inner.validation_failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(channel = self.inner.name, %reason, "payload validation failed");
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count.load(Ordering::Relaxed)
    }

    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    pub fn validation_failures(&self) -> u64 {
        self.inner.validation_failures.load(Ordering::Relaxed)
    }

    pub fn handler_panics(&self) -> u64 {
        self.inner.handler_panics.load(Ordering::Relaxed)
    }
}
