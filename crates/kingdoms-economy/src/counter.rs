//! Thread-safe resource counters with blocking consume.
//!
//! A [`ResourceCounter`] is a named, non-negative amount shared by every
//! agent of one kingdom that produces into or consumes from it.
//!
//! # Atomicity
//!
//! The amount is a single [`AtomicU32`]. Both `produce` and the
//! check-and-subtract inside `consume` are one read-modify-write on it, so
//! two consumers can never over-draw the same counter and the amount is
//! never observed below zero. The type makes a negative amount
//! unrepresentable; a subtraction that would underflow simply does not
//! happen.
//!
//! # Waiting
//!
//! A consumer that finds the amount short parks on a [`Notify`] that every
//! produce broadcasts to, then re-checks. Which of several waiters wins a
//! freshly produced batch is unspecified.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::Notify;

use kingdoms_types::{Actor, Narration, NarrationSink, Resource};

use crate::signal::RunSignal;

/// A named, non-negative resource store with blocking consume.
pub struct ResourceCounter {
    /// Which resource this counter holds.
    resource: Resource,

    /// Current amount.
    amount: AtomicU32,

    /// Broadcast on every produce.
    restocked: Notify,

    /// Where produce/consume narration goes.
    sink: Arc<dyn NarrationSink>,
}

impl core::fmt::Debug for ResourceCounter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceCounter")
            .field("resource", &self.resource)
            .field("amount", &self.amount())
            .finish_non_exhaustive()
    }
}

impl ResourceCounter {
    /// Create an empty counter.
    pub fn new(resource: Resource, sink: Arc<dyn NarrationSink>) -> Self {
        Self::with_amount(resource, 0, sink)
    }

    /// Create a counter holding `amount` units.
    pub fn with_amount(resource: Resource, amount: u32, sink: Arc<dyn NarrationSink>) -> Self {
        Self {
            resource,
            amount: AtomicU32::new(amount),
            restocked: Notify::new(),
            sink,
        }
    }

    /// Which resource this counter holds.
    pub const fn resource(&self) -> Resource {
        self.resource
    }

    /// Atomic snapshot of the current amount.
    pub fn amount(&self) -> u32 {
        self.amount.load(Ordering::Acquire)
    }

    /// Add `count` units and wake every blocked consumer.
    ///
    /// Saturates at `u32::MAX`. Producing zero is a no-op. Returns the new
    /// total.
    pub fn produce(&self, count: u32, producer: &Actor) -> u32 {
        if count == 0 {
            return self.amount();
        }

        let previous = self
            .amount
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(count))
            })
            .unwrap_or_else(|current| current);
        let total = previous.saturating_add(count);

        self.sink.record(Narration::Produced {
            actor: producer.clone(),
            resource: self.resource,
            count,
            total,
        });
        self.restocked.notify_waiters();
        total
    }

    /// Remove `count` units if that many are available right now.
    ///
    /// Returns the remaining amount on success.
    pub fn try_consume(&self, count: u32) -> Option<u32> {
        self.amount
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(count)
            })
            .ok()
            .map(|previous| previous.saturating_sub(count))
    }

    /// Wait until `count` units are available, then remove them.
    ///
    /// Returns `true` once the units have been taken. Returns `false`
    /// without touching the amount if `signal` is halted while waiting (or
    /// was already halted before any units were available).
    pub async fn consume(&self, count: u32, consumer: &Actor, signal: &RunSignal) -> bool {
        loop {
            let restocked = self.restocked.notified();
            let mut restocked = std::pin::pin!(restocked);
            // Register for the next produce before looking at the amount so
            // a produce landing between the check and the await still wakes
            // this consumer.
            restocked.as_mut().enable();

            if let Some(remaining) = self.try_consume(count) {
                self.sink.record(Narration::Consumed {
                    actor: consumer.clone(),
                    resource: self.resource,
                    count,
                    remaining,
                });
                return true;
            }

            if !signal.is_active() {
                return false;
            }

            self.sink.record(Narration::AwaitingResource {
                actor: consumer.clone(),
                resource: self.resource,
                wanted: count,
                available: self.amount(),
            });

            // A restock wins a tie with the halt and is re-checked above.
            tokio::select! {
                biased;
                () = &mut restocked => {}
                () = signal.halted() => return false,
            }
        }
    }
}
