//! Cooperative run signal shared by a group of tasks.
//!
//! A kingdom's agents and the war scheduler each loop "while active". The
//! [`RunSignal`] carries that flag together with a wake-up so that clearing
//! it interrupts every sleep and every blocked consume immediately, instead
//! of at the end of the current wait.
//!
//! The flag is an [`AtomicBool`] so the hot-path check is lock-free; the
//! wake-up is a [`Notify`] broadcast.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Active flag plus broadcast wake-up for cooperative cancellation.
#[derive(Debug)]
pub struct RunSignal {
    /// Whether the owning group should keep running.
    active: AtomicBool,

    /// Woken (broadcast) when the signal is halted.
    halted: Notify,
}

impl Default for RunSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSignal {
    /// Create an active signal.
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            halted: Notify::const_new(),
        }
    }

    /// Whether the group should keep running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Clear the flag and wake every waiter. Idempotent.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn halt(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::AcqRel);
        self.halted.notify_waiters();
        was_active
    }

    /// Resolve once the signal has been halted.
    pub async fn halted(&self) {
        loop {
            let notified = self.halted.notified();
            let mut notified = std::pin::pin!(notified);
            // Register before checking the flag so a concurrent halt between
            // the check and the await is not lost.
            notified.as_mut().enable();
            if !self.is_active() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `duration` unless halted first.
    ///
    /// Returns `true` if the full duration elapsed with the signal still
    /// active, `false` if the sleep was interrupted or the signal was
    /// already halted.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if !self.is_active() {
            return false;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => self.is_active(),
            () = self.halted() => false,
        }
    }
}
