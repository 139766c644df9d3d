//! Army strength, defeat flag, and the kingdom's combat-strength aggregate.
//!
//! Two distinct numbers describe a kingdom's military:
//!
//! - [`CombatStrength`] is the kingdom-level aggregate. Only successful
//!   army training raises it, and nothing ever lowers it.
//! - [`ArmyState::strength`] is the army's own value. Training raises it and
//!   battle damage lowers it, clamped at zero.
//!
//! Both are written by the kingdom's army task and read (or damaged) by the
//! war scheduler. Every field is a single atomic, so no reading or write
//! ever needs a wider lock.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// The army's own strength and its one-way defeated flag.
#[derive(Debug, Default)]
pub struct ArmyState {
    strength: AtomicU32,
    defeated: AtomicBool,
}

impl ArmyState {
    /// A fresh army with zero strength.
    pub const fn new() -> Self {
        Self::with_strength(0)
    }

    /// An army that starts with `strength`.
    pub const fn with_strength(strength: u32) -> Self {
        Self {
            strength: AtomicU32::new(strength),
            defeated: AtomicBool::new(false),
        }
    }

    /// Current strength.
    pub fn strength(&self) -> u32 {
        self.strength.load(Ordering::Acquire)
    }

    /// Add `amount` to the strength (saturating). Returns the new strength.
    pub fn strengthen(&self, amount: u32) -> u32 {
        let previous = self
            .strength
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(amount))
            })
            .unwrap_or_else(|current| current);
        previous.saturating_add(amount)
    }

    /// Subtract `damage` from the strength, flooring at zero. Returns the
    /// new strength.
    pub fn reduce(&self, damage: u32) -> u32 {
        let previous = self
            .strength
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(damage))
            })
            .unwrap_or_else(|current| current);
        previous.saturating_sub(damage)
    }

    /// Whether this army has been defeated.
    pub fn is_defeated(&self) -> bool {
        self.defeated.load(Ordering::Acquire)
    }

    /// Mark the army defeated. The flag never clears.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn mark_defeated(&self) -> bool {
        !self.defeated.swap(true, Ordering::AcqRel)
    }
}

/// A kingdom's monotonically increasing military aggregate.
#[derive(Debug, Default)]
pub struct CombatStrength(AtomicU32);

impl CombatStrength {
    /// Start at zero.
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Current aggregate.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the aggregate by `amount` (saturating). Returns the new value.
    pub fn raise(&self, amount: u32) -> u32 {
        let previous = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(amount))
            })
            .unwrap_or_else(|current| current);
        previous.saturating_add(amount)
    }
}
