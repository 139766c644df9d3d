//! Random sources for agents and the war scheduler.
//!
//! Every random decision in the simulation goes through one primitive,
//! [`Dice::roll`], an inclusive uniform integer draw. Higher-level draws are
//! built on top of it:
//!
//! - probabilities are rolls over `0..=9999` compared against basis points
//!   ([`chance`]);
//! - continuous multipliers in `[0.8, 1.2]` are per-mille rolls carried as
//!   exact decimals ([`Factor`]);
//! - a fair coin is `roll(0, 1)`.
//!
//! Keeping a single primitive means a test can pin the whole simulation with
//! [`ScriptedDice`] or [`MidpointDice`], and every entity can own an
//! independent [`SeededDice`] derived from one process-level [`SeedSource`].

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use kingdoms_types::Conditions;

/// Denominator for probabilities expressed in basis points.
pub const BASIS_POINTS: u32 = 10_000;

/// Lowest multiplier a [`Factor`] can take, in per mille.
pub const FACTOR_MIN_PERMILLE: u32 = 800;

/// Highest multiplier a [`Factor`] can take, in per mille.
pub const FACTOR_MAX_PERMILLE: u32 = 1200;

/// Above this a factor is narrated as favorable (or excellent training).
pub const FAVORABLE_ABOVE_PERMILLE: u32 = 1100;

/// Below this a factor is narrated as unfavorable.
pub const UNFAVORABLE_BELOW_PERMILLE: u32 = 900;

/// An inclusive uniform integer random source.
pub trait Dice: Send {
    /// Draw an integer uniformly from `low..=high`.
    ///
    /// When `high <= low` the draw is degenerate and `low` is returned.
    fn roll(&mut self, low: u32, high: u32) -> u32;
}

impl<D: Dice + ?Sized> Dice for Box<D> {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        (**self).roll(low, high)
    }
}

/// Return `true` with probability `basis_points / 10_000`.
pub fn chance(dice: &mut dyn Dice, basis_points: u32) -> bool {
    dice.roll(0, BASIS_POINTS.saturating_sub(1)) < basis_points
}

/// Flip a fair coin.
pub fn coin(dice: &mut dyn Dice) -> bool {
    dice.roll(0, 1) == 1
}

// ---------------------------------------------------------------------------
// Factor
// ---------------------------------------------------------------------------

/// A random multiplier in `[0.8, 1.2]` with per-mille resolution.
///
/// Used for army training effectiveness and per-battle factors. Applying a
/// factor floors the exact decimal product, so `Factor::UNIT.apply(x) == x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Factor {
    permille: u32,
}

impl Factor {
    /// The neutral multiplier, exactly 1.0.
    pub const UNIT: Self = Self { permille: 1000 };

    /// Build a factor from a per-mille value (1000 = 1.0).
    pub const fn from_permille(permille: u32) -> Self {
        Self { permille }
    }

    /// Draw a factor uniformly from `[0.8, 1.2]`.
    pub fn draw(dice: &mut dyn Dice) -> Self {
        Self {
            permille: dice.roll(FACTOR_MIN_PERMILLE, FACTOR_MAX_PERMILLE),
        }
    }

    /// The factor in per mille.
    pub const fn permille(self) -> u32 {
        self.permille
    }

    /// The factor as an exact decimal.
    pub fn as_decimal(self) -> Decimal {
        Decimal::new(i64::from(self.permille), 3)
    }

    /// `floor(value * factor)`, saturating at `u32::MAX`.
    pub fn apply(self, value: u32) -> u32 {
        Decimal::from(value)
            .checked_mul(self.as_decimal())
            .and_then(|product| product.floor().to_u32())
            .unwrap_or(u32::MAX)
    }

    /// Whether this factor is notable enough to narrate.
    pub const fn conditions(self) -> Option<Conditions> {
        if self.permille > FAVORABLE_ABOVE_PERMILLE {
            Some(Conditions::Favorable)
        } else if self.permille < UNFAVORABLE_BELOW_PERMILLE {
            Some(Conditions::Unfavorable)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// Production dice backed by a small, fast, seedable PRNG.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: SmallRng,
}

impl SeededDice {
    /// Create dice with a fixed seed. Equal seeds give equal roll sequences.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Create dice seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }
}

impl Dice for SeededDice {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.rng.random_range(low..=high)
    }
}

/// Dice that always land in the middle of the range (rounding down).
///
/// With these dice every factor is exactly 1.0, every probability check
/// against less than 50% fails, and every yield is its range midpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct MidpointDice;

impl MidpointDice {
    /// Midpoint of `low..=high`, rounding down.
    pub const fn midpoint(low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        low.saturating_add(high.saturating_sub(low) / 2)
    }
}

impl Dice for MidpointDice {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        Self::midpoint(low, high)
    }
}

/// Dice that replay a fixed sequence of rolls.
///
/// Each scripted value is clamped into the requested range. Once the script
/// runs out, rolls fall back to the range midpoint.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    script: VecDeque<u32>,
}

impl ScriptedDice {
    /// Create dice that will replay `rolls` in order.
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: rolls.into_iter().collect(),
        }
    }

    /// Number of scripted rolls not yet used.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        match self.script.pop_front() {
            Some(value) if low <= high => value.clamp(low, high),
            Some(_) | None => MidpointDice::midpoint(low, high),
        }
    }
}

/// Process-level seed source handing out independent dice.
///
/// Each agent and the war scheduler get their own [`SeededDice`] so they
/// never contend for a shared generator. With a fixed master seed the whole
/// hand-out sequence is reproducible.
#[derive(Debug, Clone)]
pub struct SeedSource {
    master: SmallRng,
}

impl SeedSource {
    /// Create a seed source. `None` seeds the master from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let master = seed.map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
        Self { master }
    }

    /// Hand out the next independent dice.
    pub fn next_dice(&mut self) -> SeededDice {
        SeededDice::from_seed(self.master.random())
    }
}
