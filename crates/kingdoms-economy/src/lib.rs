//! The producer/consumer economy behind each kingdom.
//!
//! This crate owns everything that runs inside a single kingdom: the shared
//! resource counters, the seven agents that trade through them, the army's
//! strength, and the kingdom lifecycle that spawns and stops the agent
//! tasks. Battles between kingdoms live in `kingdoms-core`.
//!
//! # Modules
//!
//! - [`agent`] -- Agent variants and the shared drive loop ([`Agent`])
//! - [`army`] -- Army strength, defeat flag, combat-strength aggregate
//! - [`config`] -- Agent intervals and shutdown timing ([`EconomyConfig`])
//! - [`counter`] -- Atomic resource counters with blocking consume
//! - [`dice`] -- Injectable random source ([`Dice`], [`SeededDice`], test doubles)
//! - [`error`] -- Lifecycle errors ([`KingdomError`])
//! - [`kingdom`] -- Kingdom construction, start/stop, manual stepping
//! - [`signal`] -- Cooperative cancellation ([`RunSignal`])

pub mod agent;
pub mod army;
pub mod config;
pub mod counter;
pub mod dice;
pub mod error;
pub mod kingdom;
pub mod signal;

pub use agent::{Agent, CycleOutcome, Workshop};
pub use army::{ArmyState, CombatStrength};
pub use config::EconomyConfig;
pub use counter::ResourceCounter;
pub use dice::{Dice, Factor, MidpointDice, ScriptedDice, SeedSource, SeededDice};
pub use error::KingdomError;
pub use kingdom::{Kingdom, KingdomPhase, ShutdownReport, Stock};
pub use signal::RunSignal;
