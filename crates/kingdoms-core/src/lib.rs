//! Battles, the war scheduler, and simulation orchestration for the
//! Kingdoms simulation.
//!
//! This crate sits on top of `kingdoms-economy`: it pits two running
//! kingdoms against each other, decides battles, and sequences a whole run
//! from start-up to shutdown.
//!
//! # Modules
//!
//! - [`battle`] -- Pure battle resolution ([`resolve_battle`])
//! - [`config`] -- YAML configuration ([`SimulationConfig`])
//! - [`narrator`] -- Narration as `tracing` events ([`TracingSink`])
//! - [`runner`] -- The full run ([`run_simulation`])
//! - [`war`] -- The war scheduler task ([`War`])

pub mod battle;
pub mod config;
pub mod narrator;
pub mod runner;
pub mod war;

pub use battle::{BattleOutcome, BattleReport, Belligerent, resolve_battle};
pub use config::{ConfigError, LogFormat, SimulationConfig};
pub use narrator::TracingSink;
pub use runner::{
    RunnerError, SimulationEndReason, SimulationResult, Standing, log_simulation_end,
    run_simulation,
};
pub use war::{Victory, War, WarError, WarPhase};
