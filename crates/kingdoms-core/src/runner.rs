//! The top-level simulation sequence.
//!
//! [`run_simulation`] drives one complete run:
//!
//! 1. Build both kingdoms from the master seed and start their agents.
//! 2. Declare and start the war.
//! 3. Wait for the war to end, bounded by `war.max_duration_ms` when set.
//! 4. Let the kingdoms run on for `shutdown.linger_ms`.
//! 5. Stop both kingdoms (bounded joins) and the war.
//!
//! The run never ends early on its own apart from the war outcome or the
//! time limit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use kingdoms_economy::{Kingdom, KingdomError, SeedSource, ShutdownReport, Stock};
use kingdoms_types::{Narration, NarrationSink};

use crate::config::SimulationConfig;
use crate::war::{Victory, War, WarError};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A kingdom refused a lifecycle transition.
    #[error("kingdom error: {source}")]
    Kingdom {
        /// The underlying kingdom error.
        #[from]
        source: KingdomError,
    },

    /// The war could not be started or ended without a victor.
    #[error("war error: {source}")]
    War {
        /// The underlying war error.
        #[from]
        source: WarError,
    },
}

/// Reason why the simulation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SimulationEndReason {
    /// One army was defeated.
    Conquest(Victory),
    /// `war.max_duration_ms` elapsed first.
    TimeLimit,
}

/// A kingdom's state once the run is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// Kingdom name.
    pub name: String,
    /// Final combat strength.
    pub combat_strength: u32,
    /// Final army strength.
    pub army_strength: u32,
    /// Whether the army was defeated.
    pub defeated: bool,
    /// Final amount of every resource.
    pub stock: Stock,
    /// How the agent tasks shut down.
    pub shutdown: ShutdownReport,
}

impl Standing {
    fn of(kingdom: &Kingdom, shutdown: ShutdownReport) -> Self {
        Self {
            name: kingdom.name().to_owned(),
            combat_strength: kingdom.combat_strength(),
            army_strength: kingdom.army().strength(),
            defeated: kingdom.army().is_defeated(),
            stock: kingdom.stock(),
            shutdown,
        }
    }
}

/// Result of the simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// Total battles fought.
    pub battles: u64,
    /// Both kingdoms, in configuration order.
    pub final_standings: [Standing; 2],
    /// When the run began.
    pub started_at: DateTime<Utc>,
    /// When the run finished shutting down.
    pub ended_at: DateTime<Utc>,
}

/// Run two kingdoms and their war to completion.
///
/// Requires a tokio runtime. Narration goes to `sink`.
pub async fn run_simulation(
    config: &SimulationConfig,
    sink: Arc<dyn NarrationSink>,
) -> Result<SimulationResult, RunnerError> {
    let started_at = Utc::now();
    let economy = config.economy_config();
    let mut seeds = SeedSource::new(config.world.seed);
    let [first_name, second_name] = &config.world.kingdom_names;

    let first = Arc::new(Kingdom::new(
        first_name.as_str(),
        &economy,
        Arc::clone(&sink),
        &mut seeds,
    ));
    let second = Arc::new(Kingdom::new(
        second_name.as_str(),
        &economy,
        Arc::clone(&sink),
        &mut seeds,
    ));
    let war = War::new(
        Arc::clone(&first),
        Arc::clone(&second),
        &config.war,
        economy.join_timeout(),
        Box::new(seeds.next_dice()),
        Arc::clone(&sink),
    );

    info!(
        seed = ?config.world.seed,
        first = %first.name(),
        second = %second.name(),
        "simulation starting"
    );
    launch(&first, &second, &war).await?;

    let outcome = await_outcome(&war, config).await;
    if outcome.is_ok() {
        tokio::time::sleep(config.shutdown.linger()).await;
    }

    let first_shutdown = first.stop().await;
    let second_shutdown = second.stop().await;
    war.stop().await;
    sink.record(Narration::SimulationEnded);

    let result = SimulationResult {
        end_reason: outcome?,
        battles: war.battles(),
        final_standings: [
            Standing::of(&first, first_shutdown),
            Standing::of(&second, second_shutdown),
        ],
        started_at,
        ended_at: Utc::now(),
    };
    log_simulation_end(&result);
    Ok(result)
}

/// Start both kingdoms and then the war. On failure, whatever already
/// started is stopped again before the error is returned.
async fn launch(first: &Kingdom, second: &Kingdom, war: &War) -> Result<(), RunnerError> {
    let started = first
        .start()
        .and_then(|()| second.start())
        .map_err(RunnerError::from)
        .and_then(|()| war.start().map_err(RunnerError::from));
    if let Err(error) = started {
        warn!(%error, "simulation failed to start; stopping what was started");
        first.stop().await;
        second.stop().await;
        war.stop().await;
        return Err(error);
    }
    Ok(())
}

async fn await_outcome(
    war: &War,
    config: &SimulationConfig,
) -> Result<SimulationEndReason, WarError> {
    let Some(limit) = config.war.max_duration() else {
        return war.await_end().await.map(SimulationEndReason::Conquest);
    };

    if let Ok(outcome) = tokio::time::timeout(limit, war.await_end()).await {
        outcome.map(SimulationEndReason::Conquest)
    } else {
        warn!(
            limit_ms = config.war.max_duration_ms,
            battles = war.battles(),
            "war time limit reached"
        );
        war.stop().await;
        Ok(SimulationEndReason::TimeLimit)
    }
}

/// Log a summary of the simulation result.
pub fn log_simulation_end(result: &SimulationResult) {
    let winner = match &result.end_reason {
        SimulationEndReason::Conquest(victory) => Some(victory.winner_name.as_str()),
        SimulationEndReason::TimeLimit => None,
    };
    let [first, second] = &result.final_standings;
    info!(
        winner,
        battles = result.battles,
        first_combat = first.combat_strength,
        first_army = first.army_strength,
        second_combat = second.combat_strength,
        second_army = second.army_strength,
        elapsed_ms = result
            .ended_at
            .signed_duration_since(result.started_at)
            .num_milliseconds(),
        "Simulation ended"
    );
    for standing in &result.final_standings {
        if standing.shutdown.timed_out > 0 {
            warn!(
                kingdom = %standing.name,
                timed_out = standing.shutdown.timed_out,
                "agent tasks had to be aborted"
            );
        }
    }
}
