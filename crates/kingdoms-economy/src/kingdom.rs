//! A kingdom: eight resource counters, an army, and seven agents.
//!
//! Construction wires everything together but spawns nothing. The lifecycle
//! is `Idle -> Running -> Stopped`:
//!
//! - [`Kingdom::start`] spawns one tokio task per agent.
//! - [`Kingdom::stop`] halts the kingdom's [`RunSignal`], then joins every
//!   task with a per-task timeout and aborts any that overrun.
//! - While idle, [`Kingdom::step`] runs a single cycle of one agent in place.
//!   Tests use this to drive the economy deterministically.
//!
//! Stopping one kingdom never touches another kingdom's signal.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use kingdoms_types::{AgentKind, KingdomId, Narration, NarrationSink, Resource};

use crate::agent::{Agent, CycleOutcome, Workshop};
use crate::army::{ArmyState, CombatStrength};
use crate::config::EconomyConfig;
use crate::counter::ResourceCounter;
use crate::dice::{Dice, SeedSource};
use crate::error::KingdomError;
use crate::signal::RunSignal;

/// Snapshot of all eight counters.
pub type Stock = BTreeMap<Resource, u32>;

/// Where a kingdom is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KingdomPhase {
    /// Built, agents not yet spawned.
    Idle,
    /// Agent tasks are running.
    Running,
    /// Halted; terminal.
    Stopped,
}

/// What happened to the agent tasks during [`Kingdom::stop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Tasks that finished within the join timeout.
    pub exited: usize,
    /// Tasks that overran the join timeout and were aborted.
    pub timed_out: usize,
}

enum Lifecycle {
    Idle(Vec<Agent>),
    Running(Vec<JoinHandle<u64>>),
    Stopped,
}

/// The eight counters of one kingdom.
#[derive(Debug)]
struct Stockpile {
    coal: Arc<ResourceCounter>,
    ore: Arc<ResourceCounter>,
    metal: Arc<ResourceCounter>,
    weapons: Arc<ResourceCounter>,
    jewelry: Arc<ResourceCounter>,
    food: Arc<ResourceCounter>,
    happiness: Arc<ResourceCounter>,
    tactics: Arc<ResourceCounter>,
}

impl Stockpile {
    fn empty(sink: &Arc<dyn NarrationSink>) -> Self {
        let counter = |resource| Arc::new(ResourceCounter::new(resource, Arc::clone(sink)));
        Self {
            coal: counter(Resource::Coal),
            ore: counter(Resource::Ore),
            metal: counter(Resource::Metal),
            weapons: counter(Resource::Weapons),
            jewelry: counter(Resource::Jewelry),
            food: counter(Resource::Food),
            happiness: counter(Resource::Happiness),
            tactics: counter(Resource::Tactics),
        }
    }

    const fn get(&self, resource: Resource) -> &Arc<ResourceCounter> {
        match resource {
            Resource::Coal => &self.coal,
            Resource::Ore => &self.ore,
            Resource::Metal => &self.metal,
            Resource::Weapons => &self.weapons,
            Resource::Jewelry => &self.jewelry,
            Resource::Food => &self.food,
            Resource::Happiness => &self.happiness,
            Resource::Tactics => &self.tactics,
        }
    }
}

/// One kingdom's economy and army.
pub struct Kingdom {
    id: KingdomId,
    name: String,
    signal: Arc<RunSignal>,
    stockpile: Stockpile,
    army: Arc<ArmyState>,
    combat: Arc<CombatStrength>,
    join_timeout: Duration,
    sink: Arc<dyn NarrationSink>,
    lifecycle: Mutex<Lifecycle>,
}

impl core::fmt::Debug for Kingdom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kingdom")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("phase", &self.phase())
            .field("combat_strength", &self.combat_strength())
            .field("army_strength", &self.army.strength())
            .finish_non_exhaustive()
    }
}

impl Kingdom {
    /// Build a kingdom whose agents each draw their own dice from `seeds`.
    pub fn new(
        name: impl Into<String>,
        config: &EconomyConfig,
        sink: Arc<dyn NarrationSink>,
        seeds: &mut SeedSource,
    ) -> Self {
        Self::with_dice(name, config, sink, |_| -> Box<dyn Dice> {
            Box::new(seeds.next_dice())
        })
    }

    /// Build a kingdom, asking `dice_for` for each agent's random source.
    pub fn with_dice(
        name: impl Into<String>,
        config: &EconomyConfig,
        sink: Arc<dyn NarrationSink>,
        mut dice_for: impl FnMut(AgentKind) -> Box<dyn Dice>,
    ) -> Self {
        let name = name.into();
        let stockpile = Stockpile::empty(&sink);
        let army = Arc::new(ArmyState::new());
        let combat = Arc::new(CombatStrength::new());

        let agents = AgentKind::ALL
            .into_iter()
            .map(|kind| {
                let workshop = workshop_for(kind, &stockpile, &army, &combat);
                Agent::new(&name, workshop, dice_for(kind), config, Arc::clone(&sink))
            })
            .collect();

        Self {
            id: KingdomId::new(),
            name,
            signal: Arc::new(RunSignal::new()),
            stockpile,
            army,
            combat,
            join_timeout: config.join_timeout(),
            sink,
            lifecycle: Mutex::new(Lifecycle::Idle(agents)),
        }
    }

    /// Unique identity.
    pub const fn id(&self) -> KingdomId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> KingdomPhase {
        match *self.lifecycle() {
            Lifecycle::Idle(_) => KingdomPhase::Idle,
            Lifecycle::Running(_) => KingdomPhase::Running,
            Lifecycle::Stopped => KingdomPhase::Stopped,
        }
    }

    /// Whether the agent tasks are running.
    pub fn is_running(&self) -> bool {
        self.phase() == KingdomPhase::Running
    }

    /// The kingdom's aggregate combat strength.
    pub fn combat_strength(&self) -> u32 {
        self.combat.get()
    }

    /// The army's own strength and defeated flag.
    pub const fn army(&self) -> &Arc<ArmyState> {
        &self.army
    }

    /// The counter holding `resource`.
    pub const fn counter(&self, resource: Resource) -> &Arc<ResourceCounter> {
        self.stockpile.get(resource)
    }

    /// Current amount of every resource.
    pub fn stock(&self) -> Stock {
        Resource::ALL
            .into_iter()
            .map(|resource| (resource, self.counter(resource).amount()))
            .collect()
    }

    /// Spawn every agent. Requires a tokio runtime.
    ///
    /// Refused with [`KingdomError::AgentBusy`] while a [`Kingdom::step`] is
    /// still running one of the agents.
    pub fn start(&self) -> Result<(), KingdomError> {
        let mut lifecycle = self.lifecycle();
        let agents = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle(agents) => {
                // An agent checked out by `step` would never be spawned.
                if let Some(kind) = missing_agent(&agents) {
                    *lifecycle = Lifecycle::Idle(agents);
                    return Err(KingdomError::AgentBusy {
                        kingdom: self.name.clone(),
                        kind,
                    });
                }
                agents
            }
            running @ Lifecycle::Running(_) => {
                *lifecycle = running;
                return Err(KingdomError::AlreadyStarted {
                    kingdom: self.name.clone(),
                });
            }
            Lifecycle::Stopped => {
                return Err(KingdomError::Stopped {
                    kingdom: self.name.clone(),
                });
            }
        };

        let handles = agents
            .into_iter()
            .map(|agent| tokio::spawn(agent.drive(Arc::clone(&self.signal))))
            .collect();
        *lifecycle = Lifecycle::Running(handles);
        drop(lifecycle);

        info!(kingdom = %self.name, id = %self.id, "kingdom started");
        self.sink.record(Narration::KingdomStarted {
            kingdom: self.name.clone(),
        });
        Ok(())
    }

    /// Halt every agent and wait (bounded) for their tasks to finish.
    ///
    /// Tasks are joined concurrently, each with the configured join
    /// timeout. Stragglers are aborted and counted in
    /// [`ShutdownReport::timed_out`]. Stopping an idle
    /// kingdom discards its agents. Calling `stop` again returns an empty
    /// report.
    pub async fn stop(&self) -> ShutdownReport {
        self.signal.halt();
        let previous = std::mem::replace(&mut *self.lifecycle(), Lifecycle::Stopped);
        let Lifecycle::Running(handles) = previous else {
            return ShutdownReport::default();
        };

        let joins = handles.into_iter().map(|handle| self.join_agent(handle));
        let exits = futures::future::join_all(joins).await;
        let exited = exits.iter().filter(|exited| **exited).count();
        let report = ShutdownReport {
            exited,
            timed_out: exits.len().saturating_sub(exited),
        };

        info!(
            kingdom = %self.name,
            exited = report.exited,
            timed_out = report.timed_out,
            "kingdom stopped"
        );
        self.sink.record(Narration::KingdomStopped {
            kingdom: self.name.clone(),
            exited: report.exited,
            timed_out: report.timed_out,
        });
        report
    }

    /// Run one cycle of the `kind` agent while the kingdom is idle.
    ///
    /// The cycle may wait on a counter; halting via [`Kingdom::stop`]
    /// interrupts it.
    pub async fn step(&self, kind: AgentKind) -> Result<CycleOutcome, KingdomError> {
        let mut agent = {
            let mut lifecycle = self.lifecycle();
            match &mut *lifecycle {
                Lifecycle::Idle(agents) => {
                    let position = agents
                        .iter()
                        .position(|agent| agent.kind() == kind)
                        .ok_or_else(|| KingdomError::AgentBusy {
                            kingdom: self.name.clone(),
                            kind,
                        })?;
                    agents.swap_remove(position)
                }
                Lifecycle::Running(_) => {
                    return Err(KingdomError::Running {
                        kingdom: self.name.clone(),
                        kind,
                    });
                }
                Lifecycle::Stopped => {
                    return Err(KingdomError::Stopped {
                        kingdom: self.name.clone(),
                    });
                }
            }
        };

        let outcome = agent.run_cycle(&self.signal).await;

        // Started or stopped meanwhile: the agent is simply dropped.
        if let Lifecycle::Idle(agents) = &mut *self.lifecycle() {
            agents.push(agent);
        }
        Ok(outcome)
    }

    /// Wait for one agent task; abort it on timeout. Returns whether it
    /// exited on its own.
    async fn join_agent(&self, mut handle: JoinHandle<u64>) -> bool {
        match tokio::time::timeout(self.join_timeout, &mut handle).await {
            Ok(Ok(cycles)) => {
                debug!(kingdom = %self.name, cycles, "agent task joined");
                true
            }
            Ok(Err(error)) => {
                warn!(kingdom = %self.name, %error, "agent task failed");
                true
            }
            Err(_elapsed) => {
                handle.abort();
                warn!(
                    kingdom = %self.name,
                    timeout_ms = self.join_timeout.as_millis(),
                    "agent task did not exit in time; aborted"
                );
                false
            }
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The first agent kind not present in `agents`.
fn missing_agent(agents: &[Agent]) -> Option<AgentKind> {
    AgentKind::ALL
        .into_iter()
        .find(|kind| !agents.iter().any(|agent| agent.kind() == *kind))
}

fn workshop_for(
    kind: AgentKind,
    stockpile: &Stockpile,
    army: &Arc<ArmyState>,
    combat: &Arc<CombatStrength>,
) -> Workshop {
    match kind {
        AgentKind::Miner => Workshop::Mine {
            coal: Arc::clone(&stockpile.coal),
            ore: Arc::clone(&stockpile.ore),
        },
        AgentKind::Smith => Workshop::Smithy {
            ore: Arc::clone(&stockpile.ore),
            metal: Arc::clone(&stockpile.metal),
            weapons: Arc::clone(&stockpile.weapons),
        },
        AgentKind::Farmer => Workshop::Farm {
            food: Arc::clone(&stockpile.food),
        },
        AgentKind::Jeweler => Workshop::Atelier {
            ore: Arc::clone(&stockpile.ore),
            jewelry: Arc::clone(&stockpile.jewelry),
        },
        AgentKind::Princess => Workshop::Chambers {
            jewelry: Arc::clone(&stockpile.jewelry),
            happiness: Arc::clone(&stockpile.happiness),
        },
        AgentKind::King => Workshop::Court {
            happiness: Arc::clone(&stockpile.happiness),
            tactics: Arc::clone(&stockpile.tactics),
        },
        AgentKind::Army => Workshop::Barracks {
            weapons: Arc::clone(&stockpile.weapons),
            food: Arc::clone(&stockpile.food),
            tactics: Arc::clone(&stockpile.tactics),
            army: Arc::clone(army),
            combat: Arc::clone(combat),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kingdoms_types::{Actor, RecordingSink, SilentSink};

    use super::*;
    use crate::dice::MidpointDice;

    fn midpoint_kingdom(sink: Arc<dyn NarrationSink>) -> Kingdom {
        Kingdom::with_dice("Kingdom 1", &EconomyConfig::default(), sink, |_| -> Box<dyn Dice> {
            Box::new(MidpointDice)
        })
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let sink = Arc::new(RecordingSink::new());
        let kingdom = midpoint_kingdom(sink.clone());
        assert_eq!(kingdom.phase(), KingdomPhase::Idle);

        kingdom.start().unwrap();
        assert!(kingdom.is_running());
        assert_eq!(
            kingdom.start(),
            Err(KingdomError::AlreadyStarted {
                kingdom: String::from("Kingdom 1")
            })
        );

        let report = kingdom.stop().await;
        assert_eq!(report.exited, 7);
        assert_eq!(report.timed_out, 0);
        assert_eq!(kingdom.phase(), KingdomPhase::Stopped);
        assert!(matches!(kingdom.start(), Err(KingdomError::Stopped { .. })));
        assert_eq!(kingdom.stop().await, ShutdownReport::default());

        assert_eq!(
            sink.count(|e| matches!(e, Narration::KingdomStarted { .. })),
            1
        );
        assert_eq!(
            sink.count(|e| matches!(e, Narration::KingdomStopped { exited: 7, .. })),
            1
        );
    }

    #[tokio::test]
    async fn midpoint_economy_trains_army_by_five() {
        let kingdom = midpoint_kingdom(Arc::new(SilentSink));

        // Mine: coal 3, ore 2.
        kingdom.step(AgentKind::Miner).await.unwrap();
        // Smith: ore 2 -> metal 1 -> weapons 1.
        kingdom.step(AgentKind::Smith).await.unwrap();
        // Farm: food 5.
        kingdom.step(AgentKind::Farmer).await.unwrap();
        // Mine again, then the jeweler turns 1 ore into 1 jewelry.
        kingdom.step(AgentKind::Miner).await.unwrap();
        kingdom.step(AgentKind::Jeweler).await.unwrap();
        // Princess: jewelry 1 -> happiness 3.
        kingdom.step(AgentKind::Princess).await.unwrap();
        // King: happiness 2 -> tactics 2.
        kingdom.step(AgentKind::King).await.unwrap();
        // Army: weapons 1, food 3, tactics 1 at effectiveness 1.0.
        let outcome = kingdom.step(AgentKind::Army).await.unwrap();

        assert_eq!(outcome, CycleOutcome::Completed);
        assert_eq!(kingdom.combat_strength(), 5);
        assert_eq!(kingdom.army().strength(), 5);

        let expected: Stock = [
            (Resource::Coal, 6),
            (Resource::Ore, 1),
            (Resource::Metal, 0),
            (Resource::Weapons, 0),
            (Resource::Jewelry, 0),
            (Resource::Food, 2),
            (Resource::Happiness, 1),
            (Resource::Tactics, 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(kingdom.stock(), expected);
    }

    #[tokio::test]
    async fn step_refused_while_running() {
        let kingdom = midpoint_kingdom(Arc::new(SilentSink));
        kingdom.start().unwrap();
        assert!(matches!(
            kingdom.step(AgentKind::Farmer).await,
            Err(KingdomError::Running {
                kind: AgentKind::Farmer,
                ..
            })
        ));
        kingdom.stop().await;
        assert!(matches!(
            kingdom.step(AgentKind::Farmer).await,
            Err(KingdomError::Stopped { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_waiting_step() {
        let kingdom = Arc::new(midpoint_kingdom(Arc::new(SilentSink)));
        let stepper = {
            let kingdom = Arc::clone(&kingdom);
            tokio::spawn(async move { kingdom.step(AgentKind::Army).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!stepper.is_finished());
        kingdom.stop().await;

        assert_eq!(stepper.await.unwrap(), Ok(CycleOutcome::Interrupted));
        assert_eq!(kingdom.army().strength(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_refused_while_an_agent_is_stepping() {
        let kingdom = Arc::new(midpoint_kingdom(Arc::new(SilentSink)));
        let stepper = {
            let kingdom = Arc::clone(&kingdom);
            tokio::spawn(async move { kingdom.step(AgentKind::Army).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!stepper.is_finished());
        assert_eq!(
            kingdom.start(),
            Err(KingdomError::AgentBusy {
                kingdom: String::from("Kingdom 1"),
                kind: AgentKind::Army,
            })
        );
        assert_eq!(kingdom.phase(), KingdomPhase::Idle);

        // Feed the waiting drill so the step completes and the army returns.
        let quartermaster = Actor::new("Kingdom 1", AgentKind::Smith);
        kingdom.counter(Resource::Weapons).produce(1, &quartermaster);
        kingdom.counter(Resource::Food).produce(3, &quartermaster);
        kingdom.counter(Resource::Tactics).produce(1, &quartermaster);
        assert_eq!(stepper.await.unwrap(), Ok(CycleOutcome::Completed));
        assert_eq!(kingdom.combat_strength(), 5);

        kingdom.start().unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        let report = kingdom.stop().await;
        assert_eq!(report, ShutdownReport { exited: 7, timed_out: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn running_kingdom_builds_strength_and_stops_cleanly() {
        let mut seeds = SeedSource::new(Some(7));
        let kingdom = Kingdom::new(
            "Kingdom 2",
            &EconomyConfig::default(),
            Arc::new(SilentSink),
            &mut seeds,
        );
        kingdom.start().unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        let report = kingdom.stop().await;

        assert_eq!(report, ShutdownReport { exited: 7, timed_out: 0 });
        assert!(kingdom.combat_strength() > 0);
        assert_eq!(kingdom.combat_strength(), kingdom.army().strength());
        assert_eq!(kingdom.stock().len(), 8);
    }
}
