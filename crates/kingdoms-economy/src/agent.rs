//! Autonomous agents and their production cycles.
//!
//! Every agent runs the same drive loop ([`Agent::drive`]):
//!
//! 1. Perform one production cycle for its [`Workshop`]. The cycle may block
//!    inside a [`ResourceCounter::consume`] call.
//! 2. Draw a jittered delay: `base ± up to 50% of base`, floored at the
//!    configured minimum (500 ms by default).
//! 3. Sleep for that delay, interruptibly.
//!
//! The loop exits cleanly when the kingdom's [`RunSignal`] is halted, whether
//! the agent was sleeping or waiting on a counter at the time. An interrupted
//! cycle is abandoned where it stood; units already consumed are not
//! returned.
//!
//! The per-kind behaviour lives entirely in the workshop match inside
//! [`Agent::run_cycle`]:
//!
//! | Kind | Consumes | Produces |
//! |------|----------|----------|
//! | Miner | -- | coal 1-5, ore 1-3 |
//! | Smith | ore 1-3 | metal `max(1, ore/2 + 0..1)`; 80%: metal 1 -> weapons 1-2 |
//! | Farmer | -- | food 3-8 (10% halved, 10% doubled) |
//! | Jeweler | ore 1 (30%: 2) | jewelry 1 (30%: 2-3) |
//! | Princess | jewelry 1 | happiness = mood 1-5 |
//! | King | happiness 1-3 | tactics 1/2/3 (20% / 70% / 10%) |
//! | Army | weapons 1-2, food 2-4, tactics 1 | strength `floor((2w + 3t) * 0.8..1.2)` |

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use kingdoms_types::{
    Actor, AgentKind, HarvestQuality, Mood, Narration, NarrationSink, Strategy,
};

use crate::army::{ArmyState, CombatStrength};
use crate::config::EconomyConfig;
use crate::counter::ResourceCounter;
use crate::dice::{Dice, FAVORABLE_ABOVE_PERMILLE, Factor, chance, coin};
use crate::signal::RunSignal;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Chance the blacksmith goes on to forge weapons (80%).
pub const FORGE_WEAPONS_BP: u32 = 8000;

/// Chance of a poor harvest (10%).
pub const POOR_HARVEST_BP: u32 = 1000;

/// Luck rolls at or above this give a bumper crop (top 10%).
pub const BUMPER_CROP_FROM: u32 = 9000;

/// Chance the jeweler attempts high-quality work (30%).
pub const MASTERWORK_BP: u32 = 3000;

/// Inspiration rolls below this give a basic strategy (20%).
pub const BASIC_STRATEGY_BELOW: u32 = 2000;

/// Inspiration rolls at or above this give a brilliant strategy (top 10%).
pub const BRILLIANT_STRATEGY_FROM: u32 = 9000;

/// Tactics an army consumes per drill.
pub const TACTICS_PER_DRILL: u32 = 1;

/// Strength contributed by each weapon consumed in a drill.
pub const STRENGTH_PER_WEAPON: u32 = 2;

/// Strength contributed by each tactic consumed in a drill.
pub const STRENGTH_PER_TACTIC: u32 = 3;

// ---------------------------------------------------------------------------
// Workshop
// ---------------------------------------------------------------------------

/// The counters an agent works with, by kind.
#[derive(Debug, Clone)]
pub enum Workshop {
    /// Miner: produces coal and ore.
    Mine {
        /// Coal output.
        coal: Arc<ResourceCounter>,
        /// Ore output.
        ore: Arc<ResourceCounter>,
    },
    /// Smith: ore in, metal and weapons out.
    Smithy {
        /// Ore input.
        ore: Arc<ResourceCounter>,
        /// Metal output (and weapons input).
        metal: Arc<ResourceCounter>,
        /// Weapons output.
        weapons: Arc<ResourceCounter>,
    },
    /// Farmer: produces food.
    Farm {
        /// Food output.
        food: Arc<ResourceCounter>,
    },
    /// Jeweler: ore in, jewelry out.
    Atelier {
        /// Ore input.
        ore: Arc<ResourceCounter>,
        /// Jewelry output.
        jewelry: Arc<ResourceCounter>,
    },
    /// Princess: jewelry in, happiness out.
    Chambers {
        /// Jewelry input.
        jewelry: Arc<ResourceCounter>,
        /// Happiness output.
        happiness: Arc<ResourceCounter>,
    },
    /// King: happiness in, tactics out.
    Court {
        /// Happiness input.
        happiness: Arc<ResourceCounter>,
        /// Tactics output.
        tactics: Arc<ResourceCounter>,
    },
    /// Army: weapons, food and tactics in, strength out.
    Barracks {
        /// Weapons input.
        weapons: Arc<ResourceCounter>,
        /// Food input.
        food: Arc<ResourceCounter>,
        /// Tactics input.
        tactics: Arc<ResourceCounter>,
        /// The army's own strength.
        army: Arc<ArmyState>,
        /// The kingdom's aggregate combat strength.
        combat: Arc<CombatStrength>,
    },
}

impl Workshop {
    /// Which kind of agent works this workshop.
    pub const fn kind(&self) -> AgentKind {
        match self {
            Self::Mine { .. } => AgentKind::Miner,
            Self::Smithy { .. } => AgentKind::Smith,
            Self::Farm { .. } => AgentKind::Farmer,
            Self::Atelier { .. } => AgentKind::Jeweler,
            Self::Chambers { .. } => AgentKind::Princess,
            Self::Court { .. } => AgentKind::King,
            Self::Barracks { .. } => AgentKind::Army,
        }
    }
}

/// How a single production cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran to completion.
    Completed,
    /// A consume was cancelled by the run signal; the cycle was abandoned.
    Interrupted,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// One autonomous worker inside a kingdom.
pub struct Agent {
    actor: Actor,
    workshop: Workshop,
    dice: Box<dyn Dice>,
    base_interval_ms: u64,
    min_delay_ms: u64,
    sink: Arc<dyn NarrationSink>,
}

impl core::fmt::Debug for Agent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Agent")
            .field("actor", &self.actor)
            .field("workshop", &self.workshop)
            .field("base_interval_ms", &self.base_interval_ms)
            .field("min_delay_ms", &self.min_delay_ms)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create an agent for `workshop` in the kingdom named `kingdom`.
    ///
    /// The base interval and delay floor come from `config`.
    pub fn new(
        kingdom: &str,
        workshop: Workshop,
        dice: Box<dyn Dice>,
        config: &EconomyConfig,
        sink: Arc<dyn NarrationSink>,
    ) -> Self {
        let kind = workshop.kind();
        Self {
            actor: Actor::new(kingdom, kind),
            workshop,
            dice,
            base_interval_ms: config.base_interval_ms(kind),
            min_delay_ms: config.min_delay_ms,
            sink,
        }
    }

    /// What this agent does.
    pub const fn kind(&self) -> AgentKind {
        self.workshop.kind()
    }

    /// The label this agent narrates under.
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Base production interval in ms.
    pub const fn base_interval_ms(&self) -> u64 {
        self.base_interval_ms
    }

    /// Draw the delay before the next cycle.
    pub fn next_delay(&mut self) -> Duration {
        jittered_delay(self.dice.as_mut(), self.base_interval_ms, self.min_delay_ms)
    }

    /// Run the agent until `signal` is halted. Returns completed cycles.
    pub async fn drive(mut self, signal: Arc<RunSignal>) -> u64 {
        debug!(actor = %self.actor, "agent started");
        let mut cycles: u64 = 0;

        while signal.is_active() {
            if self.run_cycle(&signal).await == CycleOutcome::Interrupted {
                break;
            }
            cycles = cycles.saturating_add(1);

            let delay = self.next_delay();
            if !signal.sleep(delay).await {
                break;
            }
        }

        debug!(actor = %self.actor, cycles, "agent stopped");
        cycles
    }

    /// Perform exactly one production cycle.
    pub async fn run_cycle(&mut self, signal: &RunSignal) -> CycleOutcome {
        let Self {
            actor,
            workshop,
            dice,
            sink,
            ..
        } = self;
        let dice: &mut dyn Dice = dice.as_mut();

        match workshop {
            Workshop::Mine { coal, ore } => {
                let coal_dug = dice.roll(1, 5);
                let ore_dug = dice.roll(1, 3);
                coal.produce(coal_dug, actor);
                ore.produce(ore_dug, actor);
                CycleOutcome::Completed
            }
            Workshop::Smithy { ore, metal, weapons } => {
                smith(actor, dice, signal, ore, metal, weapons).await
            }
            Workshop::Farm { food } => {
                farm(actor, dice, sink.as_ref(), food);
                CycleOutcome::Completed
            }
            Workshop::Atelier { ore, jewelry } => {
                craft_jewelry(actor, dice, sink.as_ref(), signal, ore, jewelry).await
            }
            Workshop::Chambers { jewelry, happiness } => {
                if !jewelry.consume(1, actor, signal).await {
                    return CycleOutcome::Interrupted;
                }
                let mood_factor = dice.roll(1, 5);
                let mood = match mood_factor {
                    5 => Mood::Excellent,
                    1 => Mood::Poor,
                    _ => Mood::Fair,
                };
                if mood != Mood::Fair {
                    sink.record(Narration::PrincessMood {
                        actor: actor.clone(),
                        mood,
                        happiness: mood_factor,
                    });
                }
                happiness.produce(mood_factor, actor);
                CycleOutcome::Completed
            }
            Workshop::Court { happiness, tactics } => {
                let needed = dice.roll(1, 3);
                if !happiness.consume(needed, actor, signal).await {
                    return CycleOutcome::Interrupted;
                }
                let strategy = draw_strategy(dice);
                if strategy == Strategy::Brilliant {
                    sink.record(Narration::BrilliantStrategy {
                        actor: actor.clone(),
                    });
                }
                tactics.produce(strategy.tactics(), actor);
                CycleOutcome::Completed
            }
            Workshop::Barracks {
                weapons,
                food,
                tactics,
                army,
                combat,
            } => {
                let weapons_needed = dice.roll(1, 2);
                let food_needed = dice.roll(2, 4);

                if !weapons.consume(weapons_needed, actor, signal).await
                    || !food.consume(food_needed, actor, signal).await
                    || !tactics.consume(TACTICS_PER_DRILL, actor, signal).await
                {
                    return CycleOutcome::Interrupted;
                }

                let effectiveness = Factor::draw(dice);
                let increase = drill_increase(weapons_needed, TACTICS_PER_DRILL, effectiveness);
                if effectiveness.permille() > FAVORABLE_ABOVE_PERMILLE {
                    sink.record(Narration::ExcellentTraining {
                        actor: actor.clone(),
                    });
                }

                let strength = army.strengthen(increase);
                combat.raise(increase);
                sink.record(Narration::ArmyStrengthened {
                    actor: actor.clone(),
                    increase,
                    strength,
                });
                CycleOutcome::Completed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-kind actions
// ---------------------------------------------------------------------------

async fn smith(
    actor: &Actor,
    dice: &mut dyn Dice,
    signal: &RunSignal,
    ore: &ResourceCounter,
    metal: &ResourceCounter,
    weapons: &ResourceCounter,
) -> CycleOutcome {
    let ore_needed = dice.roll(1, 3);
    if !ore.consume(ore_needed, actor, signal).await {
        return CycleOutcome::Interrupted;
    }

    // Larger batches smelt a little more efficiently.
    let metal_made = (ore_needed / 2).saturating_add(dice.roll(0, 1)).max(1);
    metal.produce(metal_made, actor);

    if chance(dice, FORGE_WEAPONS_BP) {
        if !metal.consume(1, actor, signal).await {
            return CycleOutcome::Interrupted;
        }
        let forged = dice.roll(1, 2);
        weapons.produce(forged, actor);
    }
    CycleOutcome::Completed
}

fn farm(actor: &Actor, dice: &mut dyn Dice, sink: &dyn NarrationSink, food: &ResourceCounter) {
    let base = dice.roll(3, 8);
    let luck = dice.roll(0, 9999);

    let (quality, amount) = if luck < POOR_HARVEST_BP {
        (HarvestQuality::Poor, (base / 2).max(1))
    } else if luck >= BUMPER_CROP_FROM {
        (HarvestQuality::Bumper, base.saturating_mul(2))
    } else {
        (HarvestQuality::Normal, base)
    };

    if quality != HarvestQuality::Normal {
        sink.record(Narration::Harvest {
            actor: actor.clone(),
            quality,
            amount,
        });
    }
    food.produce(amount, actor);
}

async fn craft_jewelry(
    actor: &Actor,
    dice: &mut dyn Dice,
    sink: &dyn NarrationSink,
    signal: &RunSignal,
    ore: &ResourceCounter,
    jewelry: &ResourceCounter,
) -> CycleOutcome {
    let masterwork = chance(dice, MASTERWORK_BP);
    let ore_needed = if masterwork { 2 } else { 1 };
    if !ore.consume(ore_needed, actor, signal).await {
        return CycleOutcome::Interrupted;
    }

    let pieces = if masterwork { dice.roll(2, 3) } else { 1 };
    if masterwork {
        sink.record(Narration::MasterworkJewelry {
            actor: actor.clone(),
            pieces,
        });
    }
    jewelry.produce(pieces, actor);
    CycleOutcome::Completed
}

fn draw_strategy(dice: &mut dyn Dice) -> Strategy {
    let inspiration = dice.roll(0, 9999);
    if inspiration >= BRILLIANT_STRATEGY_FROM {
        Strategy::Brilliant
    } else if inspiration < BASIC_STRATEGY_BELOW {
        Strategy::Basic
    } else {
        Strategy::Standard
    }
}

/// Strength gained from one army drill.
///
/// `floor((weapons * 2 + tactics * 3) * effectiveness)`.
pub fn drill_increase(weapons: u32, tactics: u32, effectiveness: Factor) -> u32 {
    let base = weapons
        .saturating_mul(STRENGTH_PER_WEAPON)
        .saturating_add(tactics.saturating_mul(STRENGTH_PER_TACTIC));
    effectiveness.apply(base)
}

/// `base ± roll(0, base / 2)` ms, floored at `floor_ms`.
///
/// A fair coin picks faster (subtract) or slower (add).
pub fn jittered_delay(dice: &mut dyn Dice, base_ms: u64, floor_ms: u64) -> Duration {
    let half = u32::try_from(base_ms / 2).unwrap_or(u32::MAX);
    let variation = u64::from(dice.roll(0, half));
    let faster = coin(dice);
    let jittered = if faster {
        base_ms.saturating_sub(variation)
    } else {
        base_ms.saturating_add(variation)
    };
    Duration::from_millis(jittered.max(floor_ms))
}
